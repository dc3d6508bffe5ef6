//! HTTP gateway for the quotesync server.
//!
//! Uses the server's REST endpoints: `GET /quotes` for the full set and
//! `POST /quotes` for batch upserts. Both exchange `{"quotes": [...]}`.
//! Change notifications come from the server's `/ws` socket.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quotesync_engine::Quote;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use tokio::sync::broadcast;

use super::changes::ChangeListener;
use super::{ChangeNotice, GatewayError, RemoteGateway};

/// Longest response body preview kept in an error.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Serialize)]
struct UpsertRequest<'a> {
    quotes: &'a [Quote],
}

#[derive(Deserialize)]
struct QuotesResponse {
    quotes: Vec<Quote>,
}

/// Gateway talking to a quotesync server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    changes: Arc<ChangeListener>,
}

impl HttpGateway {
    /// Create a gateway for the server at `base_url`.
    ///
    /// `timeout` bounds each request; `auth_token` is sent as a bearer token
    /// on requests and on the notification socket.
    pub fn new(
        base_url: &str,
        auth_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| GatewayError::Unavailable("invalid auth token format".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            changes: Arc::new(ChangeListener::new(&base_url, auth_token)),
            base_url,
        })
    }

    fn quotes_url(&self) -> String {
        format!("{}/quotes", self.base_url)
    }

    async fn parse_response(response: reqwest::Response) -> Result<Vec<Quote>, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, "remote returned an error");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let payload: QuotesResponse = response.json().await?;
        Ok(payload.quotes)
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn fetch_all(&self) -> Result<Vec<Quote>, GatewayError> {
        let response = self.client.get(self.quotes_url()).send().await?;
        Self::parse_response(response).await
    }

    async fn upsert_many(&self, quotes: &[Quote]) -> Result<Vec<Quote>, GatewayError> {
        let response = self
            .client
            .post(self.quotes_url())
            .json(&UpsertRequest { quotes })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ChangeNotice>> {
        self.changes.subscribe()
    }
}
