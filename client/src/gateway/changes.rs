//! Server change notifications over the `/ws` socket.
//!
//! The listener task is started by the first subscriber and reconnects with
//! exponential backoff for as long as anyone is subscribed.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use quotesync_engine::{QuoteId, Timestamp};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::{self, Message};

use super::ChangeNotice;

/// Client label sent to the server for its connection bookkeeping.
const CLIENT_LABEL: &str = "quotesync-client";

const NOTICE_CAPACITY: usize = 64;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Messages the server pushes; only change notices matter here.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerEvent {
    QuotesChanged {
        ids: Vec<QuoteId>,
        changed_at: Timestamp,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug)]
pub(super) struct ChangeListener {
    url: String,
    auth_token: Option<String>,
    sender: broadcast::Sender<ChangeNotice>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeListener {
    pub(super) fn new(base_url: &str, auth_token: Option<&str>) -> Self {
        let (sender, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            url: socket_url(base_url),
            auth_token: auth_token.map(String::from),
            sender,
            task: Mutex::new(None),
        }
    }

    /// Subscribe, starting the listener task if it is not running.
    ///
    /// Returns `None` outside a tokio runtime.
    pub(super) fn subscribe(&self) -> Option<broadcast::Receiver<ChangeNotice>> {
        let receiver = self.sender.subscribe();

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|running| !running.is_finished()) {
            return Some(receiver);
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime, remote change notifications disabled");
            return None;
        };
        *task = Some(runtime.spawn(listen(
            self.url.clone(),
            self.auth_token.clone(),
            self.sender.clone(),
        )));
        Some(receiver)
    }
}

impl Drop for ChangeListener {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = task.take() {
            task.abort();
        }
    }
}

/// `http(s)://host/base` to `ws(s)://host/base/ws?client=...`.
fn socket_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/ws?client={CLIENT_LABEL}")
}

async fn listen(url: String, auth_token: Option<String>, sender: broadcast::Sender<ChangeNotice>) {
    let mut backoff = INITIAL_BACKOFF;

    while sender.receiver_count() > 0 {
        match stream_notices(&url, auth_token.as_deref(), &sender).await {
            Ok(()) => {
                tracing::debug!(url = %url, "change stream closed");
                backoff = INITIAL_BACKOFF;
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, retry_in = ?backoff, "change stream unavailable");
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }

    tracing::debug!("no subscribers left, change listener stopped");
}

/// Forward notices from one connection until it closes.
async fn stream_notices(
    url: &str,
    auth_token: Option<&str>,
    sender: &broadcast::Sender<ChangeNotice>,
) -> Result<(), tungstenite::Error> {
    let mut request = url.into_client_request()?;
    if let Some(token) = auth_token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| tungstenite::Error::HttpFormat(e.into()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (mut socket, _) = tokio_tungstenite::connect_async(request).await?;
    tracing::info!(url = %url, "listening for remote changes");

    while let Some(message) = socket.next().await {
        match message? {
            Message::Text(text) => {
                let Some(notice) = parse_notice(&text) else {
                    continue;
                };
                if sender.send(notice).is_err() {
                    return Ok(());
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}

fn parse_notice(text: &str) -> Option<ChangeNotice> {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(ServerEvent::QuotesChanged { ids, changed_at }) => Some(ChangeNotice { ids, changed_at }),
        Ok(ServerEvent::Other) => None,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unreadable socket message");
            None
        }
    }
}
