//! Quote handlers - the remote authority's fetch-all and upsert-many.

use crate::db;
use crate::error::{AppError, Result};
use crate::websocket::{ConnectionManager, ServerMessage};
use quotesync_engine::{Error as EngineError, Quote, Timestamp, MAX_TIMESTAMP};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Body of both requests and responses: a list of quotes.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuotesPayload {
    pub quotes: Vec<Quote>,
}

/// Return every stored quote.
pub async fn handle_fetch(pool: &PgPool) -> Result<QuotesPayload> {
    let quotes = db::fetch_quotes(pool)
        .await?
        .into_iter()
        .map(db::StoredQuote::into_quote)
        .collect();

    Ok(QuotesPayload { quotes })
}

/// Upsert a batch and return the full set afterwards.
///
/// The batch is validated as a whole before anything is written. A
/// non-empty batch is announced to every WebSocket client.
pub async fn handle_upsert(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    request: QuotesPayload,
    now: Timestamp,
) -> Result<QuotesPayload> {
    for quote in &request.quotes {
        validate(quote)?;
    }

    if !request.quotes.is_empty() {
        db::upsert_quotes(pool, &request.quotes).await?;

        let ids: Vec<_> = request.quotes.iter().map(|q| q.id.clone()).collect();
        tracing::info!(count = ids.len(), "Quotes upserted");

        let sent = conn_manager.broadcast_all(ServerMessage::quotes_changed(ids, now));
        tracing::debug!(sent_to = sent, "Broadcast change notification");
    }

    handle_fetch(pool).await
}

/// Reject quotes no replica would accept.
fn validate(quote: &Quote) -> Result<()> {
    if quote.id.trim().is_empty() {
        return Err(EngineError::Validation("quote id must not be empty".into()).into());
    }
    if quote.text.trim().is_empty() {
        return Err(EngineError::Validation(format!("quote {} has empty text", quote.id)).into());
    }
    if quote.category.trim().is_empty() {
        return Err(
            EngineError::Validation(format!("quote {} has empty category", quote.id)).into(),
        );
    }
    if quote.updated_at > MAX_TIMESTAMP {
        return Err(AppError::BadRequest(format!(
            "quote {} has updatedAt out of range",
            quote.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(validate(&Quote::new("a", "Text", "General", 1)).is_ok());

        assert!(matches!(
            validate(&Quote::new(" ", "Text", "General", 1)),
            Err(AppError::Engine(EngineError::Validation(_)))
        ));
        assert!(matches!(
            validate(&Quote::new("a", "", "General", 1)),
            Err(AppError::Engine(EngineError::Validation(_)))
        ));
        assert!(matches!(
            validate(&Quote::new("a", "Text", "  ", 1)),
            Err(AppError::Engine(EngineError::Validation(_)))
        ));
        assert!(matches!(
            validate(&Quote::new("a", "Text", "General", u64::MAX)),
            Err(AppError::BadRequest(_))
        ));
        assert!(validate(&Quote::new("a", "Text", "General", MAX_TIMESTAMP)).is_ok());
    }

    #[test]
    fn test_payload_wire_format() {
        let payload: QuotesPayload = serde_json::from_str(
            r#"{"quotes": [{"id": "a", "text": "A", "category": "C", "updatedAt": 5}]}"#,
        )
        .unwrap();
        assert_eq!(payload.quotes, vec![Quote::new("a", "A", "C", 5)]);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["quotes"][0]["updatedAt"], 5);
    }
}
