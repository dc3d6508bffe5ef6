//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded and use snake_case for field names.

use quotesync_engine::{QuoteId, Timestamp};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Quotes were written; clients should sync.
    QuotesChanged {
        /// Ids written by the upsert
        ids: Vec<QuoteId>,
        /// Server time of the write (ms since epoch)
        changed_at: Timestamp,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Create a quotes_changed notification.
    pub fn quotes_changed(ids: Vec<QuoteId>, changed_at: Timestamp) -> Self {
        ServerMessage::QuotesChanged { ids, changed_at }
    }
}
