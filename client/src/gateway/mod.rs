//! Remote gateway contract and its implementations.
//!
//! The remote authority is opaque: it returns its full current set and
//! accepts replace-or-insert batches. It may change between any two calls.

mod changes;
mod http;
mod memory;

pub use http::HttpGateway;
pub use memory::{MemoryGateway, RemoteUpdate};

use async_trait::async_trait;
use quotesync_engine::{Quote, QuoteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;

/// Announcement that quotes changed on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// Ids written by the change
    pub ids: Vec<QuoteId>,
    /// When the remote applied it
    pub changed_at: Timestamp,
}

/// Errors raised by a gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// The remote authority.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Full current remote set. May be empty.
    async fn fetch_all(&self) -> Result<Vec<Quote>, GatewayError>;

    /// Replace-or-insert by id, last write wins within the batch in input
    /// order. Returns the new full remote set.
    async fn upsert_many(&self, quotes: &[Quote]) -> Result<Vec<Quote>, GatewayError>;

    /// Stream of remote change notifications, if the remote offers one.
    fn subscribe(&self) -> Option<broadcast::Receiver<ChangeNotice>> {
        None
    }
}
