//! Client error type.

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::storage::StorageError;

/// Errors surfaced by [`QuoteSync`](crate::QuoteSync).
///
/// Remote write failures never show up here: they are logged and the local
/// state is kept, to be pushed again on the next sync.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Rejected by the engine (validation, import, unknown backup).
    #[error(transparent)]
    Engine(#[from] quotesync_engine::Error),

    /// The remote could not be read; nothing was changed locally.
    #[error("Remote read failed: {0}")]
    RemoteRead(#[source] GatewayError),

    #[error("Gateway setup failed: {0}")]
    GatewaySetup(#[source] GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
