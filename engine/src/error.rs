//! Error types for the quotesync engine.

use crate::QuoteId;
use thiserror::Error;

/// All possible errors from the quotesync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid import: {0}")]
    InvalidImport(String),

    // Ledger errors
    #[error("no backup recorded for quote: {0}")]
    BackupNotFound(QuoteId),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
