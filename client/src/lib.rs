//! # Quotesync Client
//!
//! Async runtime around [`quotesync_engine`]: it owns the local replica,
//! persists it, talks to the remote authority and keeps the two in step.
//!
//! - [`QuoteSync`] is the application-state object a presentation layer calls.
//!   Every operation runs under one lock, so timer ticks, change
//!   notifications and user actions never interleave.
//! - [`RemoteGateway`] is the contract for the remote authority, with an
//!   in-process [`MemoryGateway`] and an [`HttpGateway`] for the server.
//! - [`Storage`] persists the state document ([`FileStorage`],
//!   [`MemoryStorage`]).
//! - [`SyncScheduler`] runs silent syncs periodically and whenever the
//!   gateway reports a remote change.
//!
//! ```no_run
//! use quotesync_client::{ClientConfig, QuoteSync, SyncOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let sync = QuoteSync::from_config(&config).await?;
//!
//! sync.add_local_quote("Less, but better.", "Design").await?;
//! let summary = sync.sync(SyncOptions::interactive()).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

mod clock;
mod config;
mod error;
mod gateway;
mod scheduler;
mod storage;
mod sync;

pub use clock::SystemClock;
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use gateway::{
    ChangeNotice, GatewayError, HttpGateway, MemoryGateway, RemoteGateway, RemoteUpdate,
};
pub use scheduler::SyncScheduler;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use sync::{export_file_name, QuoteSync, SyncOptions, SyncSettings};
