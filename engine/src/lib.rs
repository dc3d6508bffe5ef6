//! # Quotesync Engine
//!
//! A deterministic sync core for an offline-first quote list.
//!
//! The engine reconciles a local replica against a snapshot of a remote
//! authority that can change independently, resolves every divergence in
//! favour of the remote, and keeps a recoverable backup of each local version
//! it overwrote.
//!
//! ## Design Principles
//!
//! - **No IO**: The engine has no knowledge of files, network, or platform
//! - **Deterministic**: Time and ids come from a [`Clock`], so the same inputs
//!   always produce the same outputs
//! - **Testable**: Pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Quotes
//!
//! A [`Quote`] has an id stable across replicas, a text, a category and an
//! `updatedAt` timestamp. Quotes are only ever replaced as a whole.
//!
//! ### Reconciliation
//!
//! The [`Reconciler`] merges a local set with a remote snapshot:
//! - remote quotes unknown locally are added
//! - quotes differing on either side are resolved by the [`MergeStrategy`]
//!   ([`MergeStrategy::RemoteWins`] by default)
//! - local quotes unknown remotely are queued for push
//!
//! ### Backups
//!
//! Every overwritten local version lands in the [`BackupLedger`] as a
//! [`ConflictBackup`], from where it can be restored or dismissed.
//!
//! ## Quick Start
//!
//! ```rust
//! use quotesync_engine::{Clock, ManualClock, MergeStrategy, Quote, Store};
//!
//! let clock = ManualClock::new(1_706_745_600_000);
//!
//! // 1. Load (or seed) the local replica
//! let mut store = Store::load(None, &clock);
//! assert_eq!(store.len(), 3);
//!
//! // 2. Add a quote locally
//! let mine = store.add_local("Less, but better.", "Design", &clock).unwrap();
//!
//! // 3. Reconcile against what the remote returned
//! let remote = vec![Quote::new("srv-1", "Stay hungry, stay foolish.", "Inspiration", 1)];
//! let result = store.reconcile(&remote, MergeStrategy::RemoteWins, clock.now());
//!
//! assert_eq!(result.summary.added_from_server, 1);
//! assert!(result.push.iter().any(|q| q.id == mine.id));
//! ```
//!
//! ## Persistence
//!
//! Use [`Store::export_state`] and [`Store::load`] with [`StateSnapshot`] for
//! persistence. Snapshots serialize deterministically, and loading a
//! snapshot that was just exported reproduces it byte for byte.

pub mod backup;
pub mod clock;
pub mod error;
pub mod quote;
pub mod reconcile;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use backup::{BackupLedger, ConflictBackup};
pub use clock::{Clock, ManualClock};
pub use error::{Error, Result};
pub use quote::{Quote, DEFAULT_CATEGORY, MAX_TIMESTAMP};
pub use reconcile::{MergeStrategy, Reconciler, Reconciliation, SyncSummary};
pub use snapshot::{export_quotes, parse_import, StateSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{ImportReport, Store, SELECT_ALL};

/// Type aliases for clarity
pub type QuoteId = String;
pub type Timestamp = u64;
