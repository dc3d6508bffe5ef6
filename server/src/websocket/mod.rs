//! WebSocket change notifications.
//!
//! Clients connect to `/ws` and receive a `quotes_changed` message after
//! every write, so they can sync right away instead of waiting for their
//! next poll.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
