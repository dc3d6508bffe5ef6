//! Request handlers.

mod quotes;
mod websocket;

pub use quotes::*;
pub use websocket::*;
