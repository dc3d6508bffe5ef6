//! Database module for PostgreSQL persistence.

mod pool;
mod quotes;
mod startup;

pub use pool::*;
pub use quotes::*;
pub use startup::*;
