//! Time and identity source for the engine.
//!
//! The engine never reads the wall clock itself. Every operation that needs
//! "now" or a fresh quote id takes a [`Clock`], so the same inputs always
//! produce the same outputs under a [`ManualClock`].

use crate::{QuoteId, Timestamp};
use std::cell::Cell;

/// Supplies the current time and mints collision-resistant quote ids.
pub trait Clock {
    /// Current time in milliseconds since the Unix epoch.
    fn now(&self) -> Timestamp;

    /// Produce a new quote id, unique for the lifetime of the replica.
    fn generate_id(&self) -> QuoteId;
}

/// A clock driven by hand.
///
/// Time only moves when [`ManualClock::advance`] or [`ManualClock::set`] is
/// called. Ids are `"{now}-{seq}"` with a per-clock sequence, which keeps them
/// unique even when many are minted at the same instant.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Timestamp>,
    seq: Cell<u64>,
}

impl ManualClock {
    /// Create a clock frozen at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Cell::new(now),
            seq: Cell::new(0),
        }
    }

    /// Move the clock forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get().saturating_add(millis));
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: Timestamp) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }

    fn generate_id(&self) -> QuoteId {
        let seq = self.seq.get() + 1;
        self.seq.set(seq);
        format!("{}-{}", self.now.get(), seq)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn generate_id(&self) -> QuoteId {
        (**self).generate_id()
    }
}
