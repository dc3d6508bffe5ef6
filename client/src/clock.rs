//! Wall-clock time source.

use quotesync_engine::{Clock, QuoteId, Timestamp};

/// Length of the random suffix in generated ids.
const ID_SUFFIX_LEN: usize = 6;

/// [`Clock`] backed by the system time.
///
/// Ids are `"{millis}-{suffix}"`, the suffix being six random lowercase hex
/// characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Before the epoch only happens on a badly broken clock.
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }

    fn generate_id(&self) -> QuoteId {
        let random = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", self.now(), &random[..ID_SUFFIX_LEN])
    }
}
