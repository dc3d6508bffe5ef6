//! In-process remote authority.
//!
//! Handles are cheap to clone and share one remote set, so two
//! [`QuoteSync`](crate::QuoteSync) instances on the same gateway behave like
//! two processes talking to one server.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quotesync_engine::{Clock, Quote, QuoteId, Timestamp};
use tokio::sync::{broadcast, Mutex};

use super::{ChangeNotice, GatewayError, RemoteGateway};
use crate::SystemClock;

/// Capacity of the change-notification channel.
const NOTIFY_CAPACITY: usize = 64;

/// Suffix appended to a quote edited by [`MemoryGateway::edit_quote`].
const SERVER_EDIT_SUFFIX: &str = " [server edit]";

/// Category of quotes created by [`MemoryGateway::add_server_quote`].
const SERVER_CATEGORY: &str = "Server";

/// Out-of-band change applied by [`MemoryGateway::simulate_remote_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteUpdate {
    /// An existing quote was edited
    Edited(QuoteId),
    /// A new quote was created
    Added(QuoteId),
}

#[derive(Debug, Default)]
struct RemoteState {
    quotes: Vec<Quote>,
    /// Whether the set was ever written; demo seeding happens only before that
    initialized: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<RemoteState>,
    seed_demo: bool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    latency_ms: AtomicU64,
    changes: broadcast::Sender<ChangeNotice>,
}

/// Remote gateway backed by process memory.
#[derive(Debug, Clone)]
pub struct MemoryGateway {
    shared: Arc<Shared>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    fn build(quotes: Vec<Quote>, initialized: bool, seed_demo: bool) -> Self {
        let (changes, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RemoteState {
                    quotes,
                    initialized,
                }),
                seed_demo,
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
                latency_ms: AtomicU64::new(0),
                changes,
            }),
        }
    }

    /// An empty remote.
    pub fn new() -> Self {
        Self::build(Vec::new(), true, false)
    }

    /// A remote that seeds itself with two demo quotes on first use.
    pub fn with_demo_seed() -> Self {
        Self::build(Vec::new(), false, true)
    }

    /// A remote holding `quotes`.
    pub fn with_quotes(quotes: Vec<Quote>) -> Self {
        let mut state = RemoteState::default();
        upsert_into(&mut state.quotes, &quotes);
        Self::build(state.quotes, true, false)
    }

    /// Make every subsequent read fail until turned off again.
    pub fn fail_reads(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail until turned off again.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay every gateway call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.shared.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Current remote set, bypassing latency and failure injection.
    pub async fn snapshot(&self) -> Vec<Quote> {
        let mut state = self.shared.state.lock().await;
        self.ensure_seeded(&mut state);
        state.quotes.clone()
    }

    /// Append `" [server edit]"` to the quote with `id` and stamp it with the
    /// current time, as another client would.
    pub async fn edit_quote(&self, id: &str) -> Option<Quote> {
        let edited = {
            let mut state = self.shared.state.lock().await;
            self.ensure_seeded(&mut state);
            let quote = state.quotes.iter_mut().find(|q| q.id == id)?;
            quote.text.push_str(SERVER_EDIT_SUFFIX);
            quote.updated_at = SystemClock.now();
            quote.clone()
        };
        self.notify(vec![edited.id.clone()], edited.updated_at);
        Some(edited)
    }

    /// Create a new quote in the `"Server"` category.
    pub async fn add_server_quote(&self) -> Quote {
        let clock = SystemClock;
        let quote = Quote::new(
            format!("srv-{}", clock.generate_id()),
            format!("New remote quote at {}", chrono::Utc::now().format("%H:%M:%S")),
            SERVER_CATEGORY,
            clock.now(),
        );
        {
            let mut state = self.shared.state.lock().await;
            self.ensure_seeded(&mut state);
            state.quotes.push(quote.clone());
        }
        self.notify(vec![quote.id.clone()], quote.updated_at);
        quote
    }

    /// Apply a random out-of-band change: mostly an edit of an existing
    /// quote, otherwise a new quote.
    pub async fn simulate_remote_update(&self) -> RemoteUpdate {
        let roll = uuid::Uuid::new_v4().as_u128();
        let target = {
            let mut state = self.shared.state.lock().await;
            self.ensure_seeded(&mut state);
            let len = state.quotes.len() as u128;
            (len > 0 && roll % 10 < 7).then(|| {
                let idx = ((roll >> 16) % len) as usize;
                state.quotes[idx].id.clone()
            })
        };

        if let Some(id) = target {
            if let Some(edited) = self.edit_quote(&id).await {
                return RemoteUpdate::Edited(edited.id);
            }
        }
        RemoteUpdate::Added(self.add_server_quote().await.id)
    }

    fn ensure_seeded(&self, state: &mut RemoteState) {
        if state.initialized {
            return;
        }
        state.initialized = true;
        if self.shared.seed_demo && state.quotes.is_empty() {
            let now = SystemClock.now();
            state.quotes = demo_quotes(now);
            tracing::debug!(count = state.quotes.len(), "seeded demo remote");
        }
    }

    async fn delay(&self) {
        let millis = self.shared.latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn notify(&self, ids: Vec<QuoteId>, changed_at: Timestamp) {
        // No subscriber is fine.
        let _ = self.shared.changes.send(ChangeNotice { ids, changed_at });
    }
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn fetch_all(&self) -> Result<Vec<Quote>, GatewayError> {
        self.delay().await;
        if self.shared.fail_reads.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("remote read refused".into()));
        }
        Ok(self.snapshot().await)
    }

    async fn upsert_many(&self, quotes: &[Quote]) -> Result<Vec<Quote>, GatewayError> {
        self.delay().await;
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("remote write refused".into()));
        }

        let current = {
            let mut state = self.shared.state.lock().await;
            self.ensure_seeded(&mut state);
            upsert_into(&mut state.quotes, quotes);
            state.quotes.clone()
        };

        if !quotes.is_empty() {
            self.notify(
                quotes.iter().map(|q| q.id.clone()).collect(),
                SystemClock.now(),
            );
        }
        Ok(current)
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ChangeNotice>> {
        Some(self.shared.changes.subscribe())
    }
}

/// Replace-or-insert by id; replacements keep their position.
fn upsert_into(target: &mut Vec<Quote>, items: &[Quote]) {
    for item in items {
        match target.iter_mut().find(|q| q.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => target.push(item.clone()),
        }
    }
}

fn demo_quotes(now: Timestamp) -> Vec<Quote> {
    vec![
        Quote::new(
            "srv-1",
            "Stay hungry, stay foolish.",
            "Inspiration",
            now.saturating_sub(60_000),
        ),
        Quote::new(
            "srv-2",
            "Simplicity is the soul of efficiency.",
            "Productivity",
            now.saturating_sub(45_000),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str, text: &str, updated_at: Timestamp) -> Quote {
        Quote::new(id, text, "General", updated_at)
    }

    #[tokio::test]
    async fn demo_seed_happens_once() {
        let gateway = MemoryGateway::with_demo_seed();

        let first = gateway.fetch_all().await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id, "srv-1");
        assert_eq!(first[1].category, "Productivity");
        assert!(first[0].updated_at < first[1].updated_at);

        gateway.upsert_many(&[q("x", "X", 1)]).await.unwrap();
        assert_eq!(gateway.fetch_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn plain_remote_starts_empty() {
        let gateway = MemoryGateway::new();
        assert!(gateway.fetch_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins_in_order() {
        let gateway = MemoryGateway::with_quotes(vec![q("a", "A", 1), q("b", "B", 1)]);

        let result = gateway
            .upsert_many(&[q("a", "A2", 2), q("c", "C", 1), q("a", "A3", 3)])
            .await
            .unwrap();

        assert_eq!(
            result,
            vec![q("a", "A3", 3), q("b", "B", 1), q("c", "C", 1)]
        );
    }

    #[tokio::test]
    async fn failure_injection() {
        let gateway = MemoryGateway::with_quotes(vec![q("a", "A", 1)]);

        gateway.fail_reads(true);
        assert!(matches!(
            gateway.fetch_all().await,
            Err(GatewayError::Unavailable(_))
        ));
        gateway.fail_reads(false);

        gateway.fail_writes(true);
        assert!(gateway.upsert_many(&[q("b", "B", 1)]).await.is_err());
        assert_eq!(gateway.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn handles_share_state_and_notify() {
        let gateway = MemoryGateway::new();
        let other = gateway.clone();
        let mut changes = gateway.subscribe().unwrap();

        other.upsert_many(&[q("a", "A", 1)]).await.unwrap();

        assert_eq!(gateway.snapshot().await, vec![q("a", "A", 1)]);
        assert_eq!(changes.recv().await.unwrap().ids, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn empty_upsert_is_silent() {
        let gateway = MemoryGateway::new();
        let mut changes = gateway.subscribe().unwrap();

        gateway.upsert_many(&[]).await.unwrap();

        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn edit_quote_marks_server_edit() {
        let gateway = MemoryGateway::with_quotes(vec![q("a", "Text", 1)]);

        let edited = gateway.edit_quote("a").await.unwrap();

        assert_eq!(edited.text, "Text [server edit]");
        assert!(edited.updated_at > 1);
        assert!(gateway.edit_quote("missing").await.is_none());
    }

    #[tokio::test]
    async fn simulate_on_empty_remote_adds() {
        let gateway = MemoryGateway::new();

        let update = gateway.simulate_remote_update().await;

        let RemoteUpdate::Added(id) = update else {
            panic!("expected an added quote, got {update:?}");
        };
        let remote = gateway.snapshot().await;
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].id, id);
        assert!(id.starts_with("srv-"));
        assert_eq!(remote[0].category, "Server");
    }
}
