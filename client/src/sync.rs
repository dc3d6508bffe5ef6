//! The application-state object.
//!
//! [`QuoteSync`] owns the local replica and is the only way to change it.
//! Each operation takes the state lock, applies its change through the
//! engine, persists the result and only then releases the lock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use quotesync_engine::{
    export_quotes, parse_import, Clock, ConflictBackup, ImportReport, MergeStrategy, Quote,
    StateSnapshot, Store, SyncSummary, Timestamp,
};
use tokio::sync::{broadcast, Mutex};

use crate::config::{ClientConfig, DEFAULT_REMOTE_TIMEOUT};
use crate::error::{ClientError, Result};
use crate::gateway::{ChangeNotice, GatewayError, HttpGateway, MemoryGateway, RemoteGateway};
use crate::storage::{FileStorage, Storage};
use crate::SystemClock;

/// How a sync was requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Background sync: same state changes, quieter logging
    pub silent: bool,
}

impl SyncOptions {
    pub fn silent() -> Self {
        Self { silent: true }
    }

    pub fn interactive() -> Self {
        Self { silent: false }
    }
}

/// Tuning for a [`QuoteSync`].
#[derive(Clone)]
pub struct SyncSettings {
    /// Conflict rule applied during sync
    pub strategy: MergeStrategy,
    /// Bound on every gateway call
    pub remote_timeout: Duration,
    /// Time and id source
    pub clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            strategy: MergeStrategy::default(),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            clock: Arc::new(SystemClock),
        }
    }
}

/// Local quote list kept in sync with a remote authority.
pub struct QuoteSync {
    store: Mutex<Store>,
    gateway: Arc<dyn RemoteGateway>,
    storage: Arc<dyn Storage>,
    settings: SyncSettings,
}

impl QuoteSync {
    /// Load the persisted state (seeding a fresh replica) and persist it
    /// straight back in canonical form.
    ///
    /// A document that cannot be parsed is handed to
    /// [`Storage::quarantine`] and then treated as absent. If it cannot be
    /// set aside, opening fails and the document is left in place.
    pub async fn open(
        gateway: Arc<dyn RemoteGateway>,
        storage: Arc<dyn Storage>,
        settings: SyncSettings,
    ) -> Result<Self> {
        let clock = settings.clock.as_ref();

        let snapshot = match storage.load().await? {
            Some(document) => match StateSnapshot::from_json(&document, &clock) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::warn!(error = %e, "local state unreadable, starting fresh");
                    storage.quarantine(&document).await?;
                    None
                }
            },
            None => None,
        };

        let store = Store::load(snapshot, &clock);
        storage.save(&store.export_state().to_json()?).await?;

        tracing::info!(
            quotes = store.len(),
            backups = store.backups().len(),
            "local state loaded"
        );

        Ok(Self {
            store: Mutex::new(store),
            gateway,
            storage,
            settings,
        })
    }

    /// Open with the gateway and state file named by `config`.
    ///
    /// Without a server URL the in-memory demo remote is used.
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        let gateway: Arc<dyn RemoteGateway> = match &config.server_url {
            Some(url) => Arc::new(
                HttpGateway::new(url, config.auth_token.as_deref(), config.remote_timeout)
                    .map_err(ClientError::GatewaySetup)?,
            ),
            None => {
                tracing::info!("no server configured, using the in-memory demo remote");
                Arc::new(MemoryGateway::with_demo_seed())
            }
        };

        let settings = SyncSettings {
            remote_timeout: config.remote_timeout,
            ..SyncSettings::default()
        };

        Self::open(
            gateway,
            Arc::new(FileStorage::new(&config.state_path)),
            settings,
        )
        .await
    }

    /// Add a quote typed in by the user. It reaches the remote on the next
    /// sync.
    pub async fn add_local_quote(&self, text: &str, category: &str) -> Result<Quote> {
        let mut store = self.store.lock().await;
        let quote = store.add_local(text, category, &self.settings.clock.as_ref())?;
        self.persist(&store).await?;

        tracing::info!(id = %quote.id, category = %quote.category, "quote added locally");
        Ok(quote)
    }

    /// Reconcile with the remote, waiting for any operation in progress.
    ///
    /// A failed read leaves local state untouched. A failed push is logged
    /// and retried by the next sync.
    pub async fn sync(&self, options: SyncOptions) -> Result<SyncSummary> {
        let mut store = self.store.lock().await;
        self.sync_locked(&mut store, options).await
    }

    /// Like [`sync`](Self::sync), but returns `None` right away if another
    /// operation holds the state.
    pub async fn try_sync(&self, options: SyncOptions) -> Result<Option<SyncSummary>> {
        let Ok(mut store) = self.store.try_lock() else {
            tracing::debug!("sync skipped, another operation is in progress");
            return Ok(None);
        };
        self.sync_locked(&mut store, options).await.map(Some)
    }

    async fn sync_locked(&self, store: &mut Store, options: SyncOptions) -> Result<SyncSummary> {
        let remote = self
            .bounded(self.gateway.fetch_all())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "sync aborted, remote unreadable");
                ClientError::RemoteRead(e)
            })?;

        let now = self.settings.clock.now();
        let reconciliation = store.reconcile(&remote, self.settings.strategy, now);
        self.push_best_effort(&reconciliation.push).await;
        self.persist(store).await?;

        let summary = reconciliation.summary;
        if options.silent {
            tracing::debug!(
                added = summary.added_from_server,
                updated = summary.updated_from_server,
                conflicts = summary.conflicts,
                pushed = summary.pushed,
                "background sync complete"
            );
        } else {
            tracing::info!(
                added = summary.added_from_server,
                updated = summary.updated_from_server,
                conflicts = summary.conflicts,
                pushed = summary.pushed,
                "{summary}"
            );
        }

        Ok(summary)
    }

    /// Reinstate the overwritten local version recorded for `id` and push it,
    /// so the remote adopts it.
    pub async fn restore(&self, id: &str) -> Result<Quote> {
        let mut store = self.store.lock().await;
        let restored = store.restore(id, self.settings.clock.now())?;
        self.persist(&store).await?;
        self.push_best_effort(std::slice::from_ref(&restored)).await;

        tracing::info!(id, "local version restored");
        Ok(restored)
    }

    /// Drop the first backup recorded for `id`.
    pub async fn dismiss(&self, id: &str) -> Result<ConflictBackup> {
        let mut store = self.store.lock().await;
        let dismissed = store.dismiss(id)?;
        self.persist(&store).await?;
        Ok(dismissed)
    }

    /// Drop every backup. Returns how many were dropped.
    pub async fn dismiss_all(&self) -> Result<usize> {
        let mut store = self.store.lock().await;
        let count = store.backups().len();
        store.dismiss_all();
        self.persist(&store).await?;
        Ok(count)
    }

    /// Merge an import document (a JSON array of quotes).
    ///
    /// Malformed documents and batches without a single valid quote are
    /// rejected without touching local state.
    pub async fn import_batch(&self, raw_json: &str) -> Result<ImportReport> {
        let candidates = parse_import(raw_json)?;

        let mut store = self.store.lock().await;
        let report = store.merge_imported(&candidates, &self.settings.clock.as_ref())?;
        self.persist(&store).await?;

        tracing::info!(
            accepted = report.accepted,
            rejected = report.rejected,
            added = report.added,
            replaced = report.replaced,
            "import merged"
        );
        Ok(report)
    }

    /// The full local list in export format.
    pub async fn export_snapshot(&self) -> Result<String> {
        let store = self.store.lock().await;
        Ok(export_quotes(store.quotes())?)
    }

    /// Suggested file name for an export made now.
    pub fn export_file_name(&self) -> String {
        export_file_name(self.settings.clock.now())
    }

    pub async fn backups(&self) -> Vec<ConflictBackup> {
        self.store.lock().await.backups().list().to_vec()
    }

    pub async fn quotes(&self) -> Vec<Quote> {
        self.store.lock().await.quotes().to_vec()
    }

    /// Distinct categories in first-seen order.
    pub async fn categories(&self) -> Vec<String> {
        let store = self.store.lock().await;
        store.categories().into_iter().map(String::from).collect()
    }

    /// Remember the category filter; persisted across restarts.
    pub async fn select_category(&self, category: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.select_category(category);
        self.persist(&store).await
    }

    pub async fn selected_category(&self) -> String {
        self.store.lock().await.selected_category().to_string()
    }

    pub async fn quotes_in_selected_category(&self) -> Vec<Quote> {
        let store = self.store.lock().await;
        store
            .in_category(store.selected_category())
            .cloned()
            .collect()
    }

    /// When the last successful sync finished.
    pub async fn last_sync(&self) -> Option<Timestamp> {
        self.store.lock().await.last_sync()
    }

    /// Remote change notifications, when the gateway offers them.
    pub fn remote_changes(&self) -> Option<broadcast::Receiver<ChangeNotice>> {
        self.gateway.subscribe()
    }

    async fn persist(&self, store: &Store) -> Result<()> {
        let document = store.export_state().to_json()?;
        self.storage.save(&document).await?;
        Ok(())
    }

    async fn push_best_effort(&self, quotes: &[Quote]) {
        if quotes.is_empty() {
            return;
        }
        match self.bounded(self.gateway.upsert_many(quotes)).await {
            Ok(_) => tracing::debug!(count = quotes.len(), "pushed local quotes"),
            Err(e) => tracing::warn!(
                error = %e,
                count = quotes.len(),
                "push failed, local copies kept for the next sync"
            ),
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, GatewayError>>,
    ) -> std::result::Result<T, GatewayError> {
        let limit = self.settings.remote_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(limit)),
        }
    }
}

/// `quotes-YYYY-MM-DD.json` for the UTC date of `now`.
pub fn export_file_name(now: Timestamp) -> String {
    let date = i64::try_from(now)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .unwrap_or_default();
    format!("quotes-{}.json", date.format("%Y-%m-%d"))
}
