//! Store - the in-memory local replica.
//!
//! The Store holds the local quotes, the backup ledger and the small amount
//! of user state that is persisted alongside them. Every mutation is a full
//! replacement of a quote; nothing is ever deleted.

use crate::{
    error::Result, BackupLedger, Clock, ConflictBackup, Error, MergeStrategy, Quote, QuoteId,
    Reconciler, Reconciliation, StateSnapshot, Timestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Category filter value that selects every quote.
pub const SELECT_ALL: &str = "all";

/// Quotes a fresh replica starts with: `(text, category)`.
const STARTER_QUOTES: [(&str, &str); 3] = [
    (
        "The best way to get started is to quit talking and begin doing.",
        "Motivation",
    ),
    (
        "Success is not final, failure is not fatal: It is the courage to continue that counts.",
        "Inspiration",
    ),
    (
        "Do not wait for leaders; do it alone, person to person.",
        "Action",
    ),
];

/// Outcome of merging an import batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Candidates that passed validation
    pub accepted: usize,
    /// Candidates dropped by validation
    pub rejected: usize,
    /// Valid candidates with an id not yet in the store
    pub added: usize,
    /// Valid candidates that replaced an existing quote
    pub replaced: usize,
    /// Valid candidates ignored because the local quote was newer
    pub kept_local: usize,
}

/// The local replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    /// Quotes in display order
    quotes: Vec<Quote>,
    /// Position of each quote id in `quotes`
    index: HashMap<QuoteId, usize>,
    /// Overwritten local versions
    backups: BackupLedger,
    /// Last category filter chosen by the user
    selected_category: String,
    /// When the last successful sync finished
    last_sync: Option<Timestamp>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            quotes: Vec::new(),
            index: HashMap::new(),
            backups: BackupLedger::new(),
            selected_category: SELECT_ALL.to_string(),
            last_sync: None,
        }
    }

    /// Build the store from persisted state.
    ///
    /// A missing snapshot or one without quotes is seeded with the starter
    /// quotes. Quotes in the snapshot are expected to be normalized already
    /// (see [`StateSnapshot::from_json`]); duplicate ids collapse onto the
    /// last occurrence. Exporting the result and loading it again yields the
    /// same state.
    pub fn load(snapshot: Option<StateSnapshot>, clock: &impl Clock) -> Self {
        let snapshot = snapshot.unwrap_or_default();
        let mut store = Self {
            backups: snapshot.backups,
            selected_category: snapshot.selected_category,
            last_sync: snapshot.last_sync,
            ..Self::new()
        };

        if snapshot.quotes.is_empty() {
            for (text, category) in STARTER_QUOTES {
                store.upsert(Quote::new(clock.generate_id(), text, category, clock.now()));
            }
        } else {
            for quote in snapshot.quotes {
                store.upsert(quote);
            }
        }
        store
    }

    /// Capture the full state for persistence.
    pub fn export_state(&self) -> StateSnapshot {
        StateSnapshot {
            quotes: self.quotes.clone(),
            selected_category: self.selected_category.clone(),
            last_sync: self.last_sync,
            backups: self.backups.clone(),
            ..StateSnapshot::default()
        }
    }

    /// All quotes in display order.
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    /// Get a quote by id.
    pub fn get(&self, id: &str) -> Option<&Quote> {
        self.index.get(id).map(|&idx| &self.quotes[idx])
    }

    /// Check if a quote exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of quotes.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Check if the store holds no quotes.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Insert a quote or replace the one with the same id.
    ///
    /// Replacement keeps the original position. Returns the previous value.
    pub fn upsert(&mut self, quote: Quote) -> Option<Quote> {
        match self.index.get(&quote.id) {
            Some(&idx) => Some(std::mem::replace(&mut self.quotes[idx], quote)),
            None => {
                self.index.insert(quote.id.clone(), self.quotes.len());
                self.quotes.push(quote);
                None
            }
        }
    }

    /// Replace the whole quote list.
    fn replace_all(&mut self, quotes: Vec<Quote>) {
        self.quotes.clear();
        self.index.clear();
        for quote in quotes {
            self.upsert(quote);
        }
    }

    /// Add a quote typed in by the user.
    pub fn add_local(&mut self, text: &str, category: &str, clock: &impl Clock) -> Result<Quote> {
        let quote = Quote::compose(text, category, clock)?;
        self.upsert(quote.clone());
        Ok(quote)
    }

    /// Merge an import batch into the store.
    ///
    /// Each candidate is normalized on its own; invalid ones are dropped
    /// without affecting the rest. A valid candidate replaces the local quote
    /// with the same id only if its `updatedAt` is greater than or equal to
    /// the local one. A batch with no valid candidate is rejected as a whole
    /// and leaves the store untouched.
    pub fn merge_imported(&mut self, candidates: &[Value], clock: &impl Clock) -> Result<ImportReport> {
        let cleaned: Vec<Quote> = candidates
            .iter()
            .filter_map(|raw| Quote::normalize(raw, clock))
            .collect();

        if cleaned.is_empty() {
            return Err(Error::InvalidImport("no valid quotes found".into()));
        }

        let mut report = ImportReport {
            accepted: cleaned.len(),
            rejected: candidates.len() - cleaned.len(),
            ..ImportReport::default()
        };

        for imported in cleaned {
            let local_updated_at = self.get(&imported.id).map(|q| q.updated_at);
            match local_updated_at {
                None => {
                    self.upsert(imported);
                    report.added += 1;
                }
                Some(local) if imported.updated_at >= local => {
                    self.upsert(imported);
                    report.replaced += 1;
                }
                Some(_) => report.kept_local += 1,
            }
        }

        Ok(report)
    }

    /// Reconcile against a remote snapshot and apply the result.
    ///
    /// The merged set becomes the new local state, new backups are appended
    /// to the ledger and the last-sync time is set to `now`. The returned
    /// [`Reconciliation`] carries the push list the caller must upload.
    pub fn reconcile(
        &mut self,
        remote: &[Quote],
        strategy: MergeStrategy,
        now: Timestamp,
    ) -> Reconciliation {
        let reconciliation = Reconciler::new(strategy).reconcile(&self.quotes, remote, now);

        self.replace_all(reconciliation.merged.clone());
        self.backups.extend(reconciliation.backups.iter().cloned());
        self.last_sync = Some(now);

        reconciliation
    }

    /// The backup ledger.
    pub fn backups(&self) -> &BackupLedger {
        &self.backups
    }

    /// Reinstate the overwritten local version recorded for `id`.
    ///
    /// Uses the first ledger entry for `id`, stamps it with `now` so it is the
    /// newest version, stores it and removes the entry. Returns the restored
    /// quote, which the caller must push to the remote.
    pub fn restore(&mut self, id: &str, now: Timestamp) -> Result<Quote> {
        let backup = self
            .backups
            .remove(id)
            .ok_or_else(|| Error::BackupNotFound(id.to_string()))?;

        let restored = backup.local.touched(now);
        self.upsert(restored.clone());
        Ok(restored)
    }

    /// Drop the first ledger entry for `id` without restoring it.
    pub fn dismiss(&mut self, id: &str) -> Result<ConflictBackup> {
        self.backups
            .remove(id)
            .ok_or_else(|| Error::BackupNotFound(id.to_string()))
    }

    /// Drop every ledger entry.
    pub fn dismiss_all(&mut self) {
        self.backups.clear();
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for quote in &self.quotes {
            if !seen.contains(&quote.category.as_str()) {
                seen.push(quote.category.as_str());
            }
        }
        seen
    }

    /// Quotes matching a category filter; [`SELECT_ALL`] matches everything.
    pub fn in_category<'a>(&'a self, filter: &'a str) -> impl Iterator<Item = &'a Quote> + 'a {
        self.quotes
            .iter()
            .filter(move |q| filter == SELECT_ALL || q.category == filter)
    }

    /// The persisted category filter.
    pub fn selected_category(&self) -> &str {
        &self.selected_category
    }

    /// Remember the category filter chosen by the user.
    pub fn select_category(&mut self, category: impl Into<String>) {
        let category = category.into();
        self.selected_category = if category.trim().is_empty() {
            SELECT_ALL.to_string()
        } else {
            category
        };
    }

    /// When the last successful sync finished.
    pub fn last_sync(&self) -> Option<Timestamp> {
        self.last_sync
    }
}
