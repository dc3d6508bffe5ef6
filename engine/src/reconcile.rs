//! Reconciliation of the local replica against a remote snapshot.
//!
//! This is the core of the sync. Given the local quotes and a fresh snapshot
//! of the remote authority, it produces the merged local state, the backups
//! of every local version that lost, and the quotes the remote has never
//! seen.
//!
//! # Algorithm
//!
//! 1. Walk the remote snapshot. Unknown ids are added to the merged set.
//!    Known ids whose `text`, `category` or `updatedAt` differ are resolved
//!    by the [`MergeStrategy`]; every overwritten local version is backed up.
//! 2. Local ids missing from the remote are kept and queued for push.
//! 3. The merged set keeps local order, with newly discovered remote quotes
//!    appended in snapshot order.
//!
//! The reconciler performs no IO. Pushing and persisting are the caller's job.

use crate::{ConflictBackup, Quote, QuoteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Rule used when a quote exists on both sides with different content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeStrategy {
    /// Any observed difference is resolved in favour of the remote, even when
    /// the local copy carries a later `updatedAt` (default)
    #[default]
    RemoteWins,
    /// Later `updatedAt` wins, ties go to the remote. A strictly newer local
    /// copy is kept and pushed back.
    TimestampWins,
}

/// Counts describing what a reconciliation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// Remote quotes that were new to the local replica
    pub added_from_server: usize,
    /// Local quotes replaced by their remote version
    pub updated_from_server: usize,
    /// Quotes present on both sides with differing content
    pub conflicts: usize,
    /// Conflicts resolved in favour of the local copy
    pub kept_local: usize,
    /// Quotes queued for upload to the remote
    pub pushed: usize,
}

impl SyncSummary {
    /// Whether the local replica was left untouched.
    pub fn is_unchanged(&self) -> bool {
        self.added_from_server == 0 && self.updated_from_server == 0 && self.kept_local == 0
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.added_from_server == 0 && self.updated_from_server == 0 {
            return write!(f, "Sync complete. No changes.");
        }
        write!(
            f,
            "Synced: {} new from server, {} updated",
            self.added_from_server, self.updated_from_server
        )?;
        if self.conflicts > 0 {
            write!(f, ", {} conflict(s) resolved (server wins)", self.conflicts)?;
        }
        write!(f, ".")
    }
}

/// Result of reconciling one local set against one remote snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// The new local state
    pub merged: Vec<Quote>,
    /// Local versions overwritten by the remote, in resolution order
    pub backups: Vec<ConflictBackup>,
    /// Quotes the remote must receive
    pub push: Vec<Quote>,
    /// What changed
    pub summary: SyncSummary,
}

/// Computes reconciliations under a fixed [`MergeStrategy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    strategy: MergeStrategy,
}

impl Reconciler {
    /// Create a reconciler using `strategy`.
    pub fn new(strategy: MergeStrategy) -> Self {
        Self { strategy }
    }

    /// The strategy in use.
    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    /// Reconcile `local` against the remote snapshot `remote`.
    ///
    /// `now` stamps the backups created by this pass. The result depends only
    /// on the arguments, so reconciling twice against the same snapshot is
    /// safe: the second pass reports nothing.
    pub fn reconcile(&self, local: &[Quote], remote: &[Quote], now: Timestamp) -> Reconciliation {
        let mut merged: Vec<Quote> = local.to_vec();
        let mut positions: HashMap<QuoteId, usize> = HashMap::with_capacity(merged.len());
        for (idx, quote) in merged.iter().enumerate() {
            positions.insert(quote.id.clone(), idx);
        }

        let remote = dedup_last_wins(remote);
        let mut backups = Vec::new();
        let mut push = Vec::new();
        let mut summary = SyncSummary::default();

        // 1) Apply the remote snapshot
        for server in &remote {
            let Some(&idx) = positions.get(&server.id) else {
                positions.insert(server.id.clone(), merged.len());
                merged.push(server.clone());
                summary.added_from_server += 1;
                continue;
            };

            let current = &merged[idx];
            if !current.differs_from(server) {
                continue;
            }

            summary.conflicts += 1;
            if self.remote_prevails(current, server) {
                backups.push(ConflictBackup::new(current.clone(), server.clone(), now));
                merged[idx] = server.clone();
                summary.updated_from_server += 1;
            } else {
                push.push(current.clone());
                summary.kept_local += 1;
            }
        }

        // 2) Queue local-only quotes for upload
        let remote_ids: HashSet<&str> = remote.iter().map(|q| q.id.as_str()).collect();
        let local_only = merged
            .iter()
            .filter(|q| !remote_ids.contains(q.id.as_str()))
            .cloned();
        push.extend(local_only);
        summary.pushed = push.len();

        Reconciliation {
            merged,
            backups,
            push,
            summary,
        }
    }

    fn remote_prevails(&self, local: &Quote, remote: &Quote) -> bool {
        match self.strategy {
            MergeStrategy::RemoteWins => true,
            MergeStrategy::TimestampWins => remote.updated_at >= local.updated_at,
        }
    }
}

/// Collapse duplicate ids in a snapshot: the last occurrence supplies the
/// value, the first occurrence fixes the position.
fn dedup_last_wins(snapshot: &[Quote]) -> Vec<Quote> {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(snapshot.len());
    let mut unique: Vec<Quote> = Vec::with_capacity(snapshot.len());
    for quote in snapshot {
        match positions.get(quote.id.as_str()) {
            Some(&idx) => unique[idx] = quote.clone(),
            None => {
                positions.insert(quote.id.as_str(), unique.len());
                unique.push(quote.clone());
            }
        }
    }
    unique
}
