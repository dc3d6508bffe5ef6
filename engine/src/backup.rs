//! Backup ledger for local versions overwritten during sync.
//!
//! The ledger is a raw event log, not a current-state table: every overwrite
//! appends a new entry, and several entries may exist for the same quote id.

use crate::{Quote, QuoteId, Timestamp};
use serde::{Deserialize, Serialize};

/// One overwrite event: the local version that lost and the server version
/// that replaced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictBackup {
    /// Id of the quote that was overwritten
    pub id: QuoteId,
    /// Local version before the overwrite
    pub local: Quote,
    /// Server version that won
    pub server: Quote,
    /// When the overwrite happened (milliseconds since epoch)
    pub when: Timestamp,
}

impl ConflictBackup {
    /// Record that `server` replaced `local` at `when`.
    pub fn new(local: Quote, server: Quote, when: Timestamp) -> Self {
        Self {
            id: local.id.clone(),
            local,
            server,
            when,
        }
    }
}

/// Append-only list of [`ConflictBackup`] entries in recording order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupLedger {
    entries: Vec<ConflictBackup>,
}

impl BackupLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a ledger from previously persisted entries.
    pub fn from_entries(entries: Vec<ConflictBackup>) -> Self {
        Self { entries }
    }

    /// Record a new overwrite event.
    pub fn append(&mut self, backup: ConflictBackup) {
        self.entries.push(backup);
    }

    /// Record several overwrite events, preserving their order.
    pub fn extend(&mut self, backups: impl IntoIterator<Item = ConflictBackup>) {
        self.entries.extend(backups);
    }

    /// All entries, oldest first.
    pub fn list(&self) -> &[ConflictBackup] {
        &self.entries
    }

    /// First entry for `id` in ledger order.
    pub fn find(&self, id: &str) -> Option<&ConflictBackup> {
        self.entries.iter().find(|b| b.id == id)
    }

    /// Remove and return the first entry for `id`.
    ///
    /// Only one entry is removed even when several exist for the same id.
    pub fn remove(&mut self, id: &str) -> Option<ConflictBackup> {
        let idx = self.entries.iter().position(|b| b.id == id)?;
        Some(self.entries.remove(idx))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backup(id: &str, local_text: &str, when: Timestamp) -> ConflictBackup {
        ConflictBackup::new(
            Quote::new(id, local_text, "C", 1),
            Quote::new(id, "server", "C", 2),
            when,
        )
    }

    #[test]
    fn append_keeps_duplicates() {
        let mut ledger = BackupLedger::new();
        ledger.append(backup("a", "first", 10));
        ledger.append(backup("a", "second", 20));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.find("a").unwrap().local.text, "first");
    }

    #[test]
    fn remove_takes_only_first_match() {
        let mut ledger = BackupLedger::new();
        ledger.append(backup("a", "first", 10));
        ledger.append(backup("b", "other", 15));
        ledger.append(backup("a", "second", 20));

        let removed = ledger.remove("a").unwrap();
        assert_eq!(removed.local.text, "first");
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.find("a").unwrap().local.text, "second");

        assert!(ledger.remove("missing").is_none());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn clear_empties_ledger() {
        let mut ledger = BackupLedger::new();
        ledger.extend([backup("a", "x", 1), backup("b", "y", 2)]);
        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut ledger = BackupLedger::new();
        ledger.append(backup("a", "x", 1));
        let json = serde_json::to_value(&ledger).unwrap();

        assert!(json.is_array());
        assert_eq!(json[0]["id"], "a");
        assert_eq!(json[0]["local"]["text"], "x");
        assert_eq!(json[0]["when"], 1);
    }
}
