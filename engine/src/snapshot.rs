//! Snapshot types for persisting and restoring local state, plus the
//! import/export document formats.
//!
//! Snapshots are the bridge between the in-memory [`Store`](crate::Store)
//! and persistent storage. Writing is strict and deterministic; reading is
//! lenient so that legacy or hand-edited documents still load.

use crate::quote::timestamp_value;
use crate::{
    error::Result, BackupLedger, Clock, ConflictBackup, Error, Quote, Timestamp, SELECT_ALL,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Everything the local replica persists, as one JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Local quote list, in display order
    pub quotes: Vec<Quote>,
    /// Last category filter chosen by the user
    pub selected_category: String,
    /// When the last successful sync finished
    pub last_sync: Option<Timestamp>,
    /// Overwritten local versions awaiting restore or dismissal
    pub backups: BackupLedger,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            quotes: Vec::new(),
            selected_category: SELECT_ALL.to_string(),
            last_sync: None,
            backups: BackupLedger::new(),
        }
    }
}

impl StateSnapshot {
    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON, normalizing every quote.
    ///
    /// Each field is read on its own: a quote or backup that cannot be used
    /// is skipped, and a `lastSync`, `selectedCategory` or `formatVersion`
    /// of the wrong type falls back to its default. Only a document that is
    /// not a JSON object, or comes from a newer format, is an error.
    pub fn from_json(json: &str, clock: &impl Clock) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(Error::InvalidSnapshot("expected a JSON object".into()));
        };

        let format_version = fields
            .get("formatVersion")
            .and_then(Value::as_u64)
            .unwrap_or(u64::from(SNAPSHOT_FORMAT_VERSION));
        if format_version > u64::from(SNAPSHOT_FORMAT_VERSION) {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        let quotes = array_field(&fields, "quotes")
            .filter_map(|raw| Quote::normalize(raw, clock))
            .collect();

        let backups = array_field(&fields, "backups")
            .filter_map(|raw| serde_json::from_value::<ConflictBackup>(raw.clone()).ok())
            .collect();

        let selected_category = fields
            .get("selectedCategory")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .unwrap_or(SELECT_ALL)
            .to_string();

        Ok(Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            quotes,
            selected_category,
            last_sync: fields.get("lastSync").and_then(timestamp_value),
            backups: BackupLedger::from_entries(backups),
        })
    }
}

/// Entries of an array field; anything else reads as empty.
fn array_field<'a>(
    fields: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Value> + 'a {
    fields
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Serialize a quote list in the export file format: a pretty-printed array
/// with the stable field names `id`, `text`, `category`, `updatedAt`.
pub fn export_quotes(quotes: &[Quote]) -> Result<String> {
    serde_json::to_string_pretty(quotes).map_err(|e| Error::InvalidSnapshot(e.to_string()))
}

/// Parse an import document into its raw candidates.
///
/// The document must be a JSON array; individual entries are validated later
/// by [`Store::merge_imported`](crate::Store::merge_imported).
pub fn parse_import(raw: &str) -> Result<Vec<Value>> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| Error::InvalidImport(format!("not JSON: {e}")))?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(Error::InvalidImport("expected an array".into())),
    }
}
