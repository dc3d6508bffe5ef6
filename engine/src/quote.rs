//! The quote record and its normalization rules.

use crate::{error::Result, Clock, Error, QuoteId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category assigned to quotes that arrive without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Largest `updatedAt` accepted from outside. Anything above it cannot be
/// stored by a signed 64-bit remote and is treated as missing.
pub const MAX_TIMESTAMP: Timestamp = i64::MAX as Timestamp;

/// A single quote, identical in shape on both replicas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Stable identifier shared by the local and remote replica
    pub id: QuoteId,
    /// Display text, never empty
    pub text: String,
    /// Grouping label, never empty
    pub category: String,
    /// Last modification time (milliseconds since epoch)
    pub updated_at: Timestamp,
}

impl Quote {
    /// Create a quote from already-validated parts.
    pub fn new(
        id: impl Into<QuoteId>,
        text: impl Into<String>,
        category: impl Into<String>,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category: category.into(),
            updated_at,
        }
    }

    /// Create a brand new local quote from user input.
    ///
    /// Both fields are trimmed and must be non-empty afterwards.
    pub fn compose(text: &str, category: &str, clock: &impl Clock) -> Result<Self> {
        let text = text.trim();
        let category = category.trim();
        if text.is_empty() {
            return Err(Error::Validation("quote text must not be empty".into()));
        }
        if category.is_empty() {
            return Err(Error::Validation("quote category must not be empty".into()));
        }
        Ok(Self::new(clock.generate_id(), text, category, clock.now()))
    }

    /// Whether any field observable to the user differs from `other`.
    ///
    /// This is a strict comparison: a differing `updatedAt` counts even when
    /// text and category match.
    pub fn differs_from(&self, other: &Quote) -> bool {
        self.text != other.text
            || self.category != other.category
            || self.updated_at != other.updated_at
    }

    /// Copy of this quote stamped with a new modification time.
    pub fn touched(&self, now: Timestamp) -> Self {
        Self {
            updated_at: now,
            ..self.clone()
        }
    }

    /// Build a quote from loosely-shaped JSON (persisted legacy data or an
    /// import file).
    ///
    /// Missing `id` and non-numeric or out-of-range `updatedAt` are filled
    /// from `clock`, a
    /// missing category falls back to [`DEFAULT_CATEGORY`]. Returns `None`
    /// when the value is not an object or text/category are empty after
    /// trimming. Applying this to its own output is a no-op.
    pub fn normalize(raw: &Value, clock: &impl Clock) -> Option<Self> {
        let object = raw.as_object()?;

        let text = scalar_text(object.get("text")).unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let category = scalar_text(object.get("category"))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        let category = category.trim();
        if category.is_empty() {
            return None;
        }

        let id = scalar_text(object.get("id"))
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| clock.generate_id());

        let updated_at = object
            .get("updatedAt")
            .and_then(timestamp_value)
            .unwrap_or_else(|| clock.now());

        Some(Self::new(id, text, category, updated_at))
    }
}

/// Render a JSON scalar the way a loosely-typed producer would stringify it.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn timestamp_value(value: &Value) -> Option<Timestamp> {
    if let Some(ms) = value.as_u64() {
        return Some(ms).filter(|ms| *ms <= MAX_TIMESTAMP);
    }
    // Fractional millis are truncated; negative values are not timestamps.
    value
        .as_f64()
        .filter(|ms| ms.is_finite() && *ms >= 0.0 && *ms < MAX_TIMESTAMP as f64)
        .map(|ms| ms as Timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use serde_json::json;

    #[test]
    fn compose_trims_and_stamps() {
        let clock = ManualClock::new(5_000);
        let quote = Quote::compose("  Carpe diem ", " Latin ", &clock).unwrap();

        assert_eq!(quote.text, "Carpe diem");
        assert_eq!(quote.category, "Latin");
        assert_eq!(quote.updated_at, 5_000);
        assert!(!quote.id.is_empty());
    }

    #[test]
    fn compose_rejects_blank_fields() {
        let clock = ManualClock::new(0);
        assert!(matches!(
            Quote::compose("   ", "Latin", &clock),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            Quote::compose("Carpe diem", "", &clock),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn differs_on_any_field() {
        let base = Quote::new("a", "T", "C", 5);
        assert!(!base.differs_from(&base.clone()));
        assert!(base.differs_from(&Quote::new("a", "T2", "C", 5)));
        assert!(base.differs_from(&Quote::new("a", "T", "D", 5)));
        assert!(base.differs_from(&Quote::new("a", "T", "C", 3)));
    }

    #[test]
    fn normalize_fills_missing_fields() {
        let clock = ManualClock::new(7_000);
        let quote = Quote::normalize(&json!({"text": "Hello"}), &clock).unwrap();

        assert_eq!(quote.text, "Hello");
        assert_eq!(quote.category, DEFAULT_CATEGORY);
        assert_eq!(quote.updated_at, 7_000);
        assert!(quote.id.starts_with("7000-"));
    }

    #[test]
    fn normalize_keeps_valid_fields() {
        let clock = ManualClock::new(7_000);
        let raw = json!({"id": "x", "text": "Hi", "category": "Greeting", "updatedAt": 10, "extra": true});
        let quote = Quote::normalize(&raw, &clock).unwrap();

        assert_eq!(quote, Quote::new("x", "Hi", "Greeting", 10));
    }

    #[test]
    fn normalize_rejects_unusable_values() {
        let clock = ManualClock::new(0);
        assert!(Quote::normalize(&json!("just a string"), &clock).is_none());
        assert!(Quote::normalize(&json!(null), &clock).is_none());
        assert!(Quote::normalize(&json!({"category": "Empty"}), &clock).is_none());
        assert!(Quote::normalize(&json!({"text": "  "}), &clock).is_none());
        // Present-but-blank category is not replaced by the fallback.
        assert!(Quote::normalize(&json!({"text": "x", "category": "   "}), &clock).is_none());
    }

    #[test]
    fn normalize_stringifies_scalars_and_ignores_bad_timestamps() {
        let clock = ManualClock::new(99);
        let raw = json!({"id": 17, "text": 3.5, "category": "Numbers", "updatedAt": "yesterday"});
        let quote = Quote::normalize(&raw, &clock).unwrap();

        assert_eq!(quote.id, "17");
        assert_eq!(quote.text, "3.5");
        assert_eq!(quote.updated_at, 99);

        let negative = json!({"text": "x", "updatedAt": -4});
        assert_eq!(Quote::normalize(&negative, &clock).unwrap().updated_at, 99);
    }

    #[test]
    fn normalize_replaces_out_of_range_timestamps() {
        let clock = ManualClock::new(4_000);

        for huge in [json!(1e30), json!(u64::MAX), json!(MAX_TIMESTAMP + 1)] {
            let raw = json!({"id": "big", "text": "x", "updatedAt": huge});
            let quote = Quote::normalize(&raw, &clock).unwrap();
            assert_eq!(quote.updated_at, 4_000);
        }

        let raw = json!({"id": "edge", "text": "x", "updatedAt": MAX_TIMESTAMP});
        assert_eq!(Quote::normalize(&raw, &clock).unwrap().updated_at, MAX_TIMESTAMP);
    }

    #[test]
    fn normalize_is_idempotent() {
        let clock = ManualClock::new(1);
        let first = Quote::normalize(&json!({"text": " padded ", "updatedAt": 12.9}), &clock).unwrap();
        let again = Quote::normalize(&serde_json::to_value(&first).unwrap(), &clock).unwrap();

        assert_eq!(first.updated_at, 12);
        assert_eq!(first, again);
    }

    #[test]
    fn serialization_format() {
        let quote = Quote::new("q-1", "Text", "Cat", 1_000);
        let json = serde_json::to_string(&quote).unwrap();
        assert_eq!(
            json,
            r#"{"id":"q-1","text":"Text","category":"Cat","updatedAt":1000}"#
        );
    }
}
