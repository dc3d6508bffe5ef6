//! Edge case tests for quotesync-engine
//!
//! These tests drive the store through full sync rounds against a simulated
//! remote snapshot and cover boundary conditions and unusual inputs.

use quotesync_engine::{
    export_quotes, parse_import, ManualClock, MergeStrategy, Quote, StateSnapshot, Store,
    SyncSummary, Timestamp,
};
use serde_json::json;

/// Upsert-by-id the way the remote authority does: last write wins, existing
/// ids keep their position.
fn upsert(remote: &mut Vec<Quote>, items: &[Quote]) {
    for item in items {
        match remote.iter_mut().find(|r| r.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => remote.push(item.clone()),
        }
    }
}

/// One full sync round: reconcile, then push.
fn sync(store: &mut Store, remote: &mut Vec<Quote>, now: Timestamp) -> SyncSummary {
    let result = store.reconcile(remote.as_slice(), MergeStrategy::RemoteWins, now);
    upsert(remote, &result.push);
    result.summary
}

fn q(id: &str, text: &str, updated_at: Timestamp) -> Quote {
    Quote::new(id, text, "General", updated_at)
}

// ============================================================================
// Sync Scenarios
// ============================================================================

#[test]
fn first_sync_pulls_remote_seed() {
    let mut store = Store::new();
    let mut remote = vec![
        q("srv-1", "Stay hungry, stay foolish.", 1),
        q("srv-2", "Simplicity is the soul of efficiency.", 2),
    ];

    let summary = sync(&mut store, &mut remote, 100);

    assert_eq!(store.len(), 2);
    assert_eq!(summary.added_from_server, 2);
    assert_eq!(summary.conflicts, 0);
}

#[test]
fn remote_wins_regardless_of_timestamp() {
    let mut store = Store::new();
    store.upsert(q("a", "T", 5));
    let mut remote = vec![q("a", "T2", 3)];

    sync(&mut store, &mut remote, 100);

    assert_eq!(store.get("a").unwrap().text, "T2");
    assert_eq!(store.backups().len(), 1);
    assert_eq!(store.backups().list()[0].local.text, "T");
}

#[test]
fn local_only_quotes_reach_remote() {
    let clock = ManualClock::new(10);
    let mut store = Store::new();
    let mine = store.add_local("Mine", "Local", &clock).unwrap();
    let mut remote = vec![q("srv-1", "Theirs", 1)];

    sync(&mut store, &mut remote, 20);

    assert!(remote.iter().any(|r| r == &mine));
    assert_eq!(store.len(), 2);
}

#[test]
fn failed_push_is_retried_next_round() {
    let clock = ManualClock::new(10);
    let mut store = Store::new();
    let mine = store.add_local("Mine", "Local", &clock).unwrap();
    let mut remote: Vec<Quote> = vec![];

    // Push lost in transit: reconcile but never upsert.
    let first = store.reconcile(&remote, MergeStrategy::RemoteWins, 20);
    assert_eq!(first.push, vec![mine.clone()]);
    assert!(store.contains(&mine.id));

    let second = store.reconcile(&remote, MergeStrategy::RemoteWins, 30);
    assert_eq!(second.push, vec![mine.clone()]);

    upsert(&mut remote, &second.push);
    assert_eq!(remote, vec![mine]);
}

#[test]
fn second_sync_is_a_no_op() {
    let clock = ManualClock::new(10);
    let mut store = Store::new();
    store.upsert(q("a", "local", 5));
    store.add_local("Only here", "Local", &clock).unwrap();
    let mut remote = vec![q("a", "remote", 3), q("b", "B", 1)];

    sync(&mut store, &mut remote, 100);
    let backups_after_first = store.backups().len();
    let state_after_first = store.export_state().quotes;

    let summary = sync(&mut store, &mut remote, 200);

    assert!(summary.is_unchanged());
    assert_eq!(summary.conflicts, 0);
    assert_eq!(summary.pushed, 0);
    assert_eq!(store.backups().len(), backups_after_first);
    assert_eq!(store.export_state().quotes, state_after_first);
}

#[test]
fn restore_then_sync_does_not_reoverwrite() {
    let mut store = Store::new();
    store.upsert(q("a", "mine", 5));
    let mut remote = vec![q("a", "theirs", 3)];
    sync(&mut store, &mut remote, 100);
    assert_eq!(store.get("a").unwrap().text, "theirs");

    let restored = store.restore("a", 150).unwrap();
    upsert(&mut remote, &[restored.clone()]);

    let summary = sync(&mut store, &mut remote, 200);

    assert_eq!(summary.conflicts, 0);
    assert_eq!(store.get("a"), Some(&restored));
    assert!(store.backups().is_empty());
}

#[test]
fn restore_without_push_is_overwritten_again() {
    // Documents why restore must push: the remote still holds the old value.
    let mut store = Store::new();
    store.upsert(q("a", "mine", 5));
    let mut remote = vec![q("a", "theirs", 3)];
    sync(&mut store, &mut remote, 100);

    store.restore("a", 150).unwrap();
    let summary = sync(&mut store, &mut remote, 200);

    assert_eq!(summary.conflicts, 1);
    assert_eq!(store.get("a").unwrap().text, "theirs");
    assert_eq!(store.backups().len(), 1);
}

#[test]
fn timestamp_strategy_pushes_newer_local_back() {
    let mut store = Store::new();
    store.upsert(q("a", "fresh local edit", 50));
    let mut remote = vec![q("a", "stale remote", 10)];

    let result = store.reconcile(&remote, MergeStrategy::TimestampWins, 100);
    upsert(&mut remote, &result.push);

    assert_eq!(store.get("a").unwrap().text, "fresh local edit");
    assert_eq!(remote[0].text, "fresh local edit");
    assert!(store.backups().is_empty());
}

// ============================================================================
// String Edge Cases
// ============================================================================

#[test]
fn unicode_survives_sync_and_persistence() {
    let clock = ManualClock::new(1);
    let texts = [
        "日本語テスト",
        "Привет мир",
        "مرحبا بالعالم",
        "🎉🚀💯",
        "Hello\nWorld\tTab",
    ];
    let mut remote: Vec<Quote> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| q(&format!("u{i}"), t, 1))
        .collect();

    let mut store = Store::new();
    sync(&mut store, &mut remote, 10);

    let json = store.export_state().to_json().unwrap();
    let reloaded = Store::load(Some(StateSnapshot::from_json(&json, &clock).unwrap()), &clock);

    for (i, text) in texts.iter().enumerate() {
        assert_eq!(reloaded.get(&format!("u{i}")).unwrap().text, *text);
    }
}

#[test]
fn very_long_text() {
    let long_text = "x".repeat(1024 * 1024);
    let mut store = Store::new();
    let mut remote = vec![q("long", &long_text, 1)];

    sync(&mut store, &mut remote, 10);

    assert_eq!(store.get("long").unwrap().text.len(), 1024 * 1024);
}

// ============================================================================
// Numeric Edge Cases
// ============================================================================

#[test]
fn timestamp_boundaries() {
    let mut store = Store::new();
    store.upsert(q("zero", "z", 0));
    let mut remote = vec![q("zero", "z", u64::MAX), q("max", "m", u64::MAX)];

    let summary = sync(&mut store, &mut remote, u64::MAX);

    assert_eq!(summary.conflicts, 1);
    assert_eq!(store.get("zero").unwrap().updated_at, u64::MAX);
    assert_eq!(store.backups().list()[0].when, u64::MAX);
}

// ============================================================================
// Import Edge Cases
// ============================================================================

#[test]
fn import_file_round_trip_through_export() {
    let clock = ManualClock::new(1_000);
    let mut source = Store::load(None, &clock);
    source.add_local("Exported", "Files", &clock).unwrap();
    let exported = export_quotes(source.quotes()).unwrap();

    let mut target = Store::new();
    let report = target
        .merge_imported(&parse_import(&exported).unwrap(), &clock)
        .unwrap();

    assert_eq!(report.added, 4);
    assert_eq!(target.quotes(), source.quotes());
}

#[test]
fn import_ignores_unknown_fields_and_mixed_garbage() {
    let clock = ManualClock::new(5);
    let raw = json!([
        {"id": "k", "text": "Keep", "category": "A", "updatedAt": 1, "author": "someone"},
        [],
        "string",
        {"text": null},
    ])
    .to_string();

    let mut store = Store::new();
    let report = store.merge_imported(&parse_import(&raw).unwrap(), &clock).unwrap();

    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejected, 3);
    assert_eq!(store.get("k").unwrap(), &Quote::new("k", "Keep", "A", 1));
}

#[test]
fn imported_duplicates_apply_in_order() {
    let clock = ManualClock::new(5);
    let raw = json!([
        {"id": "d", "text": "first", "updatedAt": 1},
        {"id": "d", "text": "second", "updatedAt": 1},
        {"id": "d", "text": "older", "updatedAt": 0},
    ]);
    let candidates = raw.as_array().unwrap().clone();

    let mut store = Store::new();
    let report = store.merge_imported(&candidates, &clock).unwrap();

    assert_eq!(store.get("d").unwrap().text, "second");
    assert_eq!(report.added, 1);
    assert_eq!(report.replaced, 1);
    assert_eq!(report.kept_local, 1);
}

// ============================================================================
// Persistence Edge Cases
// ============================================================================

#[test]
fn snapshot_with_duplicate_ids_collapses() {
    let clock = ManualClock::new(5);
    let json = r#"{"quotes": [
        {"id": "a", "text": "one", "category": "C", "updatedAt": 1},
        {"id": "a", "text": "two", "category": "C", "updatedAt": 2}
    ]}"#;

    let store = Store::load(Some(StateSnapshot::from_json(json, &clock).unwrap()), &clock);

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("a").unwrap().text, "two");
}

#[test]
fn backups_and_filter_survive_reload() {
    let clock = ManualClock::new(5);
    let mut store = Store::new();
    store.upsert(q("a", "mine", 1));
    store.select_category("General");
    let mut remote = vec![q("a", "theirs", 2)];
    sync(&mut store, &mut remote, 10);

    let json = store.export_state().to_json().unwrap();
    let reloaded = Store::load(Some(StateSnapshot::from_json(&json, &clock).unwrap()), &clock);

    assert_eq!(reloaded.backups(), store.backups());
    assert_eq!(reloaded.selected_category(), "General");
    assert_eq!(reloaded.last_sync(), Some(10));
}
