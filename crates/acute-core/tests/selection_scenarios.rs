use acute_core::{
    Feed, FeedConfig, RawSummary, SelectionUpdate, SummaryKey, SummaryStatus, VanishedPolicy,
    REFERENCE_BREAKPOINT_PX,
};
use serde_json::{json, Value};

fn snapshot(value: Value) -> Vec<RawSummary> {
    serde_json::from_value(value).expect("valid snapshot fixture")
}

fn key(value: &str) -> SummaryKey {
    SummaryKey::new(value).expect("key")
}

fn feed_with(policy: VanishedPolicy) -> Feed {
    Feed::new(FeedConfig {
        vanished_policy: policy,
        error_threshold: 1,
        breakpoint: REFERENCE_BREAKPOINT_PX,
    })
}

#[test]
fn completed_processing_refreshes_selection() {
    let mut feed = Feed::default();
    feed.apply_snapshot(
        1,
        snapshot(json!([{
            "id": "1",
            "title": "Road traffic collision",
            "date": "2024-11-30T09:00:00Z",
            "ambulance_notes": "Driver conscious, neck pain",
            "medical_journal": {},
            "status": "processing"
        }])),
    );
    assert!(feed.select(&key("1"), 1200));

    let change = feed.apply_snapshot(
        2,
        snapshot(json!([{
            "id": "1",
            "title": "Road traffic collision",
            "date": "2024-11-30T09:00:00Z",
            "ambulance_notes": "Driver conscious, neck pain",
            "medical_journal": {},
            "status": "completed",
            "ai_summary": "Suspected whiplash; immobilised and transported."
        }])),
    );

    assert!(matches!(change.selection, SelectionUpdate::Refreshed(_)));
    let selected = feed.selected().expect("selection kept");
    assert_eq!(selected.status, SummaryStatus::Completed);
    assert_eq!(
        selected.ai_summary.as_deref(),
        Some("Suspected whiplash; immobilised and transported.")
    );
}

#[test]
fn vanished_selection_is_retained_and_marked_stale() {
    let mut feed = feed_with(VanishedPolicy::Retain);
    feed.apply_snapshot(1, snapshot(json!([{ "id": "1" }, { "id": "2" }])));
    feed.select(&key("2"), 1200);

    let change = feed.apply_snapshot(2, snapshot(json!([{ "id": "1" }])));

    assert_eq!(change.selection, SelectionUpdate::Vanished);
    assert_eq!(feed.selected().map(|s| s.key.as_str()), Some("2"));
    assert!(feed.is_selection_stale());

    feed.apply_snapshot(3, snapshot(json!([{ "id": "1" }, { "id": "2" }])));
    assert!(!feed.is_selection_stale());
}

#[test]
fn vanished_selection_is_cleared_under_clear_policy() {
    let mut feed = feed_with(VanishedPolicy::Clear);
    feed.apply_snapshot(1, snapshot(json!([{ "id": "1" }, { "id": "2" }])));
    feed.select(&key("2"), 1200);

    feed.apply_snapshot(2, snapshot(json!([{ "id": "1" }])));

    assert!(feed.selected().is_none());
    assert!(!feed.is_selection_stale());
}

#[test]
fn narrow_viewport_collapses_list_on_selection() {
    let mut narrow = Feed::default();
    narrow.apply_snapshot(1, snapshot(json!([{ "id": "1" }])));
    narrow.select(&key("1"), 800);
    assert!(narrow.is_list_collapsed());

    let mut wide = Feed::default();
    wide.apply_snapshot(1, snapshot(json!([{ "id": "1" }])));
    wide.select(&key("1"), 1200);
    assert!(!wide.is_list_collapsed());
}

#[test]
fn polls_do_not_recollapse_after_manual_expand() {
    let mut feed = Feed::default();
    feed.apply_snapshot(1, snapshot(json!([{ "id": "1", "status": "processing" }])));
    feed.select(&key("1"), 800);
    assert!(feed.is_list_collapsed());

    feed.expand_list();
    feed.apply_snapshot(2, snapshot(json!([{ "id": "1", "status": "completed" }])));
    feed.apply_snapshot(3, snapshot(json!([{ "id": "1", "status": "completed" }])));

    assert!(!feed.is_list_collapsed());
    assert_eq!(
        feed.selected().map(|s| s.status),
        Some(SummaryStatus::Completed)
    );
}

#[test]
fn identical_polls_leave_selection_untouched() {
    let body = json!([{
        "_id": "65a1f0",
        "title": "Chest pain",
        "date": "2024-11-30T11:45:00",
        "ambulance_notes": "Pain radiating to left arm",
        "timeline_events": [
            { "timestamp": "11:45", "description": "Call received" },
            { "timestamp": "11:58", "description": "Crew on scene" }
        ],
        "medical_journal": {
            "current_medications": [{ "medication": "Aspirin", "reason": "Prophylaxis" }]
        },
        "status": "live"
    }]);

    let mut feed = Feed::default();
    feed.apply_snapshot(1, snapshot(body.clone()));
    feed.select(&key("65a1f0"), 1200);
    let before = feed.selected().cloned();

    let change = feed.apply_snapshot(2, snapshot(body));

    assert_eq!(change.selection, SelectionUpdate::Unchanged);
    assert!(!change.needs_redraw());
    assert_eq!(feed.selected().cloned(), before);
}

#[test]
fn keyless_records_keep_selection_across_polls() {
    let mut feed = Feed::default();
    feed.apply_snapshot(
        1,
        snapshot(json!([{ "title": "Fall at home", "date": "2024-11-30T08:00:00Z", "status": "processing" }])),
    );
    let fallback = feed.summaries()[0].key.clone();
    feed.select(&fallback, 1200);

    feed.apply_snapshot(
        2,
        snapshot(json!([{
            "title": "Fall at home",
            "date": "2024-11-30T08:00:00Z",
            "status": "completed",
            "ai_summary": "Hip fracture suspected"
        }])),
    );

    assert_eq!(feed.summaries()[0].key, fallback);
    assert_eq!(
        feed.selected().and_then(|s| s.ai_summary.as_deref()),
        Some("Hip fracture suspected")
    );
}
