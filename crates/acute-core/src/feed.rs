//! Owner of the polled snapshot and everything derived from it.
//!
//! Poll results are applied in issue order: a cycle that is not newer than
//! the last applied one is dropped, and nothing is applied once the feed has
//! been deactivated.

use crate::identity::IdentityNormalizer;
use crate::layout::{LayoutController, REFERENCE_BREAKPOINT_PX};
use crate::reconcile::{reconcile, SelectionUpdate, VanishedPolicy};
use crate::{RawSummary, Summary, SummaryKey};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    pub vanished_policy: VanishedPolicy,
    /// Consecutive failed cycles before the error blocks the view.
    pub error_threshold: u32,
    pub breakpoint: u16,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            vanished_policy: VanishedPolicy::Retain,
            error_threshold: 1,
            breakpoint: REFERENCE_BREAKPOINT_PX,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedHealth {
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub threshold: u32,
}

impl FeedHealth {
    pub fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    pub fn is_blocking(&self) -> bool {
        self.last_error.is_some() && self.consecutive_failures >= self.threshold.max(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedChange {
    pub applied: bool,
    pub snapshot_changed: bool,
    pub health_changed: bool,
    pub selection: SelectionUpdate,
}

impl FeedChange {
    fn ignored() -> Self {
        Self {
            applied: false,
            snapshot_changed: false,
            health_changed: false,
            selection: SelectionUpdate::NoSelection,
        }
    }

    pub fn needs_redraw(&self) -> bool {
        self.snapshot_changed || self.health_changed || self.selection.is_change()
    }
}

#[derive(Debug)]
pub struct Feed {
    normalizer: IdentityNormalizer,
    summaries: Vec<Summary>,
    selection: Option<Summary>,
    selection_stale: bool,
    layout: LayoutController,
    health: FeedHealth,
    policy: VanishedPolicy,
    last_cycle: Option<u64>,
    loaded: bool,
    active: bool,
}

impl Default for Feed {
    fn default() -> Self {
        Self::new(FeedConfig::default())
    }
}

impl Feed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            normalizer: IdentityNormalizer::new(),
            summaries: Vec::new(),
            selection: None,
            selection_stale: false,
            layout: LayoutController::new(config.breakpoint),
            health: FeedHealth {
                last_error: None,
                consecutive_failures: 0,
                threshold: config.error_threshold,
            },
            policy: config.vanished_policy,
            last_cycle: None,
            loaded: false,
            active: true,
        }
    }

    pub fn summaries(&self) -> &[Summary] {
        &self.summaries
    }

    pub fn selected(&self) -> Option<&Summary> {
        self.selection.as_ref()
    }

    pub fn is_selected(&self, key: &SummaryKey) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|selected| &selected.key == key)
    }

    /// True when the selected record is no longer in the latest snapshot.
    pub fn is_selection_stale(&self) -> bool {
        self.selection_stale
    }

    pub fn health(&self) -> &FeedHealth {
        &self.health
    }

    pub fn has_loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_cycle(&self) -> Option<u64> {
        self.last_cycle
    }

    pub fn layout(&self) -> &LayoutController {
        &self.layout
    }

    pub fn is_list_collapsed(&self) -> bool {
        self.layout.is_collapsed()
    }

    pub fn toggle_list(&mut self) -> bool {
        self.layout.toggle()
    }

    pub fn expand_list(&mut self) {
        self.layout.expand();
    }

    pub fn position_of(&self, key: &SummaryKey) -> Option<usize> {
        self.summaries.iter().position(|summary| &summary.key == key)
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    fn accepts(&self, cycle: u64) -> bool {
        self.active && self.last_cycle.map_or(true, |last| cycle > last)
    }

    pub fn apply_snapshot(&mut self, cycle: u64, raws: Vec<RawSummary>) -> FeedChange {
        if !self.accepts(cycle) {
            debug!(cycle, last_cycle = ?self.last_cycle, active = self.active, "feed_snapshot_ignored");
            return FeedChange::ignored();
        }
        self.last_cycle = Some(cycle);
        let first_load = !self.loaded;
        self.loaded = true;

        let summaries = self.normalizer.normalize_snapshot(raws);
        let snapshot_changed = first_load || summaries != self.summaries;
        self.summaries = summaries;

        let update = reconcile(&self.summaries, self.selection.as_ref());
        let vanished = update == SelectionUpdate::Vanished;
        // a selection already marked stale has nothing new to report
        let selection = if vanished && self.selection_stale {
            SelectionUpdate::Unchanged
        } else {
            update.clone()
        };
        self.selection = update.apply(self.selection.take(), self.policy);
        self.selection_stale = vanished && self.selection.is_some();

        let health_changed = !self.health.is_healthy() || self.health.consecutive_failures > 0;
        self.health.last_error = None;
        self.health.consecutive_failures = 0;

        FeedChange {
            applied: true,
            snapshot_changed,
            health_changed,
            selection,
        }
    }

    pub fn apply_failure(&mut self, cycle: u64, message: impl Into<String>) -> FeedChange {
        if !self.accepts(cycle) {
            debug!(cycle, last_cycle = ?self.last_cycle, active = self.active, "feed_failure_ignored");
            return FeedChange::ignored();
        }
        self.last_cycle = Some(cycle);
        self.health.last_error = Some(message.into());
        self.health.consecutive_failures = self.health.consecutive_failures.saturating_add(1);

        FeedChange {
            applied: true,
            snapshot_changed: false,
            health_changed: true,
            selection: if self.selection.is_some() {
                SelectionUpdate::Unchanged
            } else {
                SelectionUpdate::NoSelection
            },
        }
    }

    /// Selects the snapshot record with `key`. Returns false when no such
    /// record exists.
    pub fn select(&mut self, key: &SummaryKey, viewport_width: u16) -> bool {
        let Some(summary) = self.summaries.iter().find(|summary| &summary.key == key) else {
            return false;
        };
        let had_selection = self.selection.is_some();
        self.selection = Some(summary.clone());
        self.selection_stale = false;
        self.layout
            .on_selection_changed(had_selection, true, viewport_width);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.selection_stale = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SummaryStatus;

    fn raw(id: &str, status: &str) -> RawSummary {
        RawSummary {
            id: Some(id.to_string()),
            title: format!("Case {id}"),
            status: Some(status.to_string()),
            ..RawSummary::default()
        }
    }

    fn key(value: &str) -> SummaryKey {
        SummaryKey::new(value).expect("key")
    }

    #[test]
    fn stale_cycles_are_ignored() {
        let mut feed = Feed::default();
        assert!(feed.apply_snapshot(2, vec![raw("1", "completed")]).applied);

        let change = feed.apply_snapshot(1, vec![raw("1", "processing")]);
        assert!(!change.applied);
        assert_eq!(feed.summaries()[0].status, SummaryStatus::Completed);
        assert!(!feed.apply_failure(2, "late").applied);
        assert_eq!(feed.last_cycle(), Some(2));
    }

    #[test]
    fn deactivated_feed_applies_nothing() {
        let mut feed = Feed::default();
        feed.apply_snapshot(1, vec![raw("1", "processing")]);
        feed.deactivate();

        assert!(!feed.apply_snapshot(2, vec![raw("1", "completed")]).applied);
        assert!(!feed.apply_failure(3, "boom").applied);
        assert_eq!(feed.summaries()[0].status, SummaryStatus::Processing);
        assert!(feed.health().is_healthy());
    }

    #[test]
    fn failure_keeps_snapshot_until_next_success() {
        let mut feed = Feed::default();
        feed.apply_snapshot(1, vec![raw("1", "processing")]);
        assert!(feed.select(&key("1"), 1200));

        let change = feed.apply_failure(2, "service returned 502");
        assert!(change.needs_redraw());
        assert!(feed.health().is_blocking());
        assert_eq!(feed.summaries().len(), 1);
        assert!(feed.selected().is_some());

        let change = feed.apply_snapshot(3, vec![raw("1", "processing")]);
        assert!(change.health_changed);
        assert!(feed.health().is_healthy());
        assert_eq!(feed.health().consecutive_failures, 0);
    }

    #[test]
    fn error_threshold_delays_blocking() {
        let mut feed = Feed::new(FeedConfig {
            error_threshold: 3,
            ..FeedConfig::default()
        });
        feed.apply_failure(1, "timeout");
        feed.apply_failure(2, "timeout");
        assert!(!feed.health().is_blocking());
        assert!(!feed.health().is_healthy());
        feed.apply_failure(3, "timeout");
        assert!(feed.health().is_blocking());
    }

    #[test]
    fn select_unknown_key_is_rejected() {
        let mut feed = Feed::default();
        feed.apply_snapshot(1, vec![raw("1", "live")]);
        assert!(!feed.select(&key("9"), 800));
        assert!(feed.selected().is_none());
        assert!(!feed.is_list_collapsed());
    }

    #[test]
    fn identical_snapshot_reports_no_change() {
        let mut feed = Feed::default();
        feed.apply_snapshot(1, vec![raw("1", "live"), raw("2", "processing")]);
        feed.select(&key("2"), 1200);

        let change = feed.apply_snapshot(2, vec![raw("1", "live"), raw("2", "processing")]);
        assert!(change.applied);
        assert!(!change.needs_redraw());
        assert_eq!(change.selection, SelectionUpdate::Unchanged);
    }

    #[test]
    fn retained_vanished_selection_is_reported_once() {
        let mut feed = Feed::default();
        feed.apply_snapshot(1, vec![raw("1", "live"), raw("2", "processing")]);
        feed.select(&key("2"), 1200);

        let change = feed.apply_snapshot(2, vec![raw("1", "live")]);
        assert_eq!(change.selection, SelectionUpdate::Vanished);
        assert!(change.needs_redraw());
        assert!(feed.is_selection_stale());

        let change = feed.apply_snapshot(3, vec![raw("1", "live")]);
        assert!(change.applied);
        assert_eq!(change.selection, SelectionUpdate::Unchanged);
        assert!(!change.needs_redraw());
        assert!(feed.is_selection_stale());
        assert_eq!(feed.selected().map(|s| s.key.as_str()), Some("2"));

        let change = feed.apply_snapshot(4, vec![raw("1", "live"), raw("2", "processing")]);
        assert_eq!(change.selection, SelectionUpdate::Unchanged);
        assert!(change.snapshot_changed);
        assert!(!feed.is_selection_stale());
    }

    #[test]
    fn cleared_vanished_selection_settles() {
        let mut feed = Feed::new(FeedConfig {
            vanished_policy: VanishedPolicy::Clear,
            ..FeedConfig::default()
        });
        feed.apply_snapshot(1, vec![raw("1", "live"), raw("2", "processing")]);
        feed.select(&key("2"), 1200);

        assert_eq!(
            feed.apply_snapshot(2, vec![raw("1", "live")]).selection,
            SelectionUpdate::Vanished
        );
        assert!(feed.selected().is_none());

        let change = feed.apply_snapshot(3, vec![raw("1", "live")]);
        assert_eq!(change.selection, SelectionUpdate::NoSelection);
        assert!(!change.needs_redraw());
    }

    #[test]
    fn first_empty_snapshot_still_redraws() {
        let mut feed = Feed::default();
        assert!(feed.apply_snapshot(1, Vec::new()).needs_redraw());
        assert!(!feed.apply_snapshot(2, Vec::new()).needs_redraw());
    }
}
