pub mod events;
pub mod expand;
pub mod selection;
pub mod tree;

use std::sync::mpsc::Receiver;

use tracing::{debug, info};

use events::{ChangeFeed, MirrorEvent};
use expand::ExpandState;
use selection::Selection;
use tree::{MergeOutcome, TreeChange, TreeMirror};

/// Everything the engine knows about one inspected session.
///
/// Owned by whoever drives the bridge and passed to [`crate::app::update`];
/// there is no global instance, so tests can run several side by side.
#[derive(Debug, Default)]
pub struct Inspector {
    pub tree: TreeMirror,
    pub expand: ExpandState,
    pub selection: Selection,
    filter: String,
    tree_unsupported_reported: bool,
    feed: ChangeFeed,
}

impl Inspector {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            ..Default::default()
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Returns true when the filter actually changed.
    pub fn set_filter(&mut self, filter: &str) -> bool {
        if self.filter == filter {
            return false;
        }
        self.filter = filter.to_string();
        true
    }

    pub fn subscribe(&mut self) -> Receiver<MirrorEvent> {
        let rx = self.feed.subscribe();
        debug!(subscribers = self.feed.subscriber_count(), "change feed subscribed");
        rx
    }

    pub fn publish(&mut self, event: MirrorEvent) {
        self.feed.publish(event);
    }

    pub(crate) fn publish_tree_change(&mut self, change: &TreeChange) {
        if change.reset {
            self.publish(MirrorEvent::TreeReset);
        }
        match &change.outcome {
            MergeOutcome::RootsReplaced { count } => {
                self.publish(MirrorEvent::RootsReplaced { count: *count })
            }
            MergeOutcome::Merged { target, ids } => self.publish(MirrorEvent::NodesMerged {
                target: target.clone(),
                ids: ids.clone(),
            }),
            MergeOutcome::Stale { .. } => {}
        }
    }

    /// Latch for the "tree not supported" report: true only the first time
    /// since the last successful tree update or bridge init.
    pub fn mark_tree_unsupported(&mut self) -> bool {
        !std::mem::replace(&mut self.tree_unsupported_reported, true)
    }

    pub fn tree_supported_again(&mut self) {
        self.tree_unsupported_reported = false;
    }

    /// The bridge (re)initialized: node ids of the previous session are not
    /// stable, and nothing sent before will be answered.
    pub fn init(&mut self) {
        info!("bridge session initialized");
        self.expand.clear();
        self.selection.forget_in_flight();
        self.tree_unsupported_reported = false;
    }

    /// Queue a full tree reset and drop the loaded detail.
    pub fn reset(&mut self) {
        self.tree.queue_reset();
        self.selection.clear_snapshot();
        self.publish(MirrorEvent::DetailCleared);
    }

    pub fn teardown(&mut self) {
        self.tree.clear();
        self.expand.clear();
        self.selection.clear();
        self.tree_unsupported_reported = false;
        self.publish(MirrorEvent::TreeReset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use serde_json::json;

    fn loaded() -> Inspector {
        let mut insp = Inspector::new("");
        let nodes: Vec<Node> = serde_json::from_value(json!([
            {"id": "1#root", "hasChildren": true, "children": [{"id": "1:1"}]}
        ]))
        .unwrap();
        insp.tree.apply_update("_root", nodes);
        insp.expand.set("1#root", true);
        insp
    }

    #[test]
    fn instances_are_independent() {
        let a = loaded();
        let b = Inspector::new("btn");
        assert_eq!(a.tree.len(), 2);
        assert!(b.tree.is_empty());
        assert_eq!(b.filter(), "btn");
    }

    #[test]
    fn init_clears_expand_but_keeps_tree() {
        let mut insp = loaded();
        insp.init();
        assert!(insp.expand.is_empty());
        assert_eq!(insp.tree.len(), 2);
    }

    #[test]
    fn reset_defers_tree_clear() {
        let mut insp = loaded();
        let rx = insp.subscribe();
        insp.reset();
        assert!(insp.tree.reset_pending());
        assert_eq!(insp.tree.len(), 2);
        assert_eq!(rx.try_recv().unwrap(), MirrorEvent::DetailCleared);
    }

    #[test]
    fn teardown_clears_everything() {
        let mut insp = loaded();
        insp.selection.set_selected(Some("1:1".into()));
        insp.teardown();
        assert!(insp.tree.is_empty());
        assert!(insp.expand.is_empty());
        assert_eq!(insp.selection.selected_id(), None);
    }

    #[test]
    fn unsupported_latch_fires_once() {
        let mut insp = Inspector::default();
        assert!(insp.mark_tree_unsupported());
        assert!(!insp.mark_tree_unsupported());
        insp.tree_supported_again();
        assert!(insp.mark_tree_unsupported());
    }

    #[test]
    fn set_filter_reports_change() {
        let mut insp = Inspector::default();
        assert!(insp.set_filter("todo"));
        assert!(!insp.set_filter("todo"));
        assert_eq!(insp.filter(), "todo");
    }
}
