//! Selected component and its lazily fetched detail snapshot.
//!
//! Navigation owns which id is selected; this state machine follows it and
//! tracks the detail payload:
//!
//! ```text
//! Unselected --set_selected(id)--> Pending(id) --apply_detail(id)--> Loaded(id)
//!      ^                               ^                                 |
//!      |                               +-------- clear_snapshot ---------+
//!      +------------------------ set_selected(None) ---------------------+
//! ```
//!
//! `in_flight` is separate from the selected id: it only suppresses a second
//! detail-fetch for an id whose response has not arrived yet.

use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Unselected,
    Pending {
        id: String,
    },
    Loaded {
        id: String,
        snapshot: JsonValue,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOutcome {
    Applied,
    Stale,
}

#[derive(Debug, Default, Clone)]
pub struct Selection {
    state: SelectionState,
    in_flight: Option<String>,
    last_selected: Option<String>,
    current_app: Option<String>,
}

impl Selection {
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected_id(&self) -> Option<&str> {
        match &self.state {
            SelectionState::Unselected => None,
            SelectionState::Pending { id } | SelectionState::Loaded { id, .. } => Some(id.as_str()),
        }
    }

    pub fn snapshot(&self) -> Option<&JsonValue> {
        match &self.state {
            SelectionState::Loaded { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    pub fn pending_id(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub fn last_selected_id(&self) -> Option<&str> {
        self.last_selected.as_deref()
    }

    pub fn current_app(&self) -> Option<&str> {
        self.current_app.as_deref()
    }

    pub fn set_selected(&mut self, id: Option<String>) {
        match id {
            Some(id) if self.selected_id() == Some(id.as_str()) => {}
            Some(id) => self.state = SelectionState::Pending { id },
            None => self.state = SelectionState::Unselected,
        }
    }

    /// Returns false when the fetch must not be sent: empty id, or a fetch for
    /// the same id is still outstanding.
    pub fn begin_load(&mut self, id: &str) -> bool {
        if id.is_empty() || self.in_flight.as_deref() == Some(id) {
            return false;
        }
        self.in_flight = Some(id.to_string());
        self.last_selected = Some(id.to_string());
        true
    }

    pub fn apply_detail(&mut self, id: &str, snapshot: JsonValue) -> DetailOutcome {
        let outcome = if self.selected_id() == Some(id) {
            self.state = SelectionState::Loaded {
                id: id.to_string(),
                snapshot,
            };
            DetailOutcome::Applied
        } else {
            DetailOutcome::Stale
        };
        self.finish_load(id);
        outcome
    }

    /// Release the dedup guard for `id` without touching the snapshot.
    pub fn finish_load(&mut self, id: &str) {
        if self.in_flight.as_deref() == Some(id) {
            self.in_flight = None;
        }
    }

    pub fn clear_snapshot(&mut self) {
        self.state = match std::mem::take(&mut self.state) {
            SelectionState::Loaded { id, .. } => SelectionState::Pending { id },
            other => other,
        };
    }

    /// Switch the inspected application. Returns the id to re-select when an
    /// application was already selected before this one.
    pub fn switch_app(&mut self, app_id: String) -> Option<String> {
        self.clear_snapshot();
        let reselect = if self.current_app.is_some() {
            self.last_selected.clone()
        } else {
            None
        };
        self.current_app = Some(app_id);
        reselect
    }

    /// New bridge session: nothing sent before will ever be answered.
    pub fn forget_in_flight(&mut self) {
        self.in_flight = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn begin_load_dedups_same_id() {
        let mut sel = Selection::default();
        assert!(sel.begin_load("1:2"));
        assert!(!sel.begin_load("1:2"));
        assert_eq!(sel.pending_id(), Some("1:2"));
        assert!(sel.begin_load("1:3"));
        assert_eq!(sel.pending_id(), Some("1:3"));
        assert_eq!(sel.last_selected_id(), Some("1:3"));
    }

    #[test]
    fn begin_load_ignores_empty_id() {
        let mut sel = Selection::default();
        assert!(!sel.begin_load(""));
        assert_eq!(sel.pending_id(), None);
        assert_eq!(sel.last_selected_id(), None);
    }

    #[test]
    fn detail_for_selected_id_loads_snapshot() {
        let mut sel = Selection::default();
        sel.set_selected(Some("1:2".into()));
        assert!(sel.begin_load("1:2"));
        let outcome = sel.apply_detail("1:2", json!({"state": []}));
        assert_eq!(outcome, DetailOutcome::Applied);
        assert_eq!(sel.snapshot(), Some(&json!({"state": []})));
        assert_eq!(sel.pending_id(), None);
    }

    #[test]
    fn late_detail_for_previous_selection_is_stale() {
        let mut sel = Selection::default();
        sel.set_selected(Some("A".into()));
        assert!(sel.begin_load("A"));
        sel.set_selected(Some("B".into()));
        assert!(sel.begin_load("B"));
        let outcome = sel.apply_detail("A", json!({"old": true}));
        assert_eq!(outcome, DetailOutcome::Stale);
        assert_eq!(sel.snapshot(), None);
        assert_eq!(sel.selected_id(), Some("B"));
        assert_eq!(sel.pending_id(), Some("B"));
    }

    #[test]
    fn pending_response_for_other_id_clears_guard_only() {
        let mut sel = Selection::default();
        assert!(sel.begin_load("X"));
        sel.set_selected(Some("Y".into()));
        sel.apply_detail("X", json!(1));
        assert_eq!(sel.pending_id(), None);
        assert_eq!(sel.state(), &SelectionState::Pending { id: "Y".into() });
    }

    #[test]
    fn reselecting_same_id_keeps_loaded_snapshot() {
        let mut sel = Selection::default();
        sel.set_selected(Some("A".into()));
        sel.apply_detail("A", json!(1));
        sel.set_selected(Some("A".into()));
        assert_eq!(sel.snapshot(), Some(&json!(1)));
        sel.set_selected(None);
        assert_eq!(sel.state(), &SelectionState::Unselected);
    }

    #[test]
    fn switch_app_reselects_only_after_first_app() {
        let mut sel = Selection::default();
        sel.set_selected(Some("A".into()));
        assert!(sel.begin_load("A"));
        sel.apply_detail("A", json!(1));

        assert_eq!(sel.switch_app("app-1".into()), None);
        assert_eq!(sel.snapshot(), None);
        assert_eq!(sel.selected_id(), Some("A"));

        assert_eq!(sel.switch_app("app-2".into()), Some("A".into()));
        assert_eq!(sel.current_app(), Some("app-2"));
    }
}
