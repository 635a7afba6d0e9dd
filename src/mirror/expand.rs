use std::collections::HashMap;

/// Per-node expand state. Ids without an entry are "unknown" and behave as
/// collapsed. Lives independently of the tree: a root reset keeps it, a new
/// bridge session clears it.
#[derive(Debug, Default, Clone)]
pub struct ExpandState {
    entries: HashMap<String, bool>,
}

impl ExpandState {
    pub fn state(&self, id: &str) -> Option<bool> {
        self.entries.get(id).copied()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.state(id).unwrap_or(false)
    }

    pub fn set(&mut self, id: &str, expanded: bool) {
        self.entries.insert(id.to_string(), expanded);
    }

    /// Flip and return the new state.
    pub fn toggle(&mut self, id: &str) -> bool {
        let next = !self.is_expanded(id);
        self.set(id, next);
        next
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_flips_to_expanded_then_back() {
        let mut st = ExpandState::default();
        assert_eq!(st.state("1:2"), None);
        assert!(st.toggle("1:2"));
        assert_eq!(st.state("1:2"), Some(true));
        assert!(!st.toggle("1:2"));
        assert_eq!(st.state("1:2"), Some(false));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut st = ExpandState::default();
        st.set("a", true);
        st.set("b", false);
        assert_eq!(st.len(), 2);
        st.clear();
        assert!(st.is_empty());
        assert!(!st.is_expanded("a"));
    }
}
