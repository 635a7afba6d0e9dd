//! Client-side mirror of the inspected component tree.
//!
//! The node table owns exactly one record per id. Children are stored as
//! ordered id lists, so a record can be updated field by field without
//! touching the records of its descendants. Each record gets a [`NodeKey`]
//! the first time its id is seen; merges never change it.

use std::collections::HashMap;

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::model::Node;
use crate::nav::keys::{is_root_id, node_label};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct MirrorNode {
    pub key: NodeKey,
    pub id: String,
    pub has_children: bool,
    pub children: Vec<String>,
    pub meta: Map<String, JsonValue>,
    // Bumped on every merge that touches this record
    pub revision: u64,
}

impl MirrorNode {
    pub fn label(&self) -> &str {
        node_label(&self.id, &self.meta)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Records touched by a refresh of an already known node.
    Merged { target: String, ids: Vec<String> },
    RootsReplaced { count: usize },
    /// Update for a target that is neither known nor a root (e.g. unmounted).
    Stale { target: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    /// The deferred reset was consumed before applying the update.
    pub reset: bool,
    pub outcome: MergeOutcome,
}

#[derive(Debug, Default)]
pub struct TreeMirror {
    nodes: HashMap<String, MirrorNode>,
    parents: HashMap<String, String>,
    roots: Vec<String>,
    reset_pending: bool,
    next_key: u64,
}

impl TreeMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the mirror right before the next update is applied, not now, so
    /// the current tree stays visible while the new one is in flight.
    pub fn queue_reset(&mut self) {
        self.reset_pending = true;
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    pub fn apply_update(&mut self, target_id: &str, incoming: Vec<Node>) -> TreeChange {
        let reset = std::mem::take(&mut self.reset_pending);
        if reset {
            self.nodes.clear();
            self.parents.clear();
            self.roots.clear();
        }

        let outcome = if self.nodes.contains_key(target_id) {
            let mut ids = Vec::new();
            for node in incoming {
                self.merge_node(node, None, &mut ids);
            }
            MergeOutcome::Merged {
                target: target_id.to_string(),
                ids,
            }
        } else if is_root_id(target_id) {
            self.roots = incoming.iter().map(|n| n.id.clone()).collect();
            let count = self.roots.len();
            for node in incoming {
                self.parents.remove(&node.id);
                self.insert_subtree(node, None);
            }
            MergeOutcome::RootsReplaced { count }
        } else {
            debug!(target_id, "tree update for unknown node dropped");
            MergeOutcome::Stale {
                target: target_id.to_string(),
            }
        };
        TreeChange { reset, outcome }
    }

    fn alloc_key(&mut self) -> NodeKey {
        self.next_key += 1;
        NodeKey(self.next_key)
    }

    // Upsert `node` and everything it carries. An incoming node that claims
    // children but ships none keeps the children already known; a non-empty
    // list replaces the previous one.
    fn merge_node(&mut self, node: Node, parent: Option<&str>, touched: &mut Vec<String>) {
        let Node {
            id,
            has_children,
            children,
            meta,
        } = node;
        let keep_children = has_children && children.is_empty();
        let child_ids: Vec<String> = children.iter().map(|c| c.id.clone()).collect();

        if let Some(existing) = self.nodes.get_mut(&id) {
            existing.has_children = has_children;
            existing.meta.extend(meta);
            if !keep_children {
                existing.children = child_ids;
            }
            existing.revision += 1;
        } else {
            let key = self.alloc_key();
            self.nodes.insert(
                id.clone(),
                MirrorNode {
                    key,
                    id: id.clone(),
                    has_children,
                    children: child_ids,
                    meta,
                    revision: 0,
                },
            );
        }
        if let Some(p) = parent {
            self.parents.insert(id.clone(), p.to_string());
        }
        touched.push(id.clone());
        for child in children {
            self.merge_node(child, Some(&id), touched);
        }
    }

    // Plain insert used for root replacement: fields are taken as sent.
    fn insert_subtree(&mut self, node: Node, parent: Option<&str>) {
        let Node {
            id,
            has_children,
            children,
            meta,
        } = node;
        let key = match self.nodes.get(&id) {
            Some(existing) => existing.key,
            None => self.alloc_key(),
        };
        let child_ids = children.iter().map(|c| c.id.clone()).collect();
        self.nodes.insert(
            id.clone(),
            MirrorNode {
                key,
                id: id.clone(),
                has_children,
                children: child_ids,
                meta,
                revision: 0,
            },
        );
        if let Some(p) = parent {
            self.parents.insert(id.clone(), p.to_string());
        }
        for child in children {
            self.insert_subtree(child, Some(&id));
        }
    }

    pub fn get(&self, id: &str) -> Option<&MirrorNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &MirrorNode> {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|c| self.nodes.get(c))
    }

    /// Ancestor chain of `id`, innermost first.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = id;
        while let Some(p) = self.parents.get(cur) {
            if out.iter().any(|seen| seen == p) {
                break;
            }
            out.push(p.clone());
            cur = p.as_str();
        }
        out
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.parents.clear();
        self.roots.clear();
        self.reset_pending = false;
    }
}
