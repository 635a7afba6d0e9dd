use crate::mirror::tree::MirrorNode;
use crate::mirror::Inspector;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatNode {
    pub id: String,
    pub depth: usize,
    pub label: String,
    pub has_children: bool,
    pub expanded: bool,
}

/// Visible rows of the mirrored tree: roots first, then the children of
/// every expanded node, depth first in display order.
pub fn flatten_visible(insp: &Inspector) -> Vec<FlatNode> {
    fn append(out: &mut Vec<FlatNode>, insp: &Inspector, node: &MirrorNode, depth: usize) {
        let expanded = insp.expand.is_expanded(&node.id);
        out.push(FlatNode {
            id: node.id.clone(),
            depth,
            label: node.label().to_string(),
            has_children: node.has_children,
            expanded,
        });
        if expanded {
            for child in insp.tree.children_of(&node.id) {
                append(out, insp, child, depth + 1);
            }
        }
    }

    let mut out = Vec::new();
    for root in insp.tree.roots() {
        if let Some(node) = insp.tree.get(root) {
            append(&mut out, insp, node, 0);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use serde_json::json;

    fn make_inspector() -> Inspector {
        let mut insp = Inspector::default();
        let nodes: Vec<Node> = serde_json::from_value(json!([
            {"id": "1#root", "name": "App", "hasChildren": true, "children": [
                {"id": "1:1", "name": "Header"},
                {"id": "1:2", "name": "List", "hasChildren": true, "children": [
                    {"id": "1:3", "name": "Item"}
                ]}
            ]},
            {"id": "2#root", "name": "Devtools", "hasChildren": false}
        ]))
        .unwrap();
        insp.tree.apply_update("_root", nodes);
        insp
    }

    #[test]
    fn collapsed_tree_shows_roots_only() {
        let insp = make_inspector();
        let rows = flatten_visible(&insp);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1#root", "2#root"]);
        assert!(rows[0].has_children);
        assert!(!rows[0].expanded);
    }

    #[test]
    fn expanded_nodes_show_children_in_order() {
        let mut insp = make_inspector();
        insp.expand.set("1#root", true);
        insp.expand.set("1:2", true);
        let rows = flatten_visible(&insp);
        let ids: Vec<(&str, usize)> = rows.iter().map(|r| (r.id.as_str(), r.depth)).collect();
        assert_eq!(
            ids,
            vec![
                ("1#root", 0),
                ("1:1", 1),
                ("1:2", 1),
                ("1:3", 2),
                ("2#root", 0)
            ]
        );
        assert_eq!(rows[3].label, "Item");
    }

    #[test]
    fn expanded_but_collapsed_parent_hides_grandchildren() {
        let mut insp = make_inspector();
        insp.expand.set("1:2", true);
        let rows = flatten_visible(&insp);
        assert_eq!(rows.len(), 2);
    }
}
