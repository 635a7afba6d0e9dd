use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::MirrorError;
use crate::model::Node;

// Tree payloads are a node list for root fetches and usually a single node
// for subtree refreshes.
#[derive(Deserialize)]
#[serde(untagged)]
enum TreePayload {
    Many(Vec<Node>),
    One(Node),
}

pub fn decode_tree(subject: &str, raw: &str) -> Result<Vec<Node>, MirrorError> {
    let payload: TreePayload =
        serde_json::from_str(raw).map_err(|e| MirrorError::data_format(subject, e))?;
    Ok(match payload {
        TreePayload::Many(nodes) => nodes,
        TreePayload::One(node) => vec![node],
    })
}

pub fn decode_detail(subject: &str, raw: &str) -> Result<JsonValue, MirrorError> {
    serde_json::from_str(raw).map_err(|e| MirrorError::data_format(subject, e))
}
