use serde_json::{Map, Value as JsonValue};

/// Target id used when asking the bridge for the top-level tree.
pub const ROOT_SENTINEL: &str = "_root";

const ROOT_SUFFIX: &str = "root";

/// Root ids carry a reserved suffix (`_root`, `1#root`, ...).
pub fn is_root_id(id: &str) -> bool {
    id.ends_with(ROOT_SUFFIX)
}

pub fn node_label<'a>(id: &'a str, meta: &'a Map<String, JsonValue>) -> &'a str {
    ["name", "inlineName"]
        .iter()
        .find_map(|k| meta.get(*k).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .unwrap_or(id)
}
