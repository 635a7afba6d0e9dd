use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A component node as it travels over the bridge.
///
/// Children are embedded. Everything besides `id`, `hasChildren` and
/// `children` is opaque metadata (name, tags, rendering hints) and is kept
/// verbatim in `meta`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(flatten)]
    pub meta: Map<String, JsonValue>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BridgeConfig {
    // Command line of the process speaking the bridge protocol on stdio
    #[serde(default)]
    pub command: Option<String>,
    // JSON-lines transcript of bridge events, used instead of a live process
    #[serde(default)]
    pub replay: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_prefix")]
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            level: default_log_level(),
            file_prefix: default_log_prefix(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub bridge: BridgeConfig,
    // Initial component filter
    #[serde(default)]
    pub filter: String,
    // Request the root tree as soon as the bridge is up. Default: true.
    #[serde(default = "default_true")]
    pub auto_request: bool,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: Some("Component Inspector".to_string()),
            bridge: BridgeConfig::default(),
            filter: String::new(),
            auto_request: true,
            log: LogConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_prefix() -> String {
    "devtools-mirror".to_string()
}

pub(crate) fn validate_app_config(cfg: &AppConfig) -> Result<(), String> {
    let has_command = cfg
        .bridge
        .command
        .as_deref()
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);
    let has_replay = cfg
        .bridge
        .replay
        .as_deref()
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);
    if !(has_command || has_replay) {
        return Err("bridge requires either 'command' or 'replay'".to_string());
    }
    if has_command && has_replay {
        return Err("bridge 'command' and 'replay' are mutually exclusive".to_string());
    }
    if cfg.log.level.trim().is_empty() {
        return Err("log 'level' must not be empty".to_string());
    }
    Ok(())
}
