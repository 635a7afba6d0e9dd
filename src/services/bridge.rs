//! Bridge protocol and its stdio transport.
//!
//! Every message is one JSON object per line. Commands go to the bridge as
//! `{"command": "<name>", "payload": {...}}`, events come back as
//! `{"event": "<name>", "payload": {...}}`. Serialized tree and detail blobs
//! stay strings here; [`super::decode`] turns them into data.

use std::collections::HashMap;
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::Sender;
use std::sync::OnceLock;
use std::thread;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::error::MirrorError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "command",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum BridgeCommand {
    TreeFetch {
        instance_id: String,
        filter: String,
    },
    DetailFetch {
        instance_id: String,
    },
    EditState {
        instance_id: String,
        dot_path: String,
        #[serde(rename = "type")]
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<JsonValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_key: Option<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        remove: bool,
    },
    InspectDom {
        instance_id: String,
    },
}

impl BridgeCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeCommand::TreeFetch { .. } => "tree-fetch",
            BridgeCommand::DetailFetch { .. } => "detail-fetch",
            BridgeCommand::EditState { .. } => "edit-state",
            BridgeCommand::InspectDom { .. } => "inspect-dom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum BridgeEvent {
    /// The remote side (re)initialized: a fresh inspected session.
    Init {},
    TreeData {
        instance_id: String,
        #[serde(default)]
        tree_data: Option<String>,
        #[serde(default)]
        not_found: bool,
    },
    DetailData {
        instance_id: String,
        #[serde(default)]
        data: Option<String>,
        // Innermost first
        #[serde(default)]
        parent_ids: Option<Vec<String>>,
    },
    AppSelected {
        id: String,
    },
    InspectDomAck {},
}

pub enum BridgeInbound {
    Event(BridgeEvent),
    Malformed(MirrorError),
    Closed(String),
}

pub fn parse_inbound(line: &str) -> Option<BridgeInbound> {
    let l = line.trim();
    if l.is_empty() {
        return None;
    }
    Some(match serde_json::from_str::<BridgeEvent>(l) {
        Ok(ev) => BridgeInbound::Event(ev),
        Err(e) => BridgeInbound::Malformed(MirrorError::data_format("bridge message", e)),
    })
}

/// Outbound half of the bridge. Sends are fire-and-forget: the effect of a
/// command is only observed through a later event.
pub trait CommandSink {
    fn send(&mut self, cmd: &BridgeCommand) -> Result<()>;
}

/// Keeps every command instead of delivering it (replay sessions, tests).
#[derive(Debug, Default)]
pub struct CommandLog {
    pub sent: Vec<BridgeCommand>,
}

impl CommandSink for CommandLog {
    fn send(&mut self, cmd: &BridgeCommand) -> Result<()> {
        debug!(command = cmd.name(), "recorded bridge command");
        self.sent.push(cmd.clone());
        Ok(())
    }
}

fn expand_cmdline_env(cmdline: &str) -> String {
    // Expand ${VAR} from the environment; unknown variables expand to nothing
    static VAR_RE: OnceLock<Regex> = OnceLock::new();
    let re = VAR_RE.get_or_init(|| Regex::new(r"\$\{([A-Z0-9_]+)\}").expect("valid pattern"));
    let env_map: HashMap<String, String> = env::vars().collect();
    re.replace_all(cmdline, |caps: &regex::Captures| {
        env_map.get(&caps[1]).cloned().unwrap_or_default()
    })
    .to_string()
}

/// Bridge backed by a child process speaking the protocol on stdin/stdout.
pub struct BridgeProcess {
    child: Child,
    stdin: ChildStdin,
}

impl BridgeProcess {
    pub fn spawn(cmdline: &str, tx: Sender<BridgeInbound>) -> Result<Self> {
        let expanded = expand_cmdline_env(cmdline);
        let parts =
            shlex::split(&expanded).ok_or_else(|| anyhow!("Failed to parse command line"))?;
        if parts.is_empty() {
            return Err(anyhow!("Empty command line"));
        }
        let program = &parts[0];
        let args = &parts[1..];
        let mut child = Command::new(program)
            .args(args)
            .env("DEVTOOLS_MIRROR_BRIDGE", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawning {expanded}"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("bridge stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("bridge stdout unavailable"))?;
        info!(command = %expanded, "bridge process started");

        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines().map_while(Result::ok) {
                if let Some(msg) = parse_inbound(&line) {
                    if tx.send(msg).is_err() {
                        return;
                    }
                }
            }
            let _ = tx.send(BridgeInbound::Closed("bridge process exited".to_string()));
        });

        Ok(Self { child, stdin })
    }
}

impl CommandSink for BridgeProcess {
    fn send(&mut self, cmd: &BridgeCommand) -> Result<()> {
        let line = serde_json::to_string(cmd).context("encoding bridge command")?;
        writeln!(self.stdin, "{line}").context("writing to bridge")?;
        self.stdin.flush().context("flushing bridge")?;
        debug!(command = cmd.name(), "sent bridge command");
        Ok(())
    }
}

impl Drop for BridgeProcess {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("stopping bridge process: {e}");
        }
        let _ = self.child.wait();
    }
}

/// Feed a recorded JSON-lines transcript of bridge events.
pub fn replay_transcript(path: PathBuf, tx: Sender<BridgeInbound>) {
    thread::spawn(move || {
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                let _ = tx.send(BridgeInbound::Closed(format!("reading {path:?}: {e}")));
                return;
            }
        };
        let mut count = 0usize;
        for line in BufReader::new(file).lines().map_while(Result::ok) {
            if let Some(msg) = parse_inbound(&line) {
                count += 1;
                if tx.send(msg).is_err() {
                    return;
                }
            }
        }
        info!(events = count, "replay transcript finished");
        let _ = tx.send(BridgeInbound::Closed("replay finished".to_string()));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tree_fetch_wire_shape() {
        let cmd = BridgeCommand::TreeFetch {
            instance_id: "_root".into(),
            filter: String::new(),
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"command": "tree-fetch", "payload": {"instanceId": "_root", "filter": ""}})
        );
    }

    #[test]
    fn edit_state_omits_absent_fields() {
        let cmd = BridgeCommand::EditState {
            instance_id: "1:2".into(),
            dot_path: "count".into(),
            kind: "data".into(),
            value: Some(json!(3)),
            new_key: None,
            remove: false,
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"command": "edit-state", "payload": {
                "instanceId": "1:2", "dotPath": "count", "type": "data", "value": 3
            }})
        );
    }

    #[test]
    fn parses_tree_data_event() {
        let line = r#"{"event":"tree-data","payload":{"instanceId":"1#root","treeData":"[]"}}"#;
        match parse_inbound(line) {
            Some(BridgeInbound::Event(BridgeEvent::TreeData {
                instance_id,
                tree_data,
                not_found,
            })) => {
                assert_eq!(instance_id, "1#root");
                assert_eq!(tree_data.as_deref(), Some("[]"));
                assert!(!not_found);
            }
            _ => panic!("expected tree-data"),
        }
    }

    #[test]
    fn parses_detail_data_with_parents() {
        let line = r#"{"event":"detail-data","payload":{"instanceId":"1:4","data":"{}","parentIds":["1:3","1#root"]}}"#;
        match parse_inbound(line) {
            Some(BridgeInbound::Event(BridgeEvent::DetailData { parent_ids, .. })) => {
                assert_eq!(parent_ids.unwrap(), vec!["1:3", "1#root"]);
            }
            _ => panic!("expected detail-data"),
        }
    }

    #[test]
    fn parses_payloadless_shapes() {
        assert!(matches!(
            parse_inbound(r#"{"event":"init","payload":{}}"#),
            Some(BridgeInbound::Event(BridgeEvent::Init {}))
        ));
        assert!(matches!(
            parse_inbound(r#"{"event":"inspect-dom-ack","payload":{}}"#),
            Some(BridgeInbound::Event(BridgeEvent::InspectDomAck {}))
        ));
    }

    #[test]
    fn malformed_and_blank_lines() {
        assert!(parse_inbound("   ").is_none());
        assert!(matches!(
            parse_inbound(r#"{"event":"nope","payload":{}}"#),
            Some(BridgeInbound::Malformed(MirrorError::DataFormat { .. }))
        ));
    }

    #[test]
    fn command_log_records_in_order() {
        let mut log = CommandLog::default();
        log.send(&BridgeCommand::DetailFetch {
            instance_id: "1:2".into(),
        })
        .unwrap();
        log.send(&BridgeCommand::InspectDom {
            instance_id: "1:2".into(),
        })
        .unwrap();
        let names: Vec<&str> = log.sent.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["detail-fetch", "inspect-dom"]);
    }

    #[test]
    fn cmdline_env_expansion() {
        std::env::set_var("DEVTOOLS_MIRROR_TEST_AGENT", "agent.js");
        assert_eq!(
            expand_cmdline_env("node ${DEVTOOLS_MIRROR_TEST_AGENT} ${DEVTOOLS_MIRROR_UNSET_VAR}"),
            "node agent.js "
        );
    }
}
