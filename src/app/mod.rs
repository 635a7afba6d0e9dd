use std::collections::HashSet;

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::error::MirrorError;
use crate::mirror::events::MirrorEvent;
use crate::mirror::selection::DetailOutcome;
use crate::mirror::tree::MergeOutcome;
use crate::mirror::Inspector;
use crate::nav::keys::{is_root_id, ROOT_SENTINEL};
use crate::services::bridge::{BridgeCommand, BridgeEvent};
use crate::services::decode::{decode_detail, decode_tree};

#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub instance_id: String,
    pub dot_path: String,
    // Which part of the component state is edited ("data", "props", "setup", ...)
    pub kind: String,
    pub value: Option<JsonValue>,
    pub new_key: Option<String>,
    pub remove: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppMsg {
    /// `None` targets the top-level tree.
    RequestTree {
        target: Option<String>,
    },
    SetFilter(String),
    ToggleNode {
        id: String,
        load: bool,
    },
    /// User intent; navigation decides and reports back with `SelectionChanged`.
    Select {
        id: String,
        replace: bool,
    },
    SelectionChanged(Option<String>),
    LoadDetail(String),
    EditState(EditRequest),
    InspectDom(String),
    Bridge(BridgeEvent),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(BridgeCommand),
    /// Ask navigation to make `id` the current selection.
    Navigate {
        id: String,
        replace: bool,
    },
    ShowToast {
        text: String,
        level: ToastLevel,
    },
    /// The host acknowledged a DOM inspection request.
    RevealInHost,
}

pub fn update(insp: &mut Inspector, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    match msg {
        RequestTree { target } => request_tree(insp, target.as_deref()),
        SetFilter(filter) => {
            if insp.set_filter(&filter) {
                debug!(filter = %filter, "filter changed");
                request_tree(insp, None)
            } else {
                Vec::new()
            }
        }
        ToggleNode { id, load } => toggle_node(insp, &id, load),
        Select { id, replace } => select(insp, &id, replace),
        SelectionChanged(id) => {
            insp.selection.set_selected(id.clone());
            insp.publish(MirrorEvent::SelectionChanged { id: id.clone() });
            match id {
                Some(id) => load_detail(insp, &id),
                None => Vec::new(),
            }
        }
        LoadDetail(id) => load_detail(insp, &id),
        EditState(req) => edit_state(insp, req),
        InspectDom(id) => {
            if id.is_empty() {
                return Vec::new();
            }
            vec![Effect::Send(BridgeCommand::InspectDom { instance_id: id })]
        }
        Bridge(ev) => on_bridge_event(insp, ev),
    }
}

/// Ask for the subtree rooted at `target`. Only a top-level fetch (`_root`)
/// queues the deferred tree reset; a known root node is refreshed in place
/// like any other node. The current filter always goes along.
pub(crate) fn request_tree(insp: &mut Inspector, target: Option<&str>) -> Vec<Effect> {
    let target = target.unwrap_or(ROOT_SENTINEL);
    if target == ROOT_SENTINEL {
        insp.tree.queue_reset();
    }
    vec![Effect::Send(BridgeCommand::TreeFetch {
        instance_id: target.to_string(),
        filter: insp.filter().to_string(),
    })]
}

pub(crate) fn toggle_node(insp: &mut Inspector, id: &str, load: bool) -> Vec<Effect> {
    match insp.tree.get(id) {
        Some(node) if node.has_children => {}
        _ => return Vec::new(),
    }
    let expanded = insp.expand.toggle(id);
    insp.publish(MirrorEvent::Expanded {
        id: id.to_string(),
        expanded,
    });
    if load && expanded {
        request_tree(insp, Some(id))
    } else {
        Vec::new()
    }
}

pub(crate) fn select(insp: &mut Inspector, id: &str, replace: bool) -> Vec<Effect> {
    if insp.selection.selected_id() == Some(id) {
        // Snapshot may have been dropped (e.g. app switch): fetch it again.
        return load_detail(insp, id);
    }
    vec![Effect::Navigate {
        id: id.to_string(),
        replace,
    }]
}

pub(crate) fn load_detail(insp: &mut Inspector, id: &str) -> Vec<Effect> {
    if !insp.selection.begin_load(id) {
        debug!(id, "detail fetch already in flight");
        return Vec::new();
    }
    vec![Effect::Send(BridgeCommand::DetailFetch {
        instance_id: id.to_string(),
    })]
}

fn edit_state(insp: &mut Inspector, req: EditRequest) -> Vec<Effect> {
    let EditRequest {
        instance_id,
        dot_path,
        kind,
        value,
        new_key,
        remove,
    } = req;
    let mut effects = vec![Effect::Send(BridgeCommand::EditState {
        instance_id: instance_id.clone(),
        dot_path,
        kind,
        value,
        new_key,
        remove,
    })];
    // The bridge does not push the edited state back on its own.
    effects.extend(load_detail(insp, &instance_id));
    effects
}

fn error_toast(err: &MirrorError) -> Effect {
    Effect::ShowToast {
        text: err.to_string(),
        level: ToastLevel::Error,
    }
}

fn on_bridge_event(insp: &mut Inspector, ev: BridgeEvent) -> Vec<Effect> {
    let mut effects: Vec<Effect> = Vec::new();
    match ev {
        BridgeEvent::Init {} => {
            insp.init();
            effects.extend(request_tree(insp, None));
        }
        BridgeEvent::TreeData {
            instance_id,
            tree_data,
            not_found,
        } => {
            let Some(raw) = tree_data else {
                if is_root_id(&instance_id) && !not_found {
                    if insp.mark_tree_unsupported() {
                        let err = MirrorError::NotSupported {
                            target: instance_id.clone(),
                        };
                        warn!("{err}");
                        insp.publish(MirrorEvent::TreeUnsupported {
                            target: instance_id,
                        });
                        effects.push(error_toast(&err));
                    }
                } else {
                    debug!(%instance_id, not_found, "tree response without data dropped");
                }
                return effects;
            };
            match decode_tree(&instance_id, &raw) {
                Ok(nodes) => {
                    let change = insp.tree.apply_update(&instance_id, nodes);
                    if !matches!(change.outcome, MergeOutcome::Stale { .. }) {
                        insp.tree_supported_again();
                    }
                    insp.publish_tree_change(&change);
                }
                Err(err) => {
                    warn!("{err}");
                    effects.push(error_toast(&err));
                }
            }
        }
        BridgeEvent::DetailData {
            instance_id,
            data,
            parent_ids,
        } => {
            let decoded = data
                .as_deref()
                .map(|raw| decode_detail(&instance_id, raw))
                .transpose();
            match decoded {
                Ok(Some(snapshot)) => {
                    match insp.selection.apply_detail(&instance_id, snapshot) {
                        DetailOutcome::Applied => insp.publish(MirrorEvent::DetailLoaded {
                            id: instance_id.clone(),
                        }),
                        DetailOutcome::Stale => {
                            debug!(%instance_id, "stale detail response ignored")
                        }
                    }
                }
                Ok(None) => {
                    debug!(%instance_id, "detail response without data");
                    insp.selection.finish_load(&instance_id);
                }
                Err(err) => {
                    warn!("{err}");
                    insp.selection.finish_load(&instance_id);
                    effects.push(error_toast(&err));
                    return effects;
                }
            }
            if let Some(parents) = parent_ids {
                effects.extend(expand_ancestors(insp, &parents));
            }
        }
        BridgeEvent::AppSelected { id } => {
            let changed = insp.selection.current_app() != Some(id.as_str());
            info!(app = %id, changed, "inspected application selected");
            let reselect = insp.selection.switch_app(id);
            insp.publish(MirrorEvent::DetailCleared);
            if let Some(last) = reselect {
                effects.extend(select(insp, &last, true));
            }
            if changed {
                effects.extend(request_tree(insp, None));
            }
        }
        BridgeEvent::InspectDomAck {} => effects.push(Effect::RevealInHost),
    }
    effects
}

// `parents` is innermost first; walk it from the outermost ancestor down so
// every collapsed level on the way to the selected node gets populated.
fn expand_ancestors(insp: &mut Inspector, parents: &[String]) -> Vec<Effect> {
    let mut effects = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for id in parents.iter().rev() {
        if is_root_id(id) || !seen.insert(id.as_str()) {
            continue;
        }
        insp.expand.set(id, true);
        insp.publish(MirrorEvent::Expanded {
            id: id.clone(),
            expanded: true,
        });
        effects.extend(request_tree(insp, Some(id)));
    }
    effects
}
