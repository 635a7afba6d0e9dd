use crate::app::{update, AppMsg, Effect, ToastLevel};
use crate::error::MirrorError;
use crate::mirror::events::MirrorEvent;
use crate::mirror::selection::SelectionState;
use crate::mirror::Inspector;
use crate::model::{validate_app_config, AppConfig};
use crate::nav::flatten::{flatten_visible, FlatNode};
use crate::services::bridge::{
    replay_transcript, BridgeInbound, BridgeProcess, CommandLog, CommandSink,
};
use crate::theme::Theme;
use crate::widgets::filter_box::FilterBox;
use crate::widgets::json_viewer::JsonViewerWidget;
use crate::widgets::status_bar::draw_status;
use crate::widgets::tree_view::draw_tree;
use crate::widgets::Widget;
use anyhow::{anyhow, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const CONFIG_FILE: &str = "devtools-mirror.yaml";
const TOAST_TICKS: u64 = 15;
const NOTHING_SELECTED: &str = "Select a component and press Enter";
const RECENT_COMMANDS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pane {
    Tree,
    Detail,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

pub struct AppState {
    pub config: AppConfig,
    pub theme: Theme,
    pub inspector: Inspector,
    pub rows: Vec<FlatNode>,
    pub cursor: usize,
    pub tree_offset: usize,
    pub focus: Pane,
    pub detail: JsonViewerWidget,
    pub filter_box: Option<FilterBox>,
    pub toast: Option<Toast>,
    pub tick: u64,
    /// Navigation history of selected component ids, newest last.
    pub history: Vec<String>,
    pub bridge_open: bool,
    /// Names of the most recent commands sent, oldest first.
    pub sent: VecDeque<&'static str>,
    pub sent_total: usize,
    pub errors: usize,
    pub quit: bool,
    sink: Box<dyn CommandSink>,
    inbound: Receiver<BridgeInbound>,
    changes: Receiver<MirrorEvent>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sink: Box<dyn CommandSink>,
        inbound: Receiver<BridgeInbound>,
    ) -> Self {
        let mut inspector = Inspector::new(config.filter.clone());
        let changes = inspector.subscribe();
        Self {
            config,
            theme: Theme::default(),
            inspector,
            rows: Vec::new(),
            cursor: 0,
            tree_offset: 0,
            focus: Pane::Tree,
            detail: JsonViewerWidget::with_placeholder("Detail", NOTHING_SELECTED),
            filter_box: None,
            toast: None,
            tick: 0,
            history: Vec::new(),
            bridge_open: true,
            sent: VecDeque::with_capacity(RECENT_COMMANDS),
            sent_total: 0,
            errors: 0,
            quit: false,
            sink,
            inbound,
            changes,
        }
    }

    pub fn show_toast(&mut self, text: impl Into<String>, level: ToastLevel) {
        if level == ToastLevel::Error {
            self.errors += 1;
        }
        self.toast = Some(Toast {
            text: text.into(),
            level,
            expires_at_tick: self.tick + TOAST_TICKS,
        });
    }

    fn record_sent(&mut self, name: &'static str) {
        if self.sent.len() == RECENT_COMMANDS {
            self.sent.pop_front();
        }
        self.sent.push_back(name);
        self.sent_total += 1;
    }

    fn cursor_row(&self) -> Option<&FlatNode> {
        self.rows.get(self.cursor)
    }
}

pub(crate) fn dispatch(state: &mut AppState, msg: AppMsg) {
    let effects = update(&mut state.inspector, msg);
    run_effects(state, effects);
    drain_changes(state);
}

fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    let mut queue: VecDeque<Effect> = effects.into();
    while let Some(eff) = queue.pop_front() {
        match eff {
            Effect::Send(cmd) => match state.sink.send(&cmd) {
                Ok(()) => state.record_sent(cmd.name()),
                Err(e) => {
                    warn!(command = cmd.name(), "bridge send failed: {e:#}");
                    state.show_toast(format!("{}: {e}", cmd.name()), ToastLevel::Error);
                }
            },
            Effect::Navigate { id, replace } => {
                if replace && !state.history.is_empty() {
                    state.history.pop();
                }
                state.history.push(id.clone());
                debug!(%id, replace, "navigated");
                queue.extend(update(
                    &mut state.inspector,
                    AppMsg::SelectionChanged(Some(id)),
                ));
            }
            Effect::ShowToast { text, level } => state.show_toast(text, level),
            Effect::RevealInHost => {
                state.show_toast("element revealed in the host inspector", ToastLevel::Success)
            }
        }
    }
}

// Mirror change notifications drive every view refresh.
fn drain_changes(state: &mut AppState) {
    let mut tree_dirty = false;
    let mut detail_dirty = false;
    let mut selected: Option<String> = None;
    for ev in state.changes.try_iter() {
        match ev {
            MirrorEvent::TreeReset
            | MirrorEvent::RootsReplaced { .. }
            | MirrorEvent::NodesMerged { .. }
            | MirrorEvent::Expanded { .. }
            | MirrorEvent::TreeUnsupported { .. } => tree_dirty = true,
            MirrorEvent::SelectionChanged { id } => {
                detail_dirty = true;
                selected = id;
            }
            MirrorEvent::DetailLoaded { .. } | MirrorEvent::DetailCleared => detail_dirty = true,
        }
    }
    if tree_dirty {
        refresh_rows(state);
    }
    if let Some(id) = selected {
        if let Some(idx) = state.rows.iter().position(|r| r.id == id) {
            state.cursor = idx;
        }
    }
    if detail_dirty {
        refresh_detail(state);
    }
}

fn refresh_rows(state: &mut AppState) {
    let keep = state.cursor_row().map(|r| r.id.clone());
    state.rows = flatten_visible(&state.inspector);
    state.cursor = keep
        .and_then(|id| state.rows.iter().position(|r| r.id == id))
        .unwrap_or_else(|| state.cursor.min(state.rows.len().saturating_sub(1)));
}

fn refresh_detail(state: &mut AppState) {
    // Breadcrumb from the outermost ancestor down to the node
    let label_of = |id: &str| {
        let tree = &state.inspector.tree;
        let label = |id: &str| {
            tree.get(id)
                .map(|n| n.label().to_string())
                .unwrap_or_else(|| id.to_string())
        };
        let mut parts: Vec<String> = tree.ancestors(id).iter().rev().map(|a| label(a)).collect();
        parts.push(label(id));
        parts.join(" › ")
    };
    match state.inspector.selection.state() {
        SelectionState::Unselected => state.detail.show_placeholder("Detail", NOTHING_SELECTED),
        SelectionState::Pending { id } => {
            let title = label_of(id);
            state.detail.show_placeholder(title, "loading...");
        }
        SelectionState::Loaded { id, snapshot } => {
            let title = label_of(id);
            state.detail.show_value(title, snapshot);
        }
    }
}

fn pump_bridge(state: &mut AppState) {
    let drained: Vec<BridgeInbound> = state.inbound.try_iter().collect();
    for msg in drained {
        match msg {
            BridgeInbound::Event(ev) => dispatch(state, AppMsg::Bridge(ev)),
            BridgeInbound::Malformed(err) => {
                warn!("{err}");
                state.show_toast(err.to_string(), ToastLevel::Error);
            }
            BridgeInbound::Closed(reason) => {
                let err = MirrorError::BridgeClosed(reason);
                info!("{err}");
                state.bridge_open = false;
                state.show_toast(err.to_string(), ToastLevel::Info);
            }
        }
    }
}

fn handle_key(state: &mut AppState, key: KeyEvent) {
    if let Some(fb) = state.filter_box.as_mut() {
        match key.code {
            KeyCode::Enter => {
                let text = fb.text().trim().to_string();
                state.filter_box = None;
                dispatch(state, AppMsg::SetFilter(text));
            }
            KeyCode::Esc => state.filter_box = None,
            code => {
                fb.on_key(code);
            }
        }
        return;
    }
    match key.code {
        KeyCode::Char('q') => state.quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => state.quit = true,
        KeyCode::Tab | KeyCode::BackTab => {
            state.focus = match state.focus {
                Pane::Tree => Pane::Detail,
                Pane::Detail => Pane::Tree,
            }
        }
        KeyCode::Char('/') => state.filter_box = Some(FilterBox::new(state.inspector.filter())),
        KeyCode::Char('r') => {
            state.inspector.reset();
            dispatch(state, AppMsg::RequestTree { target: None });
        }
        code if state.focus == Pane::Detail => {
            state.detail.on_key(code);
        }
        KeyCode::Up => state.cursor = state.cursor.saturating_sub(1),
        KeyCode::Down => {
            if state.cursor + 1 < state.rows.len() {
                state.cursor += 1;
            }
        }
        KeyCode::Home => state.cursor = 0,
        KeyCode::End => state.cursor = state.rows.len().saturating_sub(1),
        KeyCode::Right => {
            let Some(row) = state.cursor_row().cloned() else {
                return;
            };
            if !row.has_children {
                return;
            }
            if row.expanded {
                if state.cursor + 1 < state.rows.len() {
                    state.cursor += 1;
                }
            } else {
                dispatch(
                    state,
                    AppMsg::ToggleNode {
                        id: row.id,
                        load: true,
                    },
                );
            }
        }
        KeyCode::Left => {
            let Some(row) = state.cursor_row().cloned() else {
                return;
            };
            if row.expanded {
                dispatch(
                    state,
                    AppMsg::ToggleNode {
                        id: row.id,
                        load: false,
                    },
                );
            } else if let Some(parent) = state.inspector.tree.parent_of(&row.id) {
                if let Some(idx) = state.rows.iter().position(|r| r.id == parent) {
                    state.cursor = idx;
                }
            }
        }
        KeyCode::Enter => {
            if let Some(row) = state.cursor_row() {
                let id = row.id.clone();
                dispatch(state, AppMsg::Select { id, replace: false });
            }
        }
        KeyCode::Char('i') => {
            let id = state
                .inspector
                .selection
                .selected_id()
                .map(str::to_string)
                .or_else(|| state.cursor_row().map(|r| r.id.clone()));
            if let Some(id) = id {
                dispatch(state, AppMsg::InspectDom(id));
            }
        }
        _ => {}
    }
}

fn ui(f: &mut Frame, state: &mut AppState) {
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }
    let screen = f.area();
    f.render_widget(Block::default().style(state.theme.base_style()), screen);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(screen);
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[0]);

    draw_tree(f, panes[0], state);
    let detail_focused = state.focus == Pane::Detail;
    state.detail.render(f, panes[1], detail_focused, &state.theme);
    draw_status(f, rows[1], state);

    if let Some(fb) = state.filter_box.as_mut() {
        let area = Rect {
            x: panes[0].x + 1,
            y: panes[0].y + 1,
            width: panes[0].width.saturating_sub(2),
            height: 3.min(panes[0].height),
        };
        fb.render(f, area, true, &state.theme);
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let mut cfg: AppConfig =
        serde_yaml::from_str(&s).with_context(|| format!("parsing {path:?}"))?;
    // Relative transcripts live next to the config file
    if let (Some(replay), Some(base)) = (cfg.bridge.replay.as_mut(), path.parent()) {
        let p = PathBuf::from(replay.as_str());
        if p.is_relative() {
            *replay = base.join(p).to_string_lossy().into_owned();
        }
    }
    Ok(cfg)
}

fn discover_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut candidates = vec![cwd.join(CONFIG_FILE), cwd.join(".tui").join(CONFIG_FILE)];
    if let Some(home) = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
    {
        candidates.push(home.join(".tui").join(CONFIG_FILE));
    }
    candidates.into_iter().find(|p| p.exists())
}

fn apply_env_overrides(cfg: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(cmd) = var("DEVTOOLS_MIRROR_BRIDGE").filter(|s| !s.trim().is_empty()) {
        cfg.bridge.command = Some(cmd);
        cfg.bridge.replay = None;
    }
    if let Some(path) = var("DEVTOOLS_MIRROR_REPLAY").filter(|s| !s.trim().is_empty()) {
        cfg.bridge.replay = Some(path);
        cfg.bridge.command = None;
    }
}

/// Config from `DEVTOOLS_MIRROR_CONFIG_DIR`, else the first
/// `devtools-mirror.yaml` found in CWD, CWD/.tui or ~/.tui, else defaults.
/// Environment overrides are applied before validation.
pub fn load_config() -> Result<AppConfig> {
    let mut cfg = if let Ok(base) = std::env::var("DEVTOOLS_MIRROR_CONFIG_DIR") {
        read_config(&PathBuf::from(base).join(CONFIG_FILE))?
    } else if let Some(p) = discover_config() {
        read_config(&p)?
    } else {
        AppConfig::default()
    };
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
    validate_app_config(&cfg).map_err(|e| {
        anyhow!("invalid config: {e}. Set DEVTOOLS_MIRROR_BRIDGE, DEVTOOLS_MIRROR_REPLAY or place {CONFIG_FILE} in CWD/.tui")
    })?;
    Ok(cfg)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

fn connect(config: &AppConfig) -> Result<(Box<dyn CommandSink>, Receiver<BridgeInbound>)> {
    let (tx, rx) = mpsc::channel::<BridgeInbound>();
    let sink: Box<dyn CommandSink> = match (&config.bridge.command, &config.bridge.replay) {
        (Some(cmd), _) => Box::new(BridgeProcess::spawn(cmd, tx)?),
        (None, Some(path)) => {
            info!(path = %path, "replaying bridge transcript");
            replay_transcript(PathBuf::from(path), tx);
            Box::new(CommandLog::default())
        }
        (None, None) => return Err(anyhow!("no bridge configured")),
    };
    Ok((sink, rx))
}

pub fn run(config: AppConfig) -> Result<()> {
    let (sink, inbound) = connect(&config)?;
    let auto_request = config.auto_request;
    let mut state = AppState::new(config, sink, inbound);
    if auto_request {
        dispatch(&mut state, AppMsg::RequestTree { target: None });
    }

    if env_flag("DEVTOOLS_MIRROR_HEADLESS") {
        let ticks: u64 = std::env::var("DEVTOOLS_MIRROR_TICKS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);
        let select_id = std::env::var("DEVTOOLS_MIRROR_HEADLESS_SELECT").ok();
        return run_headless(&mut state, ticks, select_id);
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    let res: Result<()> = loop {
        if let Err(e) = terminal.draw(|f| ui(f, &mut state)) {
            break Err(e.into());
        }
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        match event::poll(timeout) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    handle_key(&mut state, key)
                }
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }
        if state.quit {
            break Ok(());
        }
        pump_bridge(&mut state);
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    };
    // Restore
    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!(commands = state.sent_total, "session ended");
    state.inspector.teardown();
    res
}

fn run_headless(state: &mut AppState, ticks: u64, select_id: Option<String>) -> Result<()> {
    let backend = ratatui::backend::TestBackend::new(100, 30);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(100);
    let mut select_done = false;
    for _ in 0..ticks {
        pump_bridge(state);
        if !select_done {
            if let Some(id) = &select_id {
                if state.inspector.tree.contains(id) {
                    let id = id.clone();
                    dispatch(state, AppMsg::Select { id, replace: false });
                    select_done = true;
                }
            }
        }
        terminal.draw(|f| ui(f, state))?;
        state.tick = state.tick.wrapping_add(1);
        std::thread::sleep(tick_rate);
    }
    pump_bridge(state);
    println!("{}", headless_summary(state, select_done));
    Ok(())
}

fn headless_summary(state: &AppState, select_done: bool) -> serde_json::Value {
    let sel = &state.inspector.selection;
    serde_json::json!({
        "ok": state.errors == 0,
        "bridge_open": state.bridge_open,
        "nodes": state.inspector.tree.len(),
        "roots": state.inspector.tree.roots().len(),
        "visible_rows": state.rows.len(),
        "selected": sel.selected_id(),
        "select_done": select_done,
        "last_selected": sel.last_selected_id(),
        "detail_loaded": sel.snapshot().is_some(),
        "expanded": state.inspector.expand.len(),
        "filter": state.inspector.filter(),
        "commands_sent": state.sent_total,
        "recent_commands": state.sent,
    })
}
