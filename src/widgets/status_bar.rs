use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::app::ToastLevel;
use crate::ui::{AppState, Pane};

pub const HELP_TREE: &str =
    "↑/↓ move • →/← expand/collapse • Enter select • / filter • i inspect DOM • r reload • Tab focus • q quit";
pub const HELP_DETAIL: &str = "↑/↓ PgUp/PgDn scroll • w wrap • Tab focus • q quit";

pub fn draw_status(f: &mut Frame, area: Rect, state: &AppState) {
    let theme = &state.theme;
    let mut spans: Vec<Span> = Vec::new();
    if !state.inspector.filter().is_empty() {
        spans.push(Span::styled(
            format!(" filter: {} ", state.inspector.filter()),
            Style::default().fg(theme.accent),
        ));
    }
    if state.inspector.tree.reset_pending() {
        spans.push(Span::styled(" reloading... ", theme.text_muted()));
    }
    if !state.bridge_open {
        spans.push(Span::styled(" [bridge closed] ", theme.text_error()));
    }
    if let Some(t) = &state.toast {
        let color = theme.toast_color(t.level);
        let tag = match t.level {
            ToastLevel::Success => "[OK]",
            ToastLevel::Error => "[ERROR]",
            ToastLevel::Info => "[INFO]",
        };
        spans.push(Span::styled(
            format!(" {tag} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(t.text.clone(), Style::default().fg(color)));
    } else {
        let help = match state.focus {
            Pane::Tree => HELP_TREE,
            Pane::Detail => HELP_DETAIL,
        };
        spans.push(Span::styled(format!(" {help}"), theme.text_muted()));
    }
    let p = Paragraph::new(Line::from(spans)).style(theme.base_style());
    f.render_widget(p, area);
}
