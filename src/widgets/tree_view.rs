use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::ui::{AppState, Pane};
use crate::widgets::chrome::panel_block;

const SPINNER: [&str; 6] = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"];

/// First visible row so that `cursor` stays inside a window of `inner_h`
/// rows, moving the window as little as possible from `offset`.
pub(crate) fn scroll_offset(offset: usize, cursor: usize, total: usize, inner_h: u16) -> usize {
    if inner_h == 0 || total == 0 {
        return 0;
    }
    let ih = inner_h as usize;
    let cursor = cursor.min(total - 1);
    let max_start = total.saturating_sub(ih);
    let start = if cursor < offset {
        cursor
    } else if cursor >= offset + ih {
        cursor + 1 - ih
    } else {
        offset
    };
    start.min(max_start)
}

pub fn draw_tree(f: &mut Frame, area: Rect, state: &mut AppState) {
    let inner_h = area.height.saturating_sub(2);
    state.tree_offset = scroll_offset(state.tree_offset, state.cursor, state.rows.len(), inner_h);
    let start = state.tree_offset;
    let end = (start + inner_h as usize).min(state.rows.len());

    let theme = &state.theme;
    let selected = state.inspector.selection.selected_id();
    let pending = state.inspector.selection.pending_id();
    let spinner = SPINNER[state.tick as usize % SPINNER.len()];

    let items: Vec<ListItem> = state.rows[start..end]
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let indent = "  ".repeat(row.depth);
            let chevron = match (row.has_children, row.expanded) {
                (false, _) => " ",
                (true, true) => "▾",
                (true, false) => "▸",
            };
            let mut text = format!("{indent}{chevron} {}", row.label);
            if pending == Some(row.id.as_str()) {
                text.push_str(&format!(" {spinner}"));
            }
            let mut item = ListItem::new(text);
            if start + i == state.cursor {
                item = item.style(theme.list_cursor_style());
            } else if selected == Some(row.id.as_str()) {
                item = item.style(theme.selected_node_style());
            }
            item
        })
        .collect();

    let title = match state.config.title.as_deref() {
        Some(t) => format!("{t} ({} nodes)", state.inspector.tree.len()),
        None => format!("Components ({} nodes)", state.inspector.tree.len()),
    };
    let block = panel_block(&title, state.focus == Pane::Tree, theme);
    if state.inspector.tree.is_empty() {
        let p = Paragraph::new(Line::from("waiting for component tree...").style(theme.text_muted()))
            .block(block);
        f.render_widget(p, area);
        return;
    }
    f.render_widget(List::new(items).block(block).style(theme.base_style()), area);
}

#[cfg(test)]
mod tests {
    use super::scroll_offset;

    #[test]
    fn window_follows_the_cursor() {
        // 20 rows, 5 visible
        assert_eq!(scroll_offset(0, 0, 20, 5), 0);
        assert_eq!(scroll_offset(0, 4, 20, 5), 0);
        assert_eq!(scroll_offset(0, 5, 20, 5), 1);
        assert_eq!(scroll_offset(10, 12, 20, 5), 10);
        assert_eq!(scroll_offset(10, 3, 20, 5), 3);
    }

    #[test]
    fn window_clamps_when_rows_shrink() {
        assert_eq!(scroll_offset(15, 30, 8, 5), 3);
        assert_eq!(scroll_offset(4, 0, 0, 5), 0);
        assert_eq!(scroll_offset(4, 2, 10, 0), 0);
    }
}
