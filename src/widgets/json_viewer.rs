use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;

use crate::theme::Theme;
use crate::widgets::chrome::panel_block;

/// Scrollable pretty-printed view of the selected component's state.
pub struct JsonViewerWidget {
    pub title: String,
    pub placeholder: Option<String>,
    pub text: String,
    pub scroll_y: u16,
    pub wrap: bool,
    last_viewport_h: u16,
}

impl JsonViewerWidget {
    pub fn with_placeholder(title: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            placeholder: Some(placeholder.into()),
            text: String::new(),
            scroll_y: 0,
            wrap: false,
            last_viewport_h: 0,
        }
    }

    pub fn show_value(&mut self, title: impl Into<String>, value: &JsonValue) {
        self.title = title.into();
        self.placeholder = None;
        self.text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        self.scroll_y = 0;
    }

    pub fn show_placeholder(&mut self, title: impl Into<String>, text: impl Into<String>) {
        self.title = title.into();
        self.placeholder = Some(text.into());
        self.text.clear();
        self.scroll_y = 0;
    }

    fn total_lines(&self) -> u16 {
        match &self.placeholder {
            Some(_) => 1,
            None => self.text.lines().count() as u16,
        }
    }
}

impl crate::widgets::Widget for JsonViewerWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        let lines: Vec<Line> = match &self.placeholder {
            Some(p) => vec![Line::from(p.clone()).style(theme.text_muted())],
            None => self.text.lines().map(|l| Line::from(l.to_string())).collect(),
        };
        self.last_viewport_h = area.height.saturating_sub(2);
        let max_scroll = self.total_lines().saturating_sub(self.last_viewport_h);
        if self.scroll_y > max_scroll {
            self.scroll_y = max_scroll;
        }
        let block = panel_block(&self.title, focused, theme);
        let mut p = Paragraph::new(lines)
            .block(block)
            .style(theme.base_style())
            .scroll((self.scroll_y, 0));
        if self.wrap {
            p = p.wrap(Wrap { trim: false });
        }
        f.render_widget(p, area);
    }

    fn on_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Up => self.scroll_y = self.scroll_y.saturating_sub(1),
            KeyCode::Down => self.scroll_y = self.scroll_y.saturating_add(1),
            KeyCode::PageUp => self.scroll_y = self.scroll_y.saturating_sub(self.last_viewport_h),
            KeyCode::PageDown => {
                self.scroll_y = self.scroll_y.saturating_add(self.last_viewport_h)
            }
            KeyCode::Home => self.scroll_y = 0,
            KeyCode::End => {
                self.scroll_y = self.total_lines().saturating_sub(self.last_viewport_h);
            }
            KeyCode::Char('w') | KeyCode::Char('W') => self.wrap = !self.wrap,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Widget;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use serde_json::json;

    fn draw(w: &mut JsonViewerWidget, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::default();
        terminal
            .draw(|f| {
                let area = f.area();
                w.render(f, area, true, &theme);
            })
            .unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn shows_pretty_printed_state() {
        let mut w = JsonViewerWidget::with_placeholder("Detail", "nothing selected");
        w.show_value("TodoList", &json!({"state": {"count": 3}}));
        let screen = draw(&mut w, 40, 10);
        assert!(screen.contains("TodoList"));
        assert!(screen.contains("\"count\": 3"));
    }

    #[test]
    fn end_jumps_to_bottom_and_w_toggles_wrap() {
        let mut w = JsonViewerWidget::with_placeholder("Detail", "");
        let items: Vec<u32> = (0..30).collect();
        w.show_value("List", &json!(items));
        draw(&mut w, 40, 12);
        assert!(w.on_key(KeyCode::End));
        // 30 items plus the brackets
        assert_eq!(w.scroll_y, 32u16.saturating_sub(10));
        assert!(!w.wrap);
        w.on_key(KeyCode::Char('w'));
        assert!(w.wrap);
        assert!(!w.on_key(KeyCode::Char('x')));
    }

    #[test]
    fn new_content_resets_scroll() {
        let mut w = JsonViewerWidget::with_placeholder("Detail", "");
        w.scroll_y = 5;
        w.show_placeholder("Detail", "loading");
        assert_eq!(w.scroll_y, 0);
        assert_eq!(w.placeholder.as_deref(), Some("loading"));
    }
}
