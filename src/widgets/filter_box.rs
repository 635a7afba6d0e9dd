use crossterm::event::KeyCode;
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use tui_textarea::TextArea;

use crate::theme::Theme;
use crate::widgets::chrome::panel_block;

/// Single-line editor for the component filter. Enter/Esc are left to the
/// caller, which decides whether to commit or discard.
pub struct FilterBox {
    textarea: TextArea<'static>,
}

impl FilterBox {
    pub fn new(initial: &str) -> Self {
        let mut textarea = TextArea::new(vec![initial.to_string()]);
        textarea.move_cursor(tui_textarea::CursorMove::End);
        Self { textarea }
    }

    pub fn text(&self) -> String {
        self.textarea.lines().concat()
    }
}

// crossterm 0.27 key codes are not the ones tui-textarea understands.
fn to_textarea_key(key: KeyCode) -> Option<rt_event::KeyCode> {
    Some(match key {
        KeyCode::Char(c) => rt_event::KeyCode::Char(c),
        KeyCode::Backspace => rt_event::KeyCode::Backspace,
        KeyCode::Delete => rt_event::KeyCode::Delete,
        KeyCode::Left => rt_event::KeyCode::Left,
        KeyCode::Right => rt_event::KeyCode::Right,
        KeyCode::Home => rt_event::KeyCode::Home,
        KeyCode::End => rt_event::KeyCode::End,
        _ => return None,
    })
}

impl crate::widgets::Widget for FilterBox {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, theme: &Theme) {
        self.textarea
            .set_block(panel_block("Filter (Enter apply, Esc cancel)", focused, theme));
        self.textarea.set_cursor_line_style(Style::default());
        f.render_widget(ratatui::widgets::Clear, area);
        f.render_widget(&self.textarea, area);
    }

    fn on_key(&mut self, key: KeyCode) -> bool {
        match to_textarea_key(key) {
            Some(code) => {
                self.textarea
                    .input(rt_event::KeyEvent::new(code, rt_event::KeyModifiers::NONE));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Widget;

    #[test]
    fn typing_edits_the_initial_text() {
        let mut fb = FilterBox::new("Todo");
        assert_eq!(fb.text(), "Todo");
        fb.on_key(KeyCode::Char('s'));
        assert_eq!(fb.text(), "Todos");
        fb.on_key(KeyCode::Backspace);
        fb.on_key(KeyCode::Backspace);
        assert_eq!(fb.text(), "Tod");
    }

    #[test]
    fn enter_is_not_consumed() {
        let mut fb = FilterBox::new("");
        assert!(!fb.on_key(KeyCode::Enter));
        assert_eq!(fb.text(), "");
    }
}
