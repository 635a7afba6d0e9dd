pub mod chrome;
pub mod filter_box;
pub mod json_viewer;
pub mod status_bar;
pub mod tree_view;

use crate::theme::Theme;
use crossterm::event::KeyCode;
use ratatui::prelude::*;

pub trait Widget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, theme: &Theme);
    /// Returns true when the key was consumed.
    fn on_key(&mut self, key: KeyCode) -> bool {
        let _ = key;
        false
    }
}
