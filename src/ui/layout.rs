use ratatui::layout::{Constraint, Rect};
use ratatui_macros::vertical;

#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub title_bar: Rect,
    pub main_content: Rect,
    pub status_bar: Rect,
    /// Centered popup area over `main_content` used by the composer.
    pub composer: Rect,
}

impl Layout {
    pub fn new(area: Rect) -> Self {
        let [title_bar, main_content, status_bar] = vertical![==1, *=1, ==1].areas(area);
        let height = main_content.height.min(14);
        let composer =
            main_content.centered(Constraint::Percentage(70), Constraint::Length(height));
        Self {
            title_bar,
            main_content,
            status_bar,
            composer,
        }
    }
}
