use rat_widget::focus::HasFocus;
use ratatui::style::Style;

use crate::ui::theme::Theme;

pub fn get_border_style(state: &impl HasFocus, theme: &Theme) -> Style {
    if state.is_focused() {
        theme.focused_border()
    } else {
        Style::default()
    }
}
