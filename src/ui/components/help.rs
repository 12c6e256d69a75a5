use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BlockExt, Clear, Widget},
};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpElementKind {
    Keybind(&'static str, &'static str),
    Text(&'static str),
}

#[macro_export]
macro_rules! help_keybind {
    ($key:expr, $description:expr) => {
        $crate::ui::components::help::HelpElementKind::Keybind($key, $description)
    };
}

#[macro_export]
macro_rules! help_text {
    ($text:expr) => {
        $crate::ui::components::help::HelpElementKind::Text($text)
    };
}

/// Keys go flush left, descriptions flush right.
pub fn help_elements_to_text(
    elements: &[HelpElementKind],
    width: u16,
    key_style: Style,
) -> Text<'static> {
    let mut lines = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            HelpElementKind::Keybind(key, description) => {
                let used = (key.chars().count() + description.chars().count()) as u16;
                let padding = width.saturating_sub(used).max(1);
                lines.push(Line::from(vec![
                    Span::styled(*key, key_style),
                    Span::raw(" ".repeat(padding as usize)),
                    Span::raw(*description),
                ]));
            }
            HelpElementKind::Text(text) => {
                let wrapped = textwrap::wrap(text, width.max(1) as usize);
                lines.extend(
                    wrapped
                        .into_iter()
                        .map(|line| Line::from(line.into_owned()).centered()),
                );
            }
        }
    }
    Text::from(lines)
}

/// Help popup centered on its parent area. A non-zero constraint sizes it as
/// a percentage of the parent width.
pub struct HelpComponent<'a> {
    constraint: u16,
    content: &'a [HelpElementKind],
    block: Option<Block<'a>>,
    key_style: Style,
}

impl<'a> HelpComponent<'a> {
    pub fn new(content: &'a [HelpElementKind]) -> Self {
        Self {
            content,
            constraint: 0,
            block: None,
            key_style: Style::new().add_modifier(Modifier::BOLD),
        }
    }

    pub fn set_constraint(self, constraint: u16) -> Self {
        Self { constraint, ..self }
    }

    pub fn block(self, block: Block<'a>) -> Self {
        Self {
            block: Some(block),
            ..self
        }
    }

    pub fn key_style(self, key_style: Style) -> Self {
        Self { key_style, ..self }
    }
}

impl Widget for HelpComponent<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        trace!(elements = self.content.len(), "rendering help");
        let popup_width = if self.constraint != 0 {
            area.width * self.constraint.min(100) / 100
        } else {
            area.width
        };
        // measure against the inner width, then size the popup to the text
        let text_width = popup_width.saturating_sub(if self.block.is_some() { 4 } else { 0 });
        let text = help_elements_to_text(self.content, text_width, self.key_style);
        let frame = if self.block.is_some() { 2 } else { 0 };
        let height = (text.height() as u16 + frame).min(area.height);
        let popup = area.centered(Constraint::Length(popup_width), Constraint::Length(height));

        Clear.render(popup, buf);
        let inner = self.block.inner_if_some(popup);
        self.block.render(popup, buf);
        let inner = Rect {
            x: inner.x + 1,
            width: inner.width.saturating_sub(2),
            ..inner
        };
        text.render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[HelpElementKind] = &[
        crate::help_text!("Comments"),
        crate::help_keybind!("l", "like"),
    ];

    #[test]
    fn keybinds_fill_the_width() {
        let text = help_elements_to_text(SAMPLE, 20, Style::new());
        assert_eq!(text.height(), 2);
        let line: String = text.lines[1]
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(line.len(), 20);
        assert!(line.starts_with('l') && line.ends_with("like"));
    }

    #[test]
    fn overlong_keybind_keeps_one_space() {
        let text = help_elements_to_text(&[crate::help_keybind!("Ctrl+Enter", "send")], 4, Style::new());
        let line: String = text.lines[0]
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(line, "Ctrl+Enter send");
    }

    #[test]
    fn renders_inside_small_area() {
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        HelpComponent::new(SAMPLE)
            .set_constraint(50)
            .block(Block::bordered().title("Help"))
            .render(area, &mut buf);
        let rendered: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(rendered.contains("Help"));
        assert!(rendered.contains("like"));
    }
}
