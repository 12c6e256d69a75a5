use std::{str::FromStr, time::Duration};

use ratatui::style::{Color, Modifier, Style};

use crate::{config::ThemeConfig, errors::AppError};

/// Colors shared by every component. Built once at startup and handed out as
/// `Arc<Theme>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub accent: Color,
    pub muted: Color,
    pub like: Color,
    pub dislike: Color,
    pub error: Color,
    pub border: Color,
    pub transition: Duration,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            muted: Color::DarkGray,
            like: Color::Green,
            dislike: Color::Red,
            error: Color::LightRed,
            border: Color::Blue,
            transition: Duration::from_millis(300),
        }
    }
}

fn parse_color(field: &str, value: &str) -> Result<Color, AppError> {
    Color::from_str(value.trim())
        .map_err(|_| AppError::Validation(format!("theme.{field}: unknown color {value:?}")))
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Result<Self, AppError> {
        Ok(Self {
            accent: parse_color("accent", &config.accent)?,
            muted: parse_color("muted", &config.muted)?,
            like: parse_color("like", &config.like)?,
            dislike: parse_color("dislike", &config.dislike)?,
            error: parse_color("error", &config.error)?,
            border: parse_color("border", &config.border)?,
            transition: Duration::from_millis(config.transition_ms),
        })
    }

    pub fn author(&self, is_self: bool) -> Style {
        if is_self {
            Style::new().fg(self.like).add_modifier(Modifier::BOLD)
        } else {
            Style::new().fg(self.accent)
        }
    }

    pub fn muted(&self) -> Style {
        Style::new().fg(self.muted)
    }

    pub fn error(&self) -> Style {
        Style::new().fg(self.error)
    }

    pub fn focused_border(&self) -> Style {
        Style::new().fg(self.border)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_default_theme() {
        let theme = Theme::from_config(&ThemeConfig::default()).unwrap();
        assert_eq!(theme, Theme::default());
    }

    #[test]
    fn hex_colors_are_accepted() {
        let config = ThemeConfig {
            accent: "#ff8800".into(),
            ..ThemeConfig::default()
        };
        let theme = Theme::from_config(&config).unwrap();
        assert_eq!(theme.accent, Color::Rgb(0xff, 0x88, 0x00));
    }

    #[test]
    fn unknown_color_names_the_field() {
        let config = ThemeConfig {
            dislike: "not-a-color".into(),
            ..ThemeConfig::default()
        };
        let err = Theme::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("theme.dislike"));
    }
}
