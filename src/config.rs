use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{app::cli::Args, errors::AppError, logging};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub composer: ComposerConfig,
    pub links: LinksConfig,
    pub theme: ThemeConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Main comments requested per page.
    pub page_size: u32,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ComposerConfig {
    pub word_limit: usize,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LinksConfig {
    pub upgrade_url: String,
}

/// Colors accept anything ratatui's `Color::from_str` does: names, `#rrggbb`
/// or an indexed number.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    pub accent: String,
    pub muted: String,
    pub like: String,
    pub dislike: String,
    pub error: String,
    pub border: String,
    pub transition_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 15,
            page_size: 10,
        }
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self { word_limit: 120 }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            upgrade_url: "sikiya://membership".to_string(),
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            accent: "cyan".to_string(),
            muted: "darkgray".to_string(),
            like: "green".to_string(),
            dislike: "red".to_string(),
            error: "lightred".to_string(),
            border: "blue".to_string(),
            transition_ms: 300,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, AppError> {
        let config_path = args.config.clone().unwrap_or_else(Self::default_path);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        if let Some(url) = args.api_url.as_ref().filter(|u| !u.trim().is_empty()) {
            config.api.base_url = url.trim().to_string();
        }
        if config.api.page_size == 0 {
            config.api.page_size = ApiConfig::default().page_size;
        }
        if config.composer.word_limit == 0 {
            return Err(AppError::Validation(
                "composer.word_limit must be at least 1".to_string(),
            ));
        }
        config.api.base_url = config.api.base_url.trim_end_matches('/').to_string();

        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        logging::project_dirs()
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }
}
