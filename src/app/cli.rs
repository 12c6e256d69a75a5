use std::{fmt::Display, path::PathBuf, str::FromStr};

use clap::Parser;
use tracing_subscriber::filter::{self, Directive};

use crate::feedback::ContentRef;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub args: Args,
}

#[derive(clap::Args, Clone, Debug)]
pub struct Args {
    /// Article whose comment thread to open
    #[clap(
        long,
        conflicts_with = "video",
        required_unless_present_any = ["video", "print_log_dir", "set_token"]
    )]
    pub article: Option<String>,
    /// Video whose comment thread to open
    #[clap(long, required_unless_present_any = ["article", "print_log_dir", "set_token"])]
    pub video: Option<String>,
    /// Path to config file
    #[clap(long, short)]
    pub config: Option<PathBuf>,
    /// Base URL of the Sikiya API
    #[clap(long, env = "SIKIYA_API_URL")]
    pub api_url: Option<String>,
    #[clap(long, short, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    #[clap(long, short)]
    pub print_log_dir: bool,
    /// Store an API token in the system keyring and exit
    #[clap(long)]
    pub set_token: Option<String>,
}

impl Args {
    pub fn content(&self) -> Option<ContentRef> {
        match (&self.article, &self.video) {
            (Some(id), _) => Some(ContentRef::Article(id.clone())),
            (None, Some(id)) => Some(ContentRef::Video(id.clone())),
            (None, None) => None,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    None,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::None => "none",
        };
        write!(f, "{s}")
    }
}

impl TryFrom<LogLevel> for Directive {
    type Error = filter::ParseError;
    fn try_from(value: LogLevel) -> Result<Self, Self::Error> {
        match value {
            LogLevel::None => Directive::from_str("off"),
            level => Directive::from_str(&level.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_and_video_are_exclusive() {
        let parsed = Cli::try_parse_from(["sikiya", "--article", "a1", "--video", "v1"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn one_content_flag_is_required() {
        assert!(Cli::try_parse_from(["sikiya"]).is_err());
        let cli = Cli::try_parse_from(["sikiya", "--print-log-dir"]).unwrap();
        assert!(cli.args.content().is_none());
    }

    #[test]
    fn video_flag_selects_video_thread() {
        let cli = Cli::try_parse_from(["sikiya", "--video", "v9", "-l", "debug"]).unwrap();
        assert_eq!(cli.args.content(), Some(ContentRef::Video("v9".into())));
        assert_eq!(cli.args.log_level, LogLevel::Debug);
    }

    #[test]
    fn none_level_turns_logging_off() {
        let directive: Directive = LogLevel::None.try_into().unwrap();
        assert_eq!(directive.to_string(), "off");
    }
}
