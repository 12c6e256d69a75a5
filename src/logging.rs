use std::path::PathBuf;

use directories::ProjectDirs;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::{app::cli::LogLevel, errors::AppError};

pub const LOG_FILE: &str = "sikiya.log";
pub const DATA_DIR_ENV: &str = "SIKIYA_DATA";

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "sikiya")
}

pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    project_dirs()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn init(level: LogLevel) -> Result<(), AppError> {
    let dir = get_data_dir();
    std::fs::create_dir_all(&dir)?;
    let log_file = std::fs::File::create(dir.join(LOG_FILE))?;
    let directive: Directive = level.try_into()?;
    let file_subscriber = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_target(true)
        .with_ansi(false);
    tracing_subscriber::registry()
        .with(EnvFilter::default().add_directive(directive))
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(())
}
