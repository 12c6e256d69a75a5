use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Network(#[from] reqwest::Error),
    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Keyring(#[from] keyring::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Inquire(#[from] inquire::error::InquireError),
    #[error("error sending message on channel")]
    TokioMpsc,
    #[error(transparent)]
    InitLoggingError(#[from] tracing_subscriber::util::TryInitError),
    #[error(transparent)]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error(transparent)]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for AppError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        AppError::TokioMpsc
    }
}

/// Coarse classification of a failed remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NetworkFailure,
    ServerError,
    ValidationFailure,
}

impl AppError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        AppError::Server {
            status,
            message: message.into(),
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            AppError::Server { status, .. } if (400..500).contains(status) => {
                FailureKind::ValidationFailure
            }
            AppError::Server { .. } | AppError::Json(_) => FailureKind::ServerError,
            AppError::Network(err) if err.is_decode() => FailureKind::ServerError,
            AppError::Network(err) => match err.status() {
                Some(status) if status.is_client_error() => FailureKind::ValidationFailure,
                Some(_) => FailureKind::ServerError,
                None => FailureKind::NetworkFailure,
            },
            AppError::Validation(_) => FailureKind::ValidationFailure,
            _ => FailureKind::NetworkFailure,
        }
    }

    /// Single line form used in status lines.
    pub fn status_message(&self) -> String {
        self.to_string().replace('\n', " ")
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
