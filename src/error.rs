use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A backend service could not be reached or answered with an error status.
    #[error("{service} data unavailable: {detail}")]
    Unavailable {
        service: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Settings(#[from] ::config::ConfigError),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl AppError {
    pub fn unavailable(service: &'static str, detail: impl std::fmt::Display) -> Self {
        AppError::Unavailable {
            service,
            detail: detail.to_string(),
        }
    }
}
