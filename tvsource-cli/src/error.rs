use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Resolver error: {0}")]
    Resolve(#[from] tv_source::ResolveError),

    #[error("Semaphore acquire error: {0}")]
    Semaphore(#[from] tokio::sync::AcquireError),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Could not resolve {0}")]
    ResolutionFailed(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),
}

impl CliError {
    pub fn missing(setting: &'static str) -> Self {
        Self::MissingSetting(setting)
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
