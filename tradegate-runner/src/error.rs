//! Runner error type: core failures plus I/O and format errors.

use thiserror::Error;
use tradegate_core::CoreError;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Input parsed but holds values the desk cannot use.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
