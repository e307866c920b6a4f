//! Crate-wide error type.

use thiserror::Error;

pub type HavocResult<T> = Result<T, HavocError>;

#[derive(Debug, Error)]
pub enum HavocError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    #[error("replay error: {0}")]
    Replay(String),

    #[error("construct error: {0}")]
    Construct(String),
}
