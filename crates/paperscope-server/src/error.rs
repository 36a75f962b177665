use paperscope_core::PaperscopeError;
use thiserror::Error;

/// Failures surfaced to the sender of a message as `{success: false, error}`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Untrusted frontend origin")]
    UntrustedOrigin,

    #[error("Invalid manuallyRead date format")]
    InvalidDate,

    #[error("No active session")]
    NoActiveSession,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Core(#[from] PaperscopeError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
