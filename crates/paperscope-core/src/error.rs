use thiserror::Error;

/// All errors that can occur in paperscope-core.
#[derive(Debug, Error)]
pub enum PaperscopeError {
    #[error("Store not configured")]
    NotConfigured,

    #[error("Paper not found: {0}")]
    PaperNotFound(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Object already exists: {0}")]
    ObjectExists(String),

    #[error("Invalid paper key: {0}")]
    InvalidKey(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, PaperscopeError>;
