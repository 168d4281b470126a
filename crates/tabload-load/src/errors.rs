use tabload_codec::CodecError;
use thiserror::Error;

/// Errors emitted while loading, exporting or realigning tables.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Core(#[from] tabload_core::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl From<sqlx::Error> for LoadError {
    fn from(value: sqlx::Error) -> Self {
        LoadError::Execution(value.to_string())
    }
}

impl LoadError {
    /// True when the row source can no longer be read.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoadError::Codec(err) if err.is_fatal())
    }
}
