use thiserror::Error;

#[derive(Debug, Error)]
pub enum FirehoseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FirehoseError {
    /// Short error code string sent to clients in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            FirehoseError::Config(_) => "CONFIG_ERROR",
            FirehoseError::InvalidRequest(_) => "INVALID_REQUEST",
            FirehoseError::Conflict(_) => "CONFLICT",
            FirehoseError::Serialization(_) => "SERIALIZATION_ERROR",
            FirehoseError::Io(_) => "IO_ERROR",
            FirehoseError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, FirehoseError>;
