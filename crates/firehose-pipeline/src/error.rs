use firehose_core::FirehoseError;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur within the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Ring sizes must be a non-zero power of two.
    #[error("Invalid queue capacity: {capacity} (must be a non-zero power of two)")]
    InvalidCapacity { capacity: usize },

    /// `start` was called while a search is still in progress.
    #[error("Rate controller is already running")]
    AlreadyRunning,

    /// `stop` was called with no search in progress.
    #[error("Rate controller is not running")]
    NotRunning,

    /// The warm-up trial could not be sustained. Fatal for the run.
    #[error("Warm-up failed at {rate} events/sec")]
    WarmupFailed { rate: u64 },

    /// The waiting connection went away before its result arrived.
    #[error("Connection {conn_id} disconnected")]
    Disconnected { conn_id: Uuid },

    /// The controller worker panicked and took the publisher with it.
    #[error("Rate controller worker lost")]
    WorkerLost,

    /// OS thread could not be spawned.
    #[error("Thread spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
}

impl From<PipelineError> for FirehoseError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::AlreadyRunning | PipelineError::NotRunning => {
                FirehoseError::Conflict(e.to_string())
            }
            PipelineError::InvalidCapacity { .. } => FirehoseError::Config(e.to_string()),
            PipelineError::Spawn(io) => FirehoseError::Io(io),
            other => FirehoseError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
