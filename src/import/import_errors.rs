use thiserror::Error;

use crate::errors::DatabaseError;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("An import is already running")]
    AlreadyRunning,

    #[error("Aborted after {failures} consecutive failures: {last_error}")]
    TooManyFailures { failures: u32, last_error: String },

    #[error("Checkpoint write failed: {0}")]
    CheckpointWriteFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Source error: {0}")]
    SourceError(String),
}
