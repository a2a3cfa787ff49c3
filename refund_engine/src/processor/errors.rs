use thiserror::Error;

use crate::db_types::FileId;

/// A failure while resolving a single refund that leaves the refund untouched.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("Could not persist the new status of refund {file_id}. {reason}")]
    Store { file_id: FileId, reason: String },
    #[error("A worker stopped before finishing its refunds. {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Could not fetch pending refunds. {0}")]
    Fetch(String),
    #[error("encountered {failures} errors during processing ({attempted} refunds attempted)")]
    BatchFailed { failures: usize, attempted: usize, errors: Vec<ResolutionError> },
    #[error("Processing was cancelled")]
    Cancelled,
    #[error("Invalid processor configuration. {0}")]
    InvalidConfig(String),
    #[error("Could not read refund statistics. {0}")]
    Stats(String),
}
