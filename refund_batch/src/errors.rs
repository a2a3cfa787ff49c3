use refund_engine::{ingest::QueueError, HealthError, ProcessorError, SqliteDatabaseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Could not initialize the batch service. {0}")]
    InitializeError(String),
    #[error("Invalid batch configuration. {0}")]
    ConfigurationError(String),
    #[error("Startup checks failed. {0}")]
    Startup(#[from] HealthError),
    #[error("Failed to process refunds. {0}")]
    Processing(#[from] ProcessorError),
}

impl From<SqliteDatabaseError> for BatchError {
    fn from(e: SqliteDatabaseError) -> Self {
        Self::InitializeError(e.to_string())
    }
}

impl From<QueueError> for BatchError {
    fn from(e: QueueError) -> Self {
        Self::InitializeError(format!("Could not open the message queue. {e}"))
    }
}
