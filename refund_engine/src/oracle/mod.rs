//! # Status oracle
//!
//! The status oracle is the abstraction over the external authority that knows the authoritative disposition of a
//! refund. The batch processor only relies on the three-outcome contract of [`StatusOracle::get_status`]:
//! the refund is processed, it is still in progress, or the authority reports an error.
//!
//! [`SimulatedOracle`] is the shipped stand-in. It answers with randomised outcomes after a randomised delay, and
//! takes its randomness from an injected [`RandomSource`] so that tests can script the outcomes. A production
//! implementation replaces it with a real network client, including its own timeout and retry policy.
mod catalogue;
mod random;
mod simulated;

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use catalogue::{CatalogueError, ErrorCatalogue};
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use simulated::SimulatedOracle;

use crate::db_types::FileId;

/// What the authority reports about a refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Processed { processed_at: DateTime<Utc> },
    InProgress,
    Error { message: Option<String> },
}

impl Disposition {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Disposition::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("file ID cannot be empty")]
    Empty,
    #[error("invalid UUID format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("Status lookup failed: {0}")]
    LookupFailed(String),
    #[error("Status oracle is unavailable: {0}")]
    Unavailable(String),
}

/// Checks that `file_id` is a well-formed UUID, e.g. `550e8400-e29b-41d4-a716-446655440000`.
pub fn validate_uuid(file_id: &FileId) -> Result<(), ValidationError> {
    if file_id.is_empty() {
        return Err(ValidationError::Empty);
    }
    uuid::Uuid::parse_str(file_id.as_str()).map(|_| ()).map_err(|e| ValidationError::InvalidFormat(e.to_string()))
}

pub trait StatusOracle: Send + Sync + 'static {
    /// Fails if `file_id` is not an identifier the authority could possibly know about. No remote call is made.
    fn validate_identifier(&self, file_id: &FileId) -> Result<(), ValidationError> {
        validate_uuid(file_id)
    }

    /// Asks the authority for the current disposition of the refund.
    ///
    /// This call may take a long time, and it is not interrupted once started.
    fn get_status(&self, file_id: &FileId) -> impl Future<Output = Result<Disposition, OracleError>> + Send;

    /// A cheap liveness check, independent of `get_status`.
    fn health_check(&self) -> impl Future<Output = Result<(), OracleError>> + Send;
}
