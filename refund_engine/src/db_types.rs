use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     RefundStatus     ---------------------------------------------------------
/// The persisted state of a refund row.
///
/// `Pending` is the only status the batch processor ever selects. `Processed` and `Error` are terminal.
/// An "in progress" answer from the status oracle is never stored; the row simply stays `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    /// Waiting for a status check against the external authority.
    Pending,
    /// The authority has processed the refund.
    Processed,
    /// The refund failed validation, the status lookup failed, or the authority reported an error.
    Error,
}

impl RefundStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            RefundStatus::Pending => false,
            RefundStatus::Processed | RefundStatus::Error => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "pending",
            RefundStatus::Processed => "processed",
            RefundStatus::Error => "error",
        }
    }
}

impl Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid refund status: {0}")]
pub struct ConversionError(String);

impl FromStr for RefundStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processed" => Ok(Self::Processed),
            "error" => Ok(Self::Error),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        FileId         ---------------------------------------------------------
/// The business identifier of a refund. It is the idempotency key for ingestion and the lookup key for the status
/// oracle. No format is enforced here; the oracle decides whether an identifier is well-formed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct FileId(pub String);

impl FileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for FileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------        Refund         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Refund {
    pub id: i64,
    pub file_id: FileId,
    pub status: RefundStatus,
    pub error_message: Option<String>,
    pub user_id: Option<String>,
    pub year: Option<i64>,
    pub refund_amount: Option<String>,
    pub eta: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Refund {
    /// Moves the refund to `Processed`. The processed timestamp is only set if it has never been set before.
    pub fn mark_processed(&mut self, processed_at: DateTime<Utc>) {
        self.status = RefundStatus::Processed;
        self.error_message = None;
        self.processed_at = self.processed_at.or(Some(processed_at));
    }

    /// Moves the refund to `Error` with the given reason.
    pub fn mark_error<S: Into<String>>(&mut self, message: S) {
        self.status = RefundStatus::Error;
        self.error_message = Some(message.into());
        self.processed_at = None;
    }
}

//--------------------------------------       NewRefund       ---------------------------------------------------------
/// A refund that has not been stored yet. New refunds always enter the store as `Pending`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRefund {
    pub file_id: FileId,
    pub user_id: Option<String>,
    pub year: Option<i64>,
    pub refund_amount: Option<String>,
    pub eta: Option<String>,
}

impl NewRefund {
    pub fn new<F: Into<FileId>>(file_id: F) -> Self {
        Self { file_id: file_id.into(), ..Default::default() }
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_refund_amount<S: Into<String>>(mut self, amount: S) -> Self {
        self.refund_amount = Some(amount.into());
        self
    }

    pub fn with_eta<S: Into<String>>(mut self, eta: S) -> Self {
        self.eta = Some(eta.into());
        self
    }
}

//--------------------------------------      RefundStats      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RefundStats {
    pub total: i64,
    pub pending: i64,
    pub processed: i64,
    pub error: i64,
}

impl Display for RefundStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total: {}, pending: {}, processed: {}, error: {}",
            self.total, self.pending, self.processed, self.error
        )
    }
}
