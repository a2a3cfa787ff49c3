use thiserror::Error;

use crate::{db::traits::StoreError, db_types::FileId};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("A refund with file id {0} already exists")]
    DuplicateFileId(FileId),
    #[error("Refund not found: {0}")]
    RefundNotFound(i64),
}

impl StoreError for SqliteDatabaseError {
    fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateFileId(_))
    }

    fn is_not_found(&self) -> bool {
        matches!(self, Self::RefundNotFound(_))
    }
}
