use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::SqlitePool;

use super::{db_url, new_pool, refunds, SqliteDatabaseError};
use crate::{
    db::traits::RefundStore,
    db_types::{FileId, NewRefund, Refund, RefundStats},
};

const DEFAULT_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl RefundStore for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_pending_after(&self, after_id: Option<i64>, limit: i64) -> Result<Vec<Refund>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        refunds::fetch_pending(after_id.unwrap_or(0), limit, &mut conn).await
    }

    async fn create_refund(&self, refund: NewRefund) -> Result<Refund, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let refund = refunds::insert_refund(refund, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Refund {} has been saved in the DB with id {}", refund.file_id, refund.id);
        Ok(refund)
    }

    async fn fetch_refund_by_file_id(&self, file_id: &FileId) -> Result<Option<Refund>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        refunds::fetch_refund_by_file_id(file_id, &mut conn).await
    }

    async fn update_refund_status(&self, refund: &Refund) -> Result<Refund, Self::Error> {
        let mut tx = self.pool.begin().await?;
        trace!("🗃️ Refund {} [{}] updating status to {}", refund.file_id, refund.id, refund.status);
        let updated = refunds::update_status(refund, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn stats(&self) -> Result<RefundStats, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        refunds::refund_stats(&mut conn).await
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `RFB_DATABASE_URL`, or the default.
    pub async fn new() -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Running this on an up-to-date database is a no-op.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
