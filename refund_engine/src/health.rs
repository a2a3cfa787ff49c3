//! The composed health check the engine exposes to its driver.
use log::*;
use thiserror::Error;

use crate::{
    db::traits::RefundStore,
    db_types::RefundStats,
    oracle::{OracleError, StatusOracle},
};

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("database health check failed: {0}")]
    Store(String),
    #[error("status service health check failed: {0}")]
    Oracle(#[from] OracleError),
}

/// Succeeds only if the store answers a stats query and the oracle reports healthy. Returns the stats on success.
pub async fn health_check<S, O>(store: &S, oracle: &O) -> Result<RefundStats, HealthError>
where
    S: RefundStore,
    O: StatusOracle,
{
    let stats = store.stats().await.map_err(|e| HealthError::Store(e.to_string()))?;
    oracle.health_check().await?;
    debug!("🗃️ Health check passed. {stats}");
    Ok(stats)
}
