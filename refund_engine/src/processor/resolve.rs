use log::*;

use super::ResolutionError;
use crate::{
    db::traits::RefundStore,
    db_types::{FileId, Refund},
    oracle::{Disposition, StatusOracle},
};

/// The result of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The refund is now `processed`. Carries the persisted row.
    Processed(Refund),
    /// The refund is now `error`. Carries the persisted row, including the reason.
    Failed(Refund),
    /// The authority is still working on it. Nothing was written.
    InProgress(FileId),
}

impl Resolution {
    pub fn resolved(&self) -> Option<&Refund> {
        match self {
            Resolution::Processed(r) | Resolution::Failed(r) => Some(r),
            Resolution::InProgress(_) => None,
        }
    }
}

/// Resolves one pending refund against the oracle and persists any terminal outcome.
///
/// Validation and lookup failures are terminal for the refund and are recorded as `error`. Only a failed store write
/// is reported as an `Err`, in which case the refund keeps whatever state it had before.
pub async fn resolve_refund<S, O>(store: &S, oracle: &O, mut refund: Refund) -> Result<Resolution, ResolutionError>
where
    S: RefundStore,
    O: StatusOracle,
{
    if let Err(e) = oracle.validate_identifier(&refund.file_id) {
        warn!("⚙️ Refund {} [{}] has an invalid file id. {e}", refund.file_id, refund.id);
        refund.mark_error(format!("Invalid file ID: {e}"));
        return persist(store, refund).await.map(Resolution::Failed);
    }
    match oracle.get_status(&refund.file_id).await {
        Ok(Disposition::Processed { processed_at }) => {
            refund.mark_processed(processed_at);
            persist(store, refund).await.map(Resolution::Processed)
        },
        Ok(Disposition::Error { message }) => {
            refund.mark_error(message.unwrap_or_else(|| "Unknown error occurred".into()));
            persist(store, refund).await.map(Resolution::Failed)
        },
        Ok(Disposition::InProgress) => {
            debug!("⚙️ Refund {} [{}] is still in progress", refund.file_id, refund.id);
            Ok(Resolution::InProgress(refund.file_id))
        },
        Err(e) => {
            warn!("⚙️ Status lookup for refund {} [{}] failed. {e}", refund.file_id, refund.id);
            refund.mark_error(format!("Status service error: {e}"));
            persist(store, refund).await.map(Resolution::Failed)
        },
    }
}

async fn persist<S: RefundStore>(store: &S, refund: Refund) -> Result<Refund, ResolutionError> {
    match store.update_refund_status(&refund).await {
        Ok(updated) => {
            info!("⚙️ Refund {} [{}] resolved as {}", updated.file_id, updated.id, updated.status);
            Ok(updated)
        },
        Err(e) => {
            error!("⚙️ Failed to update refund {} [{}]. {e}", refund.file_id, refund.id);
            Err(ResolutionError::Store { file_id: refund.file_id, reason: e.to_string() })
        },
    }
}
