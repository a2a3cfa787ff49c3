use std::future::Future;

use crate::db_types::{FileId, NewRefund, Refund, RefundStats};

/// Errors raised by a [`RefundStore`] backend must be able to say whether a failed insert was caused by the unique
/// constraint on `file_id`. Ingestion treats that case as "already ingested" rather than as a failure.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
    fn is_duplicate(&self) -> bool;

    /// True if the operation targeted a refund that does not exist.
    fn is_not_found(&self) -> bool {
        false
    }
}

/// Persistence and query operations over refund records.
///
/// Every method is a single-row or single-query operation; no transaction spans multiple refunds. Implementations must
/// be safe to share between concurrently running workers. Cloning a store must be cheap (a pool handle, typically),
/// since every worker holds its own clone.
pub trait RefundStore: Clone + Send + Sync + 'static {
    type Error: StoreError;

    /// The URL of the backing store
    fn url(&self) -> &str;

    /// Returns up to `limit` pending refunds, in ascending `id` order.
    fn fetch_pending(&self, limit: i64) -> impl Future<Output = Result<Vec<Refund>, Self::Error>> + Send {
        self.fetch_pending_after(None, limit)
    }

    /// Returns up to `limit` pending refunds whose `id` is strictly greater than `after_id`, in ascending `id` order.
    /// This lets a caller walk the pending set with a cursor so that refunds that remain pending are not selected a
    /// second time.
    fn fetch_pending_after(
        &self,
        after_id: Option<i64>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Refund>, Self::Error>> + Send;

    /// Stores a new refund with `pending` status. Fails with a duplicate error (see [`StoreError::is_duplicate`]) if a
    /// refund with the same `file_id` already exists.
    fn create_refund(&self, refund: NewRefund) -> impl Future<Output = Result<Refund, Self::Error>> + Send;

    /// Fetches the refund with the given `file_id`. If no such refund exists, `None` is returned.
    fn fetch_refund_by_file_id(
        &self,
        file_id: &FileId,
    ) -> impl Future<Output = Result<Option<Refund>, Self::Error>> + Send;

    /// Persists the status, error message and processed timestamp of an existing refund, identified by its `id`.
    ///
    /// `updated_at` is always set to the current time. `processed_at` is kept if it was already set, set to now if the
    /// new status is `processed` and it was not set, and cleared for any other status.
    ///
    /// Returns the refund as stored.
    fn update_refund_status(&self, refund: &Refund) -> impl Future<Output = Result<Refund, Self::Error>> + Send;

    /// Counts refunds by status.
    fn stats(&self) -> impl Future<Output = Result<RefundStats, Self::Error>> + Send;

    /// Closes the store.
    fn close(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async { Ok(()) }
    }
}
