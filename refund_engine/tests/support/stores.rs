use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use refund_engine::{
    db_types::{FileId, NewRefund, Refund, RefundStats},
    RefundStore,
    SqliteDatabase,
    SqliteDatabaseError,
    StoreError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestStoreError {
    #[error(transparent)]
    Inner(#[from] SqliteDatabaseError),
    #[error("Injected failure: {0}")]
    Injected(String),
}

impl StoreError for TestStoreError {
    fn is_duplicate(&self) -> bool {
        match self {
            TestStoreError::Inner(e) => e.is_duplicate(),
            TestStoreError::Injected(_) => false,
        }
    }

    fn is_not_found(&self) -> bool {
        match self {
            TestStoreError::Inner(e) => e.is_not_found(),
            TestStoreError::Injected(_) => false,
        }
    }
}

/// Wraps a real database, counts pending fetches, and fails selected operations on demand.
#[derive(Clone)]
pub struct InstrumentedStore {
    inner: SqliteDatabase,
    fetches: Arc<AtomicUsize>,
    fail_updates_for: Arc<HashSet<FileId>>,
    fail_lookups: Arc<AtomicBool>,
}

impl InstrumentedStore {
    pub fn new(inner: SqliteDatabase) -> Self {
        Self {
            inner,
            fetches: Arc::new(AtomicUsize::new(0)),
            fail_updates_for: Arc::new(HashSet::new()),
            fail_lookups: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing_updates_for(mut self, ids: &[String]) -> Self {
        self.fail_updates_for = Arc::new(ids.iter().map(|s| FileId::from(s.as_str())).collect());
        self
    }

    pub fn set_failing_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &SqliteDatabase {
        &self.inner
    }
}

impl RefundStore for InstrumentedStore {
    type Error = TestStoreError;

    fn url(&self) -> &str {
        self.inner.url()
    }

    async fn fetch_pending_after(&self, after_id: Option<i64>, limit: i64) -> Result<Vec<Refund>, Self::Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.fetch_pending_after(after_id, limit).await?)
    }

    async fn create_refund(&self, refund: NewRefund) -> Result<Refund, Self::Error> {
        Ok(self.inner.create_refund(refund).await?)
    }

    async fn fetch_refund_by_file_id(&self, file_id: &FileId) -> Result<Option<Refund>, Self::Error> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(TestStoreError::Injected("database is locked".into()));
        }
        Ok(self.inner.fetch_refund_by_file_id(file_id).await?)
    }

    async fn update_refund_status(&self, refund: &Refund) -> Result<Refund, Self::Error> {
        if self.fail_updates_for.contains(&refund.file_id) {
            return Err(TestStoreError::Injected(format!("update of {} rejected", refund.file_id)));
        }
        Ok(self.inner.update_refund_status(refund).await?)
    }

    async fn stats(&self) -> Result<RefundStats, Self::Error> {
        Ok(self.inner.stats().await?)
    }
}
