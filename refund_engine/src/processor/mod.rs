//! # Batch processor
//!
//! The batch processor drains pending refunds from the store and resolves each one against the status oracle.
//!
//! A *pass* walks the pending refunds in id order, `batch_size` at a time. Each batch is resolved by a pool of at
//! most `max_workers` tokio tasks that share one work channel. A worker resolves a refund completely (validate, look
//! up, persist) before it takes the next one. A batch is always fully resolved before the next one is fetched.
//!
//! The pass ends when a fetch comes back empty or short. Every pending refund is attempted at most once per pass,
//! so refunds that stay in progress can't make a pass spin.
//!
//! Failed store writes don't stop the other workers in a batch. They are collected, and once the batch is done the
//! pass halts with [`ProcessorError::BatchFailed`].
//!
//! Cancellation is checked before each fetch and before a worker takes its next refund. A status lookup that has
//! already started is allowed to finish.
mod errors;
mod resolve;

use std::sync::Arc;

pub use errors::{ProcessorError, ResolutionError};
use log::*;
pub use resolve::{resolve_refund, Resolution};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

use crate::{
    db::traits::RefundStore,
    db_types::{Refund, RefundStats},
    events::{EventProducers, RefundResolvedEvent},
    health::{health_check, HealthError},
    oracle::StatusOracle,
};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_WORKERS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    batch_size: usize,
    max_workers: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, max_workers: DEFAULT_MAX_WORKERS }
    }
}

impl ProcessorConfig {
    pub fn new(batch_size: usize, max_workers: usize) -> Result<Self, ProcessorError> {
        if batch_size == 0 {
            return Err(ProcessorError::InvalidConfig("batch size must be at least 1".into()));
        }
        if max_workers == 0 {
            return Err(ProcessorError::InvalidConfig("max workers must be at least 1".into()));
        }
        Ok(Self { batch_size, max_workers })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }
}

/// Outcome counts for a batch or a whole pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub batches: usize,
    pub attempted: usize,
    pub processed: usize,
    pub failed: usize,
    pub in_progress: usize,
}

impl PassSummary {
    fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Processed(_) => self.processed += 1,
            Resolution::Failed(_) => self.failed += 1,
            Resolution::InProgress(_) => self.in_progress += 1,
        }
    }

    fn merge(&mut self, other: &PassSummary) {
        self.batches += other.batches;
        self.attempted += other.attempted;
        self.processed += other.processed;
        self.failed += other.failed;
        self.in_progress += other.in_progress;
    }
}

#[derive(Default)]
struct WorkerReport {
    summary: PassSummary,
    errors: Vec<ResolutionError>,
}

pub struct BatchProcessor<S, O> {
    store: S,
    oracle: Arc<O>,
    config: ProcessorConfig,
    producers: EventProducers,
}

impl<S, O> BatchProcessor<S, O>
where
    S: RefundStore,
    O: StatusOracle,
{
    pub fn new(store: S, oracle: O, config: ProcessorConfig) -> Self {
        Self { store, oracle: Arc::new(oracle), config, producers: EventProducers::default() }
    }

    /// Resolved refunds are published to every `refund_resolved` producer in `producers`.
    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Runs one pass over the pending refunds.
    pub async fn process_pending_batches(&self, cancel: &CancellationToken) -> Result<PassSummary, ProcessorError> {
        let limit = self.config.batch_size;
        let fetch_limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut summary = PassSummary::default();
        let mut cursor = None;
        loop {
            if cancel.is_cancelled() {
                info!("⚙️ Processing cancelled after {} batches", summary.batches);
                return Err(ProcessorError::Cancelled);
            }
            let batch = self
                .store
                .fetch_pending_after(cursor, fetch_limit)
                .await
                .map_err(|e| ProcessorError::Fetch(e.to_string()))?;
            if batch.is_empty() {
                debug!("⚙️ No more pending refunds");
                break;
            }
            let fetched = batch.len();
            cursor = batch.iter().map(|r| r.id).max().or(cursor);
            summary.batches += 1;
            info!("⚙️ Processing batch {} with {fetched} pending refunds", summary.batches);
            let report = self.resolve_batch(batch, cancel).await;
            summary.merge(&report.summary);
            if !report.errors.is_empty() {
                error!("⚙️ {} refunds in batch {} could not be updated", report.errors.len(), summary.batches);
                return Err(ProcessorError::BatchFailed {
                    failures: report.errors.len(),
                    attempted: summary.attempted,
                    errors: report.errors,
                });
            }
            if cancel.is_cancelled() {
                info!("⚙️ Processing cancelled after {} batches", summary.batches);
                return Err(ProcessorError::Cancelled);
            }
            if fetched < limit {
                break;
            }
        }
        info!(
            "⚙️ Pass complete. {} batches, {} attempted, {} processed, {} failed, {} still in progress",
            summary.batches, summary.attempted, summary.processed, summary.failed, summary.in_progress
        );
        Ok(summary)
    }

    pub async fn stats(&self) -> Result<RefundStats, ProcessorError> {
        self.store.stats().await.map_err(|e| ProcessorError::Stats(e.to_string()))
    }

    pub async fn health_check(&self) -> Result<RefundStats, HealthError> {
        health_check(&self.store, self.oracle.as_ref()).await
    }

    async fn resolve_batch(&self, batch: Vec<Refund>, cancel: &CancellationToken) -> WorkerReport {
        let workers = self.config.max_workers.min(batch.len());
        let (sender, receiver) = mpsc::channel(batch.len().max(1));
        for refund in batch {
            // The channel holds the whole batch, so this never fails
            if let Err(e) = sender.try_send(refund) {
                error!("⚙️ Could not queue refund for resolution. {e}");
            }
        }
        drop(sender);
        let queue = Arc::new(Mutex::new(receiver));
        let mut pool = JoinSet::new();
        for worker in 0..workers {
            pool.spawn(run_worker(
                worker,
                Arc::clone(&queue),
                self.store.clone(),
                Arc::clone(&self.oracle),
                self.producers.clone(),
                cancel.clone(),
            ));
        }
        let mut result = WorkerReport::default();
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(report) => {
                    result.summary.merge(&report.summary);
                    result.errors.extend(report.errors);
                },
                Err(e) => {
                    error!("⚙️ A worker failed to complete. {e}");
                    result.errors.push(ResolutionError::Worker(e.to_string()));
                },
            }
        }
        result
    }
}

async fn run_worker<S, O>(
    worker: usize,
    queue: Arc<Mutex<mpsc::Receiver<Refund>>>,
    store: S,
    oracle: Arc<O>,
    producers: EventProducers,
    cancel: CancellationToken,
) -> WorkerReport
where
    S: RefundStore,
    O: StatusOracle,
{
    let mut report = WorkerReport::default();
    loop {
        if cancel.is_cancelled() {
            debug!("⚙️ Worker {worker} stopping early. Processing was cancelled");
            break;
        }
        let next = queue.lock().await.recv().await;
        let Some(refund) = next else { break };
        trace!("⚙️ Worker {worker} resolving refund {} [{}]", refund.file_id, refund.id);
        report.summary.attempted += 1;
        match resolve_refund(&store, oracle.as_ref(), refund).await {
            Ok(resolution) => {
                report.summary.record(&resolution);
                if let Some(refund) = resolution.resolved() {
                    producers.publish_refund_resolved(RefundResolvedEvent::new(refund.clone())).await;
                }
            },
            Err(e) => report.errors.push(e),
        }
    }
    report
}
