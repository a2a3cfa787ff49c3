//! Drives ingestion and processing cycles, either once or on a fixed interval.
use std::time::Duration;

use log::*;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    db::traits::RefundStore,
    ingest::{IngestReport, Ingestor},
    oracle::StatusOracle,
    processor::{BatchProcessor, PassSummary, ProcessorError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// Run one ingestion cycle and one processing pass, then stop.
    SinglePass,
    /// Run a cycle on every tick until cancelled. The first tick fires one period after start.
    Continuous(Duration),
}

impl ScheduleMode {
    /// A zero interval selects single-pass mode.
    pub fn from_interval(interval: Duration) -> Self {
        if interval.is_zero() {
            ScheduleMode::SinglePass
        } else {
            ScheduleMode::Continuous(interval)
        }
    }
}

/// What one cycle achieved. A `None` means that step failed (the failure is logged).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub ingest: Option<IngestReport>,
    pub pass: Option<PassSummary>,
}

pub struct Scheduler<I, S, O> {
    ingestor: I,
    processor: BatchProcessor<S, O>,
    mode: ScheduleMode,
}

impl<I, S, O> Scheduler<I, S, O>
where
    I: Ingestor,
    S: RefundStore,
    O: StatusOracle,
{
    pub fn new(ingestor: I, processor: BatchProcessor<S, O>, mode: ScheduleMode) -> Self {
        Self { ingestor, processor, mode }
    }

    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    pub fn processor(&self) -> &BatchProcessor<S, O> {
        &self.processor
    }

    /// Runs until the schedule is complete or `cancel` fires.
    ///
    /// In single-pass mode a processing failure is returned to the caller. In continuous mode failures are logged
    /// and the next tick still runs; the loop only ends on cancellation, and then returns `Ok`.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ProcessorError> {
        match self.mode {
            ScheduleMode::SinglePass => {
                info!("🕰️ Processing refunds once");
                self.ingest(&cancel).await;
                self.processor.process_pending_batches(&cancel).await.map(|_| ())
            },
            ScheduleMode::Continuous(period) => {
                info!("🕰️ Processing refunds every {}s", period.as_secs_f64());
                let mut timer = interval_at(Instant::now() + period, period);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            info!("🕰️ Stopping refund processing");
                            return Ok(());
                        },
                        _ = timer.tick() => {
                            info!("🕰️ Starting scheduled refund processing");
                            self.run_cycle(&cancel).await;
                            self.log_stats().await;
                        },
                    }
                }
            },
        }
    }

    /// One ingestion cycle followed by one processing pass. Failures in either are logged, not returned.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleReport {
        let ingest = self.ingest(cancel).await;
        let pass = match self.processor.process_pending_batches(cancel).await {
            Ok(summary) => Some(summary),
            Err(ProcessorError::Cancelled) => {
                info!("🕰️ Refund processing was interrupted by shutdown");
                None
            },
            Err(e) => {
                error!("🕰️ Failed to process refunds in scheduled run. {e}");
                None
            },
        };
        CycleReport { ingest, pass }
    }

    async fn ingest(&self, cancel: &CancellationToken) -> Option<IngestReport> {
        match self.ingestor.ingest(cancel).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("🕰️ Failed to pull messages. {e}");
                None
            },
        }
    }

    async fn log_stats(&self) {
        match self.processor.stats().await {
            Ok(stats) => info!("🕰️ Processing statistics. {stats}"),
            Err(e) => error!("🕰️ Failed to get processing statistics. {e}"),
        }
    }
}
