use std::{future::Future, pin::Pin};

use log::*;
use refund_engine::{
    events::{EventHandlers, EventHooks},
    ingest::{DisabledIngestor, IngestConfig, QueueIngestor, SpoolSubscription, DEFAULT_REDELIVERY_DELAY},
    oracle::{ErrorCatalogue, SimulatedOracle},
    BatchProcessor,
    RefundStore,
    ScheduleMode,
    Scheduler,
    SqliteDatabase,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{config::BatchConfig, errors::BatchError};

const EVENT_BUFFER_SIZE: usize = 100;

/// Connects to the database, runs the startup checks and then processes refunds until the schedule is complete or
/// `cancel` fires. Any failure before scheduling starts is returned straight away.
pub async fn run_batch(config: BatchConfig, cancel: CancellationToken) -> Result<(), BatchError> {
    let mut db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections).await?;
    db.migrate().await?;
    let result = schedule(&config, db.clone(), cancel).await;
    if let Err(e) = db.close().await {
        warn!("🗃️ Failed to close the database cleanly. {e}");
    }
    result
}

async fn schedule(config: &BatchConfig, db: SqliteDatabase, cancel: CancellationToken) -> Result<(), BatchError> {
    let catalogue = ErrorCatalogue::load_or_default(config.error_messages_path.as_ref());
    let (min_latency, max_latency) = config.oracle_latency;
    let oracle = SimulatedOracle::new(catalogue).with_latency(min_latency, max_latency);

    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, log_hooks());
    let producers = handlers.producers();
    let processor = BatchProcessor::new(db.clone(), oracle, config.processor).with_producers(producers.clone());

    let stats = processor.health_check().await?;
    info!("🚀️ Health check passed. {stats}");
    let hook_tasks = handlers.start_handlers();

    let mode = ScheduleMode::from_interval(config.processing_interval);
    let result = if config.enable_queue {
        let subscription = SpoolSubscription::open(&config.spool_dir, DEFAULT_REDELIVERY_DELAY).await?;
        let ingest_config = IngestConfig { receive_window: config.receive_window, ..IngestConfig::default() };
        let ingestor = QueueIngestor::new(db, subscription, ingest_config).with_producers(producers);
        Scheduler::new(ingestor, processor, mode).run(cancel).await
    } else {
        info!("📥️ Queue ingestion is disabled. Only refunds already in the database will be processed");
        drop(producers);
        Scheduler::new(DisabledIngestor, processor, mode).run(cancel).await
    };
    // The schedulers own the last producers, so the hooks can drain now
    for task in hook_tasks {
        if let Err(e) = task.await {
            warn!("📬️ Event hook task failed. {e}");
        }
    }
    result.map_err(BatchError::from)
}

fn log_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_refund_resolved(|ev| {
        let refund = ev.refund;
        Box::pin(async move {
            match &refund.error_message {
                Some(reason) => debug!("📬️ Refund {} resolved as {} ({reason})", refund.file_id, refund.status),
                None => debug!("📬️ Refund {} resolved as {}", refund.file_id, refund.status),
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}

/// Cancels `cancel` when the process receives Ctrl-C (or SIGTERM on unix).
pub fn shutdown_on_signal(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("🚀️ Received shutdown signal. Waiting for in-flight work to finish");
        cancel.cancel();
    })
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c() => {},
                    _ = term.recv() => {},
                }
            },
            Err(e) => {
                warn!("🚀️ Could not listen for SIGTERM. {e}");
                ctrl_c().await;
            },
        }
    }
    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("🚀️ Could not listen for Ctrl-C. {e}");
        std::future::pending::<()>().await;
    }
}
