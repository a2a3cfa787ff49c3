use std::time::Duration;

use refund_engine::{
    ingest::{DisabledIngestor, IngestConfig, LocalSubscription, QueueIngestor},
    BatchProcessor,
    ProcessorConfig,
    RefundStore,
    ScheduleMode,
    Scheduler,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::support::{file_id, oracles::FixedOracle, prepare_env::*};

mod support;

fn quick_ingest() -> IngestConfig {
    IngestConfig { receive_window: Duration::from_millis(100), poll_interval: Duration::from_millis(10), max_messages: 50 }
}

#[tokio::test]
async fn single_pass_ingests_then_processes() {
    let db = prepare_test_env().await;
    let subscription = LocalSubscription::new(Duration::ZERO);
    let publisher = subscription.publisher();
    for i in 0..3 {
        publisher.publish_json(&json!({"file_id": file_id(i), "refund_amount": 100 * i})).await.unwrap();
    }
    let ingestor = QueueIngestor::new(db.clone(), subscription, quick_ingest());
    let processor = BatchProcessor::new(db.clone(), FixedOracle::processed(), ProcessorConfig::new(2, 2).unwrap());
    let scheduler = Scheduler::new(ingestor, processor, ScheduleMode::SinglePass);
    scheduler.run(CancellationToken::new()).await.unwrap();
    let stats = db.stats().await.unwrap();
    assert_eq!((stats.total, stats.processed), (3, 3));
    tear_down(db).await;
}

#[tokio::test]
async fn continuous_mode_keeps_ticking_until_cancelled() {
    let db = prepare_test_env().await;
    let subscription = LocalSubscription::new(Duration::ZERO);
    let publisher = subscription.publisher();
    let ingestor = QueueIngestor::new(db.clone(), subscription, quick_ingest());
    let processor = BatchProcessor::new(db.clone(), FixedOracle::processed(), ProcessorConfig::default());
    let scheduler = Scheduler::new(ingestor, processor, ScheduleMode::Continuous(Duration::from_millis(50)));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });
    publisher.publish_json(&json!({"file_id": file_id(1)})).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    // Arrives after the first ticks; a later tick still picks it up
    publisher.publish_json(&json!({"file_id": file_id(2)})).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
    let stats = db.stats().await.unwrap();
    assert_eq!((stats.total, stats.processed), (2, 2));
    tear_down(db).await;
}

#[tokio::test]
async fn loop_runs_with_ingestion_disabled_until_cancelled() {
    let db = prepare_test_env().await;
    db.create_refund(refund_engine::db_types::NewRefund::new(file_id(7))).await.unwrap();
    let processor = BatchProcessor::new(db.clone(), FixedOracle::in_progress(), ProcessorConfig::default());
    let scheduler = Scheduler::new(DisabledIngestor, processor, ScheduleMode::Continuous(Duration::from_millis(20)));
    let cancel = CancellationToken::new();
    let report = scheduler.run_cycle(&cancel).await;
    assert_eq!(report.pass.map(|p| p.in_progress), Some(1));
    assert_eq!(report.ingest.map(|r| r.received), Some(0));
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    assert!(handle.await.unwrap().is_ok());
    assert_eq!(db.stats().await.unwrap().pending, 1);
    tear_down(db).await;
}
