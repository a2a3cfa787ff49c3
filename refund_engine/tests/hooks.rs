use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use refund_engine::{
    db_types::{NewRefund, RefundStatus},
    events::{EventHandlers, EventHooks},
    ingest::{IngestConfig, Ingestor, LocalSubscription, QueueIngestor},
    BatchProcessor,
    ProcessorConfig,
    RefundStore,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::support::{file_id, oracles::FixedOracle, prepare_env::*};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn on_refund_resolved() {
    let db = prepare_test_env().await;
    db.create_refund(NewRefund::new(file_id(1))).await.unwrap();
    db.create_refund(NewRefund::new("not-a-uuid")).await.unwrap();
    let event = HookCalled::default();
    let errors = HookCalled::default();
    let (event_copy, errors_copy) = (event.clone(), errors.clone());
    let mut hooks = EventHooks::default();
    hooks.on_refund_resolved(move |ev| {
        info!("🪝️ {} is now {}", ev.refund.file_id, ev.status());
        event_copy.called();
        if ev.status() == RefundStatus::Error {
            errors_copy.called();
        }
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    let tasks = handlers.start_handlers();

    let processor =
        BatchProcessor::new(db.clone(), FixedOracle::processed(), ProcessorConfig::default()).with_producers(producers);
    processor.process_pending_batches(&CancellationToken::new()).await.unwrap();
    // Dropping the last producer lets the handler drain and shut down
    drop(processor);
    for task in tasks {
        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }
    assert_eq!(event.count(), 2);
    assert_eq!(errors.count(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn in_progress_refunds_publish_nothing() {
    let db = prepare_test_env().await;
    db.create_refund(NewRefund::new(file_id(1))).await.unwrap();
    let event = HookCalled::default();
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_refund_resolved(move |_| {
        event_copy.called();
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    let tasks = handlers.start_handlers();
    let processor =
        BatchProcessor::new(db.clone(), FixedOracle::in_progress(), ProcessorConfig::default()).with_producers(producers);
    processor.process_pending_batches(&CancellationToken::new()).await.unwrap();
    drop(processor);
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(event.count(), 0);
    tear_down(db).await;
}

#[tokio::test]
async fn on_refund_ingested() {
    let db = prepare_test_env().await;
    let event = HookCalled::default();
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_refund_ingested(move |ev| {
        info!("🪝️ Ingested {}", ev.refund.file_id);
        event_copy.called();
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    let tasks = handlers.start_handlers();
    let subscription = LocalSubscription::new(Duration::ZERO);
    let publisher = subscription.publisher();
    publisher.publish_json(&json!({"file_id": file_id(1)})).await.unwrap();
    publisher.publish_json(&json!({"file_id": file_id(1)})).await.unwrap();
    publisher.publish_json(&json!({"file_id": file_id(2)})).await.unwrap();
    let config = IngestConfig { receive_window: Duration::from_millis(100), ..IngestConfig::default() };
    let ingestor = QueueIngestor::new(db.clone(), subscription, config).with_producers(producers);
    ingestor.ingest(&CancellationToken::new()).await.unwrap();
    drop(ingestor);
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(event.count(), 2);
    tear_down(db).await;
}
