use cucumber::{gherkin::Step, then, when};
use refund_engine::{
    db_types::{FileId, Refund, RefundStatus},
    ingest::{Ingestor, QueueIngestor},
    BatchProcessor,
    ProcessorConfig,
    RefundStore,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::cucumber::RefundWorld;

async fn fetch_refund(world: &RefundWorld, id: &str) -> Refund {
    world
        .db()
        .fetch_refund_by_file_id(&FileId::from(id))
        .await
        .expect("Error fetching refund")
        .unwrap_or_else(|| panic!("Refund {id} does not exist"))
}

#[when(expr = "I process pending refunds with batch size {int} and {int} workers")]
async fn process_refunds(world: &mut RefundWorld, batch_size: usize, workers: usize) {
    let system = world.system_mut();
    let config = ProcessorConfig::new(batch_size, workers).expect("Invalid processor config");
    let processor = BatchProcessor::new(system.db.clone(), system.oracle.clone(), config);
    let result = processor.process_pending_batches(&CancellationToken::new()).await;
    system.last_pass = Some(result.map_err(|e| e.to_string()));
}

#[when(expr = "the queue delivers a message for {string} with amount {int}")]
async fn deliver_numeric_amount(world: &mut RefundWorld, id: String, amount: i64) {
    let msg = json!({"file_id": id, "refund_amount": amount, "status": "pending"});
    world.system().subscription.publisher().publish_json(&msg).await.expect("Error publishing message");
}

#[when(expr = "the queue delivers a message for {string} with amount {string}")]
async fn deliver_string_amount(world: &mut RefundWorld, id: String, amount: String) {
    let msg = json!({"file_id": id, "refund_amount": amount});
    world.system().subscription.publisher().publish_json(&msg).await.expect("Error publishing message");
}

#[when("the queue delivers the raw message")]
async fn deliver_raw(world: &mut RefundWorld, step: &Step) {
    let payload = step.docstring.as_deref().expect("Step needs a docstring").trim().as_bytes().to_vec();
    world.system().subscription.publisher().publish(payload).await.expect("Error publishing message");
}

#[when("the ingestor runs")]
async fn run_ingestor(world: &mut RefundWorld) {
    let system = world.system();
    let ingestor = QueueIngestor::new(system.db.clone(), system.subscription.clone(), system.ingest_config);
    ingestor.ingest(&CancellationToken::new()).await.expect("Error ingesting messages");
}

#[then("the pass succeeds")]
async fn pass_succeeds(world: &mut RefundWorld) {
    match &world.system().last_pass {
        Some(Ok(_)) => {},
        Some(Err(e)) => panic!("The pass failed: {e}"),
        None => panic!("No pass has been run"),
    }
}

#[then(expr = "{int} refunds were attempted")]
async fn refunds_attempted(world: &mut RefundWorld, count: usize) {
    let summary = world.system().last_pass.clone().expect("No pass has been run").expect("The pass failed");
    assert_eq!(summary.attempted, count);
}

#[then(expr = "all refunds are {word}")]
async fn all_refunds_are(world: &mut RefundWorld, status: String) {
    let status = status.parse::<RefundStatus>().expect("Invalid status");
    let stats = world.db().stats().await.expect("Error fetching stats");
    let count = match status {
        RefundStatus::Pending => stats.pending,
        RefundStatus::Processed => stats.processed,
        RefundStatus::Error => stats.error,
    };
    assert_eq!(count, stats.total);
}

#[then(expr = "there are {int} pending refunds")]
async fn pending_count(world: &mut RefundWorld, count: usize) {
    let pending = world.db().fetch_pending(1000).await.expect("Error fetching pending refunds");
    assert_eq!(pending.len(), count);
}

#[then(expr = "the store holds {int} refund(s)")]
async fn total_count(world: &mut RefundWorld, count: i64) {
    let stats = world.db().stats().await.expect("Error fetching stats");
    assert_eq!(stats.total, count);
}

#[then(expr = "refund {string} has status {word}")]
async fn refund_status(world: &mut RefundWorld, id: String, status: String) {
    let refund = fetch_refund(world, &id).await;
    assert_eq!(refund.status.to_string(), status);
    assert_eq!(refund.processed_at.is_some(), refund.status == RefundStatus::Processed);
}

#[then(expr = "refund {string} has an error message starting with {string}")]
async fn refund_error_message(world: &mut RefundWorld, id: String, prefix: String) {
    let refund = fetch_refund(world, &id).await;
    let message = refund.error_message.unwrap_or_default();
    assert!(message.starts_with(&prefix), "{message} does not start with {prefix}");
}

#[then(expr = "refund {string} has refund amount {string}")]
async fn refund_amount(world: &mut RefundWorld, id: String, amount: String) {
    let refund = fetch_refund(world, &id).await;
    assert_eq!(refund.refund_amount.as_deref(), Some(amount.as_str()));
}

#[then("every processed refund has a processed timestamp")]
async fn processed_timestamps(world: &mut RefundWorld) {
    let pool = world.db().pool();
    let missing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM refunds WHERE status = 'processed' AND processed_at IS NULL")
            .fetch_one(pool)
            .await
            .expect("Error counting refunds");
    assert_eq!(missing, 0);
}
