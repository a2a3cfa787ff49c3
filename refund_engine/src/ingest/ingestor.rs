use std::{future::Future, sync::Arc, time::Duration};

use log::*;
use thiserror::Error;
use tokio::{task::JoinSet, time::Instant};
use tokio_util::sync::CancellationToken;

use super::{Delivery, QueueError, QueueMessage, Subscription};
use crate::{
    db::traits::{RefundStore, StoreError},
    db_types::Refund,
    events::{EventProducers, RefundIngestedEvent},
};

pub const DEFAULT_RECEIVE_WINDOW: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_MESSAGES: usize = 100;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Could not pull messages from the subscription. {0}")]
    Queue(#[from] QueueError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    /// How long one ingestion cycle keeps pulling messages.
    pub receive_window: Duration,
    /// How long to wait before pulling again when the subscription had nothing to offer.
    pub poll_interval: Duration,
    pub max_messages: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            receive_window: DEFAULT_RECEIVE_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }
}

/// What happened to a single delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new pending refund was stored. The message is acked.
    Created(Refund),
    /// A refund with this file id was already stored. The message is acked.
    AlreadyExists,
    /// The message can never be ingested. It is acked so that it isn't redelivered forever.
    Dropped(String),
    /// A transient store failure. The message is nacked for redelivery.
    Retry(String),
}

impl IngestOutcome {
    pub fn should_ack(&self) -> bool {
        !matches!(self, IngestOutcome::Retry(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub received: usize,
    pub created: usize,
    pub duplicates: usize,
    pub dropped: usize,
    pub retried: usize,
}

impl IngestReport {
    fn record(&mut self, outcome: &IngestOutcome) {
        self.received += 1;
        match outcome {
            IngestOutcome::Created(_) => self.created += 1,
            IngestOutcome::AlreadyExists => self.duplicates += 1,
            IngestOutcome::Dropped(_) => self.dropped += 1,
            IngestOutcome::Retry(_) => self.retried += 1,
        }
    }
}

/// One ingestion cycle: move whatever the message source has to offer into the store.
pub trait Ingestor: Send + Sync + 'static {
    fn ingest(&self, cancel: &CancellationToken) -> impl Future<Output = Result<IngestReport, IngestError>> + Send;
}

/// The ingestor used when queue ingestion is switched off. Every cycle is an immediate no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIngestor;

impl Ingestor for DisabledIngestor {
    async fn ingest(&self, _cancel: &CancellationToken) -> Result<IngestReport, IngestError> {
        debug!("📥️ Queue ingestion is disabled. Skipping message pull");
        Ok(IngestReport::default())
    }
}

/// Pulls messages from a [`Subscription`] for a bounded receive window and stores each one as a pending refund.
///
/// Messages in one pull are handled concurrently. Deduplication is check-then-create on `file_id`; a duplicate key
/// error from a concurrent delivery of the same id is treated as "already exists".
pub struct QueueIngestor<S, Q> {
    store: S,
    subscription: Arc<Q>,
    config: IngestConfig,
    producers: EventProducers,
}

impl<S, Q> QueueIngestor<S, Q>
where
    S: RefundStore,
    Q: Subscription,
{
    pub fn new(store: S, subscription: Q, config: IngestConfig) -> Self {
        Self { store, subscription: Arc::new(subscription), config, producers: EventProducers::default() }
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn subscription(&self) -> &Q {
        &self.subscription
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }
}

impl<S, Q> Ingestor for QueueIngestor<S, Q>
where
    S: RefundStore,
    Q: Subscription,
{
    async fn ingest(&self, cancel: &CancellationToken) -> Result<IngestReport, IngestError> {
        info!("📥️ Pulling messages for up to {}ms", self.config.receive_window.as_millis());
        let deadline = Instant::now() + self.config.receive_window;
        let mut report = IngestReport::default();
        while !cancel.is_cancelled() && Instant::now() < deadline {
            let deliveries = self.subscription.pull(self.config.max_messages.max(1)).await?;
            if deliveries.is_empty() {
                let wake = (Instant::now() + self.config.poll_interval).min(deadline);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep_until(wake) => continue,
                }
            }
            let mut jobs = JoinSet::new();
            for delivery in deliveries {
                let store = self.store.clone();
                let subscription = Arc::clone(&self.subscription);
                let producers = self.producers.clone();
                jobs.spawn(async move { handle_delivery(&store, subscription.as_ref(), &producers, delivery).await });
            }
            while let Some(joined) = jobs.join_next().await {
                match joined {
                    Ok(outcome) => report.record(&outcome),
                    Err(e) => error!("📥️ A message handler did not complete: {e}"),
                }
            }
        }
        info!(
            "📥️ Finished pulling messages. {} received, {} created, {} already stored, {} dropped, {} returned for \
             redelivery",
            report.received, report.created, report.duplicates, report.dropped, report.retried
        );
        Ok(report)
    }
}

async fn handle_delivery<S, Q>(store: &S, subscription: &Q, producers: &EventProducers, delivery: Delivery) -> IngestOutcome
where
    S: RefundStore,
    Q: Subscription,
{
    trace!("📥️ Received message {} (attempt {})", delivery.id, delivery.attempt);
    let outcome = ingest_message(store, &delivery.payload).await;
    let settled = if outcome.should_ack() { subscription.ack(&delivery).await } else { subscription.nack(&delivery).await };
    if let Err(e) = settled {
        warn!("📥️ Could not settle message {}. It may be delivered again. {e}", delivery.id);
    }
    if let IngestOutcome::Created(refund) = &outcome {
        producers.publish_refund_ingested(RefundIngestedEvent::new(refund.clone())).await;
    }
    outcome
}

/// Converts a raw message payload into a pending refund, if it isn't stored already.
pub async fn ingest_message<S: RefundStore>(store: &S, payload: &[u8]) -> IngestOutcome {
    let message = match QueueMessage::from_slice(payload) {
        Ok(message) => message,
        Err(e) => {
            error!("📥️ Failed to parse queue message. It will be dropped. {e}");
            return IngestOutcome::Dropped(format!("Unparseable message: {e}"));
        },
    };
    let new_refund = message.to_new_refund();
    if new_refund.file_id.is_empty() {
        error!("📥️ Queue message has an empty file_id. It will be dropped.");
        return IngestOutcome::Dropped("Empty file_id".into());
    }
    if let Some(reason) = message.error_message.as_deref().filter(|s| !s.is_empty()) {
        debug!("📥️ Message for {} carried an error message that is not stored: {reason}", new_refund.file_id);
    }
    match store.fetch_refund_by_file_id(&new_refund.file_id).await {
        Ok(Some(existing)) => {
            info!("📥️ Refund {} already exists with status {}. Skipping", existing.file_id, existing.status);
            return IngestOutcome::AlreadyExists;
        },
        Ok(None) => {},
        Err(e) => {
            error!("📥️ Failed to check whether refund {} exists. {e}", new_refund.file_id);
            return IngestOutcome::Retry(e.to_string());
        },
    }
    let file_id = new_refund.file_id.clone();
    match store.create_refund(new_refund).await {
        Ok(refund) => {
            info!("📥️ Refund {} [{}] stored as pending", refund.file_id, refund.id);
            IngestOutcome::Created(refund)
        },
        Err(e) if e.is_duplicate() => {
            info!("📥️ Refund {file_id} was stored by a concurrent delivery. Skipping");
            IngestOutcome::AlreadyExists
        },
        Err(e) => {
            error!("📥️ Failed to store refund {file_id}. {e}");
            IngestOutcome::Retry(e.to_string())
        },
    }
}
