//! # Queue ingestion
//!
//! Inbound work descriptions arrive on a message source ([`Subscription`]) as JSON [`QueueMessage`]s. The
//! [`QueueIngestor`] turns each accepted message into a new pending refund. Ingestion is at-least-once:
//!
//! * Unparseable messages, or messages without a `file_id`, are acked and dropped.
//! * Messages for a `file_id` that is already stored are acked without creating anything.
//! * Transient store failures nack the message so that it is redelivered later.
//!
//! When ingestion is switched off, [`DisabledIngestor`] stands in for the real thing.
mod ingestor;
mod local;
mod message;
mod spool;
mod subscription;

pub use ingestor::{
    ingest_message,
    DisabledIngestor,
    IngestConfig,
    IngestError,
    IngestOutcome,
    IngestReport,
    Ingestor,
    QueueIngestor,
    DEFAULT_MAX_MESSAGES,
    DEFAULT_POLL_INTERVAL,
    DEFAULT_RECEIVE_WINDOW,
};
pub use local::{LocalPublisher, LocalSubscription, DEFAULT_REDELIVERY_DELAY};
pub use message::QueueMessage;
pub use spool::SpoolSubscription;
pub use subscription::{Delivery, QueueError, Subscription};
