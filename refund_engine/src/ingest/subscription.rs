use std::future::Future;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue I/O error. {0}")]
    Io(#[from] std::io::Error),
    #[error("Delivery {0} is not in flight")]
    UnknownDelivery(String),
    #[error("The subscription has been closed")]
    Closed,
}

/// One message handed out by a [`Subscription`]. It stays in flight until it is acked or nacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: String,
    pub payload: Vec<u8>,
    /// 1 for the first delivery, incremented on every redelivery.
    pub attempt: u32,
}

/// A pull-based message source with at-least-once delivery.
pub trait Subscription: Send + Sync + 'static {
    /// Returns up to `max` deliveries that are currently available. Returns an empty vec rather than waiting when
    /// nothing is available.
    fn pull(&self, max: usize) -> impl Future<Output = Result<Vec<Delivery>, QueueError>> + Send;

    /// Removes the message for good.
    fn ack(&self, delivery: &Delivery) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Returns the message to the source so that it is redelivered later.
    fn nack(&self, delivery: &Delivery) -> impl Future<Output = Result<(), QueueError>> + Send;
}
