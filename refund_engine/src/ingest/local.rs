use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use log::*;
use serde::Serialize;
use tokio::{sync::Mutex, time::Instant};

use super::{Delivery, QueueError, Subscription};

pub const DEFAULT_REDELIVERY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct LocalQueue {
    next_id: u64,
    ready: VecDeque<(Instant, Delivery)>,
    in_flight: HashMap<String, Delivery>,
    closed: bool,
}

/// An in-process message bus. Messages are published through a [`LocalPublisher`] and pulled through the
/// subscription. Nacked messages become visible again after the redelivery delay.
#[derive(Debug, Clone)]
pub struct LocalSubscription {
    queue: Arc<Mutex<LocalQueue>>,
    redelivery_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct LocalPublisher {
    queue: Arc<Mutex<LocalQueue>>,
}

impl Default for LocalSubscription {
    fn default() -> Self {
        Self::new(DEFAULT_REDELIVERY_DELAY)
    }
}

impl LocalSubscription {
    pub fn new(redelivery_delay: Duration) -> Self {
        Self { queue: Arc::new(Mutex::new(LocalQueue::default())), redelivery_delay }
    }

    pub fn publisher(&self) -> LocalPublisher {
        LocalPublisher { queue: Arc::clone(&self.queue) }
    }

    /// Number of messages waiting to be delivered, including those waiting out a redelivery delay.
    pub async fn backlog(&self) -> usize {
        self.queue.lock().await.ready.len()
    }

    pub async fn in_flight(&self) -> usize {
        self.queue.lock().await.in_flight.len()
    }

    /// Stops accepting new messages. Messages already queued can still be pulled.
    pub async fn close(&self) {
        self.queue.lock().await.closed = true;
    }
}

impl LocalPublisher {
    /// Enqueues a raw payload and returns its delivery id.
    pub async fn publish(&self, payload: Vec<u8>) -> Result<String, QueueError> {
        let mut queue = self.queue.lock().await;
        if queue.closed {
            return Err(QueueError::Closed);
        }
        queue.next_id += 1;
        let id = format!("local-{}", queue.next_id);
        trace!("📥️ Published {id} ({} bytes)", payload.len());
        queue.ready.push_back((Instant::now(), Delivery { id: id.clone(), payload, attempt: 1 }));
        Ok(id)
    }

    pub async fn publish_json<T: Serialize>(&self, message: &T) -> Result<String, QueueError> {
        let payload = serde_json::to_vec(message).map_err(|e| QueueError::Io(e.into()))?;
        self.publish(payload).await
    }
}

impl Subscription for LocalSubscription {
    async fn pull(&self, max: usize) -> Result<Vec<Delivery>, QueueError> {
        let mut queue = self.queue.lock().await;
        let now = Instant::now();
        let mut result = Vec::new();
        let mut waiting = VecDeque::with_capacity(queue.ready.len());
        while let Some((visible_at, delivery)) = queue.ready.pop_front() {
            if result.len() < max && visible_at <= now {
                result.push(delivery);
            } else {
                waiting.push_back((visible_at, delivery));
            }
        }
        queue.ready = waiting;
        for delivery in &result {
            queue.in_flight.insert(delivery.id.clone(), delivery.clone());
        }
        Ok(result)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut queue = self.queue.lock().await;
        queue.in_flight.remove(&delivery.id).map(|_| ()).ok_or_else(|| QueueError::UnknownDelivery(delivery.id.clone()))
    }

    async fn nack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut queue = self.queue.lock().await;
        let mut returned =
            queue.in_flight.remove(&delivery.id).ok_or_else(|| QueueError::UnknownDelivery(delivery.id.clone()))?;
        returned.attempt += 1;
        let visible_at = Instant::now() + self.redelivery_delay;
        queue.ready.push_back((visible_at, returned));
        Ok(())
    }
}
