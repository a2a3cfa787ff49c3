use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, RefundIngestedEvent, RefundResolvedEvent};

/// Cloneable publishing side of all configured hooks. Components that emit events hold one of these.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub refund_ingested_producer: Vec<EventProducer<RefundIngestedEvent>>,
    pub refund_resolved_producer: Vec<EventProducer<RefundResolvedEvent>>,
}

impl EventProducers {
    pub async fn publish_refund_ingested(&self, event: RefundIngestedEvent) {
        for producer in &self.refund_ingested_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_refund_resolved(&self, event: RefundResolvedEvent) {
        for producer in &self.refund_resolved_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_refund_ingested: Option<EventHandler<RefundIngestedEvent>>,
    pub on_refund_resolved: Option<EventHandler<RefundResolvedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_refund_ingested = hooks.on_refund_ingested.map(|f| EventHandler::new(buffer_size, f));
        let on_refund_resolved = hooks.on_refund_resolved.map(|f| EventHandler::new(buffer_size, f));
        Self { on_refund_ingested, on_refund_resolved }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_refund_ingested {
            result.refund_ingested_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_refund_resolved {
            result.refund_resolved_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a dispatch task per configured hook. The tasks end once every producer has been dropped.
    pub fn start_handlers(self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut tasks = Vec::new();
        if let Some(handler) = self.on_refund_ingested {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_refund_resolved {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        tasks
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_refund_ingested: Option<Handler<RefundIngestedEvent>>,
    pub on_refund_resolved: Option<Handler<RefundResolvedEvent>>,
}

impl EventHooks {
    pub fn on_refund_ingested<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RefundIngestedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_refund_ingested = Some(Arc::new(f));
        self
    }

    pub fn on_refund_resolved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RefundResolvedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_refund_resolved = Some(Arc::new(f));
        self
    }
}
