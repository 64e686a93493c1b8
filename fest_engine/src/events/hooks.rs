use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{EventHandler, EventProducer, Handler, OrderFinalizedEvent, OrderFulfilledEvent};

/// Cloned into every API instance that emits events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_finalized_producer: Vec<EventProducer<OrderFinalizedEvent>>,
    pub order_fulfilled_producer: Vec<EventProducer<OrderFulfilledEvent>>,
}

impl EventProducers {
    pub async fn publish_order_finalized(&self, event: OrderFinalizedEvent) {
        for producer in &self.order_finalized_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_fulfilled(&self, event: OrderFulfilledEvent) {
        for producer in &self.order_fulfilled_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_finalized: Option<EventHandler<OrderFinalizedEvent>>,
    pub on_order_fulfilled: Option<EventHandler<OrderFulfilledEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_finalized = hooks.on_order_finalized.map(|f| EventHandler::new(buffer_size, f));
        let on_order_fulfilled = hooks.on_order_fulfilled.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_finalized, on_order_fulfilled }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_finalized {
            result.order_finalized_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_fulfilled {
            result.order_fulfilled_producer.push(handler.subscribe());
        }
        result
    }

    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_finalized {
            info!("📬️ Starting order finalized handler");
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_fulfilled {
            info!("📬️ Starting order fulfilled handler");
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_finalized: Option<Handler<OrderFinalizedEvent>>,
    pub on_order_fulfilled: Option<Handler<OrderFulfilledEvent>>,
}

impl EventHooks {
    pub fn on_order_finalized<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderFinalizedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_finalized = Some(Arc::new(f));
        self
    }

    pub fn on_order_fulfilled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderFulfilledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_fulfilled = Some(Arc::new(f));
        self
    }
}
