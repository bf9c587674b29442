use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderDeliveredEvent,
    OrderOutOfStockEvent,
    OrderPaidEvent,
    OrderRefundedEvent,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The publishing side of the configured hooks. Cheap to clone; hand a copy to every API that emits events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub order_delivered_producer: Vec<EventProducer<OrderDeliveredEvent>>,
    pub order_out_of_stock_producer: Vec<EventProducer<OrderOutOfStockEvent>>,
    pub order_refunded_producer: Vec<EventProducer<OrderRefundedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_paid(&self, event: OrderPaidEvent) {
        for producer in &self.order_paid_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_delivered(&self, event: OrderDeliveredEvent) {
        for producer in &self.order_delivered_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_out_of_stock(&self, event: OrderOutOfStockEvent) {
        for producer in &self.order_out_of_stock_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_refunded(&self, event: OrderRefundedEvent) {
        for producer in &self.order_refunded_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_delivered: Option<EventHandler<OrderDeliveredEvent>>,
    pub on_order_out_of_stock: Option<EventHandler<OrderOutOfStockEvent>>,
    pub on_order_refunded: Option<EventHandler<OrderRefundedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_order_delivered = hooks.on_order_delivered.map(|f| EventHandler::new(buffer_size, f));
        let on_order_out_of_stock = hooks.on_order_out_of_stock.map(|f| EventHandler::new(buffer_size, f));
        let on_order_refunded = hooks.on_order_refunded.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_order_delivered, on_order_out_of_stock, on_order_refunded }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_delivered {
            result.order_delivered_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_out_of_stock {
            result.order_out_of_stock_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_refunded {
            result.order_refunded_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task per configured hook. Each task runs until all of its producers have been dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_delivered {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_out_of_stock {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_refunded {
            tokio::spawn(handler.start_handler());
        }
        debug!("📬️ Event handlers started");
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_delivered: Option<Handler<OrderDeliveredEvent>>,
    pub on_order_out_of_stock: Option<Handler<OrderOutOfStockEvent>>,
    pub on_order_refunded: Option<Handler<OrderRefundedEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_order_delivered<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderDeliveredEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_delivered = Some(Arc::new(f));
        self
    }

    pub fn on_order_out_of_stock<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderOutOfStockEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_out_of_stock = Some(Arc::new(f));
        self
    }

    pub fn on_order_refunded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderRefundedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_refunded = Some(Arc::new(f));
        self
    }
}
