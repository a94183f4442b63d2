use std::{future::Future, pin::Pin, sync::Arc};

use crate::{
    db_types::{NewAuditEvent, Order},
    events::{AuditLogEvent, EventHandler, EventProducer, Handler, OrderPaidEvent},
};

/// The publishing side of the configured hooks. Cloned into each API object. With no hooks configured, publishing
/// is a no-op.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub audit_producer: Vec<EventProducer<AuditLogEvent>>,
}

impl EventProducers {
    pub async fn publish_order_paid(&self, order: &Order) {
        for producer in &self.order_paid_producer {
            producer.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    /// Hands the record to the audit sink without waiting for it to be written.
    pub fn record_audit(&self, event: NewAuditEvent) {
        for producer in &self.audit_producer {
            producer.try_publish_event(AuditLogEvent(event.clone()));
        }
    }
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_audit_event: Option<EventHandler<AuditLogEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_audit_event = hooks.on_audit_event.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_audit_event }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_audit_event {
            result.audit_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_audit_event {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_audit_event: Option<Handler<AuditLogEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_audit_event<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(AuditLogEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_audit_event = Some(Arc::new(f));
        self
    }
}
