use crate::db_types::{NewAuditEvent, Order};

/// Published once, by whichever payment-success delivery moved the order to `Paid`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An audit record on its way to the audit sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogEvent(pub NewAuditEvent);

impl From<NewAuditEvent> for AuditLogEvent {
    fn from(event: NewAuditEvent) -> Self {
        Self(event)
    }
}
