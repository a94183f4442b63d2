use appeal_engine::{
    db_types::{LeadId, OrderId},
    order_objects::PaymentEvent,
    report_objects::ReportSummary,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentEventType {
    #[serde(rename = "payment.succeeded")]
    Succeeded,
    #[serde(rename = "payment.failed")]
    Failed,
    /// Events we don't subscribe to are acknowledged and ignored.
    #[serde(other)]
    Other,
}

/// A payment processor webhook delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentNotification {
    #[serde(rename = "type")]
    pub event_type: PaymentEventType,
    pub payment_ref: String,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

impl PaymentNotification {
    pub fn to_event(&self) -> PaymentEvent {
        PaymentEvent::new(self.payment_ref.clone(), self.order_id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookReceipt {
    pub received: bool,
}

impl WebhookReceipt {
    pub fn received() -> Self {
        Self { received: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStatusParams {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryResponse {
    pub status: String,
    pub report: ReportSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadConfirmParams {
    pub id: LeadId,
}
