use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, PrecheckId, DEFAULT_DISCLAIMER_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub precheck_id: PrecheckId,
    /// When the user ticked the legal acknowledgement box
    pub legal_accepted_at: DateTime<Utc>,
    #[serde(default = "default_disclaimer_version")]
    pub disclaimer_version: String,
}

fn default_disclaimer_version() -> String {
    DEFAULT_DISCLAIMER_VERSION.to_string()
}

/// A payment processor verdict. `order_id` is the correlation key embedded in the checkout metadata, used when no
/// order carries `payment_ref` yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub payment_ref: String,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

impl PaymentEvent {
    pub fn new<S: Into<String>>(payment_ref: S, order_id: Option<OrderId>) -> Self {
        Self { payment_ref: payment_ref.into(), order_id }
    }
}

/// What handling a payment event did. Every variant is a successful acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// The order changed status as a result of this event.
    Applied(Order),
    /// The order was not awaiting payment, so the event had already been handled (or arrived too late).
    AlreadyHandled(Order),
    /// No order matches the event.
    Unmatched,
}

impl PaymentOutcome {
    pub fn order(&self) -> Option<&Order> {
        match self {
            PaymentOutcome::Applied(o) | PaymentOutcome::AlreadyHandled(o) => Some(o),
            PaymentOutcome::Unmatched => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, PaymentOutcome::Applied(_))
    }
}
