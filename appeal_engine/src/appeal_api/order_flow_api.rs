use std::fmt::Debug;

use log::*;

use crate::{
    appeal_api::{
        order_objects::{CreateOrderRequest, PaymentEvent, PaymentOutcome},
        RequestContext,
    },
    db_types::{AuditEntityType, AuditEventType, NewAuditEvent, NewOrder, Order, OrderId, OrderStatusType},
    events::EventProducers,
    legal::disclaimer_text,
    traits::{OrderManagement, PrecheckManagement},
    OrderFlowError,
};

/// The order state machine.
///
/// Every status change goes through [`OrderFlowApi::transition`] or [`OrderFlowApi::try_transition`], which check the
/// central transition table in [`OrderStatusType::allowed_transitions`] before issuing a conditional update.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn invalid_transition(order: &Order, to: OrderStatusType, detail: &str) -> OrderFlowError {
    let err =
        OrderFlowError::InvalidTransition { order_id: order.id.clone(), from: order.status, to, detail: detail.into() };
    error!("🔄️ {err}");
    err
}

pub(crate) async fn try_transition<B: OrderManagement>(
    db: &B,
    order: &Order,
    to: OrderStatusType,
) -> Result<Option<Order>, OrderFlowError> {
    if !order.status.can_transition_to(to) {
        return Err(invalid_transition(order, to, "not a permitted transition"));
    }
    let updated = db.transition_order(&order.id, order.status, to).await?;
    match &updated {
        Some(_) => debug!("🔄️ Order {} moved from {} to {to}", order.id, order.status),
        None => info!("🔄️ Order {} was no longer {} when moving to {to}", order.id, order.status),
    }
    Ok(updated)
}

pub(crate) async fn transition<B: OrderManagement>(
    db: &B,
    order: &Order,
    to: OrderStatusType,
) -> Result<Order, OrderFlowError> {
    match try_transition(db, order, to).await? {
        Some(updated) => Ok(updated),
        None => Err(invalid_transition(order, to, "the order was modified concurrently")),
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + PrecheckManagement
{
    /// Creates an order for an eligible precheck owned by `user_id`.
    ///
    /// The idempotency key is derived from the precheck, so a second order for the same precheck fails with
    /// [`OrderFlowError::ActiveOrderExists`].
    pub async fn create_order(
        &self,
        user_id: &str,
        request: &CreateOrderRequest,
        ctx: &RequestContext,
    ) -> Result<Order, OrderFlowError> {
        let precheck = self
            .db
            .fetch_precheck(&request.precheck_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| OrderFlowError::PrecheckNotFound(request.precheck_id.clone()))?;
        if !precheck.is_eligible() {
            return Err(OrderFlowError::PrecheckNotEligible(precheck.id));
        }
        if disclaimer_text(&request.disclaimer_version).is_none() {
            let msg = format!("Unknown disclaimer version '{}'", request.disclaimer_version);
            return Err(OrderFlowError::ValidationError(msg));
        }
        let new_order =
            NewOrder::new(user_id, precheck.id.clone(), request.legal_accepted_at, request.disclaimer_version.as_str());
        let order = match self.db.insert_order(new_order).await {
            Ok(order) => order,
            Err(e) if e.is_unique_violation() => {
                info!("🔄️ {user_id} tried to order precheck {} again", precheck.id);
                return Err(OrderFlowError::ActiveOrderExists(precheck.id));
            },
            Err(e) => return Err(e.into()),
        };
        info!("🔄️ Order {} created for precheck {}", order.id, order.precheck_id);
        let event = NewAuditEvent::new(AuditEventType::OrderCreated, AuditEntityType::Order, &order.id)
            .with_user(user_id)
            .with_origin(ctx.ip.clone(), ctx.user_agent.clone());
        self.producers.record_audit(event);
        Ok(order)
    }

    pub async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        Ok(self.db.fetch_order(id).await?)
    }

    /// Stores the checkout reference and moves the order to `PaymentPending`.
    pub async fn attach_payment_ref(&self, id: &OrderId, payment_ref: &str) -> Result<Order, OrderFlowError> {
        if let Some(order) = self.db.attach_payment_ref(id, payment_ref).await? {
            debug!("🔄️ Order {id} is awaiting payment {payment_ref}");
            return Ok(order);
        }
        let order = self.db.fetch_order(id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(id.clone()))?;
        let detail = "a payment reference can only be attached once";
        Err(invalid_transition(&order, OrderStatusType::PaymentPending, detail))
    }

    /// Moves `order` from its current status to `to`.
    ///
    /// Returns `None` if the order was no longer in the status `order` carries, i.e. another trigger has already moved
    /// it. Transitions outside the table are always an error.
    pub async fn try_transition(&self, order: &Order, to: OrderStatusType) -> Result<Option<Order>, OrderFlowError> {
        try_transition(&self.db, order, to).await
    }

    /// As [`Self::try_transition`], but losing the race is an error too.
    pub async fn transition(&self, order: &Order, to: OrderStatusType) -> Result<Order, OrderFlowError> {
        transition(&self.db, order, to).await
    }

    async fn find_payment_order(&self, event: &PaymentEvent) -> Result<Option<Order>, OrderFlowError> {
        if let Some(order) = self.db.fetch_order_by_payment_ref(&event.payment_ref).await? {
            return Ok(Some(order));
        }
        match &event.order_id {
            Some(id) => Ok(self.db.fetch_order(id).await?),
            None => Ok(None),
        }
    }

    /// Handles a "payment succeeded" event. Safe to call any number of times for the same event.
    ///
    /// If the order is found only through the embedded order id and never had its payment reference stored, the
    /// reference is back-filled first. On the `PaymentPending` to `Paid` transition the order-paid hook is fired.
    pub async fn handle_payment_succeeded(
        &self,
        event: &PaymentEvent,
        ctx: &RequestContext,
    ) -> Result<PaymentOutcome, OrderFlowError> {
        let Some(mut order) = self.find_payment_order(event).await? else {
            warn!("🔄️ No order matches successful payment {}", event.payment_ref);
            return Ok(PaymentOutcome::Unmatched);
        };
        if order.status == OrderStatusType::Created && order.payment_ref.is_none() {
            info!("🔄️ Back-filling payment reference {} on order {}", event.payment_ref, order.id);
            let id = order.id.clone();
            order = match self.db.attach_payment_ref(&id, &event.payment_ref).await? {
                Some(o) => o,
                None => self.db.fetch_order(&id).await?.ok_or(OrderFlowError::OrderNotFound(id))?,
            };
        }
        if order.status != OrderStatusType::PaymentPending {
            debug!("🔄️ Order {} is {}. Payment {} was already handled", order.id, order.status, event.payment_ref);
            return Ok(PaymentOutcome::AlreadyHandled(order));
        }
        let Some(paid) = self.try_transition(&order, OrderStatusType::Paid).await? else {
            let current = self.db.fetch_order(&order.id).await?.unwrap_or(order);
            return Ok(PaymentOutcome::AlreadyHandled(current));
        };
        info!("🔄️ Order {} is paid", paid.id);
        let audit = NewAuditEvent::new(AuditEventType::PaymentSucceeded, AuditEntityType::Order, &paid.id)
            .with_user(paid.user_id.as_str())
            .with_origin(ctx.ip.clone(), ctx.user_agent.clone());
        self.producers.record_audit(audit);
        self.producers.publish_order_paid(&paid).await;
        Ok(PaymentOutcome::Applied(paid))
    }

    /// Handles a "payment failed" event. An order awaiting payment is canceled; anything else is left alone. A
    /// failure audit record is written for every matched order.
    pub async fn handle_payment_failed(
        &self,
        event: &PaymentEvent,
        ctx: &RequestContext,
    ) -> Result<PaymentOutcome, OrderFlowError> {
        let Some(order) = self.find_payment_order(event).await? else {
            warn!("🔄️ No order matches failed payment {}", event.payment_ref);
            return Ok(PaymentOutcome::Unmatched);
        };
        let audit = NewAuditEvent::new(AuditEventType::PaymentFailed, AuditEntityType::Order, &order.id)
            .with_user(order.user_id.as_str())
            .with_origin(ctx.ip.clone(), ctx.user_agent.clone());
        let outcome = if order.status == OrderStatusType::PaymentPending {
            match self.try_transition(&order, OrderStatusType::Canceled).await? {
                Some(canceled) => {
                    info!("🔄️ Payment {} failed. Order {} is canceled", event.payment_ref, canceled.id);
                    PaymentOutcome::Applied(canceled)
                },
                None => PaymentOutcome::AlreadyHandled(order),
            }
        } else {
            debug!("🔄️ Order {} is {}. Ignoring failed payment {}", order.id, order.status, event.payment_ref);
            PaymentOutcome::AlreadyHandled(order)
        };
        self.producers.record_audit(audit);
        Ok(outcome)
    }
}
