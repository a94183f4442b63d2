use chrono::{DateTime, Utc};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    traits::StoreError,
};

/// Storage for orders.
///
/// Orders are never deleted and their status is never written unconditionally. Every status change names the status
/// it expects to replace, and a change whose expectation does not hold affects nothing.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Inserts a new order in `Created` status. A second order with the same idempotency key fails with
    /// [`StoreError::UniqueViolation`].
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>, StoreError>;

    /// Sets the status to `to` if, and only if, the order is currently in `from`. Returns the updated order, or
    /// `None` if no row matched.
    async fn transition_order(
        &self,
        id: &OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, StoreError>;

    /// Stores the payment reference and moves the order from `Created` to `PaymentPending` in a single write.
    /// Returns `None` if the order is not in `Created` status.
    async fn attach_payment_ref(&self, id: &OrderId, payment_ref: &str) -> Result<Option<Order>, StoreError>;

    /// Claims the order's generation lock until `until`. Succeeds only if the lock is free or has expired at `now`.
    async fn try_lock_order(
        &self,
        id: &OrderId,
        token: &str,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Releases the lock if it is still held with `token`.
    async fn release_order_lock(&self, id: &OrderId, token: &str) -> Result<(), StoreError>;
}
