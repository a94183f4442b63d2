use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{NewOrder, Order, OrderId, OrderStatusType};

/// Inserts a new order in `Created` status. The idempotency key is unique, so a second order for the same precheck
/// and engine version fails with a unique-constraint error.
pub async fn insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let id = OrderId::random();
    let now = Utc::now();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                user_id,
                precheck_id,
                idempotency_key,
                status,
                legal_accepted_at,
                disclaimer_version,
                engine_version,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .bind(order.user_id)
    .bind(order.precheck_id)
    .bind(order.idempotency_key)
    .bind(OrderStatusType::Created)
    .bind(order.legal_accepted_at)
    .bind(order.disclaimer_version)
    .bind(order.engine_version)
    .bind(now)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Order {} inserted for precheck {}", order.id, order.precheck_id);
    Ok(order)
}

pub async fn fetch_by_id(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_by_payment_ref(
    payment_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE payment_ref = $1").bind(payment_ref).fetch_optional(conn).await?;
    Ok(order)
}

/// Compare-and-swap on the status column. Returns `None` if the order was not in `from`.
pub async fn update_status(
    id: &OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(Utc::now())
    .bind(id.as_str())
    .bind(from)
    .fetch_all(conn)
    .await?
    .pop();
    trace!("🗃️ Order {id} status update {from} -> {to}: {}", if order.is_some() { "applied" } else { "no match" });
    Ok(order)
}

/// Sets the payment reference and moves the order to `PaymentPending` in one statement. Only orders in `Created`
/// status are touched.
pub async fn attach_payment_ref(
    id: &OrderId,
    payment_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET payment_ref = $1, status = $2, updated_at = $3
            WHERE id = $4 AND status = $5
            RETURNING *;
        "#,
    )
    .bind(payment_ref)
    .bind(OrderStatusType::PaymentPending)
    .bind(Utc::now())
    .bind(id.as_str())
    .bind(OrderStatusType::Created)
    .fetch_all(conn)
    .await?
    .pop();
    Ok(order)
}

/// Claims the generation lock on the order. The claim succeeds when no lock is held or the held lock has expired.
pub async fn try_lock(
    id: &OrderId,
    token: &str,
    now: DateTime<Utc>,
    until: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET locked_until = $1, lock_token = $2
            WHERE id = $3 AND (locked_until IS NULL OR locked_until < $4)
        "#,
    )
    .bind(until)
    .bind(token)
    .bind(id.as_str())
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn release_lock(id: &OrderId, token: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET locked_until = NULL, lock_token = NULL WHERE id = $1 AND lock_token = $2")
        .bind(id.as_str())
        .bind(token)
        .execute(conn)
        .await?;
    Ok(())
}
