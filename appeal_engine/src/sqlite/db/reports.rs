use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{Order, OrderId, OrderStatusType, Report, ReportId, TEMPLATE_VERSION},
    snapshot::ReportSnapshot,
};

/// Returns the report for the order, creating it first if necessary. The `order_id` column is unique, so a
/// concurrent creator simply loses the insert and reads the winner's row.
pub async fn fetch_or_create(order: &Order, conn: &mut SqliteConnection) -> Result<Report, sqlx::Error> {
    let id = ReportId::random();
    let result = sqlx::query(
        r#"
            INSERT INTO reports (id, order_id, user_id, template_version, engine_version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (order_id) DO NOTHING;
        "#,
    )
    .bind(id.as_str())
    .bind(order.id.as_str())
    .bind(&order.user_id)
    .bind(TEMPLATE_VERSION)
    .bind(&order.engine_version)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() > 0 {
        debug!("🗃️ Report {id} created for order {}", order.id);
    }
    let report =
        sqlx::query_as("SELECT * FROM reports WHERE order_id = $1").bind(order.id.as_str()).fetch_one(conn).await?;
    Ok(report)
}

pub async fn fetch_by_id(id: &ReportId, conn: &mut SqliteConnection) -> Result<Option<Report>, sqlx::Error> {
    let report = sqlx::query_as("SELECT * FROM reports WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(report)
}

pub async fn fetch_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Report>, sqlx::Error> {
    let report =
        sqlx::query_as("SELECT * FROM reports WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(report)
}

pub async fn increment_attempt(
    id: &ReportId,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Report, sqlx::Error> {
    let report = sqlx::query_as(
        "UPDATE reports SET attempt_count = attempt_count + 1, last_attempt_at = $1 WHERE id = $2 RETURNING *",
    )
    .bind(at)
    .bind(id.as_str())
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(report)
}

pub async fn save_snapshot(
    id: &ReportId,
    snapshot: &ReportSnapshot,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE reports SET content_snapshot = $1 WHERE id = $2")
        .bind(Json(snapshot))
        .bind(id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn save_artifact(
    id: &ReportId,
    pdf_url: &str,
    generated_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Report, sqlx::Error> {
    let report = sqlx::query_as(
        "UPDATE reports SET pdf_url = $1, generated_at = $2, last_error = NULL WHERE id = $3 RETURNING *",
    )
    .bind(pdf_url)
    .bind(generated_at)
    .bind(id.as_str())
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(report)
}

pub async fn record_error(id: &ReportId, message: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE reports SET last_error = $1 WHERE id = $2")
        .bind(message)
        .bind(id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_failed_below_attempts(
    max_attempts: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Report>, sqlx::Error> {
    let reports = sqlx::query_as(
        r#"
            SELECT reports.* FROM reports
            JOIN orders ON orders.id = reports.order_id
            WHERE orders.status = $1 AND reports.attempt_count < $2
            ORDER BY reports.last_attempt_at ASC
        "#,
    )
    .bind(OrderStatusType::Failed)
    .bind(max_attempts)
    .fetch_all(conn)
    .await?;
    Ok(reports)
}
