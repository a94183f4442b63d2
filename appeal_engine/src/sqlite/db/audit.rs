use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{AuditEntityType, AuditEvent, NewAuditEvent};

pub async fn insert(event: NewAuditEvent, conn: &mut SqliteConnection) -> Result<AuditEvent, sqlx::Error> {
    let event = sqlx::query_as(
        r#"
            INSERT INTO audit_events (user_id, event_type, entity_type, entity_id, ip, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(event.user_id)
    .bind(event.event_type)
    .bind(event.entity_type)
    .bind(event.entity_id)
    .bind(event.ip)
    .bind(event.user_agent)
    .bind(event.created_at)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(event)
}

pub async fn count_for_ip(
    ip: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_events WHERE ip = $1 AND created_at >= $2 AND created_at < $3")
            .bind(ip)
            .bind(since)
            .bind(until)
            .fetch_one(conn)
            .await?;
    Ok(count)
}

pub async fn fetch_for_entity(
    entity_type: AuditEntityType,
    entity_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    let events = sqlx::query_as("SELECT * FROM audit_events WHERE entity_type = $1 AND entity_id = $2 ORDER BY id ASC")
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(conn)
        .await?;
    Ok(events)
}
