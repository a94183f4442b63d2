use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{NewPrecheck, Precheck, PrecheckId, ENGINE_VERSION};

pub async fn insert(precheck: NewPrecheck, conn: &mut SqliteConnection) -> Result<Precheck, sqlx::Error> {
    let id = PrecheckId::random();
    let rule_pack_id = precheck.snapshot_config.rule_pack_id.clone();
    let precheck: Precheck = sqlx::query_as(
        r#"
            INSERT INTO prechecks (
                id,
                user_id,
                property_id,
                decision,
                confidence,
                factors,
                metrics,
                snapshot_config,
                rule_pack_id,
                metadata,
                explanation,
                engine_version,
                confirmed_by_user,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .bind(precheck.user_id)
    .bind(precheck.property_id)
    .bind(precheck.decision)
    .bind(precheck.confidence)
    .bind(Json(precheck.factors))
    .bind(Json(precheck.metrics))
    .bind(Json(precheck.snapshot_config))
    .bind(rule_pack_id)
    .bind(Json(precheck.metadata))
    .bind(precheck.explanation)
    .bind(ENGINE_VERSION)
    .bind(precheck.confirmed_by_user)
    .bind(precheck.created_at)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Precheck {} saved for user {} ({})", precheck.id, precheck.user_id, precheck.decision);
    Ok(precheck)
}

pub async fn fetch_by_id(id: &PrecheckId, conn: &mut SqliteConnection) -> Result<Option<Precheck>, sqlx::Error> {
    let precheck =
        sqlx::query_as("SELECT * FROM prechecks WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(precheck)
}

/// The most recent precheck by the user for the property with the given place identifier within `[since, until)`.
pub async fn fetch_latest_for_place(
    user_id: &str,
    place_id: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Precheck>, sqlx::Error> {
    let precheck = sqlx::query_as(
        r#"
            SELECT prechecks.* FROM prechecks
            JOIN properties ON properties.id = prechecks.property_id
            WHERE prechecks.user_id = $1
              AND properties.place_id = $2
              AND prechecks.created_at >= $3
              AND prechecks.created_at < $4
            ORDER BY prechecks.created_at DESC
            LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(place_id)
    .bind(since)
    .bind(until)
    .fetch_optional(conn)
    .await?;
    Ok(precheck)
}

pub async fn count_for_user(
    user_id: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM prechecks WHERE user_id = $1 AND created_at >= $2 AND created_at < $3",
    )
    .bind(user_id)
    .bind(since)
    .bind(until)
    .fetch_one(conn)
    .await?;
    Ok(count)
}
