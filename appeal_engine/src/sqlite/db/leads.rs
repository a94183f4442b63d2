use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{Lead, LeadId, NewLead};

pub async fn insert(lead: NewLead, conn: &mut SqliteConnection) -> Result<Lead, sqlx::Error> {
    let lead = sqlx::query_as(
        r#"
            INSERT INTO leads (id, user_id, email, tag, recontact_month, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(LeadId::random().as_str())
    .bind(lead.user_id)
    .bind(lead.email)
    .bind(lead.tag)
    .bind(lead.recontact_month)
    .bind(Utc::now())
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(lead)
}

pub async fn fetch_by_id(id: &LeadId, conn: &mut SqliteConnection) -> Result<Option<Lead>, sqlx::Error> {
    let lead = sqlx::query_as("SELECT * FROM leads WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(lead)
}

/// Sets the confirmation time only the first time a lead is confirmed.
pub async fn confirm(id: &LeadId, conn: &mut SqliteConnection) -> Result<Option<Lead>, sqlx::Error> {
    sqlx::query("UPDATE leads SET opt_in_confirmed_at = $1 WHERE id = $2 AND opt_in_confirmed_at IS NULL")
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;
    fetch_by_id(id, conn).await
}
