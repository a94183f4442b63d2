use sqlx::SqliteConnection;

use crate::db_types::SystemConfigEntry;

pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<Vec<SystemConfigEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT key, value FROM system_configs ORDER BY key").fetch_all(conn).await?;
    Ok(entries)
}

pub async fn upsert(key: &str, value: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO system_configs (key, value, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(chrono::Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}
