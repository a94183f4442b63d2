use sqlx::SqliteConnection;

use crate::db_types::RulePack;

/// The published rule pack with the highest version.
pub async fn fetch_active(conn: &mut SqliteConnection) -> Result<Option<RulePack>, sqlx::Error> {
    let pack = sqlx::query_as("SELECT * FROM rule_packs WHERE published = TRUE ORDER BY version DESC LIMIT 1")
        .fetch_optional(conn)
        .await?;
    Ok(pack)
}
