use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewProperty, Property, PropertyId};

/// Inserts the property unless one with the same place identifier already exists, then returns the stored row.
/// The insert and the read are separate statements, so concurrent callers converge on whichever row won the insert.
pub async fn fetch_or_create(property: NewProperty, conn: &mut SqliteConnection) -> Result<Property, sqlx::Error> {
    let id = PropertyId::random();
    let result = sqlx::query(
        r#"
            INSERT INTO properties (
                id,
                place_id,
                formatted_address,
                street_number,
                route,
                locality,
                postal_code,
                country,
                unit_number,
                lat,
                lng,
                address_quality_score,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (place_id) DO NOTHING;
        "#,
    )
    .bind(id.as_str())
    .bind(&property.place_id)
    .bind(&property.formatted_address)
    .bind(&property.street_number)
    .bind(&property.route)
    .bind(&property.locality)
    .bind(&property.postal_code)
    .bind(&property.country)
    .bind(&property.unit_number)
    .bind(property.lat)
    .bind(property.lng)
    .bind(property.address_quality_score)
    .bind(chrono::Utc::now())
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() > 0 {
        debug!("🗃️ Property {id} created for place {}", property.place_id);
    }
    let stored = sqlx::query_as("SELECT * FROM properties WHERE place_id = $1")
        .bind(&property.place_id)
        .fetch_one(conn)
        .await?;
    Ok(stored)
}

pub async fn fetch_by_id(id: &PropertyId, conn: &mut SqliteConnection) -> Result<Option<Property>, sqlx::Error> {
    let property =
        sqlx::query_as("SELECT * FROM properties WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(property)
}
