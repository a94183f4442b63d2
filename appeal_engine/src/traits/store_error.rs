use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    /// A uniqueness constraint rejected the write. Callers map this onto a domain error.
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),
    #[error("Stored data could not be decoded: {0}")]
    DataError(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::UniqueViolation(db.message().to_string())
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => StoreError::DataError(e.to_string()),
            e => StoreError::DatabaseError(e.to_string()),
        }
    }
}
