use crate::{db_types::SystemConfigEntry, traits::StoreError};

/// The key/value table behind [`crate::SystemConfig`]. It is administered out-of-band; the engine only reads it.
#[allow(async_fn_in_trait)]
pub trait SystemConfigStore {
    async fn fetch_system_config_entries(&self) -> Result<Vec<SystemConfigEntry>, StoreError>;

    async fn upsert_system_config(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
