use chrono::{DateTime, Utc};

use crate::{
    db_types::{NewPrecheck, NewProperty, Precheck, PrecheckId, Property, PropertyId, RulePack},
    traits::StoreError,
};

/// Storage for properties, prechecks and rule packs.
#[allow(async_fn_in_trait)]
pub trait PrecheckManagement {
    /// Returns the property with the same place identifier, creating it if it does not exist yet. Concurrent callers
    /// for the same place identifier all receive the same row.
    async fn fetch_or_create_property(&self, property: NewProperty) -> Result<Property, StoreError>;

    async fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, StoreError>;

    /// The published rule pack with the highest version, if there is one.
    async fn fetch_active_rule_pack(&self) -> Result<Option<RulePack>, StoreError>;

    /// The most recent precheck by `user_id` for the property with `place_id`, created in `[since, until)`.
    async fn fetch_cached_precheck(
        &self,
        user_id: &str,
        place_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Option<Precheck>, StoreError>;

    /// The number of prechecks `user_id` created in `[since, until)`.
    async fn count_prechecks_for_user(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    async fn insert_precheck(&self, precheck: NewPrecheck) -> Result<Precheck, StoreError>;

    async fn fetch_precheck(&self, id: &PrecheckId) -> Result<Option<Precheck>, StoreError>;
}
