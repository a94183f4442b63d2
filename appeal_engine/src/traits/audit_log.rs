use chrono::{DateTime, Utc};

use crate::{
    db_types::{AuditEntityType, AuditEvent, NewAuditEvent},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait AuditLog {
    async fn insert_audit_event(&self, event: NewAuditEvent) -> Result<AuditEvent, StoreError>;

    /// The number of audit events recorded from `ip` in `[since, until)`.
    async fn count_audit_events_for_ip(
        &self,
        ip: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// All audit events for one entity, oldest first.
    async fn fetch_audit_events_for_entity(
        &self,
        entity_type: AuditEntityType,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>, StoreError>;
}
