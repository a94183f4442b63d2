use std::{future::Future, pin::Pin};

use log::*;

use crate::{events::AuditLogEvent, traits::AuditLog, SqliteDatabase};

/// Builds the audit hook that writes each record to the database. A failed write is logged and otherwise ignored.
pub fn sqlite_audit_sink(
    db: SqliteDatabase,
) -> impl Fn(AuditLogEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
    move |AuditLogEvent(event)| {
        let db = db.clone();
        Box::pin(async move {
            let kind = event.event_type;
            let entity = event.entity_id.clone();
            match db.insert_audit_event(event).await {
                Ok(_) => trace!("📬️ Audit event {kind:?} recorded for {entity}"),
                Err(e) => warn!("📬️ Could not record audit event {kind:?} for {entity}. {e}"),
            }
        })
    }
}
