use appeal_engine::{
    db_types::{
        AuditEntityType,
        AuditEvent,
        Lead,
        LeadId,
        NewAuditEvent,
        NewLead,
        NewOrder,
        NewPrecheck,
        NewProperty,
        Order,
        OrderId,
        OrderStatusType,
        Precheck,
        PrecheckId,
        Property,
        PropertyId,
        Report,
        ReportId,
        RulePack,
        SystemConfigEntry,
    },
    snapshot::ReportSnapshot,
    AuditLog,
    LeadManagement,
    OrderManagement,
    PrecheckManagement,
    ReportManagement,
    StoreError,
    SystemConfigStore,
};
use chrono::{DateTime, Utc};
use mockall::mock;

use crate::integrations::payments::{CheckoutRequest, CheckoutSession, PaymentProcessor, PaymentProcessorError};

mock! {
    pub Backend {}
    impl PrecheckManagement for Backend {
        async fn fetch_or_create_property(&self, property: NewProperty) -> Result<Property, StoreError>;
        async fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, StoreError>;
        async fn fetch_active_rule_pack(&self) -> Result<Option<RulePack>, StoreError>;
        async fn fetch_cached_precheck(&self, user_id: &str, place_id: &str, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Option<Precheck>, StoreError>;
        async fn count_prechecks_for_user(&self, user_id: &str, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<i64, StoreError>;
        async fn insert_precheck(&self, precheck: NewPrecheck) -> Result<Precheck, StoreError>;
        async fn fetch_precheck(&self, id: &PrecheckId) -> Result<Option<Precheck>, StoreError>;
    }
    impl OrderManagement for Backend {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;
        async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;
        async fn fetch_order_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>, StoreError>;
        async fn transition_order(&self, id: &OrderId, from: OrderStatusType, to: OrderStatusType) -> Result<Option<Order>, StoreError>;
        async fn attach_payment_ref(&self, id: &OrderId, payment_ref: &str) -> Result<Option<Order>, StoreError>;
        async fn try_lock_order(&self, id: &OrderId, token: &str, now: DateTime<Utc>, until: DateTime<Utc>) -> Result<bool, StoreError>;
        async fn release_order_lock(&self, id: &OrderId, token: &str) -> Result<(), StoreError>;
    }
    impl ReportManagement for Backend {
        async fn fetch_or_create_report(&self, order: &Order) -> Result<Report, StoreError>;
        async fn fetch_report(&self, id: &ReportId) -> Result<Option<Report>, StoreError>;
        async fn fetch_report_for_order(&self, order_id: &OrderId) -> Result<Option<Report>, StoreError>;
        async fn increment_report_attempt(&self, id: &ReportId, at: DateTime<Utc>) -> Result<Report, StoreError>;
        async fn save_report_snapshot(&self, id: &ReportId, snapshot: &ReportSnapshot) -> Result<(), StoreError>;
        async fn save_report_artifact(&self, id: &ReportId, pdf_url: &str, generated_at: DateTime<Utc>) -> Result<Report, StoreError>;
        async fn record_report_error(&self, id: &ReportId, message: &str) -> Result<(), StoreError>;
        async fn fetch_auto_retry_candidates(&self, max_attempts: i64) -> Result<Vec<Report>, StoreError>;
    }
    impl AuditLog for Backend {
        async fn insert_audit_event(&self, event: NewAuditEvent) -> Result<AuditEvent, StoreError>;
        async fn count_audit_events_for_ip(&self, ip: &str, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<i64, StoreError>;
        async fn fetch_audit_events_for_entity(&self, entity_type: AuditEntityType, entity_id: &str) -> Result<Vec<AuditEvent>, StoreError>;
    }
    impl LeadManagement for Backend {
        async fn insert_lead(&self, lead: NewLead) -> Result<Lead, StoreError>;
        async fn fetch_lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError>;
        async fn confirm_lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError>;
    }
    impl SystemConfigStore for Backend {
        async fn fetch_system_config_entries(&self) -> Result<Vec<SystemConfigEntry>, StoreError>;
        async fn upsert_system_config(&self, key: &str, value: &str) -> Result<(), StoreError>;
    }
}

mock! {
    pub Payments {}
    impl PaymentProcessor for Payments {
        async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentProcessorError>;
    }
}

/// A backend whose business configuration table is empty, so the defaults apply.
pub fn backend_with_defaults() -> MockBackend {
    let mut db = MockBackend::new();
    db.expect_fetch_system_config_entries().returning(|| Ok(Vec::new()));
    db
}

/// A rate limiter backend that reports `ip_count` requests from the caller's address and `user_count` prechecks by the
/// caller today.
pub fn limiter_backend(ip_count: i64, user_count: i64) -> MockBackend {
    let mut db = MockBackend::new();
    db.expect_count_audit_events_for_ip().returning(move |_, _, _| Ok(ip_count));
    db.expect_count_prechecks_for_user().returning(move |_, _, _| Ok(user_count));
    db
}
