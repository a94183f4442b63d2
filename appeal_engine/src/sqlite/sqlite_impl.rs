//! `SqliteDatabase` is a concrete implementation of an appeal engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Each trait method borrows one connection from the pool and delegates to the functions in [`super::db`].
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{audit, db_url, leads, new_pool, orders, prechecks, properties, reports, rule_packs, system_config};
use crate::{
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
    traits::{
        AuditLog,
        LeadManagement,
        OrderManagement,
        PrecheckManagement,
        ReportManagement,
        StoreError,
        SystemConfigStore,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PrecheckManagement for SqliteDatabase {
    async fn fetch_or_create_property(&self, property: NewProperty) -> Result<Property, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let property = properties::fetch_or_create(property, &mut conn).await?;
        Ok(property)
    }

    async fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let property = properties::fetch_by_id(id, &mut conn).await?;
        Ok(property)
    }

    async fn fetch_active_rule_pack(&self) -> Result<Option<RulePack>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let pack = rule_packs::fetch_active(&mut conn).await?;
        Ok(pack)
    }

    async fn fetch_cached_precheck(
        &self,
        user_id: &str,
        place_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Option<Precheck>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let precheck = prechecks::fetch_latest_for_place(user_id, place_id, since, until, &mut conn).await?;
        Ok(precheck)
    }

    async fn count_prechecks_for_user(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let count = prechecks::count_for_user(user_id, since, until, &mut conn).await?;
        Ok(count)
    }

    async fn insert_precheck(&self, precheck: NewPrecheck) -> Result<Precheck, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let precheck = prechecks::insert(precheck, &mut conn).await?;
        Ok(precheck)
    }

    async fn fetch_precheck(&self, id: &PrecheckId) -> Result<Option<Precheck>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let precheck = prechecks::fetch_by_id(id, &mut conn).await?;
        Ok(precheck)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::insert(order, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_by_payment_ref(payment_ref, &mut conn).await?;
        Ok(order)
    }

    async fn transition_order(
        &self,
        id: &OrderId,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_status(id, from, to, &mut conn).await?;
        Ok(order)
    }

    async fn attach_payment_ref(&self, id: &OrderId, payment_ref: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::attach_payment_ref(id, payment_ref, &mut conn).await?;
        Ok(order)
    }

    async fn try_lock_order(
        &self,
        id: &OrderId,
        token: &str,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let locked = orders::try_lock(id, token, now, until, &mut conn).await?;
        Ok(locked)
    }

    async fn release_order_lock(&self, id: &OrderId, token: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::release_lock(id, token, &mut conn).await?;
        Ok(())
    }
}

impl ReportManagement for SqliteDatabase {
    async fn fetch_or_create_report(&self, order: &Order) -> Result<Report, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let report = reports::fetch_or_create(order, &mut conn).await?;
        Ok(report)
    }

    async fn fetch_report(&self, id: &ReportId) -> Result<Option<Report>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let report = reports::fetch_by_id(id, &mut conn).await?;
        Ok(report)
    }

    async fn fetch_report_for_order(&self, order_id: &OrderId) -> Result<Option<Report>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let report = reports::fetch_for_order(order_id, &mut conn).await?;
        Ok(report)
    }

    async fn increment_report_attempt(&self, id: &ReportId, at: DateTime<Utc>) -> Result<Report, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let report = reports::increment_attempt(id, at, &mut conn).await?;
        Ok(report)
    }

    async fn save_report_snapshot(&self, id: &ReportId, snapshot: &ReportSnapshot) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        reports::save_snapshot(id, snapshot, &mut conn).await?;
        Ok(())
    }

    async fn save_report_artifact(
        &self,
        id: &ReportId,
        pdf_url: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Report, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let report = reports::save_artifact(id, pdf_url, generated_at, &mut conn).await?;
        Ok(report)
    }

    async fn record_report_error(&self, id: &ReportId, message: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        reports::record_error(id, message, &mut conn).await?;
        Ok(())
    }

    async fn fetch_auto_retry_candidates(&self, max_attempts: i64) -> Result<Vec<Report>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let reports = reports::fetch_failed_below_attempts(max_attempts, &mut conn).await?;
        Ok(reports)
    }
}

impl AuditLog for SqliteDatabase {
    async fn insert_audit_event(&self, event: NewAuditEvent) -> Result<AuditEvent, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let event = audit::insert(event, &mut conn).await?;
        Ok(event)
    }

    async fn count_audit_events_for_ip(
        &self,
        ip: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let count = audit::count_for_ip(ip, since, until, &mut conn).await?;
        Ok(count)
    }

    async fn fetch_audit_events_for_entity(
        &self,
        entity_type: AuditEntityType,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let events = audit::fetch_for_entity(entity_type, entity_id, &mut conn).await?;
        Ok(events)
    }
}

impl SystemConfigStore for SqliteDatabase {
    async fn fetch_system_config_entries(&self) -> Result<Vec<SystemConfigEntry>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let entries = system_config::fetch_all(&mut conn).await?;
        Ok(entries)
    }

    async fn upsert_system_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        system_config::upsert(key, value, &mut conn).await?;
        Ok(())
    }
}

impl LeadManagement for SqliteDatabase {
    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let lead = leads::insert(lead, &mut conn).await?;
        Ok(lead)
    }

    async fn fetch_lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let lead = leads::fetch_by_id(id, &mut conn).await?;
        Ok(lead)
    }

    async fn confirm_lead(&self, id: &LeadId) -> Result<Option<Lead>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let lead = leads::confirm(id, &mut conn).await?;
        Ok(lead)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
