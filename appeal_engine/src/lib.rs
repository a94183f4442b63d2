//! Appeal Engine
//!
//! The Appeal Engine takes a homeowner's geocoded address through an automated assessment-appeal eligibility check
//! ("precheck"), an idempotent paid order for a report, and a retryable, lock-protected report-generation job.
//! The library is storage-agnostic.
//!
//! The library is divided into these main sections:
//! 1. Pure domain logic: the eligibility engine ([`mod@eligibility`]), the recommendation and legal templates, and the
//!    report content snapshot builder. None of these perform I/O.
//! 2. Backend contracts ([`mod@traits`]) and the SQLite implementation of them ([`SqliteDatabase`]). You should never
//!    need to access the database directly. The types stored in the database live in [`mod@db_types`] and are public.
//! 3. The public API ([`mod@appeal_api`]). [`PrecheckApi`], [`OrderFlowApi`], [`ReportApi`], [`LeadApi`] and the
//!    [`RateLimiter`] are each generic over the backend traits they need.
//!
//! Side effects (audit records, report generation after payment) are dispatched through the event hooks in
//! [`mod@events`] so that a slow or failing sink never blocks the request that produced the event.
pub mod appeal_api;
pub mod config;
pub mod db_types;
pub mod eligibility;
pub mod events;
pub mod helpers;
pub mod legal;
pub mod recommendation;
pub mod renderer;
pub mod snapshot;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use appeal_api::{
    errors::{LeadError, OrderFlowError, PrecheckError, RateLimitError, ReportError},
    lead_api::{LeadApi, LeadReceipt, LeadRequest},
    order_flow_api::OrderFlowApi,
    order_objects,
    precheck_api::PrecheckApi,
    precheck_objects,
    rate_limiter::{RateLimitLayer, RateLimiter},
    report_api::{auto_retry_backoff, ReportApi, ORDER_LOCK_TTL_SECS},
    report_objects,
    RequestContext,
};
pub use config::{load_system_config, CivilDay, SystemConfig};
pub use renderer::{DigestRenderer, RenderError, ReportRenderer};
#[cfg(feature = "sqlite")]
pub use sqlite::{db, SqliteDatabase};
pub use traits::{
    AuditLog,
    LeadManagement,
    OrderManagement,
    PrecheckManagement,
    ReportManagement,
    StoreError,
    SystemConfigStore,
};
