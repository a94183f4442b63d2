//! # Backend contracts
//!
//! This module defines the interface contracts that a storage *backend* must satisfy to support the appeal engine.
//! The public APIs in [`crate::appeal_api`] are generic over these traits, so they never touch the database directly.
//!
//! * [`PrecheckManagement`] stores properties and prechecks, and resolves the active rule pack.
//! * [`OrderManagement`] stores orders. Every status change is a conditional update keyed on the current status, and
//!   the order row doubles as the lock that serialises report generation.
//! * [`ReportManagement`] stores reports and their generation history.
//! * [`AuditLog`] persists audit events and answers the per-IP counts used by the rate limiter.
//! * [`SystemConfigStore`] reads the business configuration table.
//! * [`LeadManagement`] stores "notify me" leads.
mod audit_log;
mod lead_management;
mod order_management;
mod precheck_management;
mod report_management;
mod store_error;
mod system_config_store;

pub use audit_log::AuditLog;
pub use lead_management::LeadManagement;
pub use order_management::OrderManagement;
pub use precheck_management::PrecheckManagement;
pub use report_management::ReportManagement;
pub use store_error::StoreError;
pub use system_config_store::SystemConfigStore;
