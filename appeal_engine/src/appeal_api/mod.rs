//! # Appeal engine public API
//!
//! The `appeal_api` module exposes the programmatic API of the engine. The API is modular, so callers construct only
//! the parts they need, each over a backend that implements the traits that part requires.
//!
//! * [`precheck_api`] runs the eligibility precheck for an address: the quality gate, the same-day cache, the daily
//!   quota, the budgeted property-data fetch, and persistence.
//! * [`order_flow_api`] owns the order state machine: order creation, payment reference attachment, and the reaction
//!   to payment success and failure events.
//! * [`report_api`] runs report generation under the order lock, manual retries, status queries, and the automatic
//!   retry sweep.
//! * [`rate_limiter`] enforces the per-IP and per-user daily request limits.
//! * [`lead_api`] stores "notify me" leads.
//!
//! # API usage
//!
//! ```rust,ignore
//! use appeal_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements OrderManagement and PrecheckManagement
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let order = api.create_order("user-1", &request, &config, &ctx).await?;
//! ```
use crate::helpers::normalize_ip;

pub mod errors;
pub mod lead_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod precheck_api;
pub mod precheck_objects;
pub mod rate_limiter;
pub mod report_api;
pub mod report_objects;

/// Where a request came from. Attached to the audit records the request produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// A blank or `unknown` address is stored as no address.
    pub fn new(ip: Option<&str>, user_agent: Option<&str>) -> Self {
        Self { ip: normalize_ip(ip).map(String::from), user_agent: user_agent.map(String::from) }
    }

    /// For calls that do not originate from a client request, such as webhooks and background retries.
    pub fn system() -> Self {
        Self::default()
    }
}
