use chrono::{DateTime, Utc};

use crate::{
    db_types::{Order, OrderId, Report, ReportId},
    snapshot::ReportSnapshot,
    traits::StoreError,
};

/// Storage for reports. There is at most one report per order, and it is reused across generation attempts.
#[allow(async_fn_in_trait)]
pub trait ReportManagement {
    /// Returns the order's report, creating an empty one (no attempts yet) if it does not exist.
    async fn fetch_or_create_report(&self, order: &Order) -> Result<Report, StoreError>;

    async fn fetch_report(&self, id: &ReportId) -> Result<Option<Report>, StoreError>;

    async fn fetch_report_for_order(&self, order_id: &OrderId) -> Result<Option<Report>, StoreError>;

    /// Adds one to the attempt counter and stamps the attempt time.
    async fn increment_report_attempt(&self, id: &ReportId, at: DateTime<Utc>) -> Result<Report, StoreError>;

    async fn save_report_snapshot(&self, id: &ReportId, snapshot: &ReportSnapshot) -> Result<(), StoreError>;

    /// Records a successful render and clears any previous error.
    async fn save_report_artifact(
        &self,
        id: &ReportId,
        pdf_url: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Report, StoreError>;

    async fn record_report_error(&self, id: &ReportId, message: &str) -> Result<(), StoreError>;

    /// Reports whose order is `Failed` and that have been attempted fewer than `max_attempts` times, oldest attempt
    /// first.
    async fn fetch_auto_retry_candidates(&self, max_attempts: i64) -> Result<Vec<Report>, StoreError>;
}
