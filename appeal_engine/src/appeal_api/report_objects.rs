use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderStatusType, Report, ReportId};

/// The answer to "where is my report?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportStatus {
    pub order_id: OrderId,
    pub order_status: OrderStatusType,
    pub report: Option<ReportSummary>,
}

impl ReportStatus {
    pub fn new(order: &Order, report: Option<&Report>) -> Self {
        Self { order_id: order.id.clone(), order_status: order.status, report: report.map(ReportSummary::from) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: ReportId,
    pub pdf_url: Option<String>,
    pub attempt_count: i64,
    pub last_error: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl From<&Report> for ReportSummary {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            pdf_url: report.pdf_url.clone(),
            attempt_count: report.attempt_count,
            last_error: report.last_error.clone(),
            generated_at: report.generated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryRequest {
    pub report_id: ReportId,
}

/// The result of one automatic retry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrySweep {
    pub candidates: usize,
    pub attempted: Vec<OrderId>,
    pub succeeded: Vec<OrderId>,
}
