use thiserror::Error;

use crate::{
    appeal_api::rate_limiter::RateLimitLayer,
    db_types::{LeadId, OrderId, OrderStatusType, PrecheckId},
    traits::StoreError,
};

#[derive(Debug, Clone, Error)]
pub enum PrecheckError {
    #[error("Invalid precheck request. {0}")]
    ValidationError(String),
    /// The user must confirm a low-quality address before the check can run.
    #[error("Address quality score below threshold. User confirmation required.")]
    AddressConfirmationRequired { score: i64, threshold: i64 },
    #[error("Daily precheck limit of {limit} exceeded")]
    DailyLimitExceeded { limit: i64 },
    #[error("Precheck total budget of {0} ms exceeded")]
    BudgetExceeded(u64),
    #[error("No published rule pack found")]
    NoActiveRulePack,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for PrecheckError {
    fn from(e: StoreError) -> Self {
        PrecheckError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Invalid order request. {0}")]
    ValidationError(String),
    #[error("Precheck not found")]
    PrecheckNotFound(PrecheckId),
    #[error("Only eligible prechecks can be purchased")]
    PrecheckNotEligible(PrecheckId),
    #[error("An active order already exists for precheck {0}")]
    ActiveOrderExists(PrecheckId),
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),
    #[error("Invalid order transition: {from} → {to} for order {order_id} ({detail})")]
    InvalidTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType, detail: String },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for OrderFlowError {
    fn from(e: StoreError) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),
    #[error("Report not found")]
    ReportNotFound,
    #[error("Cannot generate report for order in {0} status")]
    OrderNotGeneratable(OrderStatusType),
    #[error("Can only retry failed orders")]
    OrderNotRetryable(OrderStatusType),
    #[error("Maximum retry attempts ({0}) reached")]
    MaxRetriesReached(i64),
    #[error("Report generation for order {0} is already in progress")]
    LockUnavailable(OrderId),
    #[error("Could not build the report content. {0}")]
    SnapshotFailed(String),
    #[error("Report rendering failed. {0}")]
    RenderFailed(String),
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for ReportError {
    fn from(e: StoreError) -> Self {
        ReportError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Too many requests. The {layer} limit of {limit} per day has been reached.")]
pub struct RateLimitError {
    pub layer: RateLimitLayer,
    pub limit: i64,
}

#[derive(Debug, Clone, Error)]
pub enum LeadError {
    #[error("Invalid lead request. {0}")]
    ValidationError(String),
    #[error("Lead {0} not found")]
    LeadNotFound(LeadId),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<StoreError> for LeadError {
    fn from(e: StoreError) -> Self {
        LeadError::DatabaseError(e.to_string())
    }
}
