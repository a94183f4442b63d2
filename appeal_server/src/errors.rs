use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use appeal_engine::{LeadError, OrderFlowError, PrecheckError, RateLimitError, ReportError};
use log::error;
use serde::Serialize;
use thiserror::Error;

use crate::integrations::payments::PaymentProcessorError;

/// What the caller should do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Fix the request and resubmit.
    FixInput,
    /// Wait, then try again.
    RetryLater,
    /// Retrying will not help. Contact support.
    Terminal,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("The X-User-Id header is missing or empty")]
    MissingUserId,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request query: {0}")]
    InvalidRequestQuery(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    QuotaExceeded { message: String, limit: i64 },
    #[error("{0}")]
    Busy(String),
    #[error("An upstream service failed. {0}")]
    UpstreamError(String),
    #[error("{0}")]
    UpstreamTimeout(String),
    #[error("{0}")]
    RetryLimitReached(String),
    #[error("{0}")]
    InvalidStateTransition(String),
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingUserId |
            Self::InvalidRequestBody(_) |
            Self::InvalidRequestQuery(_) |
            Self::ValidationError(_) |
            Self::NoRecordFound(_) |
            Self::Conflict(_) => ErrorKind::FixInput,
            Self::QuotaExceeded { .. } | Self::Busy(_) | Self::UpstreamError(_) | Self::UpstreamTimeout(_) => {
                ErrorKind::RetryLater
            },
            Self::InitializeError(_) |
            Self::BackendError(_) |
            Self::IOError(_) |
            Self::ConfigurationError(_) |
            Self::Unspecified(_) |
            Self::RetryLimitReached(_) |
            Self::InvalidStateTransition(_) => ErrorKind::Terminal,
        }
    }

    pub fn limit(&self) -> Option<i64> {
        match self {
            Self::QuotaExceeded { limit, .. } => Some(*limit),
            _ => None,
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingUserId => StatusCode::UNAUTHORIZED,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestQuery(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::RetryLimitReached(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Busy(_) => StatusCode::CONFLICT,
            Self::InvalidStateTransition(_) => StatusCode::CONFLICT,
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        if let Some(limit) = self.limit() {
            body["limit"] = limit.into();
        }
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<PrecheckError> for ServerError {
    fn from(e: PrecheckError) -> Self {
        match e {
            PrecheckError::ValidationError(_) | PrecheckError::AddressConfirmationRequired { .. } => {
                Self::ValidationError(e.to_string())
            },
            PrecheckError::DailyLimitExceeded { limit } => Self::QuotaExceeded { message: e.to_string(), limit },
            PrecheckError::BudgetExceeded(_) => Self::UpstreamTimeout(e.to_string()),
            PrecheckError::NoActiveRulePack => {
                error!("💻️ There is no published rule pack. Prechecks cannot run until one is published.");
                Self::ConfigurationError(e.to_string())
            },
            PrecheckError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::ValidationError(_) | OrderFlowError::PrecheckNotEligible(_) => {
                Self::ValidationError(e.to_string())
            },
            OrderFlowError::PrecheckNotFound(_) | OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::ActiveOrderExists(_) => Self::Conflict(e.to_string()),
            OrderFlowError::InvalidTransition { .. } => Self::InvalidStateTransition(e.to_string()),
            OrderFlowError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<ReportError> for ServerError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::OrderNotFound(_) | ReportError::ReportNotFound => Self::NoRecordFound(e.to_string()),
            ReportError::OrderNotGeneratable(_) | ReportError::OrderNotRetryable(_) => {
                Self::ValidationError(e.to_string())
            },
            ReportError::MaxRetriesReached(_) => Self::RetryLimitReached(e.to_string()),
            ReportError::LockUnavailable(_) => Self::Busy(e.to_string()),
            ReportError::RenderFailed(_) => Self::UpstreamError(e.to_string()),
            ReportError::SnapshotFailed(_) => Self::BackendError(e.to_string()),
            ReportError::OrderFlow(e) => e.into(),
            ReportError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<RateLimitError> for ServerError {
    fn from(e: RateLimitError) -> Self {
        Self::QuotaExceeded { message: e.to_string(), limit: e.limit }
    }
}

impl From<LeadError> for ServerError {
    fn from(e: LeadError) -> Self {
        match e {
            LeadError::ValidationError(_) => Self::ValidationError(e.to_string()),
            LeadError::LeadNotFound(_) => Self::NoRecordFound(e.to_string()),
            LeadError::DatabaseError(s) => Self::BackendError(s),
        }
    }
}

impl From<PaymentProcessorError> for ServerError {
    fn from(e: PaymentProcessorError) -> Self {
        Self::UpstreamError(e.to_string())
    }
}
