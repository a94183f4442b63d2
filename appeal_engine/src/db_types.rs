use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use property_data::{ComparableSale, County, DataSourceTag, PropertyFacts};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

use crate::helpers::idempotency_key;

/// Version tag of the eligibility computation. Frozen into every precheck, order and report.
pub const ENGINE_VERSION: &str = "e1";
/// Version of the report content template.
pub const TEMPLATE_VERSION: &str = "v1";
/// Version of the PDF layout the renderer is expected to produce.
pub const PDF_VERSION: &str = "p1";
pub const DEFAULT_DISCLAIMER_VERSION: &str = "d1";

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind} value: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    pub fn new<S: Into<String>>(kind: &'static str, value: S) -> Self {
        Self { kind, value: value.into() }
    }
}

//--------------------------------------     Identifiers     ---------------------------------------------------------
macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl<S: Into<String>> From<S> for $name {
            fn from(value: S) -> Self {
                Self(value.into())
            }
        }
    };
}

uuid_id!(PropertyId);
uuid_id!(RulePackId);
uuid_id!(PrecheckId);
uuid_id!(OrderId);
uuid_id!(ReportId);
uuid_id!(LeadId);

//--------------------------------------       Property      ---------------------------------------------------------
/// A geocoded address. Immutable once created, and unique per place identifier.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub place_id: String,
    pub formatted_address: String,
    pub street_number: Option<String>,
    pub route: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub unit_number: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub address_quality_score: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
    pub place_id: String,
    pub formatted_address: String,
    pub street_number: Option<String>,
    pub route: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub unit_number: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub address_quality_score: i64,
}

//--------------------------------------      Rule packs     ---------------------------------------------------------
/// Eligibility thresholds and confidence weights. Penalties are stored as positive numbers and subtracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub min_comps: usize,
    pub min_lower_comps: usize,
    pub outlier_low_factor: f64,
    pub outlier_high_factor: f64,
    pub max_comp_age_months: u32,
    pub confidence_base: f64,
    pub confidence_comps_5_bonus: f64,
    pub confidence_ratio_40_bonus: f64,
    pub confidence_gap_10_bonus: f64,
    pub confidence_low_quality_penalty: f64,
    pub confidence_conflict_penalty: f64,
    pub low_quality_threshold: i64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            min_comps: 3,
            min_lower_comps: 2,
            outlier_low_factor: 0.5,
            outlier_high_factor: 1.5,
            max_comp_age_months: 12,
            confidence_base: 0.5,
            confidence_comps_5_bonus: 0.15,
            confidence_ratio_40_bonus: 0.15,
            confidence_gap_10_bonus: 0.1,
            confidence_low_quality_penalty: 0.15,
            confidence_conflict_penalty: 0.2,
            low_quality_threshold: 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RulePack {
    pub id: RulePackId,
    pub version: i64,
    pub published: bool,
    pub rules_json: Json<RuleConfig>,
    pub created_at: DateTime<Utc>,
}

/// The subset of rule-pack parameters frozen into a precheck, so later rule changes never alter its explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub rule_pack_id: RulePackId,
    pub rule_pack_version: i64,
    pub min_comps: usize,
    pub min_lower_comps: usize,
    pub outlier_low_factor: f64,
    pub outlier_high_factor: f64,
    pub max_comp_age_months: u32,
}

impl From<&RulePack> for SnapshotConfig {
    fn from(pack: &RulePack) -> Self {
        let rules = &pack.rules_json.0;
        Self {
            rule_pack_id: pack.id.clone(),
            rule_pack_version: pack.version,
            min_comps: rules.min_comps,
            min_lower_comps: rules.min_lower_comps,
            outlier_low_factor: rules.outlier_low_factor,
            outlier_high_factor: rules.outlier_high_factor,
            max_comp_age_months: rules.max_comp_age_months,
        }
    }
}

//--------------------------------------  Eligibility enums  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrecheckDecision {
    Eligible,
    NotEligible,
}

impl Display for PrecheckDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrecheckDecision::Eligible => write!(f, "ELIGIBLE"),
            PrecheckDecision::NotEligible => write!(f, "NOT_ELIGIBLE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityFactor {
    CompsFound,
    CompsLowerThanAssessed,
    LowerCompRatioHigh,
    AddressQualityLow,
    PropertyDataConflict,
    InsufficientComps,
    OutlierFiltered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityMetrics {
    pub assessed_value: i64,
    pub comps_used_count: usize,
    pub comps_lower_count: usize,
    pub comps_lower_ratio: f64,
    pub best_lower_comp_gap: f64,
}

//--------------------------------------       Precheck      ---------------------------------------------------------
/// Raw provider output kept with a precheck so that a report can be built later without re-fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecheckMetadata {
    pub data_source: DataSourceTag,
    pub comps_raw_count: usize,
    /// Every comp the provider returned
    pub comps: Vec<ComparableSale>,
    /// The comps that survived the age and outlier filters, in canonical display order
    #[serde(default)]
    pub comps_used: Vec<ComparableSale>,
    pub property_data: PropertyFacts,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Precheck {
    pub id: PrecheckId,
    pub user_id: String,
    pub property_id: PropertyId,
    pub decision: PrecheckDecision,
    pub confidence: f64,
    pub factors: Json<Vec<EligibilityFactor>>,
    pub metrics: Json<EligibilityMetrics>,
    pub snapshot_config: Json<SnapshotConfig>,
    pub rule_pack_id: RulePackId,
    pub metadata: Json<PrecheckMetadata>,
    pub explanation: String,
    pub engine_version: String,
    pub confirmed_by_user: bool,
    pub created_at: DateTime<Utc>,
}

impl Precheck {
    pub fn is_eligible(&self) -> bool {
        self.decision == PrecheckDecision::Eligible
    }

    pub fn county(&self) -> County {
        self.metadata.property_data.county
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPrecheck {
    pub user_id: String,
    pub property_id: PropertyId,
    pub decision: PrecheckDecision,
    pub confidence: f64,
    pub factors: Vec<EligibilityFactor>,
    pub metrics: EligibilityMetrics,
    pub snapshot_config: SnapshotConfig,
    pub metadata: PrecheckMetadata,
    pub explanation: String,
    pub confirmed_by_user: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order exists, but the payment processor has not issued a payment reference for it yet.
    Created,
    /// A checkout session exists and the order is waiting for the payment processor's verdict.
    PaymentPending,
    /// Payment succeeded. Report generation has not started.
    Paid,
    /// A report generation attempt holds the order.
    Processing,
    /// The report was generated and stored.
    Completed,
    /// The last report generation attempt failed. The order can be retried.
    Failed,
    /// Payment failed or the order was abandoned before payment.
    Canceled,
}

impl OrderStatusType {
    /// The central transition table. Any transition not listed here is invalid.
    pub fn allowed_transitions(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            Created => &[PaymentPending, Canceled],
            PaymentPending => &[Paid, Canceled],
            Paid => &[Processing],
            Processing => &[Completed, Failed],
            Failed => &[Processing],
            Completed | Canceled => &[],
        }
    }

    pub fn can_transition_to(&self, to: OrderStatusType) -> bool {
        self.allowed_transitions().contains(&to)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Created => "CREATED",
            OrderStatusType::PaymentPending => "PAYMENT_PENDING",
            OrderStatusType::Paid => "PAID",
            OrderStatusType::Processing => "PROCESSING",
            OrderStatusType::Completed => "COMPLETED",
            OrderStatusType::Failed => "FAILED",
            OrderStatusType::Canceled => "CANCELED",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "PAYMENT_PENDING" => Ok(Self::PaymentPending),
            "PAID" => Ok(Self::Paid),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "CANCELED" => Ok(Self::Canceled),
            s => Err(ConversionError::new("order status", s)),
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    pub precheck_id: PrecheckId,
    pub payment_ref: Option<String>,
    pub idempotency_key: String,
    pub status: OrderStatusType,
    pub legal_accepted_at: DateTime<Utc>,
    pub disclaimer_version: String,
    pub engine_version: String,
    #[serde(skip)]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub lock_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: String,
    pub precheck_id: PrecheckId,
    pub legal_accepted_at: DateTime<Utc>,
    pub disclaimer_version: String,
    pub engine_version: String,
    pub idempotency_key: String,
}

impl NewOrder {
    /// Builds a new order for the current engine version. The idempotency key is derived from the precheck id and
    /// the engine version, so the same precheck can never be ordered twice.
    pub fn new<S: Into<String>>(
        user_id: S,
        precheck_id: PrecheckId,
        legal_accepted_at: DateTime<Utc>,
        disclaimer_version: S,
    ) -> Self {
        let idempotency_key = idempotency_key(&precheck_id, ENGINE_VERSION);
        Self {
            user_id: user_id.into(),
            precheck_id,
            legal_accepted_at,
            disclaimer_version: disclaimer_version.into(),
            engine_version: ENGINE_VERSION.to_string(),
            idempotency_key,
        }
    }
}

//--------------------------------------        Report       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub order_id: OrderId,
    pub user_id: String,
    pub template_version: String,
    pub engine_version: String,
    pub content_snapshot: Option<Json<crate::snapshot::ReportSnapshot>>,
    pub pdf_url: Option<String>,
    pub attempt_count: i64,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      Audit log      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    PrecheckCreated,
    OrderCreated,
    PaymentSucceeded,
    PaymentFailed,
    ReportGenerationStarted,
    ReportGenerated,
    ReportGenerationFailed,
    ReportRetryRequested,
    LeadSubmitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuditEntityType {
    Precheck,
    Order,
    Report,
    Lead,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEvent {
    pub user_id: Option<String>,
    pub event_type: AuditEventType,
    pub entity_type: AuditEntityType,
    pub entity_id: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewAuditEvent {
    pub fn new<S: Display>(event_type: AuditEventType, entity_type: AuditEntityType, entity_id: S) -> Self {
        Self {
            user_id: None,
            event_type,
            entity_type,
            entity_id: entity_id.to_string(),
            ip: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_user<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_origin(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.ip = ip;
        self.user_agent = user_agent;
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AuditEvent {
    pub id: i64,
    pub user_id: Option<String>,
    pub event_type: AuditEventType,
    pub entity_type: AuditEntityType,
    pub entity_id: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Leads        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub user_id: String,
    pub email: String,
    pub tag: String,
    pub recontact_month: i64,
    pub opt_in_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub user_id: String,
    pub email: String,
    pub tag: String,
    pub recontact_month: i64,
}

//--------------------------------------    System config    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SystemConfigEntry {
    pub key: String,
    pub value: String,
}
