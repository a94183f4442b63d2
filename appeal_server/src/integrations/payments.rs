//! Payment processor client.
//!
//! The processor hosts the checkout page. We create a checkout session per order, carrying the order and user ids as
//! metadata so that webhook deliveries can be correlated with the order even if the payment reference was never
//! stored. The session's payment reference is attached to the order straight away.
use std::sync::Arc;

use appeal_common::{Secret, UsdCents, USD_CURRENCY_CODE};
use appeal_engine::db_types::OrderId;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const REPORT_PRODUCT_NAME: &str = "Property Tax Appeal Report";
pub const REPORT_PRODUCT_DESCRIPTION: &str = "Assessment appeal eligibility report with comparable sales";

#[derive(Debug, Clone, Error)]
pub enum PaymentProcessorError {
    #[error("Could not initialize the payment client. {0}")]
    Initialization(String),
    #[error("Could not reach the payment processor. {0}")]
    RequestError(String),
    #[error("The payment processor returned an error. Status {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid response from the payment processor. {0}")]
    JsonError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutMetadata {
    pub order_id: OrderId,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRequest {
    pub name: String,
    pub description: String,
    pub currency: String,
    /// Price in cents.
    pub unit_amount: UsdCents,
    pub quantity: u32,
    pub metadata: CheckoutMetadata,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutRequest {
    /// A one-off purchase of a single report for `order_id`.
    pub fn for_report(order_id: &OrderId, user_id: &str, price: UsdCents, site_url: &str) -> Self {
        Self {
            name: REPORT_PRODUCT_NAME.to_string(),
            description: REPORT_PRODUCT_DESCRIPTION.to_string(),
            currency: USD_CURRENCY_CODE.to_string(),
            unit_amount: price,
            quantity: 1,
            metadata: CheckoutMetadata { order_id: order_id.clone(), user_id: user_id.to_string() },
            success_url: format!("{site_url}/home/reports?highlight={order_id}"),
            cancel_url: format!("{site_url}/home"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    /// Not every processor issues the payment reference when the session is created. If it is missing here, the
    /// webhook back-fills it from the order id in the metadata.
    #[serde(default)]
    pub payment_ref: Option<String>,
    #[serde(alias = "url")]
    pub checkout_url: String,
}

#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentProcessorError>;
}

#[derive(Clone)]
pub struct PaymentClient {
    base_url: String,
    client: Arc<Client>,
}

impl PaymentClient {
    pub fn new(base_url: &str, api_key: &Secret<String>) -> Result<Self, PaymentProcessorError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", api_key.reveal()))
            .map_err(|e| PaymentProcessorError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PaymentProcessorError::Initialization(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl PaymentProcessor for PaymentClient {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentProcessorError> {
        let url = self.url("/checkout/sessions");
        trace!("💻️ Creating checkout session for order {}", request.metadata.order_id);
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| PaymentProcessorError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            let session = response
                .json::<CheckoutSession>()
                .await
                .map_err(|e| PaymentProcessorError::JsonError(e.to_string()))?;
            debug!(
                "💻️ Checkout session created for order {}. Payment reference: {:?}",
                request.metadata.order_id, session.payment_ref
            );
            Ok(session)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(PaymentProcessorError::QueryError { status, message })
        }
    }
}
