#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use appeal_engine::{
    db_types::{Order, OrderId, OrderStatusType, PrecheckId, ReportId},
    events::EventProducers,
    order_objects::{CreateOrderRequest, PaymentEvent},
    precheck_objects::PrecheckRequest,
    snapshot::ReportSnapshot,
    OrderFlowApi,
    PrecheckApi,
    RenderError,
    ReportRenderer,
    RequestContext,
    SqliteDatabase,
    SystemConfig,
};
use property_data::{DataSourceResult, FixtureProvider, PropertyDataSource, PropertyLookup, ProviderTimeouts};

/// Serves the deterministic fixture and counts the calls it receives.
#[derive(Clone, Default)]
pub struct CountingGateway {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl CountingGateway {
    pub fn slow(delay: Duration) -> Self {
        Self { calls: Arc::default(), delay: Some(delay) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PropertyDataSource for CountingGateway {
    async fn fetch(&self, _lookup: &PropertyLookup, _timeouts: &ProviderTimeouts) -> DataSourceResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        FixtureProvider.fetch()
    }
}

/// Renders successfully unless told to fail, and counts its calls.
#[derive(Clone, Default)]
pub struct ScriptedRenderer {
    calls: Arc<AtomicUsize>,
    failures_left: Arc<AtomicUsize>,
}

impl ScriptedRenderer {
    pub fn failing(times: usize) -> Self {
        Self { calls: Arc::default(), failures_left: Arc::new(AtomicUsize::new(times)) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recover(&self) {
        self.failures_left.store(0, Ordering::SeqCst);
    }
}

impl ReportRenderer for ScriptedRenderer {
    async fn render(&self, report_id: &ReportId, _snapshot: &ReportSnapshot) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(RenderError::Unavailable("renderer is down".into()));
        }
        Ok(format!("https://files.example.com/reports/{report_id}.pdf"))
    }
}

pub fn request(place_id: &str, score: i64) -> PrecheckRequest {
    PrecheckRequest {
        place_id: place_id.to_string(),
        formatted_address: format!("{place_id} Test Ln, Levittown, NY 11756"),
        street_number: Some("1".into()),
        route: Some("Test Ln".into()),
        locality: Some("Levittown".into()),
        postal_code: Some("11756".into()),
        country: Some("US".into()),
        unit_number: None,
        lat: 40.7259,
        lng: -73.5143,
        address_quality_score: score,
        confirmed_by_user: false,
    }
}

pub fn precheck_api(db: &SqliteDatabase, gateway: &CountingGateway) -> PrecheckApi<SqliteDatabase, CountingGateway> {
    PrecheckApi::new(db.clone(), gateway.clone(), EventProducers::default())
}

pub fn config() -> SystemConfig {
    SystemConfig::default()
}

pub fn unknown_order() -> OrderId {
    OrderId::from("no-such-order")
}

/// Runs an eligible precheck for `user_id` and returns its id.
pub async fn eligible_precheck(db: &SqliteDatabase, user_id: &str, place_id: &str) -> PrecheckId {
    let api = precheck_api(db, &CountingGateway::default());
    let outcome = api
        .execute(user_id, &request(place_id, 95), &config(), &RequestContext::system())
        .await
        .expect("precheck failed");
    assert!(outcome.precheck.is_eligible());
    outcome.precheck.id
}

pub fn order_request(precheck_id: PrecheckId) -> CreateOrderRequest {
    CreateOrderRequest { precheck_id, legal_accepted_at: chrono::Utc::now(), disclaimer_version: "d1".into() }
}

/// An eligible precheck, ordered and paid for by `user_id`.
pub async fn paid_order(db: &SqliteDatabase, user_id: &str, place_id: &str) -> Order {
    let precheck_id = eligible_precheck(db, user_id, place_id).await;
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::system();
    let order = flow.create_order(user_id, &order_request(precheck_id), &ctx).await.expect("order failed");
    let payment_ref = format!("pay_{place_id}");
    flow.attach_payment_ref(&order.id, &payment_ref).await.expect("attach failed");
    let event = PaymentEvent::new(payment_ref, None);
    let outcome = flow.handle_payment_succeeded(&event, &ctx).await.expect("payment failed");
    let order = outcome.order().cloned().expect("no order");
    assert_eq!(order.status, OrderStatusType::Paid);
    order
}
