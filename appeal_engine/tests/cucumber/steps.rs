use std::sync::atomic::Ordering;

use appeal_engine::{
    db_types::{OrderStatusType, PrecheckDecision, DEFAULT_DISCLAIMER_VERSION},
    order_objects::{CreateOrderRequest, PaymentEvent},
    precheck_objects::{PrecheckRequest, PrecheckSource},
    RequestContext,
};
use chrono::Utc;
use cucumber::{then, when};

use crate::cucumber::AppealWorld;

fn precheck_request(place_id: &str, score: i64, confirmed: bool) -> PrecheckRequest {
    PrecheckRequest {
        place_id: place_id.to_string(),
        formatted_address: format!("{place_id}, Levittown, NY 11756"),
        street_number: None,
        route: None,
        locality: Some("Levittown".into()),
        postal_code: Some("11756".into()),
        country: Some("US".into()),
        unit_number: None,
        lat: 40.7259,
        lng: -73.5143,
        address_quality_score: score,
        confirmed_by_user: confirmed,
    }
}

async fn run_precheck(world: &mut AppealWorld, user: &str, place_id: &str, score: i64, confirmed: bool) {
    let request = precheck_request(place_id, score, confirmed);
    let sys = world.system();
    match sys.prechecks.execute(user, &request, &sys.config, &RequestContext::system()).await {
        Ok(outcome) => {
            world.last_precheck = Some((outcome.source, outcome.precheck));
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "{word} runs a precheck for place '{word}' with quality {int}")]
async fn precheck(world: &mut AppealWorld, user: String, place_id: String, score: i64) {
    run_precheck(world, &user, &place_id, score, false).await;
}

#[when(expr = "{word} confirms and runs a precheck for place '{word}' with quality {int}")]
async fn confirmed_precheck(world: &mut AppealWorld, user: String, place_id: String, score: i64) {
    run_precheck(world, &user, &place_id, score, true).await;
}

#[then(expr = "the precheck is {word} from {word}")]
async fn precheck_result(world: &mut AppealWorld, decision: String, source: String) {
    assert!(world.last_error.is_none(), "Precheck failed: {:?}", world.last_error);
    let (actual_source, precheck) = world.last_precheck.as_ref().expect("No precheck has been run");
    let expected_decision = match decision.as_str() {
        "ELIGIBLE" => PrecheckDecision::Eligible,
        _ => PrecheckDecision::NotEligible,
    };
    let expected_source = match source.as_str() {
        "LIVE" => PrecheckSource::Live,
        _ => PrecheckSource::Cache,
    };
    assert_eq!(precheck.decision, expected_decision);
    assert_eq!(*actual_source, expected_source);
}

#[then(expr = "the request is rejected with {string}")]
async fn rejected(world: &mut AppealWorld, message: String) {
    let error = world.last_error.as_deref().expect("The request succeeded");
    assert!(error.contains(&message), "Unexpected error: {error}");
}

#[when(expr = "{word} orders the precheck as '{word}'")]
async fn order_precheck(world: &mut AppealWorld, user: String, alias: String) {
    let request = CreateOrderRequest {
        precheck_id: world.precheck().id.clone(),
        legal_accepted_at: Utc::now(),
        disclaimer_version: DEFAULT_DISCLAIMER_VERSION.to_string(),
    };
    match world.system().orders.create_order(&user, &request, &RequestContext::system()).await {
        Ok(order) => {
            world.orders.insert(alias, order);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "the payment processor issues reference '{word}' for '{word}'")]
async fn attach_reference(world: &mut AppealWorld, payment_ref: String, alias: String) {
    let id = world.order(&alias).id.clone();
    let order = world.system().orders.attach_payment_ref(&id, &payment_ref).await.expect("Could not attach reference");
    world.orders.insert(alias, order);
}

#[when(expr = "payment '{word}' succeeds")]
async fn payment_succeeds(world: &mut AppealWorld, payment_ref: String) {
    let event = PaymentEvent::new(payment_ref, None);
    world.system().orders.handle_payment_succeeded(&event, &RequestContext::system()).await.expect("Webhook failed");
}

#[when(expr = "payment '{word}' fails")]
async fn payment_fails(world: &mut AppealWorld, payment_ref: String) {
    let event = PaymentEvent::new(payment_ref, None);
    world.system().orders.handle_payment_failed(&event, &RequestContext::system()).await.expect("Webhook failed");
}

#[when(expr = "the report for '{word}' is generated")]
async fn generate(world: &mut AppealWorld, alias: String) {
    let id = world.order(&alias).id.clone();
    let sys = world.system();
    match sys.reports.generate(&id, &sys.config).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when("the renderer recovers")]
async fn renderer_recovers(world: &mut AppealWorld) {
    world.system().renderer.down.store(false, Ordering::SeqCst);
}

#[when(expr = "{word} retries the report for '{word}'")]
async fn retry(world: &mut AppealWorld, user: String, alias: String) {
    let id = world.order(&alias).id.clone();
    let sys = world.system();
    let status = sys.reports.report_status(&user, &id).await.expect("Could not fetch status");
    let report_id = status.report.expect("There is no report to retry").id;
    match sys.reports.manual_retry(&user, &report_id, &sys.config, &RequestContext::system()).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[then(expr = "order '{word}' has status {word}")]
async fn order_status(world: &mut AppealWorld, alias: String, status: String) {
    let id = world.order(&alias).id.clone();
    let order = world.system().orders.fetch_order(&id).await.expect("Error fetching order").expect("Order is gone");
    let expected = status.parse::<OrderStatusType>().expect("Not a valid status");
    assert_eq!(order.status, expected);
}

#[then(expr = "the report for '{word}' has {int} attempt(s)")]
async fn report_attempts(world: &mut AppealWorld, alias: String, attempts: i64) {
    let id = world.order(&alias).id.clone();
    let owner = world.order(&alias).user_id.clone();
    let status = world.system().reports.report_status(&owner, &id).await.expect("Could not fetch status");
    assert_eq!(status.report.expect("No report").attempt_count, attempts);
}

#[then(expr = "the report for '{word}' has an artifact")]
async fn report_artifact(world: &mut AppealWorld, alias: String) {
    let id = world.order(&alias).id.clone();
    let owner = world.order(&alias).user_id.clone();
    let status = world.system().reports.report_status(&owner, &id).await.expect("Could not fetch status");
    let report = status.report.expect("No report");
    assert!(report.pdf_url.is_some_and(|url| url.ends_with(".pdf")));
    assert!(report.last_error.is_none());
}
