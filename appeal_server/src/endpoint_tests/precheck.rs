use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use appeal_engine::{events::EventProducers, PrecheckApi, RateLimiter};
use property_data::DataSourceGateway;
use serde_json::json;

use super::{helpers::*, mocks::*};
use crate::routes::PrecheckRoute;

fn precheck_body(score: i64, confirmed: bool) -> serde_json::Value {
    json!({
        "place_id": "ChIJ-levittown-1",
        "formatted_address": "1 Test Ln, Levittown, NY 11756",
        "locality": "Levittown",
        "postal_code": "11756",
        "lat": 40.7259,
        "lng": -73.5143,
        "address_quality_score": score,
        "confirmed_by_user": confirmed
    })
}

fn configure(db: MockBackend, limiter: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = PrecheckApi::new(db, DataSourceGateway::fixture_only(), EventProducers::default());
        cfg.service(PrecheckRoute::<MockBackend, DataSourceGateway>::new())
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(RateLimiter::new(limiter)));
    }
}

#[actix_web::test]
async fn precheck_without_caller() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/precheck").set_json(precheck_body(95, false));
    let reply = send(req, configure(MockBackend::new(), MockBackend::new())).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json()["kind"], "fix_input");
}

#[actix_web::test]
async fn weak_address_needs_confirmation() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/precheck"), ALICE).set_json(precheck_body(40, false));
    let reply = send(req, configure(backend_with_defaults(), limiter_backend(0, 0))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let body = reply.json();
    assert_eq!(body["kind"], "fix_input");
    assert!(body["error"].as_str().unwrap().contains("confirmation required"), "was: {}", reply.body);
}

#[actix_web::test]
async fn same_day_precheck_comes_from_cache() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_defaults();
    db.expect_fetch_cached_precheck()
        .withf(|user, place, since, until| user == ALICE && place == "ChIJ-levittown-1" && since < until)
        .returning(|_, _, _, _| Ok(Some(precheck(ALICE, "ELIGIBLE"))));
    db.expect_count_prechecks_for_user().never();
    db.expect_insert_precheck().never();
    let req = as_user(TestRequest::post().uri("/precheck"), ALICE).set_json(precheck_body(95, false));
    let reply = send(req, configure(db, limiter_backend(0, 1))).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let body = reply.json();
    assert_eq!(body["source"], "CACHE");
    assert_eq!(body["precheck"]["id"], "pc-1");
    assert_eq!(body["precheck"]["decision"], "ELIGIBLE");
    assert_eq!(body["precheck"]["metrics"]["comps_lower_count"], 4);
    assert_eq!(body["property"]["assessed_value"], 500000);
    // Internal fields stay internal
    assert!(body["precheck"].get("snapshot_config").is_none());
}

#[actix_web::test]
async fn daily_quota_is_enforced() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_defaults();
    db.expect_fetch_cached_precheck().returning(|_, _, _, _| Ok(None));
    db.expect_count_prechecks_for_user().returning(|_, _, _| Ok(10));
    db.expect_fetch_or_create_property().never();
    let req = as_user(TestRequest::post().uri("/precheck"), ALICE).set_json(precheck_body(95, false));
    // The limiter sees fewer requests than its own limit, so the quota is what stops the request
    let reply = send(req, configure(db, limiter_backend(0, 3))).await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    let body = reply.json();
    assert_eq!(body["kind"], "retry_later");
    assert_eq!(body["limit"], 10);
}

#[actix_web::test]
async fn busy_addresses_are_rate_limited() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/precheck"), ALICE)
        .peer_addr("203.0.113.5:40000".parse().unwrap())
        .set_json(precheck_body(95, false));
    let mut limiter = MockBackend::new();
    limiter.expect_count_audit_events_for_ip().withf(|ip, _, _| ip == "203.0.113.5").returning(|_, _, _| Ok(20));
    limiter.expect_count_prechecks_for_user().returning(|_, _, _| Ok(0));
    let mut db = backend_with_defaults();
    db.expect_fetch_cached_precheck().never();
    let reply = send(req, configure(db, limiter)).await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    let body = reply.json();
    assert_eq!(body["limit"], 20);
    assert!(body["error"].as_str().unwrap().contains("ip limit"), "was: {}", reply.body);
}

#[actix_web::test]
async fn malformed_precheck_body() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/precheck"), ALICE)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"{"place_id": "ChIJ-levittown-1""#);
    let reply = send(req, configure(MockBackend::new(), MockBackend::new())).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json()["error"].as_str().unwrap().starts_with("Could not read request body"), "was: {}", reply.body);
}
