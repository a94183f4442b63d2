use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use appeal_engine::{
    db_types::OrderStatusType,
    events::EventProducers,
    DigestRenderer,
    RateLimiter,
    ReportApi,
};
use serde_json::json;

use super::{helpers::*, mocks::*};
use crate::routes::{ReportStatusRoute, RetryReportRoute};

fn configure(db: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = ReportApi::new(db, DigestRenderer::new("https://reports.example.com"), EventProducers::default());
        cfg.service(ReportStatusRoute::<MockBackend, DigestRenderer>::new())
            .service(RetryReportRoute::<MockBackend, DigestRenderer>::new())
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(RateLimiter::new(limiter_backend(0, 1))));
    }
}

#[actix_web::test]
async fn report_status_for_the_owner() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order("order-1", ALICE, OrderStatusType::Failed))));
    db.expect_fetch_report_for_order().returning(|_| Ok(Some(report("order-1", ALICE, 2))));
    let req = as_user(TestRequest::get().uri("/report/status?order_id=order-1"), ALICE);
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let body = reply.json();
    assert_eq!(body["order_id"], "order-1");
    assert_eq!(body["order_status"], "FAILED");
    assert_eq!(body["report"]["id"], "rep-1");
    assert_eq!(body["report"]["attempt_count"], 2);
    assert_eq!(body["report"]["pdf_url"], serde_json::Value::Null);
}

#[actix_web::test]
async fn report_status_is_private() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order("order-1", ALICE, OrderStatusType::Completed))));
    db.expect_fetch_report_for_order().never();
    let req = as_user(TestRequest::get().uri("/report/status?order_id=order-1"), BOB);
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn report_status_needs_an_order_id() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/report/status"), ALICE);
    let reply = send(req, configure(MockBackend::new())).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json()["error"].as_str().unwrap().starts_with("Could not read request query"), "was: {}", reply.body);
}

#[actix_web::test]
async fn retry_stops_at_the_ceiling() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_defaults();
    db.expect_fetch_report().returning(|_| Ok(Some(report("order-1", ALICE, 5))));
    db.expect_fetch_order().returning(|_| Ok(Some(order("order-1", ALICE, OrderStatusType::Failed))));
    db.expect_try_lock_order().never();
    let req = as_user(TestRequest::post().uri("/report/retry"), ALICE).set_json(json!({ "report_id": "rep-1" }));
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let body = reply.json();
    assert_eq!(body["kind"], "terminal");
    assert!(body["error"].as_str().unwrap().contains("(5)"), "was: {}", reply.body);
}

#[actix_web::test]
async fn only_failed_reports_can_be_retried() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_defaults();
    db.expect_fetch_report().returning(|_| Ok(Some(report("order-1", ALICE, 1))));
    db.expect_fetch_order().returning(|_| Ok(Some(order("order-1", ALICE, OrderStatusType::Completed))));
    db.expect_try_lock_order().never();
    let req = as_user(TestRequest::post().uri("/report/retry"), ALICE).set_json(json!({ "report_id": "rep-1" }));
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["kind"], "fix_input");
}

#[actix_web::test]
async fn retry_while_generating_is_busy() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_defaults();
    db.expect_fetch_report().returning(|_| Ok(Some(report("order-1", ALICE, 1))));
    db.expect_fetch_order().returning(|_| Ok(Some(order("order-1", ALICE, OrderStatusType::Failed))));
    db.expect_try_lock_order().times(1).returning(|_, _, _, _| Ok(false));
    db.expect_release_order_lock().never();
    let req = as_user(TestRequest::post().uri("/report/retry"), ALICE).set_json(json!({ "report_id": "rep-1" }));
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.json()["kind"], "retry_later");
}

#[actix_web::test]
async fn other_users_reports_cannot_be_retried() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_defaults();
    db.expect_fetch_report().returning(|_| Ok(Some(report("order-1", ALICE, 1))));
    db.expect_fetch_order().never();
    let req = as_user(TestRequest::post().uri("/report/retry"), BOB).set_json(json!({ "report_id": "rep-1" }));
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
