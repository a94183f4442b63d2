use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use appeal_common::UsdCents;
use appeal_engine::{
    db_types::{OrderId, OrderStatusType},
    events::EventProducers,
    OrderFlowApi,
    RateLimiter,
    StoreError,
};
use serde_json::json;

use super::{helpers::*, mocks::*};
use crate::{
    integrations::payments::{CheckoutSession, PaymentProcessorError},
    routes::CreateOrderRoute,
};

fn order_body() -> serde_json::Value {
    json!({ "precheck_id": "pc-1", "legal_accepted_at": "2026-10-19T14:04:00Z" })
}

fn configure(db: MockBackend, payments: MockPayments) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(CreateOrderRoute::<MockBackend, MockPayments>::new())
            .app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())))
            .app_data(web::Data::new(RateLimiter::new(limiter_backend(0, 1))))
            .app_data(web::Data::new(payments));
    }
}

fn backend_with_precheck(decision: &'static str) -> MockBackend {
    let mut db = backend_with_defaults();
    db.expect_fetch_precheck().returning(move |_| Ok(Some(precheck(ALICE, decision))));
    db
}

#[actix_web::test]
async fn order_opens_a_checkout_session() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_precheck("ELIGIBLE");
    db.expect_insert_order()
        .withf(|o| o.user_id == ALICE && o.disclaimer_version == "d1")
        .returning(|_| Ok(order("order-1", ALICE, OrderStatusType::Created)));
    db.expect_attach_payment_ref()
        .withf(|id, payment_ref| id.as_str() == "order-1" && payment_ref == "cs_test_1")
        .times(1)
        .returning(|_, _| Ok(Some(order("order-1", ALICE, OrderStatusType::PaymentPending))));
    let mut payments = MockPayments::new();
    payments
        .expect_create_checkout()
        .withf(|req| {
            req.unit_amount == UsdCents::from(999) &&
                req.quantity == 1 &&
                req.metadata.order_id == OrderId::from("order-1") &&
                req.metadata.user_id == ALICE
        })
        .returning(|_| {
            Ok(CheckoutSession {
                payment_ref: Some("cs_test_1".into()),
                checkout_url: "https://pay.example.com/c/cs_test_1".into(),
            })
        });
    let req = as_user(TestRequest::post().uri("/orders"), ALICE).set_json(order_body());
    let reply = send(req, configure(db, payments)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let body = reply.json();
    assert_eq!(body["order_id"], "order-1");
    assert_eq!(body["checkout_url"], "https://pay.example.com/c/cs_test_1");
}

#[actix_web::test]
async fn checkout_without_payment_reference() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_precheck("ELIGIBLE");
    db.expect_insert_order().returning(|_| Ok(order("order-1", ALICE, OrderStatusType::Created)));
    db.expect_attach_payment_ref().never();
    let mut payments = MockPayments::new();
    payments.expect_create_checkout().returning(|_| {
        Ok(CheckoutSession { payment_ref: None, checkout_url: "https://pay.example.com/c/1".into() })
    });
    let req = as_user(TestRequest::post().uri("/orders"), ALICE).set_json(order_body());
    let reply = send(req, configure(db, payments)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.json()["checkout_url"], "https://pay.example.com/c/1");
}

#[actix_web::test]
async fn processor_outage_is_an_upstream_error() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_precheck("ELIGIBLE");
    db.expect_insert_order().returning(|_| Ok(order("order-1", ALICE, OrderStatusType::Created)));
    db.expect_attach_payment_ref().never();
    let mut payments = MockPayments::new();
    payments
        .expect_create_checkout()
        .returning(|_| Err(PaymentProcessorError::RequestError("connection refused".into())));
    let req = as_user(TestRequest::post().uri("/orders"), ALICE).set_json(order_body());
    let reply = send(req, configure(db, payments)).await;
    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert_eq!(reply.json()["kind"], "retry_later");
}

#[actix_web::test]
async fn second_order_for_a_precheck_conflicts() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_precheck("ELIGIBLE");
    db.expect_insert_order()
        .returning(|_| Err(StoreError::UniqueViolation("orders.idempotency_key".into())));
    let mut payments = MockPayments::new();
    payments.expect_create_checkout().never();
    let req = as_user(TestRequest::post().uri("/orders"), ALICE).set_json(order_body());
    let reply = send(req, configure(db, payments)).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    let body = reply.json();
    assert_eq!(body["kind"], "fix_input");
    assert!(body["error"].as_str().unwrap().contains("active order"), "was: {}", reply.body);
}

#[actix_web::test]
async fn ineligible_prechecks_cannot_be_ordered() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_precheck("NOT_ELIGIBLE");
    db.expect_insert_order().never();
    let mut payments = MockPayments::new();
    payments.expect_create_checkout().never();
    let req = as_user(TestRequest::post().uri("/orders"), ALICE).set_json(order_body());
    let reply = send(req, configure(db, payments)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn another_users_precheck_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_precheck("ELIGIBLE");
    db.expect_insert_order().never();
    let req = as_user(TestRequest::post().uri("/orders"), BOB).set_json(order_body());
    let reply = send(req, configure(db, MockPayments::new())).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
