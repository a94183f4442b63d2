use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use appeal_common::Secret;
use appeal_engine::{db_types::OrderStatusType, events::EventProducers, OrderFlowApi, StoreError};

use super::{helpers::*, mocks::*};
use crate::{
    helpers::calculate_hmac,
    middleware::{HmacMiddlewareFactory, PAYMENT_SIGNATURE_HEADER},
    routes::PaymentWebhookRoute,
};

const WEBHOOK_SECRET: &str = "whsec_test";

fn configure(db: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(PaymentWebhookRoute::<MockBackend>::new())
            .app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())));
    }
}

fn notification(body: &'static str) -> TestRequest {
    TestRequest::post().uri("/payment").insert_header(("Content-Type", "application/json")).set_payload(body)
}

#[actix_web::test]
async fn successful_payment_marks_the_order_paid() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_order_by_payment_ref()
        .withf(|r| r == "pay_1")
        .returning(|_| Ok(Some(order("order-1", ALICE, OrderStatusType::PaymentPending))));
    db.expect_transition_order()
        .withf(|id, from, to| {
            id.as_str() == "order-1" && *from == OrderStatusType::PaymentPending && *to == OrderStatusType::Paid
        })
        .times(1)
        .returning(|_, _, _| Ok(Some(order("order-1", ALICE, OrderStatusType::Paid))));
    let req = notification(r#"{"type":"payment.succeeded","payment_ref":"pay_1","order_id":"order-1"}"#);
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.json()["received"], true);
}

#[actix_web::test]
async fn repeated_success_is_acknowledged_without_changes() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_order_by_payment_ref().returning(|_| Ok(Some(order("order-1", ALICE, OrderStatusType::Completed))));
    db.expect_transition_order().never();
    let req = notification(r#"{"type":"payment.succeeded","payment_ref":"pay_1"}"#);
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["received"], true);
}

#[actix_web::test]
async fn failed_payment_cancels_a_pending_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_order_by_payment_ref()
        .returning(|_| Ok(Some(order("order-1", ALICE, OrderStatusType::PaymentPending))));
    db.expect_transition_order()
        .withf(|_, from, to| *from == OrderStatusType::PaymentPending && *to == OrderStatusType::Canceled)
        .times(1)
        .returning(|_, _, _| Ok(Some(order("order-1", ALICE, OrderStatusType::Canceled))));
    let req = notification(r#"{"type":"payment.failed","payment_ref":"pay_1"}"#);
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[actix_web::test]
async fn unknown_payments_and_events_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_order_by_payment_ref().times(1).returning(|_| Ok(None));
    db.expect_fetch_order().never();
    let req = notification(r#"{"type":"payment.succeeded","payment_ref":"pay_unknown"}"#);
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::OK);

    // Event types we don't handle never reach the database
    let req = notification(r#"{"type":"charge.refunded","payment_ref":"pay_1"}"#);
    let reply = send(req, configure(MockBackend::new())).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["received"], true);
}

#[actix_web::test]
async fn storage_failure_asks_for_redelivery() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_fetch_order_by_payment_ref().returning(|_| Err(StoreError::DatabaseError("database is locked".into())));
    let req = notification(r#"{"type":"payment.succeeded","payment_ref":"pay_1"}"#);
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn signed_delivery_reaches_the_handler() {
    let _ = env_logger::try_init().ok();
    let payload = r#"{"type":"payment.failed","payment_ref":"pay_9"}"#;
    let signature = calculate_hmac(WEBHOOK_SECRET, payload.as_bytes()).unwrap();
    let mut db = MockBackend::new();
    db.expect_fetch_order_by_payment_ref().withf(|r| r == "pay_9").times(1).returning(|_| Ok(None));
    let req = TestRequest::post()
        .uri("/webhooks/payment")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((PAYMENT_SIGNATURE_HEADER, signature))
        .set_payload(payload);
    let reply = send(req, move |cfg: &mut ServiceConfig| {
        let secret = Secret::new(WEBHOOK_SECRET.to_string());
        cfg.service(
            web::scope("/webhooks")
                .wrap(HmacMiddlewareFactory::new(PAYMENT_SIGNATURE_HEADER, secret, true))
                .service(PaymentWebhookRoute::<MockBackend>::new()),
        )
        .app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())));
    })
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
}
