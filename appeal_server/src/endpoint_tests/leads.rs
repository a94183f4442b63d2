use actix_web::{
    http::{header::LOCATION, StatusCode},
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use appeal_engine::{db_types::LeadId, events::EventProducers, LeadApi, RateLimiter, StoreError};
use serde_json::json;

use super::{helpers::*, mocks::*};
use crate::routes::{ConfirmLeadRoute, SubmitLeadRoute};

fn configure(db: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(SubmitLeadRoute::<MockBackend>::new())
            .service(ConfirmLeadRoute::<MockBackend>::new())
            .app_data(web::Data::new(LeadApi::new(db, EventProducers::default())))
            .app_data(web::Data::new(RateLimiter::new(limiter_backend(0, 0))));
    }
}

#[actix_web::test]
async fn submit_a_lead() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_defaults();
    db.expect_insert_lead()
        .withf(|l| l.user_id == ALICE && l.email == "alice@example.com" && l.recontact_month == 1)
        .times(1)
        .returning(|_| Ok(lead("lead-1", false)));
    let req = as_user(TestRequest::post().uri("/leads"), ALICE)
        .set_json(json!({ "email": " alice@example.com ", "tag": "grievance-2027", "county": "Nassau" }));
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    let body = reply.json();
    assert_eq!(body["id"], "lead-1");
    assert_eq!(body["status"], "pending_confirmation");
}

#[actix_web::test]
async fn invalid_email_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut db = backend_with_defaults();
    db.expect_insert_lead().never();
    let req = as_user(TestRequest::post().uri("/leads"), ALICE).set_json(json!({ "email": "nope", "tag": "x" }));
    let reply = send(req, configure(db)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn confirmation_link_redirects_home() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_confirm_lead()
        .withf(|id| *id == LeadId::from("lead-1"))
        .times(1)
        .returning(|_| Ok(Some(lead("lead-1", true))));
    let reply = send(TestRequest::get().uri("/leads/confirm?id=lead-1"), configure(db)).await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.headers.get(LOCATION).unwrap(), "http://localhost:3000/home?confirmed=1");
}

#[actix_web::test]
async fn stale_confirmation_link_still_redirects() {
    let _ = env_logger::try_init().ok();
    let mut db = MockBackend::new();
    db.expect_confirm_lead().returning(|_| Ok(None));
    let reply = send(TestRequest::get().uri("/leads/confirm?id=gone"), configure(db)).await;
    assert_eq!(reply.status, StatusCode::FOUND);

    let mut db = MockBackend::new();
    db.expect_confirm_lead().returning(|_| Err(StoreError::DatabaseError("disk I/O error".into())));
    let reply = send(TestRequest::get().uri("/leads/confirm?id=lead-1"), configure(db)).await;
    assert_eq!(reply.status, StatusCode::FOUND);
}

#[actix_web::test]
async fn confirmation_link_needs_an_id() {
    let _ = env_logger::try_init().ok();
    let reply = send(TestRequest::get().uri("/leads/confirm"), configure(MockBackend::new())).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}
