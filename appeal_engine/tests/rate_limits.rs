use appeal_engine::{
    db_types::{AuditEntityType, AuditEventType, NewAuditEvent},
    test_utils::prepare_env::{fresh_database, tear_down},
    AuditLog,
    RateLimitLayer,
    RateLimiter,
    RequestContext,
};
use chrono::Utc;
use support::{config, precheck_api, request, CountingGateway};

mod support;

fn seen_from(ip: &str, n: usize) -> NewAuditEvent {
    NewAuditEvent::new(AuditEventType::PrecheckCreated, AuditEntityType::Precheck, format!("pc-{n}"))
        .with_origin(Some(ip.to_string()), None)
}

#[tokio::test]
async fn ip_layer_counts_audit_events() {
    let db = fresh_database().await;
    let limiter = RateLimiter::new(db.clone());
    let mut config = config();
    config.rate_limit_ip = 2;
    let ctx = RequestContext::new(Some("192.0.2.1"), None);

    assert!(limiter.check("alice", &ctx, &config, Utc::now()).await.is_ok());
    for n in 0..2 {
        db.insert_audit_event(seen_from("192.0.2.1", n)).await.unwrap();
    }
    let err = limiter.check("alice", &ctx, &config, Utc::now()).await.unwrap_err();
    assert_eq!(err.layer, RateLimitLayer::Ip);
    assert_eq!(err.limit, 2);

    // Other addresses and unknown addresses are unaffected
    let other = RequestContext::new(Some("192.0.2.2"), None);
    assert!(limiter.check("alice", &other, &config, Utc::now()).await.is_ok());
    let unknown = RequestContext::new(Some("unknown"), None);
    assert!(limiter.check("alice", &unknown, &config, Utc::now()).await.is_ok());
    tear_down(db).await;
}

#[tokio::test]
async fn user_layer_counts_prechecks() {
    let db = fresh_database().await;
    let gateway = CountingGateway::default();
    let api = precheck_api(&db, &gateway);
    let limiter = RateLimiter::new(db.clone());
    let mut config = config();
    config.rate_limit_user = 1;
    let ctx = RequestContext::system();

    assert!(limiter.check("alice", &ctx, &config, Utc::now()).await.is_ok());
    api.execute("alice", &request("p-1", 95), &config, &ctx).await.unwrap();
    let err = limiter.check("alice", &ctx, &config, Utc::now()).await.unwrap_err();
    assert_eq!(err.layer, RateLimitLayer::User);
    assert_eq!(err.to_string(), "Too many requests. The user limit of 1 per day has been reached.");
    assert!(limiter.check("bob", &ctx, &config, Utc::now()).await.is_ok());
    tear_down(db).await;
}

#[tokio::test]
async fn ip_layer_is_reported_when_both_are_exhausted() {
    let db = fresh_database().await;
    let gateway = CountingGateway::default();
    let api = precheck_api(&db, &gateway);
    let limiter = RateLimiter::new(db.clone());
    let mut config = config();
    config.rate_limit_user = 1;
    config.rate_limit_ip = 1;
    let ctx = RequestContext::new(Some("198.51.100.4"), None);
    api.execute("alice", &request("p-2", 95), &config, &ctx).await.unwrap();
    db.insert_audit_event(seen_from("198.51.100.4", 1)).await.unwrap();

    let err = limiter.check("alice", &ctx, &config, Utc::now()).await.unwrap_err();
    assert_eq!(err.layer, RateLimitLayer::Ip);
    tear_down(db).await;
}

#[tokio::test]
async fn storage_failure_lets_requests_through() {
    let db = fresh_database().await;
    let limiter = RateLimiter::new(db.clone());
    let mut config = config();
    config.rate_limit_ip = 0;
    config.rate_limit_user = 0;
    db.close().await;
    let ctx = RequestContext::new(Some("203.0.113.9"), None);
    assert!(limiter.check("alice", &ctx, &config, Utc::now()).await.is_ok());
    tear_down(db).await;
}
