use actix_web::{
    http::{header::HeaderMap, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use appeal_engine::{
    db_types::{Lead, LeadId, Order, OrderId, OrderStatusType, Precheck, PrecheckId, Report, ReportId},
    SystemConfig,
};
use chrono::{TimeZone, Utc};
use log::debug;
use serde_json::{json, Value};

use crate::{
    auth::USER_ID_HEADER,
    config::ServerOptions,
    server::{json_config, query_config},
};

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|e| panic!("Not JSON ({e}): {}", self.body))
    }
}

/// Sends `req` to an app with the default business configuration and whatever `configure` registers.
pub async fn send<F>(req: TestRequest, configure: F) -> Reply
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new()
        .app_data(json_config())
        .app_data(query_config())
        .app_data(web::Data::new(SystemConfig::default()))
        .app_data(web::Data::new(ServerOptions::default()))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let headers = res.headers().clone();
    let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
    Reply { status, headers, body }
}

pub fn as_user(req: TestRequest, user: &str) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user))
}

pub fn precheck(user: &str, decision: &str) -> Precheck {
    serde_json::from_value(json!({
        "id": "pc-1",
        "user_id": user,
        "property_id": "prop-1",
        "decision": decision,
        "confidence": 0.9,
        "factors": ["COMPS_FOUND", "COMPS_LOWER_THAN_ASSESSED", "LOWER_COMP_RATIO_HIGH"],
        "metrics": {
            "assessed_value": 500000,
            "comps_used_count": 5,
            "comps_lower_count": 4,
            "comps_lower_ratio": 0.8,
            "best_lower_comp_gap": 0.16
        },
        "snapshot_config": {
            "rule_pack_id": "rp-1",
            "rule_pack_version": 1,
            "min_comps": 3,
            "min_lower_comps": 2,
            "outlier_low_factor": 0.5,
            "outlier_high_factor": 1.5,
            "max_comp_age_months": 12
        },
        "rule_pack_id": "rp-1",
        "metadata": {
            "data_source": "mock",
            "comps_raw_count": 0,
            "comps": [],
            "comps_used": [],
            "property_data": { "assessed_value": 500000, "county": "Nassau" }
        },
        "explanation": "4 of 5 comparable sales are lower than your assessed value.",
        "engine_version": "e1",
        "confirmed_by_user": false,
        "created_at": "2026-10-19T14:00:00Z"
    }))
    .expect("Invalid precheck fixture")
}

pub fn order(id: &str, user: &str, status: OrderStatusType) -> Order {
    let at = Utc.with_ymd_and_hms(2026, 10, 19, 14, 5, 0).unwrap();
    Order {
        id: OrderId::from(id),
        user_id: user.to_string(),
        precheck_id: PrecheckId::from("pc-1"),
        payment_ref: (status != OrderStatusType::Created).then(|| "pay_1".to_string()),
        idempotency_key: "idem-1".to_string(),
        status,
        legal_accepted_at: at,
        disclaimer_version: "d1".to_string(),
        engine_version: "e1".to_string(),
        locked_until: None,
        lock_token: None,
        created_at: at,
        updated_at: at,
    }
}

pub fn report(order_id: &str, user: &str, attempt_count: i64) -> Report {
    let at = Utc.with_ymd_and_hms(2026, 10, 19, 14, 10, 0).unwrap();
    Report {
        id: ReportId::from("rep-1"),
        order_id: OrderId::from(order_id),
        user_id: user.to_string(),
        template_version: "v1".to_string(),
        engine_version: "e1".to_string(),
        content_snapshot: None,
        pdf_url: None,
        attempt_count,
        last_error: (attempt_count > 0).then(|| "Report rendering failed. connection refused".to_string()),
        last_attempt_at: (attempt_count > 0).then_some(at),
        generated_at: None,
        created_at: at,
    }
}

pub fn lead(id: &str, confirmed: bool) -> Lead {
    let at = Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap();
    Lead {
        id: LeadId::from(id),
        user_id: ALICE.to_string(),
        email: "alice@example.com".to_string(),
        tag: "grievance-2027".to_string(),
        recontact_month: 1,
        opt_in_confirmed_at: confirmed.then_some(at),
        created_at: at,
    }
}
