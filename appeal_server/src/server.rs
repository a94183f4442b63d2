use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use appeal_engine::{
    events::{sqlite_audit_sink, EventHandlers, EventHooks, EventProducers, OrderPaidEvent},
    load_system_config,
    LeadApi,
    OrderFlowApi,
    PrecheckApi,
    RateLimiter,
    ReportApi,
    SqliteDatabase,
    SystemConfig,
};
use log::*;
use property_data::DataSourceGateway;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{payments::PaymentClient, renderer::ServerRenderer},
    middleware::{HmacMiddlewareFactory, PAYMENT_SIGNATURE_HEADER},
    retry_worker::start_retry_worker,
    routes::{
        health,
        ConfirmLeadRoute,
        CreateOrderRoute,
        PaymentWebhookRoute,
        PrecheckRoute,
        ReportStatusRoute,
        RetryReportRoute,
        SubmitLeadRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 100;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    let defaults = config.system_config_defaults();
    let renderer = ServerRenderer::from_config(&config.renderer, &config.site_url);

    // Audit records are written by their own handler, so that report generation can publish them too.
    let mut audit_hooks = EventHooks::default();
    audit_hooks.on_audit_event(sqlite_audit_sink(db.clone()));
    let audit_handlers = EventHandlers::new(EVENT_BUFFER_SIZE, audit_hooks);
    let audit_producers = audit_handlers.producers();

    let report_api = Arc::new(ReportApi::new(db.clone(), renderer.clone(), audit_producers.clone()));
    let order_handlers = EventHandlers::new(EVENT_BUFFER_SIZE, report_hooks(Arc::clone(&report_api), defaults.clone()));
    let mut producers = order_handlers.producers();
    producers.audit_producer = audit_producers.audit_producer;
    audit_handlers.start_handlers().await;
    order_handlers.start_handlers().await;
    let _retry_worker = start_retry_worker(report_api, defaults.clone(), config.retry_sweep_interval);

    let payments = PaymentClient::new(&config.payment.api_url, &config.payment.api_key)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = DataSourceGateway::new(&config.data_sources);
    let services = ServerServices { db: db.clone(), producers, renderer, gateway, payments, defaults };
    let srv = create_server_instance(config, services)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    db.close().await;
    result
}

/// Generates the report as soon as an order is paid. Failures leave the order in `FAILED` for the retry worker.
fn report_hooks(api: Arc<ReportApi<SqliteDatabase, ServerRenderer>>, defaults: SystemConfig) -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |OrderPaidEvent { order }| {
        let api = Arc::clone(&api);
        let defaults = defaults.clone();
        Box::pin(async move {
            let config = load_system_config(api.db(), &defaults).await;
            match api.generate(&order.id, &config).await {
                Ok(report) => info!("📄️ Report {} generated for order {}", report.id, order.id),
                Err(e) => warn!("📄️ Report generation for order {} failed. {e}", order.id),
            }
        })
    });
    hooks
}

/// The long-lived clients and settings that every worker's API objects are built from.
#[derive(Clone)]
pub struct ServerServices {
    pub db: SqliteDatabase,
    pub producers: EventProducers,
    pub renderer: ServerRenderer,
    pub gateway: DataSourceGateway,
    pub payments: PaymentClient,
    pub defaults: SystemConfig,
}

pub fn create_server_instance(config: ServerConfig, services: ServerServices) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let webhook_secret = config.payment.webhook_secret.clone();
    let signature_checks = config.payment.signature_checks;
    let srv = HttpServer::new(move || {
        let ServerServices { db, producers, renderer, gateway, payments, defaults } = services.clone();
        let precheck_api = PrecheckApi::new(db.clone(), gateway, producers.clone());
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let reports_api = ReportApi::new(db.clone(), renderer, producers.clone());
        let leads_api = LeadApi::new(db.clone(), producers);
        let limiter = RateLimiter::new(db);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("appeal::access_log"))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(web::Data::new(precheck_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(reports_api))
            .app_data(web::Data::new(leads_api))
            .app_data(web::Data::new(limiter))
            .app_data(web::Data::new(payments))
            .app_data(web::Data::new(defaults))
            .app_data(web::Data::new(options.clone()));
        let api_scope = web::scope("/api")
            .service(PrecheckRoute::<SqliteDatabase, DataSourceGateway>::new())
            .service(CreateOrderRoute::<SqliteDatabase, PaymentClient>::new())
            .service(ReportStatusRoute::<SqliteDatabase, ServerRenderer>::new())
            .service(RetryReportRoute::<SqliteDatabase, ServerRenderer>::new())
            .service(SubmitLeadRoute::<SqliteDatabase>::new())
            .service(ConfirmLeadRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhooks")
            .wrap(HmacMiddlewareFactory::new(PAYMENT_SIGNATURE_HEADER, webhook_secret.clone(), signature_checks))
            .service(PaymentWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Malformed JSON bodies are reported in the same error format as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| ServerError::InvalidRequestQuery(err.to_string()).into())
}
