//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
//!
//! Every `/api` route identifies the caller with the [`CallerId`] extractor, and every route that costs money or
//! creates records is rate limited before any work is done.
use actix_web::{get, http::header::LOCATION, web, HttpRequest, HttpResponse, Responder};
use appeal_engine::{
    load_system_config,
    order_objects::{CreateOrderRequest, PaymentOutcome},
    precheck_objects::{PrecheckRequest, PrecheckResponse},
    report_objects::{ReportSummary, RetryRequest},
    AuditLog,
    LeadApi,
    LeadManagement,
    LeadReceipt,
    LeadRequest,
    OrderFlowApi,
    OrderManagement,
    PrecheckApi,
    PrecheckManagement,
    RateLimiter,
    ReportApi,
    ReportManagement,
    ReportRenderer,
    RequestContext,
    SystemConfig,
    SystemConfigStore,
};
use chrono::Utc;
use log::*;
use property_data::PropertyDataSource;

use crate::{
    auth::CallerId,
    config::ServerOptions,
    data_objects::{
        CheckoutResponse,
        LeadConfirmParams,
        PaymentEventType,
        PaymentNotification,
        ReportStatusParams,
        RetryResponse,
        WebhookReceipt,
    },
    errors::ServerError,
    helpers::request_context,
    integrations::payments::{CheckoutRequest, PaymentProcessor},
};

/// Everything the route handlers need from the storage backend.
pub trait AppealBackend:
    PrecheckManagement + OrderManagement + ReportManagement + AuditLog + LeadManagement + SystemConfigStore
{
}

impl<T> AppealBackend for T where T: PrecheckManagement
        + OrderManagement
        + ReportManagement
        + AuditLog
        + LeadManagement
        + SystemConfigStore
{
}

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// Loads the business configuration and applies the request rate limits. Returns the configuration so that the
/// handler works with the same values the limiter used.
async fn admit<B: AppealBackend>(
    db: &B,
    limiter: &RateLimiter<B>,
    defaults: &SystemConfig,
    caller: &CallerId,
    ctx: &RequestContext,
) -> Result<SystemConfig, ServerError> {
    let config = load_system_config(db, defaults).await;
    limiter.check(caller.as_str(), ctx, &config, Utc::now()).await.map_err(|e| {
        info!("🚦️ Request from {caller} ({:?}) was rate limited. {e}", ctx.ip);
        ServerError::from(e)
    })?;
    Ok(config)
}

//----------------------------------------------   Precheck  ----------------------------------------------------
route!(precheck => Post "/precheck" impl AppealBackend, PropertyDataSource);
/// Route handler for the precheck endpoint
///
/// Runs (or returns today's cached) eligibility precheck for a geocoded address. The response's `source` field is
/// `LIVE` for a fresh check and `CACHE` when the same address was already checked today.
///
/// Addresses with a quality score under the configured threshold are rejected with a 400 unless
/// `confirmed_by_user` is set.
pub async fn precheck<B: AppealBackend, G: PropertyDataSource>(
    req: HttpRequest,
    caller: CallerId,
    body: web::Json<PrecheckRequest>,
    api: web::Data<PrecheckApi<B, G>>,
    limiter: web::Data<RateLimiter<B>>,
    defaults: web::Data<SystemConfig>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST precheck for {caller} at {}", body.place_id);
    let ctx = request_context(&req, &options);
    let config = admit(api.db(), &limiter, &defaults, &caller, &ctx).await?;
    let outcome = api.execute(caller.as_str(), &body, &config, &ctx).await.map_err(|e| {
        debug!("💻️ Precheck for {caller} at {} failed. {e}", body.place_id);
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(PrecheckResponse::from(outcome)))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl AppealBackend, PaymentProcessor);
/// Route handler for report purchases
///
/// Creates the order for an eligible precheck, opens a checkout session for it with the payment processor, and
/// returns the checkout page URL. If the processor cannot be reached the order is left in `CREATED` and the caller
/// gets a 502.
pub async fn create_order<B: AppealBackend, P: PaymentProcessor>(
    req: HttpRequest,
    caller: CallerId,
    body: web::Json<CreateOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
    limiter: web::Data<RateLimiter<B>>,
    processor: web::Data<P>,
    defaults: web::Data<SystemConfig>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST order for precheck {} by {caller}", body.precheck_id);
    let ctx = request_context(&req, &options);
    let config = admit(api.db(), &limiter, &defaults, &caller, &ctx).await?;
    let order = api.create_order(caller.as_str(), &body, &ctx).await?;
    let checkout = CheckoutRequest::for_report(&order.id, caller.as_str(), config.report_price, &options.site_url);
    let session = processor.create_checkout(&checkout).await.map_err(|e| {
        error!("💻️ Could not create a checkout session for order {}. {e}", order.id);
        ServerError::from(e)
    })?;
    match &session.payment_ref {
        Some(payment_ref) => {
            api.attach_payment_ref(&order.id, payment_ref).await?;
        },
        None => debug!("💻️ No payment reference yet for order {}. The webhook will fill it in.", order.id),
    }
    Ok(HttpResponse::Ok().json(CheckoutResponse { order_id: order.id, checkout_url: session.checkout_url }))
}

//----------------------------------------------   Reports  ----------------------------------------------------
route!(report_status => Get "/report/status" impl AppealBackend, ReportRenderer);
pub async fn report_status<B: AppealBackend, R: ReportRenderer>(
    caller: CallerId,
    params: web::Query<ReportStatusParams>,
    api: web::Data<ReportApi<B, R>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET report status for order {} by {caller}", params.order_id);
    let status = api.report_status(caller.as_str(), &params.order_id).await?;
    Ok(HttpResponse::Ok().json(status))
}

route!(retry_report => Post "/report/retry" impl AppealBackend, ReportRenderer);
/// Route handler for manual report retries
///
/// Only a report whose order is `FAILED` can be retried, and only until the manual retry ceiling is reached. The
/// report is generated before the response is sent.
pub async fn retry_report<B: AppealBackend, R: ReportRenderer>(
    req: HttpRequest,
    caller: CallerId,
    body: web::Json<RetryRequest>,
    api: web::Data<ReportApi<B, R>>,
    limiter: web::Data<RateLimiter<B>>,
    defaults: web::Data<SystemConfig>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST retry for report {} by {caller}", body.report_id);
    let ctx = request_context(&req, &options);
    let config = admit(api.db(), &limiter, &defaults, &caller, &ctx).await?;
    let report = api.manual_retry(caller.as_str(), &body.report_id, &config, &ctx).await.map_err(|e| {
        info!("💻️ Retry of report {} failed. {e}", body.report_id);
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(RetryResponse { status: "completed".into(), report: ReportSummary::from(&report) }))
}

//----------------------------------------------   Leads  ----------------------------------------------------
route!(submit_lead => Post "/leads" impl AppealBackend);
pub async fn submit_lead<B: AppealBackend>(
    req: HttpRequest,
    caller: CallerId,
    body: web::Json<LeadRequest>,
    api: web::Data<LeadApi<B>>,
    limiter: web::Data<RateLimiter<B>>,
    defaults: web::Data<SystemConfig>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST lead '{}' by {caller}", body.tag);
    let ctx = request_context(&req, &options);
    let config = admit(api.db(), &limiter, &defaults, &caller, &ctx).await?;
    let lead = api.submit(caller.as_str(), &body, &config, &ctx).await?;
    Ok(HttpResponse::Ok().json(LeadReceipt::from(&lead)))
}

route!(confirm_lead => Get "/leads/confirm" impl AppealBackend);
/// Route handler for the link in the lead opt-in email
///
/// The user always lands back on the site. A link for an unknown lead is logged and otherwise treated like a good one.
pub async fn confirm_lead<B: AppealBackend>(
    params: web::Query<LeadConfirmParams>,
    api: web::Data<LeadApi<B>>,
    options: web::Data<ServerOptions>,
) -> HttpResponse {
    match api.confirm(&params.id).await {
        Ok(lead) => info!("💻️ Lead {} confirmed", lead.id),
        Err(e) => warn!("💻️ Could not confirm lead {}. {e}", params.id),
    }
    let location = format!("{}/home?confirmed=1", options.site_url);
    HttpResponse::Found().insert_header((LOCATION, location)).finish()
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(payment_webhook => Post "/payment" impl AppealBackend);
/// Route handler for payment processor webhooks
///
/// Signatures are checked by the HMAC middleware before this handler runs. Deliveries are acknowledged whether or not
/// they change anything, so that the processor stops redelivering them. The only exception is a storage failure,
/// which returns a 500 so that the delivery is retried.
pub async fn payment_webhook<B: AppealBackend>(
    body: web::Json<PaymentNotification>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let notification = body.into_inner();
    trace!("💻️ Received payment notification: {notification:?}");
    let event = notification.to_event();
    let ctx = RequestContext::system();
    let outcome = match notification.event_type {
        PaymentEventType::Succeeded => api.handle_payment_succeeded(&event, &ctx).await?,
        PaymentEventType::Failed => api.handle_payment_failed(&event, &ctx).await?,
        PaymentEventType::Other => {
            debug!("💻️ Ignoring payment notification for {}", notification.payment_ref);
            return Ok(HttpResponse::Ok().json(WebhookReceipt::received()));
        },
    };
    match outcome {
        PaymentOutcome::Applied(order) => {
            info!("💻️ Payment {} moved order {} to {}", event.payment_ref, order.id, order.status)
        },
        PaymentOutcome::AlreadyHandled(order) => {
            debug!("💻️ Payment {} was already handled. Order {} is {}", event.payment_ref, order.id, order.status)
        },
        PaymentOutcome::Unmatched => warn!("💻️ No order matches payment {}", event.payment_ref),
    }
    Ok(HttpResponse::Ok().json(WebhookReceipt::received()))
}
