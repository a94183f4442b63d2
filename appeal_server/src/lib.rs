//! # Appeal server
//! This crate hosts the HTTP surface of the property tax appeal service. It is responsible for:
//! * Running address prechecks and returning the eligibility result.
//! * Creating report orders and opening checkout sessions with the payment processor.
//! * Receiving payment webhooks and moving orders through their lifecycle.
//! * Triggering report generation when an order is paid, and retrying failed reports in the background.
//! * Storing "notify me" leads.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /api/precheck`: Run or fetch today's precheck for an address.
//! * `POST /api/orders`: Order a report for an eligible precheck. Returns the checkout URL.
//! * `GET /api/report/status?order_id=`: The order's status and its report, if any.
//! * `POST /api/report/retry`: Retry a failed report.
//! * `POST /api/leads`: Store a lead.
//! * `GET /api/leads/confirm?id=`: Confirm a lead's opt-in and redirect to the site.
//! * `POST /webhooks/payment`: Payment processor notifications. Signed with HMAC-SHA256.
//!
//! Callers of `/api` routes are identified by the `X-User-Id` header, set by the authenticating gateway.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod retry_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
