use std::{sync::Arc, time::Duration};

use appeal_engine::{db_types::OrderId, load_system_config, ReportApi, SqliteDatabase, SystemConfig};
use chrono::Utc;
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::renderer::ServerRenderer;

/// Starts the automatic report retry worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_retry_worker(
    api: Arc<ReportApi<SqliteDatabase, ServerRenderer>>,
    defaults: SystemConfig,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Report retry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running report retry job");
            let config = load_system_config(api.db(), &defaults).await;
            match api.retry_failed_reports(&config, Utc::now()).await {
                Ok(sweep) if sweep.candidates == 0 => trace!("🕰️ No failed reports to retry"),
                Ok(sweep) => {
                    info!(
                        "🕰️ {} failed reports found. {} retried, {} completed",
                        sweep.candidates,
                        sweep.attempted.len(),
                        sweep.succeeded.len()
                    );
                    debug!("🕰️ Retried orders: {}", order_list(&sweep.attempted));
                    debug!("🕰️ Completed orders: {}", order_list(&sweep.succeeded));
                },
                Err(e) => {
                    error!("🕰️ Error running report retry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[OrderId]) -> String {
    orders.iter().map(|o| o.to_string()).collect::<Vec<String>>().join(", ")
}
