use std::{fmt::Debug, time::Duration};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    appeal_api::{
        order_flow_api::transition,
        report_objects::{ReportStatus, RetrySweep},
        RequestContext,
    },
    config::SystemConfig,
    db_types::{AuditEntityType, AuditEventType, NewAuditEvent, Order, OrderId, OrderStatusType, Report, ReportId},
    events::EventProducers,
    helpers::new_lock_token,
    renderer::ReportRenderer,
    snapshot::build_snapshot,
    traits::{OrderManagement, PrecheckManagement, ReportManagement},
    ReportError,
};

/// How long a generation attempt may hold an order before another trigger may claim it.
pub const ORDER_LOCK_TTL_SECS: i64 = 300;
/// The delay before the first automatic retry. Each later retry waits twice as long as the one before.
pub const AUTO_RETRY_BASE_DELAY: Duration = Duration::from_secs(30);

/// The minimum time to wait after the last generation attempt before retrying automatically.
pub fn auto_retry_backoff(attempt_count: i64) -> Duration {
    let doublings = attempt_count.saturating_sub(1).clamp(0, 16) as u32;
    AUTO_RETRY_BASE_DELAY * 2u32.pow(doublings)
}

/// The report generation job.
///
/// [`ReportApi::generate`] claims the order's lock before it reads the order, so two triggers for the same order
/// (a duplicated payment event and a manual retry, say) can never both run. A failed attempt is recorded on the
/// report, the order is moved to `Failed`, and the error is returned to the caller. The job never reschedules itself;
/// [`ReportApi::manual_retry`] and [`ReportApi::retry_failed_reports`] decide when to try again.
pub struct ReportApi<B, R> {
    db: B,
    renderer: R,
    producers: EventProducers,
}

impl<B, R> Debug for ReportApi<B, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReportApi")
    }
}

impl<B, R> ReportApi<B, R> {
    pub fn new(db: B, renderer: R, producers: EventProducers) -> Self {
        Self { db, renderer, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    fn audit(&self, event_type: AuditEventType, order: &Order, report: &Report) {
        let event =
            NewAuditEvent::new(event_type, AuditEntityType::Report, &report.id).with_user(order.user_id.as_str());
        self.producers.record_audit(event);
    }
}

impl<B, R> ReportApi<B, R>
where
    B: OrderManagement + PrecheckManagement + ReportManagement,
    R: ReportRenderer,
{
    /// Generates the report for a `Paid` or `Failed` order.
    pub async fn generate(&self, order_id: &OrderId, config: &SystemConfig) -> Result<Report, ReportError> {
        let token = new_lock_token();
        let now = Utc::now();
        let until = now + chrono::Duration::seconds(ORDER_LOCK_TTL_SECS);
        if !self.db.try_lock_order(order_id, &token, now, until).await? {
            return match self.db.fetch_order(order_id).await? {
                None => Err(ReportError::OrderNotFound(order_id.clone())),
                Some(_) => {
                    warn!("📄️ Order {order_id} is locked by another generation attempt");
                    Err(ReportError::LockUnavailable(order_id.clone()))
                },
            };
        }
        trace!("📄️ Lock {token} acquired on order {order_id}");
        let result = self.generate_locked(order_id, config).await;
        if let Err(e) = self.db.release_order_lock(order_id, &token).await {
            warn!("📄️ Could not release the lock on order {order_id}. It will expire by itself. {e}");
        }
        result
    }

    async fn generate_locked(&self, order_id: &OrderId, config: &SystemConfig) -> Result<Report, ReportError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| ReportError::OrderNotFound(order_id.clone()))?;
        if !matches!(order.status, OrderStatusType::Paid | OrderStatusType::Failed) {
            return Err(ReportError::OrderNotGeneratable(order.status));
        }
        // The ceiling is checked before the order moves, so an exhausted order stays `Failed` with its last error
        let existing = self.db.fetch_report_for_order(order_id).await?;
        if let Some(report) = existing.as_ref().filter(|r| r.attempt_count >= config.max_manual_retries) {
            info!("📄️ Report {} for order {order_id} has used all {} attempts", report.id, config.max_manual_retries);
            return Err(ReportError::MaxRetriesReached(config.max_manual_retries));
        }
        let order = transition(&self.db, &order, OrderStatusType::Processing).await?;
        // From here on, every failure must move the order out of `Processing`
        let report = match existing {
            Some(report) => report,
            None => match self.db.fetch_or_create_report(&order).await {
                Ok(report) => report,
                Err(e) => {
                    let e = ReportError::from(e);
                    self.mark_failed(&order, None, &e).await;
                    return Err(e);
                },
            },
        };
        debug!("📄️ Generating report {} for order {order_id} (attempt #{})", report.id, report.attempt_count + 1);
        self.audit(AuditEventType::ReportGenerationStarted, &order, &report);

        match self.attempt(&order, &report).await {
            Ok(generated) => {
                info!("📄️ Report {} for order {order_id} is available at {:?}", generated.id, generated.pdf_url);
                self.audit(AuditEventType::ReportGenerated, &order, &generated);
                Ok(generated)
            },
            Err(e) => {
                self.mark_failed(&order, Some(&report), &e).await;
                Err(e)
            },
        }
    }

    /// Records the failure on the report (when there is one) and moves the order from `Processing` to `Failed`.
    async fn mark_failed(&self, order: &Order, report: Option<&Report>, e: &ReportError) {
        warn!("📄️ Report generation for order {} failed. {e}", order.id);
        if let Some(report) = report {
            if let Err(db_err) = self.db.record_report_error(&report.id, &e.to_string()).await {
                error!("📄️ Could not record the failure on report {}. {db_err}", report.id);
            }
        }
        if let Err(t_err) = transition(&self.db, order, OrderStatusType::Failed).await {
            error!("📄️ Could not mark order {} as failed. {t_err}", order.id);
        }
        if let Some(report) = report {
            self.audit(AuditEventType::ReportGenerationFailed, order, report);
        }
    }

    async fn attempt(&self, order: &Order, report: &Report) -> Result<Report, ReportError> {
        let now = Utc::now();
        let report = self.db.increment_report_attempt(&report.id, now).await?;
        let precheck = self
            .db
            .fetch_precheck(&order.precheck_id)
            .await?
            .ok_or_else(|| ReportError::SnapshotFailed(format!("Precheck {} not found", order.precheck_id)))?;
        let property = self
            .db
            .fetch_property(&precheck.property_id)
            .await?
            .ok_or_else(|| ReportError::SnapshotFailed(format!("Property {} not found", precheck.property_id)))?;
        let snapshot = build_snapshot(&report.id, now, order, &precheck, &property)
            .map_err(|e| ReportError::SnapshotFailed(e.to_string()))?;
        self.db.save_report_snapshot(&report.id, &snapshot).await?;
        let pdf_url = self
            .renderer
            .render(&report.id, &snapshot)
            .await
            .map_err(|e| ReportError::RenderFailed(e.to_string()))?;
        let report = self.db.save_report_artifact(&report.id, &pdf_url, Utc::now()).await?;
        transition(&self.db, order, OrderStatusType::Completed).await?;
        Ok(report)
    }

    /// Retries a failed report on behalf of its owner.
    pub async fn manual_retry(
        &self,
        user_id: &str,
        report_id: &ReportId,
        config: &SystemConfig,
        ctx: &RequestContext,
    ) -> Result<Report, ReportError> {
        let report =
            self.db.fetch_report(report_id).await?.filter(|r| r.user_id == user_id).ok_or(ReportError::ReportNotFound)?;
        let order = self.db.fetch_order(&report.order_id).await?.ok_or(ReportError::ReportNotFound)?;
        if order.status != OrderStatusType::Failed {
            return Err(ReportError::OrderNotRetryable(order.status));
        }
        if report.attempt_count >= config.max_manual_retries {
            info!("📄️ Report {report_id} has used all {} attempts", config.max_manual_retries);
            return Err(ReportError::MaxRetriesReached(config.max_manual_retries));
        }
        let event = NewAuditEvent::new(AuditEventType::ReportRetryRequested, AuditEntityType::Report, report_id)
            .with_user(user_id)
            .with_origin(ctx.ip.clone(), ctx.user_agent.clone());
        self.producers.record_audit(event);
        self.generate(&order.id, config).await
    }

    /// The order's status, and its report if one exists. Only the order's owner may see it.
    pub async fn report_status(&self, user_id: &str, order_id: &OrderId) -> Result<ReportStatus, ReportError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| ReportError::OrderNotFound(order_id.clone()))?;
        let report = self.db.fetch_report_for_order(order_id).await?;
        Ok(ReportStatus::new(&order, report.as_ref()))
    }

    /// One pass of the automatic retry policy. Failed orders whose report has been attempted fewer than
    /// `max_auto_retries` times, and whose last attempt is older than [`auto_retry_backoff`], are generated again.
    pub async fn retry_failed_reports(
        &self,
        config: &SystemConfig,
        now: DateTime<Utc>,
    ) -> Result<RetrySweep, ReportError> {
        let candidates = self.db.fetch_auto_retry_candidates(config.max_auto_retries).await?;
        let mut sweep = RetrySweep { candidates: candidates.len(), ..Default::default() };
        for report in candidates {
            let backoff = chrono::Duration::seconds(auto_retry_backoff(report.attempt_count).as_secs() as i64);
            let due = report.last_attempt_at.map(|at| at + backoff <= now).unwrap_or(true);
            if !due {
                trace!("📄️ Report {} is not due for a retry yet", report.id);
                continue;
            }
            sweep.attempted.push(report.order_id.clone());
            match self.generate(&report.order_id, config).await {
                Ok(_) => sweep.succeeded.push(report.order_id.clone()),
                Err(e) => warn!("📄️ Automatic retry of order {} failed. {e}", report.order_id),
            }
        }
        Ok(sweep)
    }
}
