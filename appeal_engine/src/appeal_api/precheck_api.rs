use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use property_data::PropertyDataSource;

use crate::{
    appeal_api::{
        precheck_objects::{PrecheckOutcome, PrecheckRequest},
        RequestContext,
    },
    config::SystemConfig,
    db_types::{AuditEntityType, AuditEventType, NewAuditEvent, NewPrecheck, PrecheckMetadata, SnapshotConfig},
    eligibility::{compute_eligibility, EligibilityInput},
    events::EventProducers,
    traits::PrecheckManagement,
    PrecheckError,
};

/// Runs eligibility prechecks.
///
/// Each step of [`PrecheckApi::execute`] is a hard gate: the address quality gate, the same-day cache, the daily
/// quota, the property upsert, the budgeted data fetch and the rule pack lookup all run before anything is written.
pub struct PrecheckApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for PrecheckApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrecheckApi")
    }
}

impl<B, G> PrecheckApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> PrecheckApi<B, G>
where
    B: PrecheckManagement,
    G: PropertyDataSource,
{
    pub async fn execute(
        &self,
        user_id: &str,
        request: &PrecheckRequest,
        config: &SystemConfig,
        ctx: &RequestContext,
    ) -> Result<PrecheckOutcome, PrecheckError> {
        self.execute_at(user_id, request, config, ctx, Utc::now()).await
    }

    /// As [`Self::execute`], with the civil day and the comp age window taken from `now`.
    pub async fn execute_at(
        &self,
        user_id: &str,
        request: &PrecheckRequest,
        config: &SystemConfig,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<PrecheckOutcome, PrecheckError> {
        request.validate()?;
        let threshold = config.address_score_modal_threshold;
        if request.address_quality_score < threshold && !request.confirmed_by_user {
            debug!(
                "🔍️ Address '{}' scored {} (< {threshold}) and has not been confirmed by {user_id}",
                request.formatted_address, request.address_quality_score
            );
            return Err(PrecheckError::AddressConfirmationRequired { score: request.address_quality_score, threshold });
        }

        let day = config.civil_day(now);
        if let Some(cached) = self.db.fetch_cached_precheck(user_id, &request.place_id, day.start, day.end).await? {
            debug!("🔍️ Returning precheck {} from {} for {user_id} from cache", cached.id, day.date);
            return Ok(PrecheckOutcome::cached(cached));
        }

        let used = self.db.count_prechecks_for_user(user_id, day.start, day.end).await?;
        if used >= config.free_daily_limit {
            info!("🔍️ {user_id} has used {used} of {} prechecks on {}", config.free_daily_limit, day.date);
            return Err(PrecheckError::DailyLimitExceeded { limit: config.free_daily_limit });
        }

        let property = self.db.fetch_or_create_property(request.new_property()).await?;
        trace!("🔍️ Property {} resolved for place {}", property.id, property.place_id);

        let timeouts = config.provider_timeouts();
        let lookup = request.lookup();
        let data = tokio::time::timeout(config.precheck_total_budget(), self.gateway.fetch(&lookup, &timeouts))
            .await
            .map_err(|_| {
                warn!(
                    "🔍️ Property data for '{}' did not arrive within {} ms",
                    request.formatted_address, config.precheck_total_budget_ms
                );
                PrecheckError::BudgetExceeded(config.precheck_total_budget_ms)
            })?;

        let pack = self.db.fetch_active_rule_pack().await?.ok_or(PrecheckError::NoActiveRulePack)?;
        let input = EligibilityInput {
            assessed_value: data.property.assessed_value.unwrap_or_default(),
            comps: &data.comps,
            address_quality_score: request.address_quality_score,
            has_property_data_conflict: false,
            rules: &pack.rules_json.0,
            today: day.date,
        };
        let result = compute_eligibility(&input);

        let metadata = PrecheckMetadata {
            data_source: data.source,
            comps_raw_count: data.comps.len(),
            comps: data.comps,
            comps_used: result.comps,
            property_data: data.property,
        };
        let new_precheck = NewPrecheck {
            user_id: user_id.to_string(),
            property_id: property.id,
            decision: result.decision,
            confidence: result.confidence,
            factors: result.factors,
            metrics: result.metrics,
            snapshot_config: SnapshotConfig::from(&pack),
            metadata,
            explanation: result.explanation,
            confirmed_by_user: request.confirmed_by_user,
            created_at: now,
        };
        let precheck = self.db.insert_precheck(new_precheck).await?;
        info!(
            "🔍️ Precheck {} for {user_id}: {} with confidence {:.2} (rule pack v{})",
            precheck.id, precheck.decision, precheck.confidence, pack.version
        );

        let event = NewAuditEvent::new(AuditEventType::PrecheckCreated, AuditEntityType::Precheck, &precheck.id)
            .with_user(user_id)
            .with_origin(ctx.ip.clone(), ctx.user_agent.clone())
            .at(now);
        self.producers.record_audit(event);
        Ok(PrecheckOutcome::live(precheck))
    }
}
