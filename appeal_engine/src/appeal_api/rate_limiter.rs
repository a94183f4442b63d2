//! Per-IP and per-user daily request limits.
//!
//! Both layers count over the same civil day as the precheck cache and quota. The IP layer counts audit events
//! recorded from the caller's address; the user layer counts prechecks the user has created. A layer whose count
//! cannot be read lets the request through.
use std::fmt::{Debug, Display};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    appeal_api::RequestContext,
    config::{CivilDay, SystemConfig},
    traits::{AuditLog, PrecheckManagement},
    RateLimitError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitLayer {
    Ip,
    User,
}

impl Display for RateLimitLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitLayer::Ip => write!(f, "ip"),
            RateLimitLayer::User => write!(f, "user"),
        }
    }
}

pub struct RateLimiter<B> {
    db: B,
}

impl<B> Debug for RateLimiter<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RateLimiter")
    }
}

impl<B> RateLimiter<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> RateLimiter<B>
where B: AuditLog + PrecheckManagement
{
    /// Checks both layers concurrently. If both are exhausted, the IP layer is reported.
    pub async fn check(
        &self,
        user_id: &str,
        ctx: &RequestContext,
        config: &SystemConfig,
        now: DateTime<Utc>,
    ) -> Result<(), RateLimitError> {
        let day = config.civil_day(now);
        let (ip, user) =
            tokio::join!(self.check_ip(ctx.ip.as_deref(), config, &day), self.check_user(user_id, config, &day));
        ip?;
        user
    }

    async fn check_ip(&self, ip: Option<&str>, config: &SystemConfig, day: &CivilDay) -> Result<(), RateLimitError> {
        // Requests without a usable address are not limited by IP
        let Some(ip) = ip else {
            return Ok(());
        };
        match self.db.count_audit_events_for_ip(ip, day.start, day.end).await {
            Ok(count) if count >= config.rate_limit_ip => {
                info!("🚦️ {ip} has made {count} requests on {}. Limit is {}", day.date, config.rate_limit_ip);
                Err(RateLimitError { layer: RateLimitLayer::Ip, limit: config.rate_limit_ip })
            },
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("🚦️ Could not count requests from {ip}. Allowing the request. {e}");
                Ok(())
            },
        }
    }

    async fn check_user(&self, user_id: &str, config: &SystemConfig, day: &CivilDay) -> Result<(), RateLimitError> {
        match self.db.count_prechecks_for_user(user_id, day.start, day.end).await {
            Ok(count) if count >= config.rate_limit_user => {
                let limit = config.rate_limit_user;
                info!("🚦️ {user_id} has made {count} prechecks on {}. Limit is {limit}", day.date);
                Err(RateLimitError { layer: RateLimitLayer::User, limit: config.rate_limit_user })
            },
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("🚦️ Could not count prechecks for {user_id}. Allowing the request. {e}");
                Ok(())
            },
        }
    }
}
