//! Business configuration.
//!
//! Tunable business values live in the `system_configs` key/value table so they can be changed without a deploy.
//! They are read once at the start of each request into a [`SystemConfig`] value, which is then passed explicitly to
//! everything that needs it. Missing or unreadable entries fall back to the defaults below.
use std::{str::FromStr, time::Duration};

use appeal_common::UsdCents;
use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::*;
use property_data::{County, ProviderTimeouts};

use crate::{db_types::SystemConfigEntry, traits::SystemConfigStore};

pub const DEFAULT_CIVIL_TIMEZONE: Tz = chrono_tz::America::New_York;

pub const KEY_FREE_DAILY_LIMIT: &str = "FREE_DAILY_LIMIT";
pub const KEY_ADDRESS_SCORE_MODAL_THRESHOLD: &str = "ADDRESS_SCORE_MODAL_THRESHOLD";
pub const KEY_ADDRESS_SCORE_OK: &str = "ADDRESS_SCORE_OK";
pub const KEY_RATE_LIMIT_IP: &str = "RATE_LIMIT_IP";
pub const KEY_RATE_LIMIT_USER: &str = "RATE_LIMIT_USER";
pub const KEY_RECONTACT_MONTH_SUFFOLK: &str = "DEFAULT_RECONTACT_MONTH_SUFFOLK";
pub const KEY_RECONTACT_MONTH_NASSAU: &str = "DEFAULT_RECONTACT_MONTH_NASSAU";
pub const KEY_REPORT_PRICE_USD: &str = "REPORT_PRICE_USD";
pub const KEY_MAX_AUTO_RETRIES: &str = "REPORT_MAX_AUTO_RETRIES";
pub const KEY_MAX_MANUAL_RETRIES: &str = "REPORT_MAX_MANUAL_RETRIES";
pub const KEY_ATTOM_TIMEOUT_MS: &str = "ATTOM_TIMEOUT_MS";
pub const KEY_PROPAPIS_TIMEOUT_MS: &str = "PROPAPIS_TIMEOUT_MS";
pub const KEY_RENTCAST_TIMEOUT_MS: &str = "RENTCAST_TIMEOUT_MS";
pub const KEY_PRECHECK_TOTAL_BUDGET_MS: &str = "PRECHECK_TOTAL_BUDGET_MS";
pub const KEY_CIVIL_TIMEZONE: &str = "CIVIL_TIMEZONE";

#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfig {
    pub free_daily_limit: i64,
    /// Below this address-quality score the user must explicitly confirm the address.
    pub address_score_modal_threshold: i64,
    pub address_score_ok: i64,
    pub rate_limit_ip: i64,
    pub rate_limit_user: i64,
    pub recontact_month_suffolk: i64,
    pub recontact_month_nassau: i64,
    pub report_price: UsdCents,
    pub max_auto_retries: i64,
    pub max_manual_retries: i64,
    pub attom_timeout_ms: u64,
    pub propapis_timeout_ms: u64,
    pub rentcast_timeout_ms: u64,
    pub precheck_total_budget_ms: u64,
    /// The zone whose calendar day bounds the precheck cache, the daily quota and the rate limits.
    pub civil_timezone: Tz,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            free_daily_limit: 10,
            address_score_modal_threshold: 70,
            address_score_ok: 90,
            rate_limit_ip: 20,
            rate_limit_user: 10,
            recontact_month_suffolk: 1,
            recontact_month_nassau: 1,
            report_price: UsdCents::from(999),
            max_auto_retries: 3,
            max_manual_retries: 5,
            attom_timeout_ms: 5000,
            propapis_timeout_ms: 5000,
            rentcast_timeout_ms: 8000,
            precheck_total_budget_ms: 12_000,
            civil_timezone: DEFAULT_CIVIL_TIMEZONE,
        }
    }
}

/// The half-open UTC interval `[start, end)` covering one calendar day in the civil timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilDay {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SystemConfig {
    /// Overlays the stored entries on top of `base`. Unknown keys are ignored, and unparsable values keep the value
    /// from `base`.
    pub fn from_entries(base: &SystemConfig, entries: &[SystemConfigEntry]) -> Self {
        let mut config = base.clone();
        for entry in entries {
            let value = entry.value.trim();
            match entry.key.as_str() {
                KEY_FREE_DAILY_LIMIT => set_parsed(&mut config.free_daily_limit, &entry.key, value),
                KEY_ADDRESS_SCORE_MODAL_THRESHOLD => {
                    set_parsed(&mut config.address_score_modal_threshold, &entry.key, value)
                },
                KEY_ADDRESS_SCORE_OK => set_parsed(&mut config.address_score_ok, &entry.key, value),
                KEY_RATE_LIMIT_IP => set_parsed(&mut config.rate_limit_ip, &entry.key, value),
                KEY_RATE_LIMIT_USER => set_parsed(&mut config.rate_limit_user, &entry.key, value),
                KEY_RECONTACT_MONTH_SUFFOLK => set_parsed(&mut config.recontact_month_suffolk, &entry.key, value),
                KEY_RECONTACT_MONTH_NASSAU => set_parsed(&mut config.recontact_month_nassau, &entry.key, value),
                KEY_MAX_AUTO_RETRIES => set_parsed(&mut config.max_auto_retries, &entry.key, value),
                KEY_MAX_MANUAL_RETRIES => set_parsed(&mut config.max_manual_retries, &entry.key, value),
                KEY_ATTOM_TIMEOUT_MS => set_parsed(&mut config.attom_timeout_ms, &entry.key, value),
                KEY_PROPAPIS_TIMEOUT_MS => set_parsed(&mut config.propapis_timeout_ms, &entry.key, value),
                KEY_RENTCAST_TIMEOUT_MS => set_parsed(&mut config.rentcast_timeout_ms, &entry.key, value),
                KEY_PRECHECK_TOTAL_BUDGET_MS => set_parsed(&mut config.precheck_total_budget_ms, &entry.key, value),
                KEY_CIVIL_TIMEZONE => set_parsed(&mut config.civil_timezone, &entry.key, value),
                KEY_REPORT_PRICE_USD => {
                    match value.parse::<f64>().map_err(|e| e.to_string()).and_then(|d| {
                        UsdCents::try_from_dollars(d).map_err(|e| e.to_string())
                    }) {
                        Ok(price) => config.report_price = price,
                        Err(e) => warn!("🪛️ Ignoring invalid {KEY_REPORT_PRICE_USD} value '{value}'. {e}"),
                    }
                },
                _ => trace!("🪛️ Ignoring unknown system config key {}", entry.key),
            }
        }
        config
    }

    pub fn provider_timeouts(&self) -> ProviderTimeouts {
        ProviderTimeouts {
            rentcast: Duration::from_millis(self.rentcast_timeout_ms),
            attom: Duration::from_millis(self.attom_timeout_ms),
            propapis: Duration::from_millis(self.propapis_timeout_ms),
        }
    }

    pub fn precheck_total_budget(&self) -> Duration {
        Duration::from_millis(self.precheck_total_budget_ms)
    }

    /// The month a lead in `county` should be recontacted. Anything other than Nassau uses the Suffolk default.
    pub fn recontact_month_for(&self, county: County) -> i64 {
        match county {
            County::Nassau => self.recontact_month_nassau,
            _ => self.recontact_month_suffolk,
        }
    }

    /// The civil day containing `now`.
    pub fn civil_day(&self, now: DateTime<Utc>) -> CivilDay {
        let tz = self.civil_timezone;
        let date = now.with_timezone(&tz).date_naive();
        let start = local_midnight(&tz, date);
        let end = date
            .checked_add_days(Days::new(1))
            .map(|next| local_midnight(&tz, next))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        CivilDay { date, start, end }
    }
}

/// The first instant of `date` in `tz`. In zones that skip midnight for a DST change, the day starts at the first
/// valid local time after midnight.
fn local_midnight(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let mut time = date.and_time(NaiveTime::MIN);
    for _ in 0..4 {
        match tz.from_local_datetime(&time) {
            LocalResult::Single(t) => return t.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => time += chrono::Duration::minutes(30),
        }
    }
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn set_parsed<T: FromStr>(target: &mut T, key: &str, value: &str) {
    match value.parse::<T>() {
        Ok(v) => *target = v,
        Err(_) => warn!("🪛️ Ignoring invalid {key} value '{value}'. Keeping the current value."),
    }
}

/// Loads the business configuration from the store, overlaying it on `fallback`. If the store cannot be read, the
/// fallback is returned unchanged.
pub async fn load_system_config<B: SystemConfigStore>(db: &B, fallback: &SystemConfig) -> SystemConfig {
    match db.fetch_system_config_entries().await {
        Ok(entries) => SystemConfig::from_entries(fallback, &entries),
        Err(e) => {
            warn!("🪛️ Could not load system configuration. Using defaults. {e}");
            fallback.clone()
        },
    }
}
