use std::{env, time::Duration};

use appeal_common::{parse_boolean_flag, Secret};
use appeal_engine::{config::DEFAULT_CIVIL_TIMEZONE, SystemConfig, ORDER_LOCK_TTL_SECS};
use chrono_tz::Tz;
use log::*;
use property_data::DataSourceConfig;

const DEFAULT_APPEAL_HOST: &str = "127.0.0.1";
const DEFAULT_APPEAL_PORT: u16 = 8360;
const DEFAULT_RETRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_RENDERER_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// The zone whose calendar day bounds the precheck cache, quotas and rate limits.
    pub civil_timezone: Tz,
    /// How often the automatic report retry sweep runs.
    pub retry_sweep_interval: Duration,
    /// The public site. Checkout redirects and lead confirmation links point back here.
    pub site_url: String,
    pub payment: PaymentConfig,
    pub renderer: RendererConfig,
    pub data_sources: DataSourceConfig,
}

#[derive(Clone, Debug, Default)]
pub struct PaymentConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    /// If false, webhook signatures are not checked. **DANGER**
    pub signature_checks: bool,
}

#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// If empty, reports are "rendered" by the digest renderer, which produces no file.
    pub url: String,
    pub secret: Secret<String>,
    /// The longest a render request may take. Always shorter than the order lock, so that a hung renderer cannot
    /// outlive the generation attempt that called it.
    pub timeout: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self { url: String::default(), secret: Secret::default(), timeout: DEFAULT_RENDERER_TIMEOUT }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_APPEAL_HOST.to_string(),
            port: DEFAULT_APPEAL_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            civil_timezone: DEFAULT_CIVIL_TIMEZONE,
            retry_sweep_interval: DEFAULT_RETRY_SWEEP_INTERVAL,
            site_url: DEFAULT_SITE_URL.to_string(),
            payment: PaymentConfig { signature_checks: true, ..Default::default() },
            renderer: RendererConfig::default(),
            data_sources: DataSourceConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("APPEAL_HOST").ok().unwrap_or_else(|| DEFAULT_APPEAL_HOST.into());
        let port = env::var("APPEAL_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for APPEAL_PORT. {e} Using the default, {DEFAULT_APPEAL_PORT}, \
                         instead."
                    );
                    DEFAULT_APPEAL_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_APPEAL_PORT);
        let database_url = env::var("APPEAL_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ APPEAL_DATABASE_URL is not set. Please set it to the URL for the appeal database.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("APPEAL_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("APPEAL_USE_FORWARDED").ok(), false);
        let civil_timezone = configure_civil_timezone();
        let retry_sweep_interval = configure_retry_sweep_interval();
        let site_url = env::var("APPEAL_SITE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ APPEAL_SITE_URL is not set. Using {DEFAULT_SITE_URL} for redirects.");
            DEFAULT_SITE_URL.to_string()
        });
        let site_url = site_url.trim_end_matches('/').to_string();
        let payment = PaymentConfig::from_env_or_defaults();
        let renderer = RendererConfig::from_env_or_defaults();
        let data_sources = DataSourceConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            civil_timezone,
            retry_sweep_interval,
            site_url,
            payment,
            renderer,
            data_sources,
        }
    }

    /// The business configuration used when the `system_configs` table has no entry for a value.
    pub fn system_config_defaults(&self) -> SystemConfig {
        SystemConfig { civil_timezone: self.civil_timezone, ..SystemConfig::default() }
    }
}

impl PaymentConfig {
    pub fn from_env_or_defaults() -> Self {
        let api_url = env::var("APPEAL_PAYMENT_API_URL").ok().unwrap_or_else(|| {
            error!("🪛️ APPEAL_PAYMENT_API_URL is not set. Checkout sessions cannot be created.");
            String::default()
        });
        let api_key = Secret::new(env::var("APPEAL_PAYMENT_API_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ APPEAL_PAYMENT_API_KEY is not set. Please set it to the payment processor's secret key.");
            String::default()
        }));
        let webhook_secret = Secret::new(env::var("APPEAL_PAYMENT_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ APPEAL_PAYMENT_WEBHOOK_SECRET is not set. Please set it to the signing secret for payment \
                 webhooks."
            );
            String::default()
        }));
        let signature_checks = parse_boolean_flag(env::var("APPEAL_PAYMENT_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!("🚨️ Payment webhook signature checks are DISABLED. Do not run production like this. 🚨️");
        }
        Self { api_url: api_url.trim_end_matches('/').to_string(), api_key, webhook_secret, signature_checks }
    }
}

impl RendererConfig {
    pub fn from_env_or_defaults() -> Self {
        let url = env::var("APPEAL_RENDERER_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ APPEAL_RENDERER_URL is not set. Reports will be recorded without a rendered file.");
            String::default()
        });
        let secret = Secret::new(env::var("APPEAL_RENDERER_SECRET").ok().unwrap_or_default());
        if !url.is_empty() && !secret.is_set() {
            warn!("🪛️ APPEAL_RENDERER_SECRET is not set. The renderer will probably reject our requests.");
        }
        let timeout = renderer_timeout(env::var("APPEAL_RENDERER_TIMEOUT").ok());
        Self { url: url.trim_end_matches('/').to_string(), secret, timeout }
    }

    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

fn configure_civil_timezone() -> Tz {
    env::var("APPEAL_CIVIL_TIMEZONE")
        .map_err(|_| info!("🪛️ APPEAL_CIVIL_TIMEZONE is not set. Using {DEFAULT_CIVIL_TIMEZONE}."))
        .and_then(|s| {
            s.parse::<Tz>().map_err(|e| warn!("🪛️ Invalid configuration value for APPEAL_CIVIL_TIMEZONE. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_CIVIL_TIMEZONE)
}

/// Parses the renderer timeout in seconds. Values of zero, or at least as long as the order lock, are rejected.
fn renderer_timeout(value: Option<String>) -> Duration {
    let max_secs = u64::try_from(ORDER_LOCK_TTL_SECS).unwrap_or(u64::MAX);
    value
        .ok_or_else(|| {
            debug!(
                "🪛️ APPEAL_RENDERER_TIMEOUT is not set. Using the default value of {} s.",
                DEFAULT_RENDERER_TIMEOUT.as_secs()
            )
        })
        .and_then(|s| {
            s.trim().parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for APPEAL_RENDERER_TIMEOUT. {e}"))
        })
        .and_then(|secs| {
            (secs > 0 && secs < max_secs).then(|| Duration::from_secs(secs)).ok_or_else(|| {
                warn!("🪛️ APPEAL_RENDERER_TIMEOUT must be between 1 and {} seconds.", max_secs - 1)
            })
        })
        .unwrap_or(DEFAULT_RENDERER_TIMEOUT)
}

fn configure_retry_sweep_interval() -> Duration {
    env::var("APPEAL_RETRY_SWEEP_INTERVAL")
        .map_err(|_| {
            info!(
                "🪛️ APPEAL_RETRY_SWEEP_INTERVAL is not set. Using the default value of {} s.",
                DEFAULT_RETRY_SWEEP_INTERVAL.as_secs()
            )
        })
        .and_then(|s| {
            s.parse::<u64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for APPEAL_RETRY_SWEEP_INTERVAL. {e}"))
                .and_then(|secs| {
                    (secs > 0)
                        .then(|| Duration::from_secs(secs))
                        .ok_or_else(|| warn!("🪛️ APPEAL_RETRY_SWEEP_INTERVAL must be at least 1 second."))
                })
        })
        .ok()
        .unwrap_or(DEFAULT_RETRY_SWEEP_INTERVAL)
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub site_url: String,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            site_url: config.site_url.clone(),
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}
