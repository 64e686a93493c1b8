//! Server configuration.
//!
//! Everything is read once from the environment at start-up (a `.env` file is honoured). Missing or invalid values
//! fall back to defaults, and every fallback is logged.
use std::{env, time::Duration};

use fest_common::{parse_boolean_flag, Secret, DEFAULT_CURRENCY_CODE};
use fest_engine::proofs::GatewayConfig;
use log::*;

const DEFAULT_FEST_HOST: &str = "127.0.0.1";
const DEFAULT_FEST_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/fest_orders.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_GATEWAY_URL: &str = "https://api.razorpay.com";
const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_OCR_URL: &str = "http://127.0.0.1:8866/ocr";
const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_ASSET_BASE_URL: &str = "http://127.0.0.1:8867/assets";
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub identity: IdentityConfig,
    pub gateway: GatewayConfig,
    /// ISO currency code used for payment intents
    pub currency: String,
    pub ocr: OcrConfig,
    /// When false, counter cash proofs are rejected.
    pub allow_counter_cash: bool,
    /// If set, finalized and fulfilled orders are POSTed here as JSON.
    pub notify_webhook_url: Option<String>,
    pub event_buffer_size: usize,
}

#[derive(Clone, Debug)]
pub struct IdentityConfig {
    /// The secret shared with the identity provider, used to sign the `x-fest-claims` header.
    pub secret: Secret<String>,
    /// If false, claims are accepted without checking their signature. **DANGER**
    pub checks: bool,
}

#[derive(Clone, Debug)]
pub struct OcrConfig {
    pub url: String,
    pub api_key: Secret<String>,
    /// Upper bound on fetching a screenshot and reading it
    pub timeout: Duration,
    pub asset_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FEST_HOST.to_string(),
            port: DEFAULT_FEST_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            identity: IdentityConfig::default(),
            gateway: GatewayConfig {
                base_url: DEFAULT_GATEWAY_URL.to_string(),
                timeout: DEFAULT_GATEWAY_TIMEOUT,
                ..Default::default()
            },
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            ocr: OcrConfig::default(),
            allow_counter_cash: true,
            notify_webhook_url: None,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { secret: Secret::default(), checks: true }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OCR_URL.to_string(),
            api_key: Secret::default(),
            timeout: DEFAULT_OCR_TIMEOUT,
            asset_base_url: DEFAULT_ASSET_BASE_URL.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("FEST_HOST").ok().unwrap_or_else(|| DEFAULT_FEST_HOST.into());
        let port = parse_env("FEST_PORT", DEFAULT_FEST_PORT);
        let database_url = env::var("FEST_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ FEST_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = parse_env("FEST_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let identity = IdentityConfig::from_env_or_default();
        let gateway = gateway_config_from_env();
        let currency = env::var("FEST_CURRENCY").ok().unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        let ocr = OcrConfig::from_env_or_default();
        let allow_counter_cash = parse_boolean_flag(env::var("FEST_ALLOW_COUNTER_CASH").ok(), true);
        if !allow_counter_cash {
            info!("🪛️ Counter cash payments are switched off.");
        }
        let notify_webhook_url = env::var("FEST_NOTIFY_WEBHOOK_URL").ok().filter(|s| !s.trim().is_empty());
        if notify_webhook_url.is_none() {
            info!("🪛️ FEST_NOTIFY_WEBHOOK_URL is not set. Order notifications will only be logged.");
        }
        let event_buffer_size = parse_env("FEST_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        Self {
            host,
            port,
            database_url,
            max_connections,
            identity,
            gateway,
            currency,
            ocr,
            allow_counter_cash,
            notify_webhook_url,
            event_buffer_size,
        }
    }
}

impl IdentityConfig {
    pub fn from_env_or_default() -> Self {
        let secret = env::var("FEST_IDENTITY_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ FEST_IDENTITY_SECRET is not set. Please set it to the secret shared with your identity provider. \
                 No signed claims will be accepted until you do."
            );
            String::default()
        });
        let checks = parse_boolean_flag(env::var("FEST_IDENTITY_CHECKS").ok(), true);
        if !checks {
            warn!(
                "🚨️🚨️🚨️ Identity claim signatures are NOT being checked. Anyone can act as any user. Never run \
                 production like this. 🚨️🚨️🚨️"
            );
        }
        Self { secret: Secret::new(secret), checks }
    }
}

impl OcrConfig {
    pub fn from_env_or_default() -> Self {
        let url = env::var("FEST_OCR_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ FEST_OCR_URL is not set. Using {DEFAULT_OCR_URL}");
            DEFAULT_OCR_URL.to_string()
        });
        let api_key = Secret::new(env::var("FEST_OCR_API_KEY").ok().unwrap_or_default());
        let timeout = Duration::from_secs(parse_env("FEST_OCR_TIMEOUT_SECS", DEFAULT_OCR_TIMEOUT.as_secs()));
        let asset_base_url = env::var("FEST_ASSET_BASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ FEST_ASSET_BASE_URL is not set. Using {DEFAULT_ASSET_BASE_URL}");
            DEFAULT_ASSET_BASE_URL.to_string()
        });
        Self { url, api_key, timeout, asset_base_url }
    }
}

fn gateway_config_from_env() -> GatewayConfig {
    let base_url = env::var("FEST_GATEWAY_URL").ok().unwrap_or_else(|| {
        info!("🪛️ FEST_GATEWAY_URL is not set. Using {DEFAULT_GATEWAY_URL}");
        DEFAULT_GATEWAY_URL.to_string()
    });
    let key_id = env::var("FEST_GATEWAY_KEY_ID").ok().unwrap_or_else(|| {
        error!("🪛️ FEST_GATEWAY_KEY_ID is not set. Payment intents cannot be created.");
        String::default()
    });
    let key_secret = env::var("FEST_GATEWAY_KEY_SECRET").ok().unwrap_or_else(|| {
        error!("🪛️ FEST_GATEWAY_KEY_SECRET is not set. Gateway payments cannot be verified.");
        String::default()
    });
    GatewayConfig { base_url, key_id, key_secret: Secret::new(key_secret), timeout: DEFAULT_GATEWAY_TIMEOUT }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => parse_value(name, &s, default),
        Err(_) => default,
    }
}

fn parse_value<T>(name: &str, value: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().unwrap_or_else(|e| {
        error!("🪛️ {value} is not a valid value for {name}. {e} Using the default, {default}, instead.");
        default
    })
}
