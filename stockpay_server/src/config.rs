use std::{env, time::Duration as StdDuration};

use chrono::{Duration, Utc};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use spg_common::{helpers::parse_seconds, Secret};
use stockpay_engine::{helpers::DEFAULT_MIN_REFUND_ADDRESS_LEN, DEFAULT_QUOTE_LOCK_SECS};

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/stockpay.db";
const DEFAULT_CATALOG_PATH: &str = "catalog.toml";
const DEFAULT_NODE_URL: &str = "http://127.0.0.1:9998/";
const DEFAULT_ORACLE_URL: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const MAX_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_SESSION_TTL_SECS: u64 = 1800;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub catalog_path: String,
    /// Requests to the `/admin` scope must carry this value in the `spg_admin_key` header.
    pub admin_api_key: Secret<String>,
    pub node: NodeConfig,
    /// Base URL of the CoinGecko-compatible price API
    pub oracle_url: String,
    /// Upper bound on every call to the node or the oracle
    pub http_timeout: StdDuration,
    /// Time between reconciliation cycles
    pub poll_interval: StdDuration,
    pub min_confirmations: u32,
    /// How long a price quote (and so an unpaid order) stays valid
    pub quote_lock: Duration,
    /// Lifetime of refund-address and upload sessions
    pub session_ttl: Duration,
    pub min_refund_address_len: usize,
    /// If set, customer notifications are POSTed here. Otherwise they are only logged.
    pub notify_webhook_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct NodeConfig {
    pub url: String,
    pub user: String,
    pub password: Secret<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            catalog_path: DEFAULT_CATALOG_PATH.to_string(),
            admin_api_key: random_admin_key(),
            node: NodeConfig { url: DEFAULT_NODE_URL.to_string(), ..Default::default() },
            oracle_url: DEFAULT_ORACLE_URL.to_string(),
            http_timeout: StdDuration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            poll_interval: StdDuration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            min_confirmations: 0,
            quote_lock: Duration::seconds(DEFAULT_QUOTE_LOCK_SECS),
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS as i64),
            min_refund_address_len: DEFAULT_MIN_REFUND_ADDRESS_LEN,
            notify_webhook_url: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead."
                    );
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SPG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let catalog_path = env::var("SPG_CATALOG_PATH").ok().unwrap_or_else(|| {
            info!("🪛️ SPG_CATALOG_PATH is not set. Looking for {DEFAULT_CATALOG_PATH} in the working directory.");
            DEFAULT_CATALOG_PATH.to_string()
        });
        let admin_api_key = match env::var("SPG_ADMIN_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Secret::new(key.trim().to_string()),
            _ => random_admin_key(),
        };
        let node = NodeConfig::from_env_or_default();
        let oracle_url = env::var("SPG_ORACLE_URL").ok().unwrap_or_else(|| DEFAULT_ORACLE_URL.to_string());
        let http_timeout = http_timeout(seconds_from_env("SPG_HTTP_TIMEOUT", DEFAULT_HTTP_TIMEOUT_SECS));
        let poll_interval =
            StdDuration::from_secs(seconds_from_env("SPG_POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECS).max(1));
        let min_confirmations = env::var("SPG_MIN_CONFIRMATIONS")
            .ok()
            .and_then(|s| {
                s.trim()
                    .parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SPG_MIN_CONFIRMATIONS. {e}"))
                    .ok()
            })
            .unwrap_or(0);
        #[allow(clippy::cast_sign_loss)]
        let quote_lock = lifetime(
            "SPG_QUOTE_LOCK",
            seconds_from_env("SPG_QUOTE_LOCK", DEFAULT_QUOTE_LOCK_SECS as u64),
            Duration::seconds(DEFAULT_QUOTE_LOCK_SECS),
        );
        #[allow(clippy::cast_possible_wrap)]
        let session_ttl = lifetime(
            "SPG_SESSION_TTL",
            seconds_from_env("SPG_SESSION_TTL", DEFAULT_SESSION_TTL_SECS),
            Duration::seconds(DEFAULT_SESSION_TTL_SECS as i64),
        );
        let min_refund_address_len = env::var("SPG_MIN_REFUND_ADDRESS_LEN")
            .ok()
            .and_then(|s| {
                s.trim()
                    .parse::<usize>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SPG_MIN_REFUND_ADDRESS_LEN. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_MIN_REFUND_ADDRESS_LEN);
        let notify_webhook_url = env::var("SPG_NOTIFY_WEBHOOK_URL").ok().filter(|s| !s.trim().is_empty());
        if notify_webhook_url.is_none() {
            info!("🪛️ SPG_NOTIFY_WEBHOOK_URL is not set. Customer notifications will only be logged.");
        }
        Self {
            host,
            port,
            database_url,
            catalog_path,
            admin_api_key,
            node,
            oracle_url,
            http_timeout,
            poll_interval,
            min_confirmations,
            quote_lock,
            session_ttl,
            min_refund_address_len,
            notify_webhook_url,
        }
    }
}

impl NodeConfig {
    pub fn from_env_or_default() -> Self {
        let url = env::var("SPG_NODE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ SPG_NODE_URL is not set. Using {DEFAULT_NODE_URL}.");
            DEFAULT_NODE_URL.to_string()
        });
        let user = env::var("SPG_NODE_USER").ok().unwrap_or_default();
        let password = Secret::new(env::var("SPG_NODE_PASSWORD").ok().unwrap_or_default());
        if user.is_empty() {
            warn!("🪛️ SPG_NODE_USER is not set. Calls to the payment node will not be authenticated.");
        }
        Self { url, user, password }
    }
}

fn seconds_from_env(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(s) => parse_seconds(&s).unwrap_or_else(|| {
            warn!("🪛️ Invalid configuration value for {name}: {s}. Using the default of {default}s.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default of {default}s.");
            default
        },
    }
}

/// Calls to the node and the oracle get between 1 and 10 seconds.
fn http_timeout(secs: u64) -> StdDuration {
    let clamped = secs.clamp(1, MAX_HTTP_TIMEOUT_SECS);
    if clamped != secs {
        warn!("🪛️ SPG_HTTP_TIMEOUT of {secs}s is out of bounds. Using {clamped}s instead.");
    }
    StdDuration::from_secs(clamped)
}

/// Converts a configured number of seconds into a lifetime that can be added to the current time without overflowing.
fn lifetime(name: &str, secs: u64, default: Duration) -> Duration {
    let lifetime = Duration::from_std(StdDuration::from_secs(secs))
        .ok()
        .filter(|d| Utc::now().checked_add_signed(*d).is_some());
    lifetime.unwrap_or_else(|| {
        warn!("🪛️ {name} of {secs}s is out of range. Using the default of {}s.", default.num_seconds());
        default
    })
}

fn random_admin_key() -> Secret<String> {
    let key = thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect::<String>();
    warn!(
        "🚨️🚨️🚨️ SPG_ADMIN_API_KEY has not been set. I'm using a random value for this session. The admin API is \
         unusable until you set it explicitly. 🚨️🚨️🚨️"
    );
    Secret::new(key)
}
