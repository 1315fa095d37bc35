use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::enumerator::EnumerationOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    #[serde(default = "default_http_url")]
    pub http_url: String,
    /// Upper bound for a single read-only call; a timed-out read fails its candidate only.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_http_url() -> String {
    "http://127.0.0.1:8545".to_string()
}
fn default_read_timeout_ms() -> u64 {
    3_000
}

impl Default for Rpc {
    fn default() -> Self {
        Self {
            http_url: default_http_url(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Routing {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    #[serde(default = "default_multihop_fee_tier_cap")]
    pub multihop_fee_tier_cap: usize,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
    /// 0 disables the cross-request pool-address cache.
    #[serde(default = "default_pool_cache_ttl_seconds")]
    pub pool_cache_ttl_seconds: u64,
    #[serde(default = "default_pool_cache_capacity")]
    pub pool_cache_capacity: usize,
}

fn default_max_concurrency() -> usize {
    32
}
fn default_max_hops() -> usize {
    3
}
fn default_multihop_fee_tier_cap() -> usize {
    2
}
fn default_slippage_bps() -> u32 {
    50
} // 0.5%
fn default_pool_cache_ttl_seconds() -> u64 {
    300
}
fn default_pool_cache_capacity() -> usize {
    crate::prober::DEFAULT_POOL_CACHE_CAPACITY
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_hops: default_max_hops(),
            multihop_fee_tier_cap: default_multihop_fee_tier_cap(),
            slippage_bps: default_slippage_bps(),
            pool_cache_ttl_seconds: default_pool_cache_ttl_seconds(),
            pool_cache_capacity: default_pool_cache_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub rpc: Rpc,
    #[serde(default)]
    pub routing: Routing,
    #[serde(default)]
    pub log: Log,
}

impl Settings {
    /// `Config.toml` in the working directory (optional), `.env`, then `ROUTE_SDK_*`.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("Config.toml")
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;
        settings.apply_overrides(|key| env::var(key).ok());
        Ok(settings)
    }

    /// Applies `ROUTE_SDK_*` overrides read through `lookup`. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ROUTE_SDK_RPC_HTTP_URL") {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                self.rpc.http_url = trimmed.to_string();
            }
        }
        if let Some(ms) = parse_env(&lookup, "ROUTE_SDK_READ_TIMEOUT_MS") {
            self.rpc.read_timeout_ms = ms;
        }
        if let Some(n) = parse_env(&lookup, "ROUTE_SDK_MAX_CONCURRENCY") {
            self.routing.max_concurrency = n;
        }
        if let Some(n) = parse_env(&lookup, "ROUTE_SDK_MAX_HOPS") {
            self.routing.max_hops = n;
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc.read_timeout_ms)
    }

    pub fn enumeration_options(&self) -> EnumerationOptions {
        EnumerationOptions {
            max_hops: self.routing.max_hops.clamp(1, 3),
            multihop_fee_tier_cap: self.routing.multihop_fee_tier_cap.max(1),
        }
    }

    pub fn pool_cache_ttl(&self) -> Option<Duration> {
        match self.routing.pool_cache_ttl_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}: cannot parse {:?}", key, raw);
            None
        }
    }
}
