//! Environment-variable configuration loading
//!
//! Every variable is optional; absent variables keep their defaults while
//! present-but-unparsable ones are reported with the variable name.

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

use super::types::ServiceConfig;

impl ServiceConfig {
    /// Load configuration from the process environment
    ///
    /// Reads a `.env` file first if one is present (development).
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed, or if the
    /// resulting configuration fails builder validation.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = Self::builder();

        if let Some(host) = get("HOST") {
            builder = builder.host(host);
        }
        if let Some(port) = parse_var::<u16>(&get, "PORT")? {
            builder = builder.port(port);
        }
        if let Some(size) = parse_var::<usize>(&get, "BROWSER_POOL_SIZE")? {
            builder = builder.pool_size(size);
        }
        if let Some(max) = parse_var::<usize>(&get, "MAX_CONCURRENT_REQUESTS")? {
            builder = builder.max_concurrent_requests(max);
        }
        if let Some(ms) = parse_var::<u64>(&get, "REQUEST_TIMEOUT")? {
            builder = builder.request_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64>(&get, "CACHE_TTL")? {
            builder = builder.cache_ttl(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64>(&get, "SELECTOR_TIMEOUT")? {
            builder = builder.selector_timeout(Duration::from_millis(ms));
        }

        // HEADLESS wins over the NODE_ENV convention when both are set
        if let Some(headless) = get("HEADLESS") {
            builder = builder.headless(parse_bool("HEADLESS", &headless)?);
        } else if let Some(node_env) = get("NODE_ENV") {
            builder = builder.headless(node_env == "production");
        }

        if let Some(trust) = get("TRUST_PROXY") {
            builder = builder.trust_proxy(parse_bool("TRUST_PROXY", &trust)?);
        }

        let defaults = ServiceConfig::default();
        let max_requests = parse_var::<usize>(&get, "RATE_LIMIT_MAX_REQUESTS")?
            .unwrap_or(defaults.rate_limit_max_requests);
        let window = parse_var::<u64>(&get, "RATE_LIMIT_WINDOW")?
            .map_or(defaults.rate_limit_window, Duration::from_millis);
        builder = builder.rate_limit(max_requests, window);

        if let Some(ms) = parse_var::<u64>(&get, "KEEPALIVE_INTERVAL")? {
            builder = builder.keepalive_interval((ms > 0).then(|| Duration::from_millis(ms)));
        }
        if let Some(url) = get("SCAM_DETECTOR_BASE_URL") {
            builder = builder.scam_detector_base_url(url.trim_end_matches('/'));
        }
        if let Some(url) = get("PHISHTANK_URL") {
            builder = builder.phishtank_url(url);
        }

        builder.build()
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
        })
        .transpose()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!("{key} must be a boolean, got '{raw}'")),
    }
}
