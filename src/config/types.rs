//! Core configuration type for the scraping service
//!
//! `ServiceConfig` holds every externally supplied parameter: listener
//! address, pool bounds, timeouts, cache TTL, rate-limit thresholds and
//! target site locations. Construct it with [`ServiceConfig::from_env`]
//! or [`ServiceConfig::builder`].

use std::time::Duration;

use crate::utils::constants::{
    DEFAULT_CACHE_TTL, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_POOL_SIZE, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SELECTOR_TIMEOUT, PHISHTANK_URL, RATE_LIMIT_MAX_REQUESTS,
    RATE_LIMIT_WINDOW, SCAM_DETECTOR_BASE_URL,
};

/// Main configuration struct for the scraping service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub(crate) host: String,
    pub(crate) port: u16,

    /// Pre-warmed idle sessions kept by the pool.
    ///
    /// Independent of `max_concurrent_requests`: this bounds the idle queue,
    /// that bounds the number of sessions lent out at once.
    pub(crate) pool_size: usize,
    pub(crate) max_concurrent_requests: usize,

    /// Budget for navigation plus extraction of one request
    pub(crate) request_timeout: Duration,

    /// Time-to-live of cached extraction results. Zero disables caching.
    pub(crate) cache_ttl: Duration,

    /// How long to wait for the reputation accordion before extracting anyway
    pub(crate) selector_timeout: Duration,

    pub(crate) headless: bool,

    /// Take the client identity from `X-Forwarded-For` / `X-Real-IP`.
    /// Only safe behind a reverse proxy that overwrites those headers.
    pub(crate) trust_proxy: bool,

    pub(crate) rate_limit_max_requests: usize,
    pub(crate) rate_limit_window: Duration,

    /// Period of the idle-session keepalive sweep; `None` disables it
    pub(crate) keepalive_interval: Option<Duration>,

    pub(crate) scam_detector_base_url: String,
    pub(crate) phishtank_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            pool_size: DEFAULT_POOL_SIZE,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            selector_timeout: DEFAULT_SELECTOR_TIMEOUT,
            headless: true,
            trust_proxy: false,
            rate_limit_max_requests: RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window: RATE_LIMIT_WINDOW,
            keepalive_interval: None,
            scam_detector_base_url: SCAM_DETECTOR_BASE_URL.to_string(),
            phishtank_url: PHISHTANK_URL.to_string(),
        }
    }
}
