//! Fluent builder for `ServiceConfig`
//!
//! Every field has a default, so the builder starts from
//! `ServiceConfig::default()` and only validates cross-field bounds on `build()`.

use anyhow::{Result, bail};
use std::time::Duration;

use super::types::ServiceConfig;

#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfig {
    /// Start building a configuration from defaults
    #[must_use]
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    #[must_use]
    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.config.max_concurrent_requests = max;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// A zero TTL disables caching
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn selector_timeout(mut self, timeout: Duration) -> Self {
        self.config.selector_timeout = timeout;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.config.trust_proxy = trust;
        self
    }

    #[must_use]
    pub fn rate_limit(mut self, max_requests: usize, window: Duration) -> Self {
        self.config.rate_limit_max_requests = max_requests;
        self.config.rate_limit_window = window;
        self
    }

    #[must_use]
    pub fn keepalive_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.keepalive_interval = interval;
        self
    }

    #[must_use]
    pub fn scam_detector_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.scam_detector_base_url = url.into();
        self
    }

    #[must_use]
    pub fn phishtank_url(mut self, url: impl Into<String>) -> Self {
        self.config.phishtank_url = url.into();
        self
    }

    /// Validate and produce the configuration
    ///
    /// # Errors
    ///
    /// Returns an error when a bound is zero where at least one is required,
    /// or when a site URL does not parse.
    pub fn build(self) -> Result<ServiceConfig> {
        let config = self.config;

        if config.max_concurrent_requests == 0 {
            bail!("max_concurrent_requests must be at least 1");
        }
        if config.rate_limit_max_requests == 0 {
            bail!("rate_limit_max_requests must be at least 1");
        }
        if config.rate_limit_window.is_zero() {
            bail!("rate_limit_window must be non-zero");
        }
        if config.request_timeout.is_zero() {
            bail!("request_timeout must be non-zero");
        }
        if config.keepalive_interval.is_some_and(|d| d.is_zero()) {
            bail!("keepalive_interval must be non-zero when set");
        }
        for (name, value) in [
            ("scam_detector_base_url", &config.scam_detector_base_url),
            ("phishtank_url", &config.phishtank_url),
        ] {
            if let Err(e) = url::Url::parse(value) {
                bail!("{name} is not a valid URL ({value}): {e}");
            }
        }

        Ok(config)
    }
}
