//! Read accessors for `ServiceConfig`

use std::time::Duration;

use super::types::ServiceConfig;

impl ServiceConfig {
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` string suitable for `TcpListener::bind`
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    #[must_use]
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    #[must_use]
    pub fn selector_timeout(&self) -> Duration {
        self.selector_timeout
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn trust_proxy(&self) -> bool {
        self.trust_proxy
    }

    #[must_use]
    pub fn rate_limit_max_requests(&self) -> usize {
        self.rate_limit_max_requests
    }

    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        self.rate_limit_window
    }

    #[must_use]
    pub fn keepalive_interval(&self) -> Option<Duration> {
        self.keepalive_interval
    }

    #[must_use]
    pub fn scam_detector_base_url(&self) -> &str {
        &self.scam_detector_base_url
    }

    #[must_use]
    pub fn phishtank_url(&self) -> &str {
        &self.phishtank_url
    }
}
