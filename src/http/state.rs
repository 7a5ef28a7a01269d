use std::sync::Arc;
use std::time::Instant;

use crate::browser_pool::SessionLauncher;
use crate::rate_limiter::ClientRateLimiter;
use crate::scrape_service::ScrapeService;

/// Shared state handed to every handler
pub struct AppState<L: SessionLauncher> {
    pub service: Arc<ScrapeService<L>>,
    pub limiter: Arc<ClientRateLimiter>,
    pub started_at: Instant,
    /// Honour forwarded-for headers when identifying clients
    pub trust_proxy: bool,
}

impl<L: SessionLauncher> AppState<L> {
    pub fn new(service: Arc<ScrapeService<L>>, limiter: Arc<ClientRateLimiter>) -> Self {
        Self {
            service,
            limiter,
            started_at: Instant::now(),
            trust_proxy: false,
        }
    }

    #[must_use]
    pub fn with_trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }
}

// Manual impl: deriving would demand `L: Clone`
impl<L: SessionLauncher> Clone for AppState<L> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            limiter: Arc::clone(&self.limiter),
            started_at: self.started_at,
            trust_proxy: self.trust_proxy,
        }
    }
}
