//! Request coordination: validate, consult the cache, borrow a session, run a page task
//!
//! Every path that acquires a session hands it back to the pool, whether the
//! page work succeeded, failed or ran out of time. A page abandoned by a
//! timeout is closed when the pool recycles the session.

pub mod errors;
pub mod page_timeout;

pub use errors::ScrapeError;
pub use page_timeout::with_page_timeout;

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::browser_pool::{BrowserPool, PageOf, PageSettings, Session, SessionLauncher, SessionPage};
use crate::config::ServiceConfig;
use crate::extraction::{
    ExtractionResult, PageTask, PhishCheckResult, PhishTankChecker, ScamDetectorExtractor,
};
use crate::result_cache::ResultCache;
use crate::utils::{cache_key, validate_domain};

/// A result together with how it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOutcome<T> {
    pub data: T,
    pub cached: bool,
    pub processing_time: Duration,
}

pub struct ScrapeService<L: SessionLauncher> {
    pool: Arc<BrowserPool<L>>,
    cache: ResultCache<ExtractionResult>,
    extractor: ScamDetectorExtractor,
    phish_checker: PhishTankChecker,
    page_settings: PageSettings,
    request_timeout: Duration,
}

impl<L: SessionLauncher> ScrapeService<L> {
    pub fn new(pool: Arc<BrowserPool<L>>, config: &ServiceConfig) -> Self {
        Self {
            pool,
            cache: ResultCache::new(config.cache_ttl()),
            extractor: ScamDetectorExtractor::new(
                config.scam_detector_base_url(),
                config.selector_timeout(),
            ),
            phish_checker: PhishTankChecker::new(config.phishtank_url()),
            page_settings: PageSettings::with_navigation_timeout(config.request_timeout()),
            request_timeout: config.request_timeout(),
        }
    }

    #[must_use]
    pub fn with_phish_checker(mut self, checker: PhishTankChecker) -> Self {
        self.phish_checker = checker;
        self
    }

    pub fn pool(&self) -> &Arc<BrowserPool<L>> {
        &self.pool
    }

    pub fn cache(&self) -> &ResultCache<ExtractionResult> {
        &self.cache
    }

    /// Reputation record for `domain`, from cache when fresh
    pub async fn parse_domain(
        &self,
        domain: &str,
    ) -> Result<ScrapeOutcome<ExtractionResult>, ScrapeError> {
        let started = Instant::now();
        ensure_valid(domain)?;

        let key = cache_key(domain);
        if let Some(data) = self.cache.get(&key) {
            debug!(domain, "Cache hit");
            return Ok(ScrapeOutcome {
                data,
                cached: true,
                processing_time: started.elapsed(),
            });
        }

        let data = self.run_page_task(&self.extractor, domain).await?;
        self.cache.put(key, data.clone());

        let processing_time = started.elapsed();
        info!(domain, ?processing_time, "Domain parsed");
        Ok(ScrapeOutcome {
            data,
            cached: false,
            processing_time,
        })
    }

    /// Submit `domain` to the anti-phishing lookup form. Never cached.
    pub async fn check_phish(
        &self,
        domain: &str,
    ) -> Result<ScrapeOutcome<PhishCheckResult>, ScrapeError> {
        let started = Instant::now();
        ensure_valid(domain)?;

        let data = self.run_page_task(&self.phish_checker, domain).await?;
        let processing_time = started.elapsed();
        info!(domain, ?processing_time, challenge = data.challenge_detected, "Phish check done");
        Ok(ScrapeOutcome {
            data,
            cached: false,
            processing_time,
        })
    }

    /// Borrow a session, do the page work under the task's time budget, give the session back
    async fn run_page_task<T>(&self, task: &T, domain: &str) -> Result<T::Output, ScrapeError>
    where
        T: PageTask<PageOf<L>>,
    {
        let lease = self.pool.acquire().await.inspect_err(|e| {
            warn!(domain, task = task.name(), "Could not acquire browser session: {}", e);
        })?;
        let session_id = lease.id();
        let budget = task.time_budget(self.request_timeout);
        debug!(domain, session_id, task = task.name(), ?budget, "Running page task");

        let outcome =
            match tokio::time::timeout(budget, self.visit(lease.session(), task, domain)).await {
                Ok(result) => result,
                Err(_) => Err(ScrapeError::Timeout(format!(
                    "{} timeout after {:?}",
                    task.name(),
                    budget
                ))),
            };

        lease.release().await;

        if let Err(e) = &outcome {
            warn!(domain, session_id, task = task.name(), "Page task failed: {}", e);
        }
        outcome
    }

    async fn visit<T>(
        &self,
        session: &L::Session,
        task: &T,
        domain: &str,
    ) -> Result<T::Output, ScrapeError>
    where
        T: PageTask<PageOf<L>>,
    {
        let page = session
            .open_page()
            .await
            .map_err(|e| ScrapeError::Session(format!("{e:#}")))?;

        let result = async {
            page.prepare(&self.page_settings)
                .await
                .context("Failed to prepare page")?;
            let url = task.target_url(domain);
            with_page_timeout(
                page.navigate(&url),
                self.page_settings.navigation_timeout,
                "Navigation",
            )
            .await?;
            task.run(&page, domain).await
        }
        .await;

        if let Err(e) = page.close().await {
            warn!(domain, "Failed to close page: {:#}", e);
        }

        result.map_err(|e| ScrapeError::classify(e, domain))
    }
}

fn ensure_valid(domain: &str) -> Result<(), ScrapeError> {
    if validate_domain(domain) {
        Ok(())
    } else {
        Err(ScrapeError::InvalidInput(format!(
            "'{domain}' is not a valid domain"
        )))
    }
}
