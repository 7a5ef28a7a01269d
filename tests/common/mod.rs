//! Test doubles for the scamcheck-parser test suite
//!
//! `FakeLauncher` hands out `FakeSession`s whose behaviour is driven by a
//! shared `FakeBehavior`, so tests can kill sessions, fail spawns or slow
//! navigation without a browser.

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use scamcheck_parser::browser_pool::{PageSettings, Session, SessionLauncher, SessionPage};
use scamcheck_parser::config::ServiceConfig;
use scamcheck_parser::extraction::{FormTimings, PhishTankChecker};
use scamcheck_parser::scrape_service::ScrapeService;
use scamcheck_parser::{BrowserPool, ClientRateLimiter};

pub const TEST_BASE_URL: &str = "https://scam-detector.test/validator";
pub const TEST_PHISHTANK_URL: &str = "https://phishtank.test/";

#[derive(Debug, Default)]
pub struct FakeBehavior {
    /// Number of upcoming spawns that fail
    pub failing_spawns: AtomicUsize,
    /// Sessions whose liveness probe answers "dead"
    pub dead: Mutex<HashSet<u64>>,
    /// Liveness probe returns an error for every session
    pub liveness_errors: AtomicBool,
    /// Sessions whose close fails
    pub close_failures: Mutex<HashSet<u64>>,
    pub navigate_delay: Mutex<Duration>,
    pub fail_navigation: AtomicBool,
    /// Returned for the reputation script
    pub reputation: Mutex<Value>,
    /// Selectors currently on the fake page
    pub present: Mutex<HashSet<String>>,
    /// Clicking the checkbox clears every challenge marker
    pub checkbox_clears_challenge: AtomicBool,
    /// Closing a page fails
    pub page_close_fails: AtomicBool,
    /// Closing leftover pages on release fails
    pub close_extra_pages_fails: AtomicBool,

    pub spawned: AtomicUsize,
    pub closed: Mutex<Vec<u64>>,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
    pub clicks: Mutex<Vec<String>>,
    pub typed: Mutex<Vec<(String, String)>>,
}

impl FakeBehavior {
    pub fn new() -> Arc<Self> {
        let behavior = Self::default();
        *behavior.reputation.lock() = reputation_payload();
        behavior.present.lock().insert("div.factcesAccordion".to_string());
        Arc::new(behavior)
    }

    pub fn kill(&self, id: u64) {
        self.dead.lock().insert(id);
    }

    pub fn closed_ids(&self) -> Vec<u64> {
        self.closed.lock().clone()
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct FakeLauncher {
    pub behavior: Arc<FakeBehavior>,
}

impl FakeLauncher {
    pub fn new(behavior: Arc<FakeBehavior>) -> Self {
        Self { behavior }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn spawn(&self, id: u64) -> Result<FakeSession> {
        let failing = &self.behavior.failing_spawns;
        if failing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(anyhow!("fake spawn failure for session {id}"));
        }
        self.behavior.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            id,
            behavior: Arc::clone(&self.behavior),
        })
    }
}

#[derive(Debug)]
pub struct FakeSession {
    id: u64,
    behavior: Arc<FakeBehavior>,
}

#[async_trait]
impl Session for FakeSession {
    type Page = FakePage;

    fn id(&self) -> u64 {
        self.id
    }

    async fn is_alive(&self) -> Result<bool> {
        if self.behavior.liveness_errors.load(Ordering::SeqCst) {
            return Err(anyhow!("liveness probe failed"));
        }
        Ok(!self.behavior.dead.lock().contains(&self.id))
    }

    async fn open_page(&self) -> Result<FakePage> {
        self.behavior.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakePage {
            behavior: Arc::clone(&self.behavior),
            url: Mutex::new(None),
        })
    }

    async fn close_extra_pages(&self) -> Result<usize> {
        if self.behavior.close_extra_pages_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("fake close_extra_pages failure"));
        }
        Ok(0)
    }

    async fn close(&mut self) -> Result<()> {
        self.behavior.closed.lock().push(self.id);
        if self.behavior.close_failures.lock().contains(&self.id) {
            return Err(anyhow!("fake close failure"));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakePage {
    behavior: Arc<FakeBehavior>,
    url: Mutex<Option<String>>,
}

#[async_trait]
impl SessionPage for FakePage {
    async fn prepare(&self, _settings: &PageSettings) -> Result<()> {
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let delay = *self.behavior.navigate_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.behavior.fail_navigation.load(Ordering::SeqCst) {
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED"));
        }
        self.behavior.navigations.lock().push(url.to_string());
        *self.url.lock() = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        if self.behavior.present.lock().contains(selector) {
            return Ok(true);
        }
        tokio::time::sleep(timeout).await;
        Ok(self.behavior.present.lock().contains(selector))
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        if script.contains("factcesAccordion") {
            return Ok(self.behavior.reputation.lock().clone());
        }
        if script.contains("input.value = ''") {
            return Ok(Value::Bool(true));
        }

        // Marker probe: first listed selector that is present
        let present = self.behavior.present.lock();
        let first = present
            .iter()
            .filter_map(|sel| {
                let quoted = serde_json::to_string(sel).ok()?;
                script.find(&quoted).map(|pos| (pos, sel.clone()))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, sel)| Value::String(sel));
        Ok(first.unwrap_or(Value::Null))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.behavior.clicks.lock().push(selector.to_string());
        if selector == r#"input[type="checkbox"]"#
            && self.behavior.checkbox_clears_challenge.load(Ordering::SeqCst)
        {
            let mut present = self.behavior.present.lock();
            for marker in scamcheck_parser::extraction::phishtank::CHALLENGE_MARKERS {
                present.remove(*marker);
            }
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.behavior
            .typed
            .lock()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.url.lock().clone())
    }

    async fn close(self) -> Result<()> {
        self.behavior.pages_closed.fetch_add(1, Ordering::SeqCst);
        if self.behavior.page_close_fails.load(Ordering::SeqCst) {
            return Err(anyhow!("fake page close failure"));
        }
        Ok(())
    }
}

/// Raw reputation page as returned by the extraction script
pub fn reputation_payload() -> Value {
    json!({
        "panels": [
            {
                "header": "Domain Whois",
                "items": [{ "Registrar": "RU-CENTER" }, { "Created": "2006-09-23" }]
            },
            {
                "header": "Website Ranking",
                "items": ["Popular in Russia", { "Tranco rank": "25" }]
            },
            { "header": "Empty Panel", "items": null }
        ],
        "totalPercent": "100%",
        "domainAge": "18 years",
        "domainDate": "2006",
        "allData": "Intro\n\nb0\n\nb1\n\nb2\n\nNot blacklisted\n\nb4\n\nValid HTTPS found\n\nb6\n\nA social network.\n\nPopular.\n\nFooter"
    })
}

pub fn test_config() -> ServiceConfig {
    ServiceConfig::builder()
        .pool_size(1)
        .max_concurrent_requests(2)
        .cache_ttl(Duration::from_secs(60))
        .request_timeout(Duration::from_secs(5))
        .selector_timeout(Duration::from_millis(50))
        .scam_detector_base_url(TEST_BASE_URL)
        .phishtank_url(TEST_PHISHTANK_URL)
        .build()
        .expect("test config is valid")
}

pub fn instant_form_timings() -> FormTimings {
    FormTimings {
        after_challenge_click: Duration::ZERO,
        challenge_clear: Duration::ZERO,
        form_ready: Duration::ZERO,
        after_typing: Duration::ZERO,
        submit_navigation: Duration::ZERO,
        after_result_challenge: Duration::ZERO,
    }
}

pub fn build_service(
    behavior: &Arc<FakeBehavior>,
    config: &ServiceConfig,
) -> Arc<ScrapeService<FakeLauncher>> {
    let pool = BrowserPool::new(
        FakeLauncher::new(Arc::clone(behavior)),
        config.pool_size(),
        config.max_concurrent_requests(),
    );
    let service = ScrapeService::new(pool, config).with_phish_checker(
        PhishTankChecker::new(config.phishtank_url()).with_timings(instant_form_timings()),
    );
    Arc::new(service)
}

pub fn build_limiter(config: &ServiceConfig) -> Arc<ClientRateLimiter> {
    Arc::new(ClientRateLimiter::new(
        config.rate_limit_max_requests(),
        config.rate_limit_window(),
    ))
}
