//! Anti-phishing lookup form automation
//!
//! Submits `http://{domain}` to the lookup form. Bot challenges are only
//! detected from a fixed marker list; a checkbox marker gets one click and
//! a bounded wait, nothing more.

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::PageTask;
use super::js_scripts::{clear_input_script, first_present_script};
use super::schema::PhishCheckResult;
use crate::browser_pool::SessionPage;

/// Markers of an interstitial bot challenge, probed in order
pub const CHALLENGE_MARKERS: &[&str] = &[
    r#"input[type="checkbox"]"#,
    "#challenge-form",
    ".cf-challenge",
    "[data-sitekey]",
    "#cf-challenge-running",
];

const CHECKBOX_MARKER: &str = r#"input[type="checkbox"]"#;
const URL_INPUT: &str = r#"input[name="isaphishurl"]"#;
const SUBMIT_BUTTON: &str = r#"input[type="submit"][value="Is it a phish?"]"#;

const MARKER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Waits used while working through the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTimings {
    /// Pause after clicking a challenge checkbox
    pub after_challenge_click: Duration,
    /// Budget for a challenge marker to disappear
    pub challenge_clear: Duration,
    /// Budget for the lookup form to render
    pub form_ready: Duration,
    /// Pause after typing the URL
    pub after_typing: Duration,
    /// Budget for the post-submit navigation
    pub submit_navigation: Duration,
    /// Pause after a challenge is seen on the result page
    pub after_result_challenge: Duration,
}

impl FormTimings {
    /// Longest time the form flow can spend waiting, excluding CDP round trips
    #[must_use]
    pub fn total(&self) -> Duration {
        self.after_challenge_click
            + self.challenge_clear
            + self.form_ready
            + self.after_typing
            + self.submit_navigation
            + self.after_result_challenge
    }
}

impl Default for FormTimings {
    fn default() -> Self {
        Self {
            after_challenge_click: Duration::from_secs(2),
            challenge_clear: Duration::from_secs(15),
            form_ready: Duration::from_secs(20),
            after_typing: Duration::from_secs(1),
            submit_navigation: Duration::from_secs(10),
            after_result_challenge: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhishTankChecker {
    url: String,
    timings: FormTimings,
}

impl PhishTankChecker {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timings: FormTimings::default(),
        }
    }

    #[must_use]
    pub fn with_timings(mut self, timings: FormTimings) -> Self {
        self.timings = timings;
        self
    }
}

async fn probe_challenge<P: SessionPage>(page: &P) -> Result<Option<String>> {
    let found = page.evaluate(&first_present_script(CHALLENGE_MARKERS)).await?;
    Ok(found.as_str().map(str::to_string))
}

/// Poll until `marker` is gone or `budget` elapses. Returns whether it cleared.
async fn wait_for_marker_gone<P: SessionPage>(
    page: &P,
    marker: &str,
    budget: Duration,
) -> Result<bool> {
    let deadline = Instant::now() + budget;
    let probe = first_present_script(&[marker]);
    loop {
        if page.evaluate(&probe).await?.is_null() {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(MARKER_POLL_INTERVAL).await;
    }
}

#[async_trait]
impl<P: SessionPage> PageTask<P> for PhishTankChecker {
    type Output = PhishCheckResult;

    fn name(&self) -> &'static str {
        "phishtank"
    }

    fn target_url(&self, _domain: &str) -> String {
        self.url.clone()
    }

    // The request timeout covers navigation; the form waits come on top
    fn time_budget(&self, request_timeout: Duration) -> Duration {
        request_timeout + self.timings.total()
    }

    async fn run(&self, page: &P, domain: &str) -> Result<PhishCheckResult> {
        let mut challenge_detected = false;

        if let Some(marker) = probe_challenge(page).await? {
            info!(domain, marker = %marker, "Bot challenge detected on lookup page");
            challenge_detected = true;

            if marker == CHECKBOX_MARKER {
                if let Err(e) = page.click(&marker).await {
                    warn!(domain, "Failed to click challenge checkbox: {:#}", e);
                }
                tokio::time::sleep(self.timings.after_challenge_click).await;
            }

            if !wait_for_marker_gone(page, &marker, self.timings.challenge_clear).await? {
                warn!(domain, marker = %marker, "Challenge might still be present");
            }
        }

        if !page
            .wait_for_selector(URL_INPUT, self.timings.form_ready)
            .await?
        {
            bail!("Main page not loaded after challenge");
        }

        let checked_url = format!("http://{domain}");
        page.evaluate(&clear_input_script(URL_INPUT)).await?;
        page.type_text(URL_INPUT, &checked_url).await?;
        tokio::time::sleep(self.timings.after_typing).await;

        page.click(SUBMIT_BUTTON).await?;
        match page.wait_for_navigation(self.timings.submit_navigation).await {
            Ok(true) => debug!(domain, "Lookup form submitted"),
            Ok(false) => debug!(domain, "No navigation after submit, continuing"),
            Err(e) => warn!(domain, "Navigation after submit failed: {:#}", e),
        }

        let mut message = "Navigation completed".to_string();
        if let Some(marker) = probe_challenge(page).await? {
            warn!(domain, marker = %marker, "Bot challenge on result page");
            challenge_detected = true;
            message = "Navigation completed, challenge still present".to_string();
            if marker == CHECKBOX_MARKER
                && let Err(e) = page.click(&marker).await
            {
                warn!(domain, "Failed to click challenge checkbox: {:#}", e);
            }
            tokio::time::sleep(self.timings.after_result_challenge).await;
        }

        let current_url = page.current_url().await?;

        Ok(PhishCheckResult {
            domain: domain.to_string(),
            checked_url,
            current_url,
            status: "page_loaded".to_string(),
            message,
            challenge_detected,
            timestamp: Utc::now(),
        })
    }
}
