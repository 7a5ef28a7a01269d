//! chromiumoxide-backed sessions and pages

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, ResourceType, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::session::{PageSettings, Session, SessionLauncher, SessionPage};
use crate::browser_profile::{BrowserProfile, create_unique_profile};
use crate::browser_setup::launch_browser;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launches one Chrome process per session, each with its own profile
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    headless: bool,
}

impl ChromeLauncher {
    #[must_use]
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn spawn(&self, id: u64) -> Result<ChromeSession> {
        let profile = create_unique_profile().context("Failed to create browser profile")?;
        let (browser, handler) = launch_browser(self.headless, profile.path())
            .await
            .with_context(|| format!("Failed to launch browser for session {id}"))?;

        let baseline = match browser.new_page("about:blank").await {
            Ok(page) => page.target_id().clone(),
            Err(e) => {
                handler.abort();
                return Err(anyhow!("Failed to open baseline page for session {id}: {e}"));
            }
        };

        Ok(ChromeSession {
            id,
            browser,
            handler,
            baseline,
            profile: Some(profile),
        })
    }
}

/// A Chrome process with its CDP handler task and profile directory
pub struct ChromeSession {
    id: u64,
    browser: Browser,
    handler: JoinHandle<()>,
    /// Tab opened at launch; the only one kept across requests
    baseline: TargetId,
    profile: Option<BrowserProfile>,
}

impl std::fmt::Debug for ChromeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeSession")
            .field("id", &self.id)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Session for ChromeSession {
    type Page = ChromePage;

    fn id(&self) -> u64 {
        self.id
    }

    async fn is_alive(&self) -> Result<bool> {
        match self.browser.version().await {
            Ok(version) => {
                trace!(session_id = self.id, "Browser alive: {}", version.product);
                Ok(true)
            }
            Err(e) => {
                debug!(session_id = self.id, "Browser version probe failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn open_page(&self) -> Result<ChromePage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to open page")?;
        Ok(ChromePage::new(page))
    }

    async fn close_extra_pages(&self) -> Result<usize> {
        let pages = self.browser.pages().await.context("Failed to list pages")?;

        let mut closed = 0;
        for page in pages {
            if page.target_id() == &self.baseline {
                continue;
            }
            page.close().await.context("Failed to close leftover page")?;
            closed += 1;
        }
        Ok(closed)
    }

    async fn close(&mut self) -> Result<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.browser.close().await {
            errors.push(format!("browser close failed: {e}"));
        }
        // Reap the process so it does not linger as a zombie
        if let Err(e) = self.browser.wait().await {
            errors.push(format!("browser wait failed: {e}"));
        }
        self.handler.abort();

        // Dropping the profile removes the directory
        drop(self.profile.take());

        if errors.is_empty() {
            debug!(session_id = self.id, "Browser session closed");
            Ok(())
        } else {
            Err(anyhow!(errors.join("; ")))
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// One tab, plus the task failing intercepted requests
pub struct ChromePage {
    page: Page,
    interceptor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ChromePage {
    fn new(page: Page) -> Self {
        Self {
            page,
            interceptor: parking_lot::Mutex::new(None),
        }
    }

    /// Abort every request of the given resource types via CDP Fetch
    async fn block_resources(&self, resource_types: &[String]) -> Result<()> {
        let patterns: Vec<RequestPattern> = resource_types
            .iter()
            .filter_map(|name| match resource_type_from_name(name) {
                Some(resource_type) => Some(
                    RequestPattern::builder()
                        .resource_type(resource_type)
                        .request_stage(RequestStage::Request)
                        .build(),
                ),
                None => {
                    warn!("Unknown resource type '{}' in block list", name);
                    None
                }
            })
            .collect();

        if patterns.is_empty() {
            return Ok(());
        }

        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .context("Failed to subscribe to paused requests")?;

        self.page
            .execute(EnableParams::builder().patterns(patterns).build())
            .await
            .context("Failed to enable request interception")?;

        let page = self.page.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let params = FailRequestParams::new(
                    event.request_id.clone(),
                    ErrorReason::BlockedByClient,
                );
                if let Err(e) = page.execute(params).await {
                    trace!("Failed to abort intercepted request: {}", e);
                }
            }
        });

        if let Some(previous) = self.interceptor.lock().replace(handle) {
            previous.abort();
        }
        Ok(())
    }
}

fn resource_type_from_name(name: &str) -> Option<ResourceType> {
    match name {
        "image" => Some(ResourceType::Image),
        "stylesheet" => Some(ResourceType::Stylesheet),
        "font" => Some(ResourceType::Font),
        "media" => Some(ResourceType::Media),
        "script" => Some(ResourceType::Script),
        _ => None,
    }
}

#[async_trait]
impl SessionPage for ChromePage {
    async fn prepare(&self, settings: &PageSettings) -> Result<()> {
        self.page
            .set_user_agent(SetUserAgentOverrideParams::new(settings.user_agent.clone()))
            .await
            .context("Failed to set user agent")?;

        let (width, height) = settings.viewport;
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(width),
                i64::from(height),
                1.0,
                false,
            ))
            .await
            .context("Failed to set viewport")?;

        self.block_resources(&settings.blocked_resource_types).await
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {url}"))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("Script evaluation failed")?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("Element not found: {selector}"))?
            .click()
            .await
            .with_context(|| format!("Failed to click {selector}"))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("Element not found: {selector}"))?;
        element.click().await.context("Failed to focus input")?;
        element
            .type_str(text)
            .await
            .with_context(|| format!("Failed to type into {selector}"))?;
        Ok(())
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<bool> {
        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(anyhow!("Navigation failed: {e}")),
            Err(_) => Ok(false),
        }
    }

    async fn current_url(&self) -> Result<Option<String>> {
        self.page.url().await.context("Failed to read page URL")
    }

    async fn close(self) -> Result<()> {
        if let Some(handle) = self.interceptor.lock().take() {
            handle.abort();
        }
        self.page.clone().close().await.context("Failed to close page")
    }
}

// A page dropped mid-visit (request timeout) must not leave its interceptor running
impl Drop for ChromePage {
    fn drop(&mut self) {
        if let Some(handle) = self.interceptor.get_mut().take() {
            handle.abort();
        }
    }
}
