//! Session and page capabilities the pool and extractors are written against
//!
//! The pool only needs to spawn, probe and close sessions. Extractors only
//! need a handful of DOM operations on a page. Keeping both behind traits
//! lets the chromiumoxide implementation and test doubles share one code path.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::utils::constants::{
    BLOCKED_RESOURCE_TYPES, CHROME_USER_AGENT, VIEWPORT_HEIGHT, VIEWPORT_WIDTH,
};

/// Per-page setup applied before navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub user_agent: String,
    pub viewport: (u32, u32),
    /// Resource types aborted before they reach the network
    /// (`image`, `stylesheet`, `font`, `media`, ...)
    pub blocked_resource_types: Vec<String>,
    /// Budget for a single navigation
    pub navigation_timeout: Duration,
}

impl PageSettings {
    #[must_use]
    pub fn with_navigation_timeout(navigation_timeout: Duration) -> Self {
        Self {
            navigation_timeout,
            ..Self::default()
        }
    }
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            user_agent: CHROME_USER_AGENT.to_string(),
            viewport: (VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
            blocked_resource_types: BLOCKED_RESOURCE_TYPES
                .iter()
                .map(|t| (*t).to_string())
                .collect(),
            navigation_timeout: crate::utils::constants::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// One live, expensive automation context
///
/// A session is owned by the pool while idle and lent to exactly one request
/// while active. It is closed explicitly; implementations should still free
/// OS resources on drop in case a close never happens.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    type Page: SessionPage;

    /// Pool-assigned identity, stable for the session's lifetime
    fn id(&self) -> u64;

    /// Probe whether the underlying context still answers
    async fn is_alive(&self) -> Result<bool>;

    /// Open a fresh page for one request
    async fn open_page(&self) -> Result<Self::Page>;

    /// Close every page except the baseline one, returning how many were closed
    async fn close_extra_pages(&self) -> Result<usize>;

    /// Tear the session down
    async fn close(&mut self) -> Result<()>;
}

/// A disposable page within a session
#[async_trait]
pub trait SessionPage: Send + Sync + 'static {
    /// Apply identity, viewport and request filtering
    async fn prepare(&self, settings: &PageSettings) -> Result<()>;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// Poll for `selector` until it appears or `timeout` elapses.
    /// Returns whether it appeared.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Evaluate a script and return its JSON result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    async fn click(&self, selector: &str) -> Result<()>;

    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Wait for a navigation triggered by a previous action.
    /// Returns `false` if none completed within `timeout`.
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<bool>;

    async fn current_url(&self) -> Result<Option<String>>;

    async fn close(self) -> Result<()>;
}

/// Factory for new sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync + 'static {
    type Session: Session;

    async fn spawn(&self, id: u64) -> Result<Self::Session>;
}

/// Page type produced by a launcher's sessions
pub type PageOf<L> = <<L as SessionLauncher>::Session as Session>::Page;
