//! Site-specific work performed on a navigated page
//!
//! Each target site is a [`PageTask`]: it knows which URL to load for a
//! domain and how to turn the loaded page into a typed result. Tasks are
//! written against [`SessionPage`], so the pool and request coordination
//! never depend on a particular site.

pub mod js_scripts;
pub mod phishtank;
pub mod scam_detector;
pub mod schema;

pub use phishtank::{FormTimings, PhishTankChecker};
pub use scam_detector::ScamDetectorExtractor;
pub use schema::{ExtractionResult, PanelItem, PhishCheckResult, Summary, TechnicalValue};

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::browser_pool::SessionPage;

#[async_trait]
pub trait PageTask<P: SessionPage>: Send + Sync {
    type Output: Send + 'static;

    /// Short label for logs
    fn name(&self) -> &'static str;

    /// Page to load for `domain`
    fn target_url(&self, domain: &str) -> String;

    /// Wall-clock budget for the whole visit, given the configured request timeout
    fn time_budget(&self, request_timeout: Duration) -> Duration {
        request_timeout
    }

    /// Work on the already-navigated page
    async fn run(&self, page: &P, domain: &str) -> Result<Self::Output>;
}
