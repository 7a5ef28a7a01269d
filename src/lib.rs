pub mod browser_pool;
pub mod browser_profile;
pub mod browser_setup;
pub mod config;
pub mod extraction;
pub mod http;
pub mod rate_limiter;
pub mod result_cache;
pub mod scrape_service;
pub mod server;
pub mod utils;

pub use browser_pool::{
    BrowserPool, ChromeLauncher, CleanupResult, PoolError, PoolStats, Session, SessionLauncher,
    SessionLease, SessionPage,
};
pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use config::ServiceConfig;
pub use extraction::{ExtractionResult, PageTask, PhishCheckResult};
pub use rate_limiter::{ClientRateLimiter, RateLimitDecision};
pub use result_cache::ResultCache;
pub use scrape_service::{ScrapeError, ScrapeOutcome, ScrapeService};
pub use server::Server;
