//! Shared configuration constants for scamcheck-parser
//!
//! Default values and fixed thresholds used throughout the codebase to
//! ensure consistency and avoid magic numbers.

use std::time::Duration;

/// Default HTTP listening port
pub const DEFAULT_PORT: u16 = 4000;

/// Default number of pre-warmed browser sessions kept idle in the pool
pub const DEFAULT_POOL_SIZE: usize = 2;

/// Default ceiling on concurrently lent browser sessions
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;

/// Default per-request budget for navigation and extraction
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default cache TTL: zero, which disables caching entirely
///
/// A zero TTL is a deliberate configuration value, not a missing one.
pub const DEFAULT_CACHE_TTL: Duration = Duration::ZERO;

/// How long to wait for the reputation page's accordion to render
pub const DEFAULT_SELECTOR_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Result cache high-water mark; crossing it purges the oldest half
pub const CACHE_MAX_ENTRIES: usize = 1000;

/// Sliding window length for per-client rate limiting
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Requests admitted per client within one window
pub const RATE_LIMIT_MAX_REQUESTS: usize = 30;

/// Base URL of the domain reputation site; pages live at `{base}/{domain}-review`
pub const SCAM_DETECTOR_BASE_URL: &str = "https://scam-detector.com/validator";

/// Anti-phishing lookup form
pub const PHISHTANK_URL: &str = "https://www.phishtank.org";

/// Resource types aborted before they hit the network
pub const BLOCKED_RESOURCE_TYPES: &[&str] = &["image", "stylesheet", "font", "media"];

/// Viewport used for every page
pub const VIEWPORT_WIDTH: u32 = 1920;
pub const VIEWPORT_HEIGHT: u32 = 1080;

/// Chrome user agent string presented by every page
///
/// Chrome releases new stable versions ~every 4 weeks.
/// Update quarterly to stay within reasonable version window.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Prefix for per-session Chrome profile directories in the temp dir
pub const PROFILE_DIR_PREFIX: &str = "scamcheck_chrome";
