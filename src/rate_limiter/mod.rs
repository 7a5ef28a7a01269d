//! Per-client sliding-window rate limiter
//!
//! Each client keeps the timestamps of its admitted requests inside the
//! trailing window. A request is denied once that count reaches the limit;
//! the denial says how long until the oldest timestamp leaves the window.
//! State lives only as long as the process.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Rate limit decision for one incoming request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request is admitted and counted
    Allow,
    /// Request is rejected; the client may retry after `retry_after`
    Deny { retry_after: Duration },
}

impl RateLimitDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Whole seconds to wait, rounded up and never zero
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Allow => None,
            Self::Deny { retry_after } => {
                let millis = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX);
                Some(millis.div_ceil(1000).max(1))
            }
        }
    }
}

#[derive(Debug)]
pub struct ClientRateLimiter {
    max_requests: usize,
    window: Duration,
    clients: DashMap<String, VecDeque<Instant>>,
}

impl ClientRateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: DashMap::new(),
        }
    }

    /// Count one request from `client`, or reject it
    pub fn check(&self, client: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut timestamps = self.clients.entry(client.to_string()).or_default();

        self.drop_expired(&mut timestamps, now);

        if timestamps.len() >= self.max_requests {
            // The queue is non-empty here since max_requests >= 1
            let retry_after = timestamps
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            debug!(
                client,
                count = timestamps.len(),
                "Rate limit exceeded, retry after {:?}",
                retry_after
            );
            return RateLimitDecision::Deny { retry_after };
        }

        timestamps.push_back(now);
        trace!(client, count = timestamps.len(), "Request admitted");
        RateLimitDecision::Allow
    }

    /// Forget clients whose every request has left the window
    ///
    /// Returns how many clients were removed.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let before = self.clients.len();
        self.clients.retain(|_, timestamps| {
            self.drop_expired(timestamps, now);
            !timestamps.is_empty()
        });
        let removed = before.saturating_sub(self.clients.len());
        if removed > 0 {
            debug!(removed, "Pruned idle rate-limit clients");
        }
        removed
    }

    /// Run [`prune`](Self::prune) every `interval`
    pub fn start_pruning(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                limiter.prune();
            }
        })
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    fn drop_expired(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}
