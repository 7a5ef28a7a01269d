//! Bounded pool of pre-warmed browser sessions
//!
//! Two independent bounds govern the pool:
//! - `size` caps the idle queue of pre-warmed sessions;
//! - `max_connections` caps how many sessions are lent out at once.
//!
//! When nothing is idle but the lending ceiling has room, `acquire` spawns a
//! transient session instead of waiting. On return, a session only re-enters
//! the idle queue if the queue is below `size`; otherwise it is closed.

pub mod chrome;
pub mod session;

pub use chrome::{ChromeLauncher, ChromePage, ChromeSession};
pub use session::{PageOf, PageSettings, Session, SessionLauncher, SessionPage};

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

// =============================================================================
// Errors and reports
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Maximum concurrent connections reached ({max})")]
    CapacityExceeded { max: usize },

    #[error("Browser pool is shutting down")]
    ShuttingDown,

    #[error("Failed to spawn browser session: {0:#}")]
    Spawn(anyhow::Error),
}

/// Outcome of tearing sessions down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    /// Every session closed cleanly
    Success,
    /// Some closes failed, with error details
    PartialFailure(Vec<String>),
}

impl CleanupResult {
    fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::Success
        } else {
            Self::PartialFailure(errors)
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Point-in-time occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Idle sessions ready to lend
    pub available: usize,
    /// Sessions currently lent out
    pub active: usize,
    /// Lending ceiling
    pub max: usize,
    /// Idle queue capacity
    pub size: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub healthy: usize,
    pub dead: usize,
    pub replaced: usize,
}

// =============================================================================
// Pool
// =============================================================================

struct PoolState<S> {
    idle: VecDeque<S>,
    active: usize,
    size: usize,
    shutting_down: bool,
}

impl<S> PoolState<S> {
    fn has_idle_room(&self) -> bool {
        !self.shutting_down && self.idle.len() < self.size
    }
}

pub struct BrowserPool<L: SessionLauncher> {
    launcher: L,
    max_connections: usize,
    state: Mutex<PoolState<L::Session>>,
    next_id: AtomicU64,
    keepalive_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<L: SessionLauncher> std::fmt::Debug for BrowserPool<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserPool")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<L: SessionLauncher> BrowserPool<L> {
    /// Create an empty pool. Nothing is spawned until [`initialize`](Self::initialize).
    pub fn new(launcher: L, size: usize, max_connections: usize) -> Arc<Self> {
        Arc::new(Self {
            launcher,
            max_connections,
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(size),
                active: 0,
                size,
                shutting_down: false,
            }),
            next_id: AtomicU64::new(0),
            keepalive_handle: Mutex::new(None),
        })
    }

    /// Pre-warm the idle queue, one session at a time
    ///
    /// A failed spawn is logged and skipped; the pool may come up short.
    /// Returns the number of sessions added.
    pub async fn initialize(&self) -> usize {
        let target = self.state.lock().size;
        info!("Initializing browser pool with {} sessions", target);

        let mut spawned = 0;
        for _ in 0..target {
            match self.spawn_session().await {
                Ok(session) => {
                    if let Some(extra) = self.try_enqueue(session) {
                        self.close_quietly(extra).await;
                        break;
                    }
                    spawned += 1;
                }
                Err(e) => warn!("Failed to create browser session during initialize: {}", e),
            }
        }

        info!("Browser pool initialized with {}/{} sessions", spawned, target);
        spawned
    }

    /// Lend a session
    ///
    /// Fails immediately with [`PoolError::CapacityExceeded`] at the lending
    /// ceiling, leaving the pool untouched. Takes the oldest idle session, or
    /// spawns a transient one when the queue is empty.
    pub async fn acquire(self: &Arc<Self>) -> Result<SessionLease<L>, PoolError> {
        let popped = {
            let mut state = self.state.lock();
            if state.shutting_down {
                return Err(PoolError::ShuttingDown);
            }
            if state.active >= self.max_connections {
                debug!(
                    active = state.active,
                    max = self.max_connections,
                    "Browser pool at capacity"
                );
                return Err(PoolError::CapacityExceeded {
                    max: self.max_connections,
                });
            }
            state.active += 1;
            state.idle.pop_front()
        };

        // Gives the slot back if spawning fails or this future is dropped
        let mut slot = ActiveSlot {
            state: &self.state,
            armed: true,
        };

        let session = match popped {
            Some(session) => {
                debug!(session_id = session.id(), "Acquired idle browser session");
                session
            }
            None => {
                let session = self.spawn_session().await?;
                debug!(session_id = session.id(), "Acquired transient browser session");
                session
            }
        };

        slot.armed = false;
        Ok(SessionLease {
            session: Some(session),
            pool: Arc::clone(self),
        })
    }

    /// Take a session back from a lease
    async fn release(&self, session: L::Session) {
        let id = session.id();
        let shutting_down = {
            let mut state = self.state.lock();
            state.active = state.active.saturating_sub(1);
            state.shutting_down
        };

        if shutting_down {
            debug!(session_id = id, "Pool shut down, closing returned session");
            self.close_quietly(session).await;
            return;
        }

        let reusable = match session.is_alive().await {
            Ok(true) => match session.close_extra_pages().await {
                Ok(closed) => {
                    trace!(session_id = id, closed, "Closed leftover pages");
                    true
                }
                Err(e) => {
                    warn!(session_id = id, "Failed to close leftover pages: {:#}", e);
                    false
                }
            },
            Ok(false) => {
                warn!(session_id = id, "Returned browser session is dead");
                false
            }
            Err(e) => {
                warn!(session_id = id, "Liveness check failed: {:#}", e);
                false
            }
        };

        if reusable {
            match self.try_enqueue(session) {
                None => debug!(session_id = id, "Released browser session to pool"),
                Some(surplus) => {
                    debug!(session_id = id, "Idle queue full, closing surplus session");
                    self.close_quietly(surplus).await;
                }
            }
            return;
        }

        self.close_quietly(session).await;
        if self.state.lock().has_idle_room() {
            match self.spawn_session().await {
                Ok(replacement) => {
                    let replacement_id = replacement.id();
                    match self.try_enqueue(replacement) {
                        None => info!(
                            session_id = id,
                            replacement_id, "Replaced dead browser session"
                        ),
                        Some(surplus) => self.close_quietly(surplus).await,
                    }
                }
                Err(e) => warn!(session_id = id, "Failed to replace browser session: {}", e),
            }
        }
    }

    /// Probe every idle session, closing dead ones and refilling to `size`
    pub async fn health_check(&self) -> HealthReport {
        let sessions: Vec<L::Session> = self.state.lock().idle.drain(..).collect();

        let probes = futures::future::join_all(sessions.into_iter().map(|session| async move {
            let alive = matches!(session.is_alive().await, Ok(true));
            (session, alive)
        }))
        .await;

        let mut report = HealthReport::default();
        for (session, alive) in probes {
            if alive {
                report.healthy += 1;
                if let Some(surplus) = self.try_enqueue(session) {
                    self.close_quietly(surplus).await;
                }
            } else {
                report.dead += 1;
                warn!(session_id = session.id(), "Idle browser session failed health check");
                self.close_quietly(session).await;
            }
        }

        report.replaced = self.fill_idle().await;
        debug!(
            healthy = report.healthy,
            dead = report.dead,
            replaced = report.replaced,
            "Browser pool health check complete"
        );
        report
    }

    /// Change the idle capacity
    ///
    /// Shrinking closes the oldest surplus idle sessions; growing spawns up to
    /// the new size. Lent sessions are unaffected until they are returned.
    pub async fn resize(&self, new_size: usize) {
        let surplus: Vec<L::Session> = {
            let mut state = self.state.lock();
            info!("Resizing browser pool from {} to {}", state.size, new_size);
            state.size = new_size;
            let excess = state.idle.len().saturating_sub(new_size);
            state.idle.drain(..excess).collect()
        };

        for session in surplus {
            self.close_quietly(session).await;
        }
        self.fill_idle().await;
    }

    /// Close every idle session concurrently and refuse further lending
    ///
    /// Individual close failures are collected, never raised. Safe to call
    /// more than once; later calls find an empty queue.
    pub async fn destroy(&self) -> CleanupResult {
        if let Some(handle) = self.keepalive_handle.lock().take() {
            handle.abort();
        }

        let sessions: Vec<L::Session> = {
            let mut state = self.state.lock();
            state.shutting_down = true;
            state.idle.drain(..).collect()
        };

        info!("Destroying browser pool: closing {} sessions", sessions.len());

        let results = futures::future::join_all(sessions.into_iter().map(|mut session| async move {
            let id = session.id();
            session
                .close()
                .await
                .map_err(|e| format!("Session {id} close failed: {e:#}"))
        }))
        .await;

        let errors: Vec<String> = results.into_iter().filter_map(Result::err).collect();
        for error in &errors {
            warn!("{}", error);
        }
        info!("Browser pool destroyed");
        CleanupResult::from_errors(errors)
    }

    /// Run [`health_check`](Self::health_check) every `interval` until destroyed
    pub fn start_keepalive(self: &Arc<Self>, interval: Duration) {
        let pool = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; the pool was just initialized
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if pool.is_shutting_down() {
                    break;
                }
                pool.health_check().await;
            }
            debug!("Keepalive loop exiting");
        });

        if let Some(previous) = self.keepalive_handle.lock().replace(handle) {
            previous.abort();
        }
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            available: state.idle.len(),
            active: state.active,
            max: self.max_connections,
            size: state.size,
        }
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().shutting_down
    }

    async fn spawn_session(&self) -> Result<L::Session, PoolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = self.launcher.spawn(id).await.map_err(PoolError::Spawn)?;
        debug!(session_id = id, "Spawned browser session");
        Ok(session)
    }

    /// Push to the back of the idle queue, handing the session back if there is no room
    fn try_enqueue(&self, session: L::Session) -> Option<L::Session> {
        let mut state = self.state.lock();
        if state.has_idle_room() {
            state.idle.push_back(session);
            None
        } else {
            Some(session)
        }
    }

    /// Spawn sessions until the idle queue reaches `size`
    async fn fill_idle(&self) -> usize {
        let mut spawned = 0;
        while self.state.lock().has_idle_room() {
            match self.spawn_session().await {
                Ok(session) => match self.try_enqueue(session) {
                    None => spawned += 1,
                    Some(surplus) => {
                        self.close_quietly(surplus).await;
                        break;
                    }
                },
                Err(e) => {
                    warn!("Failed to refill browser pool: {}", e);
                    break;
                }
            }
        }
        spawned
    }

    async fn close_quietly(&self, mut session: L::Session) {
        let id = session.id();
        if let Err(e) = session.close().await {
            warn!(session_id = id, "Failed to close browser session: {:#}", e);
        }
    }
}

/// Lending slot reserved in `acquire`, returned on drop unless disarmed
struct ActiveSlot<'a, S> {
    state: &'a Mutex<PoolState<S>>,
    armed: bool,
}

impl<S> Drop for ActiveSlot<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock();
            state.active = state.active.saturating_sub(1);
        }
    }
}

// =============================================================================
// Lease
// =============================================================================

/// A session on loan from the pool
///
/// Call [`release`](Self::release) to hand it back and wait for recycling.
/// A lease dropped without being released schedules the release on the
/// current runtime instead.
pub struct SessionLease<L: SessionLauncher> {
    session: Option<L::Session>,
    pool: Arc<BrowserPool<L>>,
}

impl<L: SessionLauncher> SessionLease<L> {
    pub fn session(&self) -> &L::Session {
        self.session
            .as_ref()
            .unwrap_or_else(|| unreachable!("lease holds its session until released"))
    }

    pub fn id(&self) -> u64 {
        self.session().id()
    }

    /// Return the session and wait until it is recycled, replaced or closed
    pub async fn release(mut self) {
        if let Some(session) = self.session.take() {
            self.pool.release(session).await;
        }
    }
}

impl<L: SessionLauncher> Drop for SessionLease<L> {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pool = Arc::clone(&self.pool);
                handle.spawn(async move {
                    pool.release(session).await;
                });
            }
            Err(_) => {
                warn!(
                    session_id = session.id(),
                    "Lease dropped outside a runtime, discarding session"
                );
                let mut state = self.pool.state.lock();
                state.active = state.active.saturating_sub(1);
            }
        }
    }
}
