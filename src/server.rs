//! Service assembly and lifecycle
//!
//! [`Server`] owns the pool, cache, limiter and their background tasks.
//! The hosting process drives it through `start`, `serve` and `shutdown`;
//! nothing in here exits the process.

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::browser_pool::{BrowserPool, ChromeLauncher, CleanupResult, SessionLauncher};
use crate::config::ServiceConfig;
use crate::http::{AppState, create_router};
use crate::rate_limiter::ClientRateLimiter;
use crate::scrape_service::ScrapeService;

pub struct Server<L: SessionLauncher> {
    config: ServiceConfig,
    pool: Arc<BrowserPool<L>>,
    state: AppState<L>,
    prune_handle: Option<JoinHandle<()>>,
}

impl Server<ChromeLauncher> {
    /// Server backed by real Chrome sessions
    pub fn with_chrome(config: ServiceConfig) -> Self {
        let launcher = ChromeLauncher::new(config.headless());
        Self::new(config, launcher)
    }
}

impl<L: SessionLauncher> Server<L> {
    pub fn new(config: ServiceConfig, launcher: L) -> Self {
        let pool = BrowserPool::new(
            launcher,
            config.pool_size(),
            config.max_concurrent_requests(),
        );
        let service = Arc::new(ScrapeService::new(Arc::clone(&pool), &config));
        let limiter = Arc::new(ClientRateLimiter::new(
            config.rate_limit_max_requests(),
            config.rate_limit_window(),
        ));

        Self {
            state: AppState::new(service, limiter).with_trust_proxy(config.trust_proxy()),
            pool,
            config,
            prune_handle: None,
        }
    }

    /// Warm the pool and start background housekeeping
    ///
    /// Must complete before traffic is accepted. Returns how many sessions
    /// were pre-warmed.
    pub async fn start(&mut self) -> usize {
        let warmed = self.pool.initialize().await;

        if let Some(interval) = self.config.keepalive_interval() {
            info!("Starting browser keepalive every {:?}", interval);
            self.pool.start_keepalive(interval);
        }

        let prune_every = self.config.rate_limit_window().max(Duration::from_secs(1));
        self.prune_handle = Some(self.state.limiter.start_pruning(prune_every));

        warmed
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn pool(&self) -> &Arc<BrowserPool<L>> {
        &self.pool
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {addr}"))?;
        info!("Listening on {}", addr);
        Ok(listener)
    }

    /// Serve until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
    }

    /// Stop housekeeping and destroy the pool, awaiting every session close
    pub async fn shutdown(mut self) -> CleanupResult {
        info!("Shutting down scraping service");
        if let Some(handle) = self.prune_handle.take() {
            handle.abort();
        }
        self.pool.destroy().await
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Received shutdown signal");
}
