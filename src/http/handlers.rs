//! Endpoint handlers

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use super::error::{ApiError, millis};
use super::state::AppState;
use crate::browser_pool::SessionLauncher;
use crate::extraction::{ExtractionResult, PhishCheckResult};
use crate::scrape_service::{ScrapeError, ScrapeOutcome};
use crate::utils::process::resident_memory_bytes;

/// Scrape payload plus how it was produced
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResponse<T> {
    #[serde(flatten)]
    pub data: T,
    pub cached: bool,
    /// Milliseconds
    pub processing_time: u64,
}

impl<T> From<ScrapeOutcome<T>> for ScrapeResponse<T> {
    fn from(outcome: ScrapeOutcome<T>) -> Self {
        Self {
            data: outcome.data,
            cached: outcome.cached,
            processing_time: millis(outcome.processing_time),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Seconds since the router was built
    pub uptime: f64,
    pub memory: MemoryUsage,
    pub browser_pool: PoolOccupancy,
    pub cache: CacheOccupancy,
}

#[derive(Debug, Serialize)]
pub struct MemoryUsage {
    /// Resident set size in bytes, when the platform exposes it
    pub rss: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PoolOccupancy {
    pub available: usize,
    pub active: usize,
    pub max: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOccupancy {
    pub size: usize,
    pub max_size: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheClearedResponse {
    pub message: &'static str,
    pub cleared_entries: usize,
}

/// Pull `domain` out of a JSON body; anything but a string is rejected
fn domain_from_body(body: &Bytes) -> Result<String, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        ApiError::new(ScrapeError::InvalidInput(format!(
            "Request body must be JSON: {e}"
        )))
    })?;

    value
        .get("domain")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::new(ScrapeError::InvalidInput("Domain is required".into())))
}

/// POST /parse-domain
pub async fn parse_domain<L: SessionLauncher>(
    State(state): State<AppState<L>>,
    body: Bytes,
) -> Result<Json<ScrapeResponse<ExtractionResult>>, ApiError> {
    let started = Instant::now();
    let domain = domain_from_body(&body)?;

    match state.service.parse_domain(&domain).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => Err(ApiError::new(e)
            .with_domain(domain)
            .with_processing_time(started.elapsed())),
    }
}

/// POST /check-phish
pub async fn check_phish<L: SessionLauncher>(
    State(state): State<AppState<L>>,
    body: Bytes,
) -> Result<Json<ScrapeResponse<PhishCheckResult>>, ApiError> {
    let started = Instant::now();
    let domain = domain_from_body(&body)?;

    match state.service.check_phish(&domain).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => Err(ApiError::new(e)
            .with_domain(domain)
            .with_processing_time(started.elapsed())),
    }
}

/// GET /health
pub async fn health<L: SessionLauncher>(State(state): State<AppState<L>>) -> Json<HealthResponse> {
    let pool = state.service.pool().stats();
    let cache = state.service.cache();

    Json(HealthResponse {
        status: "ok",
        uptime: state.started_at.elapsed().as_secs_f64(),
        memory: MemoryUsage {
            rss: resident_memory_bytes(),
        },
        browser_pool: PoolOccupancy {
            available: pool.available,
            active: pool.active,
            max: pool.max,
        },
        cache: CacheOccupancy {
            size: cache.len(),
            max_size: cache.max_entries(),
        },
    })
}

/// DELETE /cache
pub async fn clear_cache<L: SessionLauncher>(
    State(state): State<AppState<L>>,
) -> Json<CacheClearedResponse> {
    let cleared_entries = state.service.cache().clear();
    Json(CacheClearedResponse {
        message: "Cache cleared",
        cleared_entries,
    })
}
