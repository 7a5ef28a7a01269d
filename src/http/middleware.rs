//! Client identification and rate limiting middleware

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::{IpAddr, SocketAddr};

use super::error::ApiError;
use super::state::AppState;
use crate::browser_pool::SessionLauncher;
use crate::rate_limiter::RateLimitDecision;
use crate::scrape_service::ScrapeError;

/// Extension key carrying the rate-limit identity of the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientId(pub String);

/// Derive the caller's identity
///
/// Priority:
/// 1. first address in X-Forwarded-For, only when `trust_proxy` is set
/// 2. X-Real-IP (Nginx), only when `trust_proxy` is set
/// 3. socket address, when the server was started with connect info
/// 4. `"unknown"`
pub async fn extract_client_id<L: SessionLauncher>(
    State(state): State<AppState<L>>,
    mut request: Request,
    next: Next,
) -> Response {
    let forwarded = state
        .trust_proxy
        .then(|| forwarded_client(request.headers()))
        .flatten();
    let socket = || {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    };

    let client = forwarded
        .or_else(socket)
        .map_or_else(|| "unknown".to_string(), |ip| ip.to_string());

    request.extensions_mut().insert(ClientId(client));
    next.run(request).await
}

fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
}

/// Reject callers over their sliding-window budget with 429
pub async fn enforce_rate_limit<L: SessionLauncher>(
    State(state): State<AppState<L>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ClientId>()
        .map_or("unknown", |ClientId(id)| id.as_str());

    let decision = state.limiter.check(client);
    if let RateLimitDecision::Deny { .. } = decision {
        let retry_after_secs = decision.retry_after_secs().unwrap_or(1);
        return ApiError::new(ScrapeError::RateLimited { retry_after_secs }).into_response();
    }

    next.run(request).await
}
