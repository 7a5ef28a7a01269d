//! HTTP route definitions.
//!
//! ```text
//! POST   /parse-domain  - Reputation record for a domain (rate limited)
//! POST   /check-phish   - Anti-phishing form lookup (rate limited)
//! GET    /health        - Uptime, memory, pool and cache occupancy
//! DELETE /cache         - Drop every cached result
//! ```

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{check_phish, clear_cache, health, parse_domain};
use super::middleware::{enforce_rate_limit, extract_client_id};
use super::state::AppState;
use crate::browser_pool::SessionLauncher;

pub fn create_router<L: SessionLauncher>(state: AppState<L>) -> Router {
    let scrape_routes = Router::new()
        .route("/parse-domain", post(parse_domain::<L>))
        .route("/check-phish", post(check_phish::<L>))
        .route_layer(from_fn_with_state(state.clone(), enforce_rate_limit::<L>));

    let admin_routes = Router::new()
        .route("/health", get(health::<L>))
        .route("/cache", delete(clear_cache::<L>));

    scrape_routes
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(state.clone(), extract_client_id::<L>)),
        )
        .with_state(state)
}
