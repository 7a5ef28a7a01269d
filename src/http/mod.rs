//! HTTP interface: router, handlers, middleware and error rendering

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use middleware::ClientId;
pub use routes::create_router;
pub use state::AppState;
