//! Failure taxonomy for scrape requests

use axum::http::StatusCode;
use chromiumoxide::error::CdpError;

use crate::browser_pool::PoolError;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Malformed or missing domain
    #[error("{0}")]
    InvalidInput(String),

    #[error("Too many requests, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Lending ceiling reached; retry later
    #[error("Maximum concurrent connections reached ({max})")]
    CapacityExceeded { max: usize },

    #[error("Service is shutting down")]
    ShuttingDown,

    #[error("{0}")]
    Timeout(String),

    /// Page did not have the expected shape
    #[error("Extraction failed for {domain}: {message}")]
    Extraction { domain: String, message: String },

    /// Session could not be spawned or used
    #[error("Browser session failure: {0}")]
    Session(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScrapeError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::CapacityExceeded { .. } | Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Extraction { .. } | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Headline for the JSON error body
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "Invalid domain format",
            Self::RateLimited { .. } => "Too many requests",
            _ => "Parsing failed",
        }
    }

    /// Sort a failure from page work into timeout or extraction failure
    pub fn classify(error: anyhow::Error, domain: &str) -> Self {
        let message = format!("{error:#}");
        if is_timeout(&error) {
            Self::Timeout(message)
        } else {
            Self::Extraction {
                domain: domain.to_string(),
                message,
            }
        }
    }
}

impl From<PoolError> for ScrapeError {
    fn from(error: PoolError) -> Self {
        match error {
            PoolError::CapacityExceeded { max } => Self::CapacityExceeded { max },
            PoolError::ShuttingDown => Self::ShuttingDown,
            PoolError::Spawn(e) => Self::Session(format!("{e:#}")),
        }
    }
}

fn is_timeout(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause.is::<tokio::time::error::Elapsed>()
            || matches!(cause.downcast_ref::<CdpError>(), Some(CdpError::Timeout))
    })
}
