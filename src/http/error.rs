//! Rendering of request failures as JSON responses

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::error;

use crate::scrape_service::ScrapeError;

/// A failed request with whatever context the handler knew
#[derive(Debug)]
pub struct ApiError {
    pub error: ScrapeError,
    pub domain: Option<String>,
    pub processing_time: Option<Duration>,
}

impl ApiError {
    pub fn new(error: ScrapeError) -> Self {
        Self {
            error,
            domain: None,
            processing_time: None,
        }
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_processing_time(mut self, elapsed: Duration) -> Self {
        self.processing_time = Some(elapsed);
        self
    }
}

impl From<ScrapeError> for ApiError {
    fn from(error: ScrapeError) -> Self {
        Self::new(error)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error: &'static str,
    details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    processing_time: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        if status.is_server_error() {
            error!(
                domain = self.domain.as_deref().unwrap_or("-"),
                status = status.as_u16(),
                "Request failed: {}",
                self.error
            );
        }

        let retry_after = match self.error {
            ScrapeError::RateLimited { retry_after_secs } => Some(retry_after_secs),
            _ => None,
        };

        let body = ErrorBody {
            error: self.error.label(),
            details: self.error.to_string(),
            retry_after,
            domain: self.domain.as_deref(),
            processing_time: self.processing_time.map(millis),
        };

        (status, Json(body)).into_response()
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
