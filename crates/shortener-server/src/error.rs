use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Error kinds surfaced across the HTTP boundary (§7).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body or a URL that doesn't parse as an http(s) URL with a
    /// host.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Unknown short code on redirect.
    #[error("short url not found")]
    NotFound,

    /// The Snowflake generator refused to emit because the clock moved
    /// backward.
    #[error("id generator unavailable: {0}")]
    ClockRegressed(#[from] shortener_core::Error),

    /// A `code` unique-constraint violation, or any other store failure.
    #[error("internal error: {0}")]
    Internal(#[from] shortener_store::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidUrl(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ClockRegressed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let detail = match &self {
            ApiError::NotFound => "Short URL not found".to_string(),
            _ => self.to_string(),
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}
