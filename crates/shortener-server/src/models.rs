use serde::{Deserialize, Serialize};

/// `POST /shorten` request body.
#[derive(Deserialize)]
pub struct ShortenRequest {
    pub original_url: String,
}

/// `POST /shorten` response body.
#[derive(Serialize)]
pub struct ShortenResponse {
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
}

/// `GET /health` response body, matching the shape the analytics service
/// uses for its own health check.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}
