use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use shortener_core::encode;
use shortener_store::{Cache, ClickEvent, EventPublisher, MappingStore, DEFAULT_TTL_SECS};
use url::Url as ParsedUrl;

use crate::error::ApiError;
use crate::models::{HealthResponse, ShortenRequest, ShortenResponse};
use crate::state::AppState;

/// `GET /health`.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "url-shortener",
    })
}

/// `POST /shorten` (C5).
#[tracing::instrument(skip(state, payload))]
pub async fn shorten<M: MappingStore, C: Cache, P: EventPublisher>(
    State(state): State<AppState<M, C, P>>,
    Json(payload): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, ApiError> {
    if !is_shortenable_url(&payload.original_url) {
        return Err(ApiError::InvalidUrl(payload.original_url.clone()));
    }

    let id = state.generator.generate()?;
    let code = encode(id);

    state
        .mappings
        .insert(id as i64, &payload.original_url, &code)
        .await?;

    if let Err(err) = state.cache.set(&code, &payload.original_url, DEFAULT_TTL_SECS).await {
        tracing::warn!(%err, code, "failed to prime redirect cache after shorten");
    }

    Ok(Json(ShortenResponse {
        short_code: code.clone(),
        short_url: format!("{}/{}", state.base_url.trim_end_matches('/'), code),
        original_url: payload.original_url,
    }))
}

/// `GET /{code}` (C4).
#[tracing::instrument(skip(state, headers))]
pub async fn redirect<M: MappingStore, C: Cache, P: EventPublisher>(
    State(state): State<AppState<M, C, P>>,
    Path(code): Path<String>,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, ApiError> {
    let url = match state.cache.get(&code).await {
        Ok(Some(url)) => url,
        Ok(None) => {
            let record = state
                .mappings
                .find_by_code(&code)
                .await?
                .ok_or(ApiError::NotFound)?;

            if let Err(err) = state
                .cache
                .set(&code, &record.original_url, DEFAULT_TTL_SECS)
                .await
            {
                tracing::warn!(%err, code, "failed to backfill redirect cache after db read");
            }

            record.original_url
        }
        Err(err) => {
            tracing::warn!(%err, code, "cache read failed; falling back to database");
            let record = state
                .mappings
                .find_by_code(&code)
                .await?
                .ok_or(ApiError::NotFound)?;
            record.original_url
        }
    };

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let referrer = headers
        .get(axum::http::header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let event = ClickEvent::now(code, url.clone(), user_agent, peer.ip().to_string(), referrer);
    let publisher = state.publisher.clone();
    tokio::spawn(async move {
        publisher.publish(&event).await;
    });

    let Ok(location) = HeaderValue::from_str(&url) else {
        tracing::error!(original_url = %url, "stored original_url is not a valid header value");
        return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
    };
    let mut response = Response::new(axum::body::Body::empty());
    *response.status_mut() = StatusCode::MOVED_PERMANENTLY;
    response.headers_mut().insert(axum::http::header::LOCATION, location);
    Ok(response)
}

/// A URL is shortenable if it parses and carries an http(s) scheme with a
/// host (§4.5 "URL validation").
fn is_shortenable_url(raw: &str) -> bool {
    match ParsedUrl::parse(raw) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https_urls_with_a_host() {
        assert!(is_shortenable_url("https://example.com/path"));
        assert!(is_shortenable_url("http://example.com"));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(!is_shortenable_url("ftp://example.com/file"));
        assert!(!is_shortenable_url("file:///etc/passwd"));
        assert!(!is_shortenable_url("javascript:alert(1)"));
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(!is_shortenable_url("not a url"));
        assert!(!is_shortenable_url(""));
    }

    #[test]
    fn not_found_maps_to_404_with_fixed_detail_message() {
        let response = ApiError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_url_maps_to_422() {
        let response = ApiError::InvalidUrl("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
