//! HTTP front end for the URL shortener: redirect resolver and shortener
//! intake. Exposed as a library, in addition to the `shortener-server`
//! binary, so integration tests can exercise [`app`] against in-memory
//! fakes (§9 "Test tooling") without a live Postgres/Redis/AMQP instance.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use shortener_store::{Cache, EventPublisher, MappingStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Builds the router shared by the binary and the integration tests.
pub fn app<M, C, P>(state: AppState<M, C, P>) -> Router
where
    M: MappingStore + Clone,
    C: Cache + Clone,
    P: EventPublisher,
{
    Router::new()
        .route("/health", get(handlers::health))
        .route("/shorten", post(handlers::shorten::<M, C, P>))
        .route("/{code}", get(handlers::redirect::<M, C, P>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
