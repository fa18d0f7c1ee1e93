use std::sync::Arc;

use shortener_core::{ShortflakeGenerator, SystemClock};
use shortener_store::{Cache, EventPublisher, MappingRepository, MappingStore, Publisher, RedirectCache};

/// Process-wide singletons shared across request handlers.
///
/// Generic over the mapping store, cache and publisher so handlers can be
/// exercised against in-memory fakes in tests (§9 "Test tooling") without a
/// live Postgres/Redis/AMQP instance. [`ProdState`] is the concrete
/// instantiation the binary actually runs with.
///
/// Cheap to clone: every field is itself an `Arc` or an internally-pooled
/// client.
pub struct AppState<M: MappingStore, C: Cache, P: EventPublisher> {
    pub mappings: M,
    pub cache: C,
    pub generator: Arc<ShortflakeGenerator<SystemClock>>,
    pub publisher: Arc<P>,
    pub base_url: String,
}

// Implemented by hand rather than derived: `#[derive(Clone)]` would require
// `P: Clone` too, but `publisher` is behind an `Arc` and needs no such bound.
impl<M: MappingStore + Clone, C: Cache + Clone, P: EventPublisher> Clone for AppState<M, C, P> {
    fn clone(&self) -> Self {
        Self {
            mappings: self.mappings.clone(),
            cache: self.cache.clone(),
            generator: self.generator.clone(),
            publisher: self.publisher.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// The state shape the `shortener-server` binary actually runs with.
pub type ProdState = AppState<MappingRepository, RedirectCache, Publisher>;
