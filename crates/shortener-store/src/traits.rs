use std::future::Future;

use crate::{ClickEvent, Error, MappingRecord};

/// Abstraction over the mapping repository (§3 "Mapping record"), so
/// handlers can be exercised against an in-memory fake in tests without a
/// live Postgres instance.
pub trait MappingStore: Send + Sync + 'static {
    fn insert(
        &self,
        id: i64,
        original_url: &str,
        code: &str,
    ) -> impl Future<Output = Result<MappingRecord, Error>> + Send;

    fn find_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<MappingRecord>, Error>> + Send;
}

/// Abstraction over the redirect cache (§4.4), so handlers can be exercised
/// against an in-memory fake in tests without a live Redis instance.
pub trait Cache: Send + Sync + 'static {
    fn get(&self, code: &str) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    fn set(
        &self,
        code: &str,
        original_url: &str,
        ttl_secs: u64,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Abstraction over the click-event publisher. `publish` never returns an
/// error - that's part of the contract (§4.6 step 3, property E1), not just
/// an implementation detail of the production publisher.
pub trait EventPublisher: Send + Sync + 'static {
    fn publish(&self, event: &ClickEvent) -> impl Future<Output = ()> + Send;
}

impl MappingStore for crate::mapping::MappingRepository {
    async fn insert(&self, id: i64, original_url: &str, code: &str) -> Result<MappingRecord, Error> {
        crate::mapping::MappingRepository::insert(self, id, original_url, code).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<MappingRecord>, Error> {
        crate::mapping::MappingRepository::find_by_code(self, code).await
    }
}

impl Cache for crate::cache::RedirectCache {
    async fn get(&self, code: &str) -> Result<Option<String>, Error> {
        crate::cache::RedirectCache::get(self, code).await
    }

    async fn set(&self, code: &str, original_url: &str, ttl_secs: u64) -> Result<(), Error> {
        crate::cache::RedirectCache::set(self, code, original_url, ttl_secs).await
    }
}

impl EventPublisher for crate::publisher::Publisher {
    async fn publish(&self, event: &ClickEvent) {
        crate::publisher::Publisher::publish(self, event).await
    }
}
