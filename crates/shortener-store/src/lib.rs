//! Shared infrastructure clients used by both the front-end and consumer
//! processes: the Postgres mapping repository, the Redis redirect cache,
//! click-event wire types, and the AMQP publisher.

mod cache;
mod error;
mod events;
mod mapping;
mod publisher;
mod traits;

pub use cache::{RedirectCache, DEFAULT_TTL_SECS};
pub use error::Error;
pub use events::ClickEvent;
pub use mapping::{MappingRecord, MappingRepository};
pub use publisher::Publisher;
pub use traits::{Cache, EventPublisher, MappingStore};
