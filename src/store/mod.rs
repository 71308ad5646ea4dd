//! Store module
//!
//! Shared in-memory state mutated by concurrent requests: the idempotency
//! store, the TTL cache, and the entity tables.

mod cache;
mod idempotency;
mod tables;

pub use cache::TtlCache;
pub use idempotency::{Begin, IdempotencyRecord, IdempotencyStore};
pub use tables::Tables;
