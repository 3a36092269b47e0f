//! Cache-coherent storage bridge over an abstract document store.
//!
//! This module provides:
//! - The [`DocumentStore`] CRUD contract and an in-memory implementation
//! - A query-result cache with defensive copies and prefix invalidation
//! - Buffered bulk ingestion with inline and periodic flushes
//! - The [`StorageBridge`] unifying synchronous and asynchronous callers
//!   onto one backing store

mod bridge;
mod bulk;
mod cache;
mod store;

pub use bridge::{StorageBridge, StorageBridgeConfig};
pub use bulk::{BulkBufferConfig, BulkBufferManager};
pub use cache::{CacheKey, StorageCache};
pub use store::{
    matches, Document, DocumentStore, Filter, MemoryStore, DEFAULT_DATABASE, ID_FIELD,
};
