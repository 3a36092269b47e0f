//! Query-result cache for the storage bridge.
//!
//! Entries are keyed by `(collection, query, database)`. Every read and
//! write of a cached value goes through a deep copy, so a caller
//! mutating a returned value can never alias the cached one. A write's
//! filter cannot in general be matched against arbitrary cached read
//! filters, so writers invalidate the whole `(collection, database)`
//! prefix.

use super::store::{Document, Filter};
use dashmap::DashMap;

/// Cache key: collection, serialized query, and database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The collection the query ran against.
    pub collection: String,
    /// The serialized query filter.
    pub query: String,
    /// The database, when the caller named one.
    pub database: Option<String>,
}

impl CacheKey {
    /// Builds the key for a `(collection, filter, database)` read.
    #[must_use]
    pub fn new(collection: &str, filter: &Filter, database: Option<&str>) -> Self {
        Self {
            collection: collection.to_string(),
            query: serde_json::to_string(filter).unwrap_or_default(),
            database: database.map(ToString::to_string),
        }
    }
}

/// Thread-safe query-result cache with prefix invalidation.
#[derive(Debug, Default)]
pub struct StorageCache {
    entries: DashMap<CacheKey, Vec<Document>>,
}

impl StorageCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches a value, returning an independent copy.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Vec<Document>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Stores a value snapshot.
    pub fn set(&self, key: CacheKey, value: Vec<Document>) {
        self.entries.insert(key, value);
    }

    /// Invalidates a single key.
    pub fn invalidate(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    /// Invalidates every key for a `(collection, database)` pair.
    pub fn invalidate_collection(&self, collection: &str, database: Option<&str>) {
        self.entries
            .retain(|key, _| !(key.collection == collection && key.database.as_deref() == database));
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
