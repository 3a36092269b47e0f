//! Buffered bulk ingestion for the storage bridge.
//!
//! Documents accumulate per `(collection, database)` and flush as one
//! batched write, either inline when a buffer reaches its size threshold
//! or from the bridge's periodic flush tick once a buffer's age exceeds
//! the configured interval. A failed flush re-buffers its documents at
//! the front of the buffer rather than dropping them.

use super::cache::StorageCache;
use super::store::{Document, DocumentStore};
use crate::errors::StorageError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Thresholds for the buffered-insert path.
#[derive(Debug, Clone)]
pub struct BulkBufferConfig {
    /// Buffer size that triggers an inline flush.
    pub max_size: usize,
    /// Age after which the periodic tick flushes a buffer.
    pub flush_interval: Duration,
}

impl Default for BulkBufferConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            flush_interval: Duration::from_secs(2),
        }
    }
}

impl BulkBufferConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the inline-flush size threshold.
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the aged-flush interval.
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }
}

/// Buffer identity: one buffer per `(collection, database)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct BufferKey {
    pub collection: String,
    pub database: Option<String>,
}

#[derive(Debug)]
struct Buffer {
    docs: Vec<Document>,
    last_flush: Instant,
}

impl Buffer {
    fn new() -> Self {
        Self {
            docs: Vec::new(),
            last_flush: Instant::now(),
        }
    }
}

/// Manager for the per-key bulk buffers.
///
/// Holds its own lock, separate from the bridge's cache/store path, so
/// buffered inserts never contend with cached reads.
pub struct BulkBufferManager {
    store: Arc<dyn DocumentStore>,
    cache: Arc<StorageCache>,
    buffers: Mutex<HashMap<BufferKey, Buffer>>,
    config: BulkBufferConfig,
}

impl BulkBufferManager {
    /// Creates a manager over the given store and cache.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<StorageCache>,
        config: BulkBufferConfig,
    ) -> Self {
        Self {
            store,
            cache,
            buffers: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Appends a document to its buffer, flushing inline at the size
    /// threshold.
    ///
    /// Returns true when the append triggered a flush.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::FlushFailed` when the triggered flush
    /// failed; the documents stay buffered.
    pub fn buffered_insert(
        &self,
        collection: &str,
        doc: Document,
        database: Option<&str>,
    ) -> Result<bool, StorageError> {
        let key = BufferKey {
            collection: collection.to_string(),
            database: database.map(ToString::to_string),
        };

        let should_flush = {
            let mut buffers = self.buffers.lock();
            let buffer = buffers.entry(key.clone()).or_insert_with(Buffer::new);
            buffer.docs.push(doc);
            buffer.docs.len() >= self.config.max_size
        };

        if should_flush {
            self.flush_key(&key)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Flushes every buffer whose age exceeds the flush interval.
    ///
    /// Failures are logged and the affected documents re-buffered; the
    /// tick retries on its next pass. Returns the number of buffers
    /// flushed.
    pub fn flush_aged(&self) -> usize {
        let due: Vec<BufferKey> = {
            let buffers = self.buffers.lock();
            buffers
                .iter()
                .filter(|(_, buffer)| {
                    !buffer.docs.is_empty()
                        && buffer.last_flush.elapsed() >= self.config.flush_interval
                })
                .map(|(key, _)| key.clone())
                .collect()
        };

        let mut flushed = 0;
        for key in due {
            match self.flush_key(&key) {
                Ok(0) => {}
                Ok(_) => flushed += 1,
                Err(e) => {
                    error!(collection = %key.collection, error = %e, "aged bulk flush failed");
                }
            }
        }
        flushed
    }

    /// Flushes every non-empty buffer regardless of age.
    ///
    /// Used on shutdown; failures are logged and the documents stay
    /// re-buffered. Returns the number of buffers flushed.
    pub fn flush_all(&self) -> usize {
        let keys: Vec<BufferKey> = {
            let buffers = self.buffers.lock();
            buffers
                .iter()
                .filter(|(_, buffer)| !buffer.docs.is_empty())
                .map(|(key, _)| key.clone())
                .collect()
        };

        let mut flushed = 0;
        for key in keys {
            match self.flush_key(&key) {
                Ok(0) => {}
                Ok(_) => flushed += 1,
                Err(e) => {
                    error!(collection = %key.collection, error = %e, "final bulk flush failed");
                }
            }
        }
        flushed
    }

    /// Returns the number of documents pending for a buffer.
    #[must_use]
    pub fn pending(&self, collection: &str, database: Option<&str>) -> usize {
        let key = BufferKey {
            collection: collection.to_string(),
            database: database.map(ToString::to_string),
        };
        self.buffers
            .lock()
            .get(&key)
            .map_or(0, |buffer| buffer.docs.len())
    }

    /// Flushes one buffer: batched write, buffer clear, cache prefix
    /// invalidation. The store call runs outside the buffer lock.
    fn flush_key(&self, key: &BufferKey) -> Result<usize, StorageError> {
        let docs = {
            let mut buffers = self.buffers.lock();
            match buffers.get_mut(key) {
                Some(buffer) if !buffer.docs.is_empty() => std::mem::take(&mut buffer.docs),
                _ => return Ok(0),
            }
        };

        let count = docs.len();
        match self
            .store
            .insert_many(&key.collection, &docs, key.database.as_deref())
        {
            Ok(_) => {
                self.cache
                    .invalidate_collection(&key.collection, key.database.as_deref());
                let mut buffers = self.buffers.lock();
                if let Some(buffer) = buffers.get_mut(key) {
                    buffer.last_flush = Instant::now();
                }
                debug!(collection = %key.collection, count, "bulk buffer flushed");
                Ok(count)
            }
            Err(source) => {
                self.rebuffer(key, docs);
                Err(StorageError::FlushFailed {
                    collection: key.collection.clone(),
                    source,
                })
            }
        }
    }

    /// Puts failed-flush documents back at the front of their buffer.
    fn rebuffer(&self, key: &BufferKey, mut docs: Vec<Document>) {
        let mut buffers = self.buffers.lock();
        let buffer = buffers.entry(key.clone()).or_insert_with(Buffer::new);
        docs.append(&mut buffer.docs);
        buffer.docs = docs;
    }
}

impl std::fmt::Debug for BulkBufferManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkBufferManager")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::storage::store::{Filter, MemoryStore, MockDocumentStore};
    use pretty_assertions::assert_eq;

    fn doc(n: i64) -> Document {
        let mut map = Document::new();
        map.insert("n".to_string(), serde_json::json!(n));
        map
    }

    fn manager_with(
        store: Arc<dyn DocumentStore>,
        config: BulkBufferConfig,
    ) -> BulkBufferManager {
        BulkBufferManager::new(store, Arc::new(StorageCache::new()), config)
    }

    #[test]
    fn test_size_threshold_flushes_inline() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone(), BulkBufferConfig::new().with_max_size(3));

        assert!(!manager.buffered_insert("ticks", doc(1), None).unwrap());
        assert!(!manager.buffered_insert("ticks", doc(2), None).unwrap());
        assert!(manager.buffered_insert("ticks", doc(3), None).unwrap());

        assert_eq!(manager.pending("ticks", None), 0);
        let stored = store.find("ticks", &Filter::new(), None).unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[test]
    fn test_flush_aged_respects_interval() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(
            store.clone(),
            BulkBufferConfig::new()
                .with_max_size(100)
                .with_flush_interval(Duration::from_millis(10)),
        );

        manager.buffered_insert("ticks", doc(1), None).unwrap();
        assert_eq!(manager.flush_aged(), 0);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(manager.flush_aged(), 1);
        assert_eq!(manager.pending("ticks", None), 0);
    }

    #[test]
    fn test_buffers_are_keyed_per_collection_and_database() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store, BulkBufferConfig::new().with_max_size(100));

        manager.buffered_insert("ticks", doc(1), None).unwrap();
        manager.buffered_insert("ticks", doc(2), Some("alpha")).unwrap();

        assert_eq!(manager.pending("ticks", None), 1);
        assert_eq!(manager.pending("ticks", Some("alpha")), 1);
        assert_eq!(manager.pending("candles", None), 0);
    }

    #[test]
    fn test_failed_flush_rebuffers_documents() {
        let mut store = MockDocumentStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_insert_many()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(StoreError::Unavailable("down".to_string())));
        store
            .expect_insert_many()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, docs, _| Ok(vec![serde_json::json!("id"); docs.len()]));

        let manager = manager_with(Arc::new(store), BulkBufferConfig::new().with_max_size(2));

        manager.buffered_insert("ticks", doc(1), None).unwrap();
        let err = manager.buffered_insert("ticks", doc(2), None).unwrap_err();
        assert!(matches!(err, StorageError::FlushFailed { .. }));

        // Nothing dropped: both documents still pending.
        assert_eq!(manager.pending("ticks", None), 2);

        // The next triggering insert flushes all three.
        assert!(manager.buffered_insert("ticks", doc(3), None).unwrap());
        assert_eq!(manager.pending("ticks", None), 0);
    }

    #[test]
    fn test_flush_all_drains_everything() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone(), BulkBufferConfig::new().with_max_size(100));

        manager.buffered_insert("ticks", doc(1), None).unwrap();
        manager.buffered_insert("candles", doc(2), None).unwrap();

        assert_eq!(manager.flush_all(), 2);
        assert_eq!(manager.pending("ticks", None), 0);
        assert_eq!(manager.pending("candles", None), 0);
    }
}
