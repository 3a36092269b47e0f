//! Cache-coherent sync/async bridge over a document store.
//!
//! Synchronous callers go straight through the cached CRUD path.
//! Asynchronous callers submit requests over a channel to one dedicated
//! worker thread, which executes the identical synchronous methods and
//! resolves a oneshot handle back across the thread boundary. Sync and
//! async callers therefore never race on the store logic itself, only
//! on the cache's own internal lock.

use super::bulk::{BulkBufferConfig, BulkBufferManager};
use super::cache::{CacheKey, StorageCache};
use super::store::{Document, DocumentStore, Filter, ID_FIELD};
use crate::errors::StorageError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Tunables for the storage bridge.
#[derive(Debug, Clone)]
pub struct StorageBridgeConfig {
    /// Capacity of the async request channel.
    pub channel_capacity: usize,
    /// Bulk-buffer thresholds.
    pub bulk: BulkBufferConfig,
}

impl Default for StorageBridgeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            bulk: BulkBufferConfig::default(),
        }
    }
}

impl StorageBridgeConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the async channel capacity.
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets the bulk-buffer thresholds.
    #[must_use]
    pub fn with_bulk(mut self, bulk: BulkBufferConfig) -> Self {
        self.bulk = bulk;
        self
    }
}

/// An operation submitted through the async request channel.
///
/// The typed enum makes malformed requests unrepresentable; the bridge
/// worker survives every request outcome and runs until `close`.
enum StorageOp {
    Get {
        collection: String,
        filter: Filter,
        database: Option<String>,
    },
    Insert {
        collection: String,
        document: Document,
        upsert: bool,
        database: Option<String>,
    },
    Update {
        collection: String,
        filter: Filter,
        changes: Document,
        upsert: bool,
        database: Option<String>,
    },
    Delete {
        collection: String,
        filter: Filter,
        database: Option<String>,
    },
    BulkInsert {
        collection: String,
        documents: Vec<Document>,
        database: Option<String>,
    },
}

/// The result of an executed operation.
enum StorageReply {
    Documents(Vec<Document>),
    Id(serde_json::Value),
    Ids(Vec<serde_json::Value>),
    Count(u64),
}

struct StorageRequest {
    op: StorageOp,
    reply: oneshot::Sender<Result<StorageReply, StorageError>>,
}

/// The cached CRUD path shared by the sync face and the bridge worker.
struct SyncStorage {
    store: Arc<dyn DocumentStore>,
    cache: Arc<StorageCache>,
    // Serializes read-through and writes so a concurrent miss can never
    // re-cache a value that predates an applied write.
    store_lock: Mutex<()>,
}

impl SyncStorage {
    fn get(
        &self,
        collection: &str,
        filter: &Filter,
        database: Option<&str>,
    ) -> Result<Vec<Document>, StorageError> {
        let key = CacheKey::new(collection, filter, database);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let _guard = self.store_lock.lock();
        let docs = self.store.find(collection, filter, database)?;
        self.cache.set(key, docs.clone());
        Ok(docs)
    }

    fn insert(
        &self,
        collection: &str,
        document: Document,
        upsert: bool,
        database: Option<&str>,
    ) -> Result<serde_json::Value, StorageError> {
        let _guard = self.store_lock.lock();

        let id = if upsert {
            // Replace-or-insert keyed on the document identity when it
            // carries one; plain insert otherwise.
            if let Some(id) = document.get(ID_FIELD).cloned() {
                let mut identity = Filter::new();
                identity.insert(ID_FIELD.to_string(), id.clone());
                self.store
                    .replace(collection, &identity, document, true, database)?;
                id
            } else {
                self.store.insert(collection, document, database)?
            }
        } else {
            self.store.insert(collection, document, database)?
        };

        let mut written = Filter::new();
        written.insert(ID_FIELD.to_string(), id.clone());
        self.cache
            .invalidate(&CacheKey::new(collection, &written, database));
        self.cache.invalidate_collection(collection, database);
        Ok(id)
    }

    fn update(
        &self,
        collection: &str,
        filter: &Filter,
        changes: Document,
        upsert: bool,
        database: Option<&str>,
    ) -> Result<u64, StorageError> {
        let _guard = self.store_lock.lock();

        let count = if upsert {
            self.store
                .replace(collection, filter, changes, true, database)?
        } else {
            self.store.update(collection, filter, &changes, database)?
        };

        self.cache
            .invalidate(&CacheKey::new(collection, filter, database));
        self.cache.invalidate_collection(collection, database);
        Ok(count)
    }

    fn delete(
        &self,
        collection: &str,
        filter: &Filter,
        database: Option<&str>,
    ) -> Result<u64, StorageError> {
        let _guard = self.store_lock.lock();
        let count = self.store.delete(collection, filter, database)?;

        self.cache
            .invalidate(&CacheKey::new(collection, filter, database));
        self.cache.invalidate_collection(collection, database);
        Ok(count)
    }

    fn bulk_insert(
        &self,
        collection: &str,
        documents: &[Document],
        database: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, StorageError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let _guard = self.store_lock.lock();
        let ids = self.store.insert_many(collection, documents, database)?;
        self.cache.invalidate_collection(collection, database);
        Ok(ids)
    }

    fn execute(&self, op: StorageOp) -> Result<StorageReply, StorageError> {
        match op {
            StorageOp::Get {
                collection,
                filter,
                database,
            } => self
                .get(&collection, &filter, database.as_deref())
                .map(StorageReply::Documents),
            StorageOp::Insert {
                collection,
                document,
                upsert,
                database,
            } => self
                .insert(&collection, document, upsert, database.as_deref())
                .map(StorageReply::Id),
            StorageOp::Update {
                collection,
                filter,
                changes,
                upsert,
                database,
            } => self
                .update(&collection, &filter, changes, upsert, database.as_deref())
                .map(StorageReply::Count),
            StorageOp::Delete {
                collection,
                filter,
                database,
            } => self
                .delete(&collection, &filter, database.as_deref())
                .map(StorageReply::Count),
            StorageOp::BulkInsert {
                collection,
                documents,
                database,
            } => self
                .bulk_insert(&collection, &documents, database.as_deref())
                .map(StorageReply::Ids),
        }
    }
}

/// Cache-coherent CRUD access to a backing document store, usable from
/// both blocking and async callers, plus buffered bulk ingestion.
pub struct StorageBridge {
    sync: Arc<SyncStorage>,
    bulk: Arc<BulkBufferManager>,
    sender: Mutex<Option<mpsc::Sender<StorageRequest>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    ticker_stop: Mutex<Option<std::sync::mpsc::Sender<()>>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl StorageBridge {
    /// Creates a bridge with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the bridge worker or flush ticker thread
    /// cannot be spawned.
    pub fn new(store: Arc<dyn DocumentStore>) -> Result<Self, StorageError> {
        Self::with_config(store, StorageBridgeConfig::default())
    }

    /// Creates a bridge with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the bridge worker or flush ticker thread
    /// cannot be spawned.
    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        config: StorageBridgeConfig,
    ) -> Result<Self, StorageError> {
        let cache = Arc::new(StorageCache::new());
        let sync = Arc::new(SyncStorage {
            store: store.clone(),
            cache: cache.clone(),
            store_lock: Mutex::new(()),
        });
        let bulk = Arc::new(BulkBufferManager::new(store, cache, config.bulk.clone()));

        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let worker_sync = sync.clone();
        let worker = std::thread::Builder::new()
            .name("storage-bridge".to_string())
            .spawn(move || bridge_worker(rx, &worker_sync))
            .map_err(StorageError::WorkerSpawn)?;

        let (stop_tx, stop_rx) = std::sync::mpsc::channel();
        let ticker_bulk = bulk.clone();
        let interval = config.bulk.flush_interval;
        let ticker = std::thread::Builder::new()
            .name("storage-bridge-flush".to_string())
            .spawn(move || flush_ticker(&stop_rx, &ticker_bulk, interval))
            .map_err(StorageError::WorkerSpawn)?;

        Ok(Self {
            sync,
            bulk,
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            ticker_stop: Mutex::new(Some(stop_tx)),
            ticker: Mutex::new(Some(ticker)),
        })
    }

    /// Fetches documents, serving repeated queries from the cache.
    ///
    /// Returned values are independent copies: mutating them never
    /// affects the cache.
    ///
    /// # Errors
    ///
    /// Propagates store failures on a cache miss.
    pub fn get(
        &self,
        collection: &str,
        filter: &Filter,
        database: Option<&str>,
    ) -> Result<Vec<Document>, StorageError> {
        self.sync.get(collection, filter, database)
    }

    /// Inserts a document, invalidating affected cache entries.
    ///
    /// With `upsert`, a document carrying an identity replaces any
    /// stored document with the same identity.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn insert(
        &self,
        collection: &str,
        document: Document,
        upsert: bool,
        database: Option<&str>,
    ) -> Result<serde_json::Value, StorageError> {
        self.sync.insert(collection, document, upsert, database)
    }

    /// Updates documents matching `filter`, invalidating affected cache
    /// entries. With `upsert`, replaces (or inserts) instead of merging.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn update(
        &self,
        collection: &str,
        filter: &Filter,
        changes: Document,
        upsert: bool,
        database: Option<&str>,
    ) -> Result<u64, StorageError> {
        self.sync.update(collection, filter, changes, upsert, database)
    }

    /// Deletes documents matching `filter`, invalidating affected cache
    /// entries.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn delete(
        &self,
        collection: &str,
        filter: &Filter,
        database: Option<&str>,
    ) -> Result<u64, StorageError> {
        self.sync.delete(collection, filter, database)
    }

    /// Performs one batched insert and invalidates the collection's
    /// cache prefix.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the batch is all-or-nothing.
    pub fn bulk_insert(
        &self,
        collection: &str,
        documents: &[Document],
        database: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, StorageError> {
        self.sync.bulk_insert(collection, documents, database)
    }

    /// Buffers a document for bulk insertion.
    ///
    /// Flushes inline once the buffer reaches its size threshold;
    /// otherwise the periodic tick flushes aged buffers. Returns true
    /// when this append triggered a flush.
    ///
    /// # Errors
    ///
    /// Returns a flush failure when the inline flush could not write;
    /// the documents stay buffered.
    pub fn buffered_insert(
        &self,
        collection: &str,
        document: Document,
        database: Option<&str>,
    ) -> Result<bool, StorageError> {
        self.bulk.buffered_insert(collection, document, database)
    }

    /// Returns the number of documents pending in a bulk buffer.
    #[must_use]
    pub fn pending_bulk(&self, collection: &str, database: Option<&str>) -> usize {
        self.bulk.pending(collection, database)
    }

    /// Async mirror of [`Self::get`].
    ///
    /// # Errors
    ///
    /// Propagates store failures; `BridgeClosed` after [`Self::close`].
    pub async fn async_get(
        &self,
        collection: &str,
        filter: Filter,
        database: Option<&str>,
    ) -> Result<Vec<Document>, StorageError> {
        let reply = self
            .submit(StorageOp::Get {
                collection: collection.to_string(),
                filter,
                database: database.map(ToString::to_string),
            })
            .await?;
        match reply {
            StorageReply::Documents(docs) => Ok(docs),
            _ => Ok(Vec::new()),
        }
    }

    /// Async mirror of [`Self::insert`].
    ///
    /// # Errors
    ///
    /// Propagates store failures; `BridgeClosed` after [`Self::close`].
    pub async fn async_insert(
        &self,
        collection: &str,
        document: Document,
        upsert: bool,
        database: Option<&str>,
    ) -> Result<serde_json::Value, StorageError> {
        let reply = self
            .submit(StorageOp::Insert {
                collection: collection.to_string(),
                document,
                upsert,
                database: database.map(ToString::to_string),
            })
            .await?;
        match reply {
            StorageReply::Id(id) => Ok(id),
            _ => Ok(serde_json::Value::Null),
        }
    }

    /// Async mirror of [`Self::update`].
    ///
    /// # Errors
    ///
    /// Propagates store failures; `BridgeClosed` after [`Self::close`].
    pub async fn async_update(
        &self,
        collection: &str,
        filter: Filter,
        changes: Document,
        upsert: bool,
        database: Option<&str>,
    ) -> Result<u64, StorageError> {
        let reply = self
            .submit(StorageOp::Update {
                collection: collection.to_string(),
                filter,
                changes,
                upsert,
                database: database.map(ToString::to_string),
            })
            .await?;
        match reply {
            StorageReply::Count(count) => Ok(count),
            _ => Ok(0),
        }
    }

    /// Async mirror of [`Self::delete`].
    ///
    /// # Errors
    ///
    /// Propagates store failures; `BridgeClosed` after [`Self::close`].
    pub async fn async_delete(
        &self,
        collection: &str,
        filter: Filter,
        database: Option<&str>,
    ) -> Result<u64, StorageError> {
        let reply = self
            .submit(StorageOp::Delete {
                collection: collection.to_string(),
                filter,
                database: database.map(ToString::to_string),
            })
            .await?;
        match reply {
            StorageReply::Count(count) => Ok(count),
            _ => Ok(0),
        }
    }

    /// Async mirror of [`Self::bulk_insert`].
    ///
    /// # Errors
    ///
    /// Propagates store failures; `BridgeClosed` after [`Self::close`].
    pub async fn async_bulk_insert(
        &self,
        collection: &str,
        documents: Vec<Document>,
        database: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, StorageError> {
        let reply = self
            .submit(StorageOp::BulkInsert {
                collection: collection.to_string(),
                documents,
                database: database.map(ToString::to_string),
            })
            .await?;
        match reply {
            StorageReply::Ids(ids) => Ok(ids),
            _ => Ok(Vec::new()),
        }
    }

    /// Stops the bridge worker and flush ticker, flushing remaining
    /// buffers best-effort. Idempotent.
    pub fn close(&self) {
        drop(self.sender.lock().take());
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }

        drop(self.ticker_stop.lock().take());
        if let Some(handle) = self.ticker.lock().take() {
            let _ = handle.join();
        }

        self.bulk.flush_all();
    }

    async fn submit(&self, op: StorageOp) -> Result<StorageReply, StorageError> {
        let sender = self
            .sender
            .lock()
            .clone()
            .ok_or(StorageError::BridgeClosed)?;

        let (tx, rx) = oneshot::channel();
        sender
            .send(StorageRequest { op, reply: tx })
            .await
            .map_err(|_| StorageError::BridgeClosed)?;
        rx.await.map_err(|_| StorageError::BridgeClosed)?
    }
}

impl Drop for StorageBridge {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for StorageBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBridge")
            .field("closed", &self.sender.lock().is_none())
            .finish()
    }
}

/// The dedicated bridge worker: sole executor of async-reached storage
/// operations. Exits when the request channel closes.
fn bridge_worker(mut rx: mpsc::Receiver<StorageRequest>, sync: &SyncStorage) {
    while let Some(request) = rx.blocking_recv() {
        let result = sync.execute(request.op);
        if request.reply.send(result).is_err() {
            debug!("async storage caller dropped its result handle");
        }
    }
}

/// Periodic flush tick for the bulk buffers. Exits when the stop channel
/// disconnects or receives.
fn flush_ticker(
    stop: &std::sync::mpsc::Receiver<()>,
    bulk: &BulkBufferManager,
    interval: std::time::Duration,
) {
    loop {
        match stop.recv_timeout(interval) {
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                bulk.flush_aged();
            }
            Ok(()) | Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn doc(json: serde_json::Value) -> Document {
        match json {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn filter(json: serde_json::Value) -> Filter {
        doc(json)
    }

    fn bridge() -> StorageBridge {
        StorageBridge::new(Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_read_your_write() {
        let bridge = bridge();
        let by_name = filter(serde_json::json!({"name": "a"}));

        // Prime the cache with an empty result.
        assert!(bridge.get("configs", &by_name, None).unwrap().is_empty());

        bridge
            .insert("configs", doc(serde_json::json!({"name": "a", "v": 1})), false, None)
            .unwrap();

        let found = bridge.get("configs", &by_name, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("v"), Some(&serde_json::json!(1)));

        bridge
            .update(
                "configs",
                &by_name,
                doc(serde_json::json!({"v": 2})),
                false,
                None,
            )
            .unwrap();
        let found = bridge.get("configs", &by_name, None).unwrap();
        assert_eq!(found[0].get("v"), Some(&serde_json::json!(2)));

        bridge.delete("configs", &by_name, None).unwrap();
        assert!(bridge.get("configs", &by_name, None).unwrap().is_empty());
    }

    #[test]
    fn test_get_copies_are_independent() {
        let bridge = bridge();
        bridge
            .insert("configs", doc(serde_json::json!({"name": "a", "v": 1})), false, None)
            .unwrap();

        let by_name = filter(serde_json::json!({"name": "a"}));
        let mut first = bridge.get("configs", &by_name, None).unwrap();
        first[0].insert("v".to_string(), serde_json::json!(99));

        let second = bridge.get("configs", &by_name, None).unwrap();
        assert_eq!(second[0].get("v"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_upsert_replaces_by_identity() {
        let bridge = bridge();
        bridge
            .insert(
                "configs",
                doc(serde_json::json!({"_id": "k1", "v": 1})),
                true,
                None,
            )
            .unwrap();
        bridge
            .insert(
                "configs",
                doc(serde_json::json!({"_id": "k1", "v": 2})),
                true,
                None,
            )
            .unwrap();

        let found = bridge.get("configs", &Filter::new(), None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("v"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_bulk_insert_invalidates_collection() {
        let bridge = bridge();

        // Prime a cached read of the whole collection.
        assert!(bridge.get("ticks", &Filter::new(), None).unwrap().is_empty());

        let docs = vec![
            doc(serde_json::json!({"n": 1})),
            doc(serde_json::json!({"n": 2})),
        ];
        bridge.bulk_insert("ticks", &docs, None).unwrap();

        assert_eq!(bridge.get("ticks", &Filter::new(), None).unwrap().len(), 2);
    }

    #[test]
    fn test_buffered_insert_flushes_at_max_size() {
        let store = Arc::new(MemoryStore::new());
        let bridge = StorageBridge::with_config(
            store,
            StorageBridgeConfig::new()
                .with_bulk(BulkBufferConfig::new().with_max_size(2).with_flush_interval(
                    Duration::from_secs(3600),
                )),
        )
        .unwrap();

        bridge
            .buffered_insert("ticks", doc(serde_json::json!({"n": 1})), None)
            .unwrap();
        assert_eq!(bridge.pending_bulk("ticks", None), 1);

        bridge
            .buffered_insert("ticks", doc(serde_json::json!({"n": 2})), None)
            .unwrap();
        assert_eq!(bridge.pending_bulk("ticks", None), 0);
        assert_eq!(bridge.get("ticks", &Filter::new(), None).unwrap().len(), 2);
    }

    #[test]
    fn test_tick_flushes_aged_buffer() {
        let store = Arc::new(MemoryStore::new());
        let bridge = StorageBridge::with_config(
            store,
            StorageBridgeConfig::new().with_bulk(
                BulkBufferConfig::new()
                    .with_max_size(100)
                    .with_flush_interval(Duration::from_millis(20)),
            ),
        )
        .unwrap();

        bridge
            .buffered_insert("ticks", doc(serde_json::json!({"n": 1})), None)
            .unwrap();

        // Wait out at least one tick past the buffer's age threshold.
        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(bridge.pending_bulk("ticks", None), 0);
        assert_eq!(bridge.get("ticks", &Filter::new(), None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_async_mirrors() {
        let bridge = bridge();

        bridge
            .async_insert("configs", doc(serde_json::json!({"name": "a", "v": 1})), false, None)
            .await
            .unwrap();

        let found = bridge
            .async_get("configs", filter(serde_json::json!({"name": "a"})), None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let modified = bridge
            .async_update(
                "configs",
                filter(serde_json::json!({"name": "a"})),
                doc(serde_json::json!({"v": 2})),
                false,
                None,
            )
            .await
            .unwrap();
        assert_eq!(modified, 1);

        let removed = bridge
            .async_delete("configs", filter(serde_json::json!({"name": "a"})), None)
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_async_api_drivable_from_blocking_context() {
        let bridge = bridge();
        let found = tokio_test::block_on(async {
            bridge
                .async_insert("configs", doc(serde_json::json!({"name": "a"})), false, None)
                .await
                .unwrap();
            bridge
                .async_get("configs", filter(serde_json::json!({"name": "a"})), None)
                .await
                .unwrap()
        });
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_async_sees_sync_writes() {
        let bridge = bridge();
        bridge
            .insert("configs", doc(serde_json::json!({"name": "a"})), false, None)
            .unwrap();

        let found = bridge
            .async_get("configs", filter(serde_json::json!({"name": "a"})), None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_async_bulk_insert() {
        let bridge = bridge();
        let ids = bridge
            .async_bulk_insert(
                "ticks",
                vec![
                    doc(serde_json::json!({"n": 1})),
                    doc(serde_json::json!({"n": 2})),
                ],
                None,
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn test_close_rejects_async_callers() {
        let bridge = bridge();
        bridge.close();

        let result = bridge.async_get("configs", Filter::new(), None).await;
        assert!(matches!(result, Err(StorageError::BridgeClosed)));

        // close is idempotent
        bridge.close();
    }

    #[test]
    fn test_close_flushes_pending_buffers() {
        let store = Arc::new(MemoryStore::new());
        let bridge = StorageBridge::with_config(
            store.clone(),
            StorageBridgeConfig::new().with_bulk(
                BulkBufferConfig::new()
                    .with_max_size(100)
                    .with_flush_interval(Duration::from_secs(3600)),
            ),
        )
        .unwrap();

        bridge
            .buffered_insert("ticks", doc(serde_json::json!({"n": 1})), None)
            .unwrap();
        bridge.close();

        use crate::storage::store::DocumentStore as _;
        let stored = store.find("ticks", &Filter::new(), None).unwrap();
        assert_eq!(stored.len(), 1);
    }
}
