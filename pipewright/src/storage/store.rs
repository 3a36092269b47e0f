//! Abstract document store contract and the in-memory implementation.
//!
//! The concrete wire protocol of the backing store is out of scope; the
//! bridge only requires CRUD with query-by-filter semantics. Filters are
//! equality-subset matches: a document matches when every filter field
//! is present with an equal value.

use crate::errors::StoreError;
use crate::utils::generate_uuid;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A stored document: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A query filter: equality-subset match against documents.
pub type Filter = serde_json::Map<String, serde_json::Value>;

/// The identity field carried by stored documents.
pub const ID_FIELD: &str = "_id";

/// The database used when a caller does not name one.
pub const DEFAULT_DATABASE: &str = "pipewright";

/// Returns true if `doc` matches `filter` (every filter field equal).
#[must_use]
pub fn matches(doc: &Document, filter: &Filter) -> bool {
    filter.iter().all(|(k, v)| doc.get(k) == Some(v))
}

/// The CRUD contract the storage bridge runs against.
///
/// Implementations must be thread-safe; the bridge serializes its own
/// cache-coherent path but the bulk-buffer path calls the store
/// concurrently.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentStore: Send + Sync {
    /// Finds all documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the query cannot be evaluated.
    fn find<'a>(
        &self,
        collection: &str,
        filter: &Filter,
        database: Option<&'a str>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Inserts a document, returning its identity value.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the document is rejected.
    fn insert<'a>(
        &self,
        collection: &str,
        document: Document,
        database: Option<&'a str>,
    ) -> Result<serde_json::Value, StoreError>;

    /// Replaces the first document matching `filter` with `document`.
    ///
    /// With `upsert`, inserts the document when nothing matches.
    /// Returns the number of documents affected.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the write fails.
    fn replace<'a>(
        &self,
        collection: &str,
        filter: &Filter,
        document: Document,
        upsert: bool,
        database: Option<&'a str>,
    ) -> Result<u64, StoreError>;

    /// Merges `changes` into every document matching `filter`.
    ///
    /// Returns the number of documents modified.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the write fails.
    fn update<'a>(
        &self,
        collection: &str,
        filter: &Filter,
        changes: &Document,
        database: Option<&'a str>,
    ) -> Result<u64, StoreError>;

    /// Deletes every document matching `filter`.
    ///
    /// Returns the number of documents removed.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the write fails.
    fn delete<'a>(
        &self,
        collection: &str,
        filter: &Filter,
        database: Option<&'a str>,
    ) -> Result<u64, StoreError>;

    /// Inserts a batch of documents in one write.
    ///
    /// Returns the identity values of the inserted documents.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the batch is rejected; the batch is
    /// all-or-nothing.
    fn insert_many<'a>(
        &self,
        collection: &str,
        documents: &[Document],
        database: Option<&'a str>,
    ) -> Result<Vec<serde_json::Value>, StoreError>;
}

/// An in-process document store.
///
/// Backs tests and single-process deployments; collections are keyed by
/// `(database, collection)`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<(String, String), Vec<Document>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(collection: &str, database: Option<&str>) -> (String, String) {
        (
            database.unwrap_or(DEFAULT_DATABASE).to_string(),
            collection.to_string(),
        )
    }

    fn ensure_id(document: &mut Document) -> serde_json::Value {
        if let Some(id) = document.get(ID_FIELD) {
            return id.clone();
        }
        let id = serde_json::Value::String(generate_uuid().to_string());
        document.insert(ID_FIELD.to_string(), id.clone());
        id
    }
}

impl DocumentStore for MemoryStore {
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        database: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read();
        let docs = collections
            .get(&Self::key(collection, database))
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches(doc, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    fn insert(
        &self,
        collection: &str,
        mut document: Document,
        database: Option<&str>,
    ) -> Result<serde_json::Value, StoreError> {
        let id = Self::ensure_id(&mut document);
        self.collections
            .write()
            .entry(Self::key(collection, database))
            .or_default()
            .push(document);
        Ok(id)
    }

    fn replace(
        &self,
        collection: &str,
        filter: &Filter,
        mut document: Document,
        upsert: bool,
        database: Option<&str>,
    ) -> Result<u64, StoreError> {
        let mut collections = self.collections.write();
        let docs = collections.entry(Self::key(collection, database)).or_default();

        if let Some(existing) = docs.iter_mut().find(|doc| matches(doc, filter)) {
            // Keep the stored identity when the replacement omits it.
            if !document.contains_key(ID_FIELD) {
                if let Some(id) = existing.get(ID_FIELD) {
                    document.insert(ID_FIELD.to_string(), id.clone());
                }
            }
            *existing = document;
            return Ok(1);
        }

        if upsert {
            Self::ensure_id(&mut document);
            docs.push(document);
            return Ok(1);
        }

        Ok(0)
    }

    fn update(
        &self,
        collection: &str,
        filter: &Filter,
        changes: &Document,
        database: Option<&str>,
    ) -> Result<u64, StoreError> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(&Self::key(collection, database)) else {
            return Ok(0);
        };

        let mut modified = 0;
        for doc in docs.iter_mut().filter(|doc| matches(doc, filter)) {
            for (k, v) in changes {
                doc.insert(k.clone(), v.clone());
            }
            modified += 1;
        }
        Ok(modified)
    }

    fn delete(
        &self,
        collection: &str,
        filter: &Filter,
        database: Option<&str>,
    ) -> Result<u64, StoreError> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(&Self::key(collection, database)) else {
            return Ok(0);
        };

        let before = docs.len();
        docs.retain(|doc| !matches(doc, filter));
        Ok((before - docs.len()) as u64)
    }

    fn insert_many(
        &self,
        collection: &str,
        documents: &[Document],
        database: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let mut collections = self.collections.write();
        let docs = collections.entry(Self::key(collection, database)).or_default();

        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            let mut document = document.clone();
            ids.push(Self::ensure_id(&mut document));
            docs.push(document);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(json: serde_json::Value) -> Document {
        match json {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_filter_matches_subset() {
        let document = doc(serde_json::json!({"a": 1, "b": "x"}));

        assert!(matches(&document, &doc(serde_json::json!({"a": 1}))));
        assert!(matches(&document, &doc(serde_json::json!({}))));
        assert!(!matches(&document, &doc(serde_json::json!({"a": 2}))));
        assert!(!matches(&document, &doc(serde_json::json!({"c": 1}))));
    }

    #[test]
    fn test_insert_assigns_id() {
        let store = MemoryStore::new();
        let id = store
            .insert("configs", doc(serde_json::json!({"k": "v"})), None)
            .unwrap();

        assert!(id.is_string());

        let found = store
            .find("configs", &Filter::new(), None)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get(ID_FIELD), Some(&id));
    }

    #[test]
    fn test_databases_are_isolated() {
        let store = MemoryStore::new();
        store
            .insert("configs", doc(serde_json::json!({"k": 1})), Some("alpha"))
            .unwrap();

        let other = store.find("configs", &Filter::new(), Some("beta")).unwrap();
        assert!(other.is_empty());

        let same = store.find("configs", &Filter::new(), Some("alpha")).unwrap();
        assert_eq!(same.len(), 1);
    }

    #[test]
    fn test_replace_keeps_identity() {
        let store = MemoryStore::new();
        let id = store
            .insert("configs", doc(serde_json::json!({"name": "a", "v": 1})), None)
            .unwrap();

        let count = store
            .replace(
                "configs",
                &doc(serde_json::json!({"name": "a"})),
                doc(serde_json::json!({"name": "a", "v": 2})),
                false,
                None,
            )
            .unwrap();
        assert_eq!(count, 1);

        let found = store
            .find("configs", &doc(serde_json::json!({"name": "a"})), None)
            .unwrap();
        assert_eq!(found[0].get("v"), Some(&serde_json::json!(2)));
        assert_eq!(found[0].get(ID_FIELD), Some(&id));
    }

    #[test]
    fn test_replace_upsert_inserts_when_missing() {
        let store = MemoryStore::new();
        let count = store
            .replace(
                "configs",
                &doc(serde_json::json!({"name": "a"})),
                doc(serde_json::json!({"name": "a", "v": 1})),
                true,
                None,
            )
            .unwrap();
        assert_eq!(count, 1);

        let found = store.find("configs", &Filter::new(), None).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_update_merges_changes() {
        let store = MemoryStore::new();
        store
            .insert("configs", doc(serde_json::json!({"name": "a", "v": 1})), None)
            .unwrap();
        store
            .insert("configs", doc(serde_json::json!({"name": "a", "v": 2})), None)
            .unwrap();

        let modified = store
            .update(
                "configs",
                &doc(serde_json::json!({"name": "a"})),
                &doc(serde_json::json!({"flag": true})),
                None,
            )
            .unwrap();
        assert_eq!(modified, 2);

        let found = store
            .find("configs", &doc(serde_json::json!({"flag": true})), None)
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_delete_removes_matches() {
        let store = MemoryStore::new();
        store
            .insert("configs", doc(serde_json::json!({"name": "a"})), None)
            .unwrap();
        store
            .insert("configs", doc(serde_json::json!({"name": "b"})), None)
            .unwrap();

        let removed = store
            .delete("configs", &doc(serde_json::json!({"name": "a"})), None)
            .unwrap();
        assert_eq!(removed, 1);

        let remaining = store.find("configs", &Filter::new(), None).unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn test_insert_many_returns_ids() {
        let store = MemoryStore::new();
        let docs = vec![
            doc(serde_json::json!({"n": 1})),
            doc(serde_json::json!({"n": 2})),
        ];

        let ids = store.insert_many("ticks", &docs, None).unwrap();
        assert_eq!(ids.len(), 2);

        let found = store.find("ticks", &Filter::new(), None).unwrap();
        assert_eq!(found.len(), 2);
    }
}
