//! Shared handles to named collections.
//!
//! A [`Collection`] is a cheap, cloneable handle; every clone refers to the
//! same documents. Each operation takes the collection's lock, runs the
//! corresponding [`MemoryStore`] operation to completion, and, for a
//! persistent collection, enqueues a snapshot for the flush writer after any
//! successful mutation. The writes themselves are never awaited by the
//! mutating call; use [`Collection::sync`] to wait for them.
//!
//! Operations that touch documents first wait for the collection's hydration
//! to settle, so nothing can be read or written before the persisted snapshot
//! has been loaded.
//!
//! # Example
//!
//! ```ignore
//! use docshelf::prelude::*;
//! use serde_json::json;
//!
//! let registry = CollectionRegistry::new();
//! let users = registry.create_or_replace("users", CollectionConfig::default()).await?;
//!
//! users.insert(json!([
//!     { "_id": 0, "first_name": "John", "last_name": "Doe" },
//!     { "_id": 1, "first_name": "Jane", "last_name": "Doe" }
//! ])).await;
//!
//! let john = users.find_one(json!({ "last_name": "Doe" })).await;
//! users.update(json!({ "last_name": "Doe" }), json!({ "last_name": "Smith" }), UpdateOptions::default()).await;
//! ```

use mea::rwlock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;
use std::{
    fmt,
    sync::{Arc, Weak},
};
use tracing::debug;

use docshelf_core::{
    backend::{CollectionStats, PersistenceBackend},
    config::CollectionConfig,
    document::{Document, DocumentId},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{FindResult, Selector, UpdateOptions, WriteResult},
};

use crate::{
    flush::{FlushWriter, Readiness, ready_now, spawn_hydration},
    registry::RegistryMap,
    store::MemoryStore,
};

/// A handle to one named collection.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

struct CollectionInner {
    name: RwLock<String>,
    store: Arc<RwLock<MemoryStore>>,
    backend: Option<Arc<dyn PersistenceBackend>>,
    writer: Option<FlushWriter>,
    ready: Readiness,
    registry: Weak<RegistryMap>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("backend", &self.inner.backend)
            .finish_non_exhaustive()
    }
}

impl Collection {
    /// Creates an empty collection and, if it is persistent, starts hydrating it.
    pub(crate) fn new(
        name: String,
        config: CollectionConfig,
        registry: Weak<RegistryMap>,
    ) -> DocumentStoreResult<Self> {
        let (persistence, assigner) = config.into_parts();
        let store = Arc::new(RwLock::new(MemoryStore::new(assigner)));
        let backend = persistence
            .map(|builder| builder.build(&name))
            .transpose()?;

        let (ready, writer) = match &backend {
            Some(backend) => {
                let ready = spawn_hydration(name.clone(), store.clone(), backend.clone());
                let writer = FlushWriter::spawn(name.clone(), backend.clone(), ready.clone());
                (ready, Some(writer))
            }
            None => (ready_now(), None),
        };

        Ok(Self {
            inner: Arc::new(CollectionInner {
                name: RwLock::new(name),
                store,
                backend,
                writer,
                ready,
                registry,
            }),
        })
    }

    /// Returns true if both handles refer to the same collection.
    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the name this collection is currently registered under.
    pub async fn name(&self) -> String {
        self.inner.name.read().await.clone()
    }

    /// Returns true if the collection mirrors its documents to a backend.
    pub fn is_persistent(&self) -> bool {
        self.inner.backend.is_some()
    }

    /// Waits for this collection's hydration to finish. Resolves immediately
    /// for in-memory collections.
    ///
    /// # Errors
    ///
    /// Returns the error that made loading the persisted snapshot fail. Every
    /// caller observes the same outcome.
    pub async fn ready(&self) -> DocumentStoreResult<()> {
        self.inner.ready.clone().await
    }

    /// Waits until every mutation made so far has been flushed (or its flush
    /// has failed and been discarded).
    pub async fn sync(&self) {
        if let Some(writer) = &self.inner.writer {
            writer.wait().await;
        }
    }

    /// Locks the documents for reading once hydration has settled.
    ///
    /// A failed hydration still releases the lock; the collection then works
    /// in memory only.
    async fn read_store(&self) -> RwLockReadGuard<'_, MemoryStore> {
        let _ = self.inner.ready.clone().await;
        self.inner.store.read().await
    }

    /// Locks the documents for writing once hydration has settled, so no
    /// mutation can be snapshotted before the persisted documents are loaded.
    async fn write_store(&self) -> RwLockWriteGuard<'_, MemoryStore> {
        let _ = self.inner.ready.clone().await;
        self.inner.store.write().await
    }

    fn schedule_flush(&self, store: &MemoryStore) {
        if let Some(writer) = &self.inner.writer {
            writer.schedule(store.snapshot());
        }
    }

    /// Inserts a document, or every document of an array.
    ///
    /// Returns `None` without storing anything if the payload has the wrong shape.
    pub async fn insert(&self, payload: impl Into<Value>) -> Option<WriteResult> {
        let mut store = self.write_store().await;
        let written = store.insert(payload.into())?;
        self.schedule_flush(&store);

        Some(written)
    }

    /// Inserts a single object; arrays and scalars are rejected with `None`.
    pub async fn insert_one(&self, payload: impl Into<Value>) -> Option<Document> {
        let mut store = self.write_store().await;
        let written = store.insert_one(payload.into())?;
        self.schedule_flush(&store);

        Some(written)
    }

    /// Inserts an array of objects; anything else is rejected with `None`.
    pub async fn insert_many(&self, payload: impl Into<Value>) -> Option<Vec<Document>> {
        let mut store = self.write_store().await;
        let written = store.insert_many(payload.into())?;
        self.schedule_flush(&store);

        Some(written)
    }

    /// Returns true if a document is stored under `id`.
    pub async fn has(&self, id: &DocumentId) -> bool {
        self.read_store().await.has(id)
    }

    /// Returns a copy of the document stored under `id`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let stored = users.insert_one(json!({ "name": "Alice" })).await.unwrap();
    /// let id = stored.id().unwrap();
    /// assert_eq!(users.get(&id).await, Some(stored));
    /// ```
    pub async fn get(&self, id: &DocumentId) -> Option<Document> {
        self.read_store().await.get(id).cloned()
    }

    /// Identities in natural order.
    pub async fn ids(&self) -> Vec<DocumentId> {
        self.read_store().await.ids().cloned().collect()
    }

    /// See [`MemoryStore::find`].
    pub async fn find(&self, selector: impl Into<Selector>) -> FindResult {
        self.read_store().await.find(&selector.into())
    }

    /// Returns the first match in natural order, or `None` if nothing matched
    /// or the predicate is not an object.
    pub async fn find_one(&self, selector: impl Into<Selector>) -> Option<Document> {
        self.read_store().await.find_one(&selector.into())
    }

    /// Removes and returns the first document matching a predicate.
    pub async fn find_one_and_delete(&self, selector: impl Into<Selector>) -> Option<Document> {
        let mut store = self.write_store().await;
        let removed = store.find_one_and_delete(&selector.into())?;
        self.schedule_flush(&store);

        Some(removed)
    }

    /// Shallow-merges `patch` into every match. See [`MemoryStore::update`].
    pub async fn update(
        &self,
        selector: impl Into<Selector>,
        patch: impl Into<Value>,
        options: UpdateOptions,
    ) -> Option<WriteResult> {
        let mut store = self.write_store().await;
        let written = store.update(&selector.into(), patch.into(), options)?;
        self.schedule_flush(&store);

        Some(written)
    }

    /// Same as [`update`](Self::update).
    pub async fn update_many(
        &self,
        selector: impl Into<Selector>,
        patch: impl Into<Value>,
        options: UpdateOptions,
    ) -> Option<WriteResult> {
        self.update(selector, patch, options).await
    }

    /// Shallow-merges `patch` into the first match only.
    pub async fn update_one(
        &self,
        selector: impl Into<Selector>,
        patch: impl Into<Value>,
        options: UpdateOptions,
    ) -> Option<Document> {
        let mut store = self.write_store().await;
        let written = store.update_one(&selector.into(), patch.into(), options)?;
        self.schedule_flush(&store);

        Some(written)
    }

    /// Number of stored documents.
    pub async fn count(&self) -> usize {
        self.read_store().await.count()
    }

    /// Removes every document. The collection stays registered.
    pub async fn drop_documents(&self) {
        let mut store = self.write_store().await;
        store.clear();
        self.schedule_flush(&store);
    }

    /// File metadata for a persistent collection, otherwise an estimate of
    /// the serialized size of the documents.
    pub async fn stats(&self) -> DocumentStoreResult<CollectionStats> {
        match &self.inner.backend {
            Some(backend) => backend.stats().await,
            None => Ok(CollectionStats::InMemory {
                size: self.read_store().await.estimated_size()?,
            }),
        }
    }

    /// Re-registers this collection under `name`.
    ///
    /// The old name is released only if it still refers to this collection; a
    /// collection already registered under `name` is replaced. The persisted
    /// file keeps its original location.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] if `name` is empty.
    pub async fn rename_collection(&self, name: impl Into<String>) -> DocumentStoreResult<Collection> {
        let name = name.into();
        if name.is_empty() {
            return Err(DocumentStoreError::Configuration("Name is required".into()));
        }

        let registry = self.inner.registry.upgrade();
        let mut registered = match registry.as_deref() {
            Some(registry) => Some(registry.write().await),
            None => None,
        };
        let mut current = self.inner.name.write().await;

        if let Some(registered) = registered.as_mut() {
            if registered
                .get(current.as_str())
                .is_some_and(|collection| collection.ptr_eq(self))
            {
                registered.remove(current.as_str());
            }

            if let Some(replaced) = registered.insert(name.clone(), self.clone()) {
                if !replaced.ptr_eq(self) {
                    debug!(collection = %name, "rename replaced a registered collection");
                }
            }
        }

        debug!(from = %current, to = %name, "renamed collection");
        *current = name;

        Ok(self.clone())
    }

    /// Deletes the first document matching a predicate.
    pub async fn delete_one(&self, selector: impl Into<Selector>) -> bool {
        let mut store = self.write_store().await;
        let deleted = store.delete_one(&selector.into());
        if deleted {
            self.schedule_flush(&store);
        }

        deleted
    }

    /// Deletes every document matching a predicate; true iff anything was deleted.
    pub async fn delete_many(&self, selector: impl Into<Selector>) -> bool {
        let mut store = self.write_store().await;
        let deleted = store.delete_many(&selector.into());
        if deleted {
            self.schedule_flush(&store);
        }

        deleted
    }

    /// Same as [`delete_many`](Self::delete_many).
    pub async fn delete(&self, selector: impl Into<Selector>) -> bool {
        self.delete_many(selector).await
    }

    /// Deletes the document stored under `id`; true if there was one.
    pub async fn delete_one_by_id(&self, id: &DocumentId) -> bool {
        let mut store = self.write_store().await;
        let deleted = store.delete_one_by_id(id);
        if deleted {
            self.schedule_flush(&store);
        }

        deleted
    }
}
