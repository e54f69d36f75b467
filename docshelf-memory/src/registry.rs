//! The process-local table of named collections.
//!
//! Creating a collection under a name that is already taken replaces the
//! registered entry. Handles to the replaced collection keep working, but the
//! registry no longer hands them out.

use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use docshelf_core::{
    config::CollectionConfig,
    error::{DocumentStoreError, DocumentStoreResult},
};

use crate::collection::Collection;

pub(crate) type RegistryMap = RwLock<HashMap<String, Collection>>;

/// Name to collection table shared by every clone.
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    collections: Arc<RegistryMap>,
}

impl CollectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection and registers it under `name`, replacing any
    /// collection registered there before.
    ///
    /// A persistent collection starts hydrating immediately. Its operations
    /// wait for hydration to settle; [`Collection::ready`] reports whether it
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] if `name` is empty or the
    /// persistence settings cannot produce a backend.
    pub async fn create_or_replace(
        &self,
        name: impl Into<String>,
        config: CollectionConfig,
    ) -> DocumentStoreResult<Collection> {
        let name = name.into();
        if name.is_empty() {
            return Err(DocumentStoreError::Configuration("Name is required".into()));
        }

        let persistent = config.is_persistent();
        let collection = Collection::new(name.clone(), config, Arc::downgrade(&self.collections))?;

        let replaced = self
            .collections
            .write()
            .await
            .insert(name.clone(), collection.clone());

        debug!(
            collection = %name,
            persistent,
            replaced = replaced.is_some(),
            "registered collection"
        );

        Ok(collection)
    }

    /// Returns the collection registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::CollectionNotFound`] if nothing is registered there.
    pub async fn open(&self, name: &str) -> DocumentStoreResult<Collection> {
        self.collections
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| DocumentStoreError::CollectionNotFound(name.to_string()))
    }

    /// Returns true if a collection is registered under `name`.
    pub async fn contains(&self, name: &str) -> bool {
        self.collections.read().await.contains_key(name)
    }

    /// Registered names, sorted.
    pub async fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Unregisters `name`, returning the collection that was registered there.
    ///
    /// The collection's documents and persisted file are left untouched.
    pub async fn remove(&self, name: &str) -> Option<Collection> {
        let removed = self.collections.write().await.remove(name);
        if removed.is_some() {
            debug!(collection = %name, "unregistered collection");
        }

        removed
    }
}
