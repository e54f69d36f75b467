//! Persistence abstraction for file-backed collections.
//!
//! A collection keeps all of its documents in memory. When it is configured
//! with a persistence backend it additionally:
//!
//! - hydrates itself from [`PersistenceBackend::load`] once, on creation, and
//! - hands a full snapshot of its documents to [`PersistenceBackend::flush`]
//!   after every successful mutation, from a single background writer.
//!
//! Backends are created per collection through a [`PersistenceBuilder`], which
//! receives the collection name so it can derive default locations from it.
//!
//! ```ignore
//! use docshelf_core::backend::{PersistenceBackend, CollectionStats};
//!
//! let documents = backend.load().await?;
//! backend.flush(&documents).await?;
//! let CollectionStats::OnDisk(metadata) = backend.stats().await? else { unreachable!() };
//! ```

use async_trait::async_trait;
use std::{fmt::Debug, fs::Metadata, sync::Arc};

use crate::{document::Document, error::DocumentStoreResult};

/// Storage a collection is mirrored to.
///
/// Implementations must be safe to share between the hydration task, the
/// flush writer and callers asking for statistics.
#[async_trait]
pub trait PersistenceBackend: Send + Sync + Debug {
    /// Reads the initial snapshot, creating empty storage if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the
    /// storage cannot be read, created or parsed. The error is reported to every
    /// caller awaiting the collection's readiness.
    async fn load(&self) -> DocumentStoreResult<Vec<Document>>;

    /// Overwrites the stored snapshot with `documents`.
    ///
    /// Failures are logged and discarded by the collection's writer.
    async fn flush(&self, documents: &[Document]) -> DocumentStoreResult<()>;

    /// Returns statistics about the stored snapshot.
    async fn stats(&self) -> DocumentStoreResult<CollectionStats>;
}

/// Factory for the [`PersistenceBackend`] of a single collection.
pub trait PersistenceBuilder: Send + Sync + Debug {
    /// Builds the backend for the collection called `collection`.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError::Configuration`](crate::error::DocumentStoreError::Configuration)
    /// if the builder's settings cannot produce a backend.
    fn build(self: Box<Self>, collection: &str) -> DocumentStoreResult<Arc<dyn PersistenceBackend>>;
}

/// Statistics reported by a collection.
#[derive(Debug, Clone)]
pub enum CollectionStats {
    /// Estimated size of an in-memory collection: the UTF-8 byte length of
    /// its documents serialized as one JSON array.
    InMemory { size: u64 },
    /// Metadata of the file backing a persistent collection.
    OnDisk(Metadata),
}

impl CollectionStats {
    /// Size in bytes, whichever way it was obtained.
    pub fn size(&self) -> u64 {
        match self {
            CollectionStats::InMemory { size } => *size,
            CollectionStats::OnDisk(metadata) => metadata.len(),
        }
    }
}
