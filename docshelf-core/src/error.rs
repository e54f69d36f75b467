//! Error types and result types for collection operations.
//!
//! Only configuration and lookup problems, plus persistence failures reported
//! while a collection hydrates, ever reach the caller as errors. Malformed
//! predicates and payloads are answered with sentinel values by the CRUD
//! operations instead.

use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a collection.
///
/// The enum is `Clone` so a single hydration outcome can be handed to every
/// caller awaiting a collection's readiness.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    /// The collection was configured incorrectly, e.g. created without a name.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// No collection is registered under the given name.
    #[error("No collection with name {0} found")]
    CollectionNotFound(String),
    /// The document cannot be stored, e.g. its identity is an array or object.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Serialization/deserialization error when converting documents to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Reading, writing or inspecting the persisted file failed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// A specialized `Result` type for collection operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<IoError> for DocumentStoreError {
    fn from(err: IoError) -> Self {
        DocumentStoreError::Persistence(err.to_string())
    }
}
