//! Convenient re-exports of commonly used types from docshelf.
//!
//! ```ignore
//! use docshelf::prelude::*;
//! ```
//!
//! This provides access to:
//! - The registry and collection handles
//! - Documents, identities and identity assigners
//! - Selectors, update options and results
//! - Persistence traits, configuration and error types

pub use docshelf_core::{
    backend::{CollectionStats, PersistenceBackend, PersistenceBuilder},
    config::{CollectionConfig, CollectionConfigBuilder},
    document::{Document, DocumentId},
    error::{DocumentStoreError, DocumentStoreResult},
    identity::{IdentityAssigner, UuidAssigner},
    query::{FindResult, Selector, UpdateOptions, WriteResult},
};
pub use docshelf_memory::{Collection, CollectionRegistry};
