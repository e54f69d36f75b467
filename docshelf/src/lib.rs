//! Main docshelf crate: an embeddable store of named JSON document collections.
//!
//! This crate is the entry point of the docshelf project. It re-exports the
//! core types, the in-memory collection engine and, with the `file` feature
//! (enabled by default), the JSON file persistence backend.
//!
//! # Features
//!
//! - **Named collections** - A registry of collections created, opened and renamed by name
//! - **Schemaless documents** - JSON objects keyed by an `_id` assigned on insert
//! - **Equality queries** - Find, update and delete by strict field equality
//! - **File persistence** - Optional mirroring of each collection to a JSON file
//!
//! # Quick Start
//!
//! ```ignore
//! use docshelf::prelude::*;
//! use docshelf::serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let registry = CollectionRegistry::new();
//!     let users = registry.create_or_replace("users", CollectionConfig::default()).await?;
//!
//!     users.insert(json!([
//!         { "_id": 0, "first_name": "John", "last_name": "Doe" },
//!         { "_id": 1, "first_name": "Jane", "last_name": "Doe" }
//!     ])).await;
//!
//!     // Both documents, in insertion order
//!     let does = users.find(json!({ "last_name": "Doe" })).await;
//!     println!("{:?}", does.into_documents());
//!
//!     // Only the first match is updated
//!     users
//!         .update_one(json!({ "last_name": "Doe" }), json!({ "last_name": "Smith" }), UpdateOptions::default())
//!         .await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Persistence
//!
//! A collection configured with [`file::JsonFileStore`] loads its file in the
//! background when it is created and rewrites it after every mutation. Await
//! [`Collection::ready`](prelude::Collection::ready) before reading persisted
//! data and [`Collection::sync`](prelude::Collection::sync) to wait for pending
//! writes.
//!
//! ```ignore
//! use docshelf::{prelude::*, file::JsonFileStore};
//!
//! let users = registry
//!     .create_or_replace(
//!         "users",
//!         CollectionConfig::builder()
//!             .persistence(JsonFileStore::builder("./data"))
//!             .build(),
//!     )
//!     .await?;
//! users.ready().await?;
//! ```

pub mod prelude;

pub use docshelf_core::{backend, config, document, error, identity, query};
pub use docshelf_memory::{collection, evaluator, registry, store};

// Re-export serde_json for building documents and predicates
pub use serde_json;

/// JSON file persistence.
///
/// This module is only available when the `file` feature is enabled.
#[cfg(feature = "file")]
pub mod file {
    pub use docshelf_file::{JsonFileStore, JsonFileStoreBuilder};
}
