//! The in-memory collection engine for docshelf.
//!
//! This crate holds every document of a collection in memory and implements
//! the collection operations on top of it:
//!
//! - **Engine** ([`store`]) - Synchronous CRUD over an insertion-ordered document map
//! - **Matching** ([`evaluator`]) - Strict-equality predicate evaluation
//! - **Handles** ([`collection`]) - Cloneable async handles with optional persistence
//! - **Registry** ([`registry`]) - The table of named collections
//!
//! Persistent collections hydrate from their backend on a background task and
//! flush a full snapshot after every successful mutation. Both run on the
//! ambient tokio runtime, so collections must be created from within one.
//!
//! # Quick Start
//!
//! ```ignore
//! use docshelf_core::config::CollectionConfig;
//! use docshelf_memory::CollectionRegistry;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = CollectionRegistry::new();
//!     let users = registry
//!         .create_or_replace("users", CollectionConfig::default())
//!         .await
//!         .unwrap();
//!
//!     users.insert(json!({ "name": "Alice" })).await;
//!     println!("{:?}", users.find(json!({ "name": "Alice" })).await);
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docshelf_memory;

pub mod collection;
pub mod evaluator;
mod flush;
pub mod registry;
pub mod store;

pub use collection::Collection;
pub use registry::CollectionRegistry;
pub use store::MemoryStore;
