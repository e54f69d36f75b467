//! JSON file persistence for docshelf collections.
//!
//! Each persistent collection is mirrored to one file holding a JSON array of
//! its documents. The file is read once, when the collection is created, and
//! overwritten with a full snapshot after every successful mutation.
//!
//! A file that does not exist yet is created (along with any missing
//! directories) containing `{}`, which reads back as an empty collection.
//!
//! # Example
//!
//! ```ignore
//! use docshelf::prelude::*;
//! use docshelf::file::JsonFileStore;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let registry = CollectionRegistry::new();
//!     let users = registry
//!         .create_or_replace(
//!             "users",
//!             CollectionConfig::builder()
//!                 .persistence(JsonFileStore::builder("./data"))
//!                 .build(),
//!         )
//!         .await?;
//!
//!     // Wait for ./data/users.json to be read before relying on its contents.
//!     users.ready().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docshelf_file;

pub mod store;

pub use store::{JsonFileStore, JsonFileStoreBuilder};
