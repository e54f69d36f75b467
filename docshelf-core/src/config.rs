//! Per-collection configuration.
//!
//! ```ignore
//! use docshelf_core::config::CollectionConfig;
//! use docshelf_file::JsonFileStore;
//!
//! let config = CollectionConfig::builder()
//!     .persistence(JsonFileStore::builder("./data"))
//!     .build();
//! ```

use std::sync::Arc;

use crate::{
    backend::PersistenceBuilder,
    identity::{IdentityAssigner, UuidAssigner},
};

/// How a collection is created: where (if anywhere) it is persisted, and how
/// identities are generated.
///
/// The default configuration is an in-memory collection with UUID identities.
#[derive(Debug, Default)]
pub struct CollectionConfig {
    persistence: Option<Box<dyn PersistenceBuilder>>,
    identity_assigner: Option<Arc<dyn IdentityAssigner>>,
}

impl CollectionConfig {
    pub fn builder() -> CollectionConfigBuilder {
        CollectionConfigBuilder::default()
    }

    /// Splits the configuration into the persistence builder and the identity assigner to use.
    pub fn into_parts(self) -> (Option<Box<dyn PersistenceBuilder>>, Arc<dyn IdentityAssigner>) {
        (
            self.persistence,
            self.identity_assigner
                .unwrap_or_else(|| Arc::new(UuidAssigner)),
        )
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }
}

/// Builder for [`CollectionConfig`].
#[derive(Debug, Default)]
pub struct CollectionConfigBuilder {
    persistence: Option<Box<dyn PersistenceBuilder>>,
    identity_assigner: Option<Arc<dyn IdentityAssigner>>,
}

impl CollectionConfigBuilder {
    /// Mirrors the collection to the backend produced by `builder`.
    pub fn persistence(mut self, builder: impl PersistenceBuilder + 'static) -> Self {
        self.persistence = Some(Box::new(builder));
        self
    }

    /// Replaces the default UUID identity generator.
    pub fn identity_assigner(mut self, assigner: impl IdentityAssigner + 'static) -> Self {
        self.identity_assigner = Some(Arc::new(assigner));
        self
    }

    pub fn build(self) -> CollectionConfig {
        CollectionConfig {
            persistence: self.persistence,
            identity_assigner: self.identity_assigner,
        }
    }
}
