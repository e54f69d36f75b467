//! Identity assignment for documents entering a collection.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::fmt::Debug;
use uuid::Uuid;

use crate::{
    document::{CREATED_AT_FIELD, Document, DocumentId, ID_FIELD},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Produces or validates the identity of a document on insert.
///
/// Implementors only decide how fresh identities look; [`assign`](Self::assign)
/// keeps any identity the caller supplied and always re-stamps
/// [`CREATED_AT_FIELD`].
pub trait IdentityAssigner: Send + Sync + Debug {
    /// Generates a fresh identity value for a document that has none.
    fn generate(&self) -> Value;

    /// Returns the document's key along with the document carrying its identity
    /// and a creation timestamp of "now".
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if the supplied identity
    /// is an array or object, or if [`generate`](Self::generate) produced one.
    fn assign(&self, mut document: Document) -> DocumentStoreResult<(DocumentId, Document)> {
        let value = match document.id_value() {
            Some(value) if !value.is_null() => value.clone(),
            _ => self.generate(),
        };

        let id = DocumentId::from_value(&value).ok_or_else(|| {
            DocumentStoreError::InvalidDocument(format!("{value} cannot be used as {ID_FIELD}"))
        })?;

        document.insert(ID_FIELD, value);
        document.insert(CREATED_AT_FIELD, now());

        Ok((id, document))
    }
}

/// The default assigner: random v4 UUIDs rendered as 32 hex characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidAssigner;

impl IdentityAssigner for UuidAssigner {
    fn generate(&self) -> Value {
        Value::String(Uuid::new_v4().simple().to_string())
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}
