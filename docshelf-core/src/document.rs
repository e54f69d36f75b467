//! Loosely-typed documents and the identities that key them.
//!
//! A [`Document`] is an insertion-ordered map of field names to JSON values.
//! Once stored in a collection it always carries an [`ID_FIELD`] and a
//! [`CREATED_AT_FIELD`]; both are written by the collection's
//! [`IdentityAssigner`](crate::identity::IdentityAssigner), never trusted from
//! the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Name of the field holding a document's identity.
pub const ID_FIELD: &str = "_id";

/// Name of the field holding a document's creation timestamp.
pub const CREATED_AT_FIELD: &str = "created_at";

/// A single stored record: an ordered mapping from field name to JSON value.
///
/// # Example
///
/// ```ignore
/// use docshelf_core::document::Document;
/// use serde_json::json;
///
/// let doc = Document::try_from(json!({ "_id": 1, "name": "Alice" }))?;
/// assert_eq!(doc.get("name"), Some(&json!("Alice")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Returns the raw identity value, if the field is present.
    pub fn id_value(&self) -> Option<&Value> {
        self.0.get(ID_FIELD)
    }

    /// Returns the identity of this document if it carries a usable one.
    pub fn id(&self) -> Option<DocumentId> {
        self.id_value().and_then(DocumentId::from_value)
    }

    /// Returns the creation timestamp written when the document was last stored.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.0
            .get(CREATED_AT_FIELD)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|stamp| stamp.with_timezone(&Utc))
    }

    /// Returns the value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns true if the document has `field`, even if its value is `null`.
    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Sets a field, returning the previous value. An existing field keeps its position.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Removes a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.shift_remove(field)
    }

    /// Shallow-merges `patch` into this document. Patch fields win; new fields
    /// are appended after the existing ones.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (field, value) in patch {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Borrows the underlying field map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the document, returning its field map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = DocumentStoreError;

    fn try_from(value: Value) -> DocumentStoreResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "expected an object, found {other}"
            ))),
        }
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        Value::Object(document.0)
    }
}

/// The key under which a document is stored.
///
/// Identities are derived from the JSON value of the [`ID_FIELD`]. Numbers are
/// normalised so that `1` and `1.0` name the same document, while `1` and `"1"`
/// stay distinct. `null`, arrays and objects are not identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    Bool(bool),
    Int(i64),
    UInt(u64),
    /// Non-integral number, stored as its bit pattern.
    Float(u64),
    String(String),
}

impl DocumentId {
    /// Derives an identity from a JSON value, or `None` if the value cannot key a document.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(DocumentId::Bool(*flag)),
            Value::Number(number) => Some(Self::from_number(number)),
            Value::String(text) => Some(DocumentId::String(text.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn from_number(number: &Number) -> Self {
        if let Some(int) = number.as_i64() {
            return DocumentId::Int(int);
        }
        if let Some(uint) = number.as_u64() {
            return DocumentId::UInt(uint);
        }

        let float = number.as_f64().unwrap_or_default();

        if float.fract() == 0.0 && float >= i64::MIN as f64 && float < i64::MAX as f64 {
            DocumentId::Int(float as i64)
        } else if float.fract() == 0.0 && float >= 0.0 && float < u64::MAX as f64 {
            DocumentId::UInt(float as u64)
        } else {
            DocumentId::Float(float.to_bits())
        }
    }

    /// Converts the identity back into the JSON value stored in the document.
    pub fn to_value(&self) -> Value {
        match self {
            DocumentId::Bool(flag) => Value::Bool(*flag),
            DocumentId::Int(int) => Value::from(*int),
            DocumentId::UInt(uint) => Value::from(*uint),
            DocumentId::Float(bits) => Number::from_f64(f64::from_bits(*bits))
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DocumentId::String(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::String(text) => f.write_str(text),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        DocumentId::String(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        DocumentId::String(value)
    }
}

impl From<i64> for DocumentId {
    fn from(value: i64) -> Self {
        DocumentId::Int(value)
    }
}

impl From<i32> for DocumentId {
    fn from(value: i32) -> Self {
        DocumentId::Int(value as i64)
    }
}

impl From<bool> for DocumentId {
    fn from(value: bool) -> Self {
        DocumentId::Bool(value)
    }
}
