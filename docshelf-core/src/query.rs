//! Predicate arguments, update options and operation results.
//!
//! Collections only support strict field equality, so a predicate is simply a
//! JSON object whose fields must all be equal to the document's. The argument
//! is wrapped in a [`Selector`] so the three shapes a caller can hand over stay
//! distinguishable:
//!
//! ```ignore
//! use docshelf_core::query::Selector;
//! use serde_json::json;
//!
//! let all = Selector::All;                           // no predicate
//! let does = Selector::from(json!({ "last_name": "Doe" }));
//! let bogus = Selector::from(json!("Doe"));          // Selector::Invalid
//! ```

use serde_json::{Map, Value};

use crate::document::{Document, DocumentId, ID_FIELD};

/// The predicate argument of a query, update or delete.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// No predicate was given.
    All,
    /// Field-equality predicate. An empty map matches every document.
    Fields(Map<String, Value>),
    /// Anything that is not an object. Operations answer it with their
    /// "invalid" sentinel instead of failing.
    Invalid(Value),
}

impl Selector {
    /// Returns the predicate fields, if this is a [`Selector::Fields`].
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            Selector::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns the raw identity value of the predicate, if it names one.
    ///
    /// A predicate naming an identity is resolved by direct lookup instead of
    /// a scan, even if the value can never key a document.
    pub fn id_value(&self) -> Option<&Value> {
        self.fields().and_then(|fields| fields.get(ID_FIELD))
    }
}

impl From<Value> for Selector {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Selector::Fields(fields),
            other => Selector::Invalid(other),
        }
    }
}

impl From<Option<Value>> for Selector {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Selector::All, Selector::from)
    }
}

impl From<Map<String, Value>> for Selector {
    fn from(fields: Map<String, Value>) -> Self {
        Selector::Fields(fields)
    }
}

impl From<&Document> for Selector {
    fn from(document: &Document) -> Self {
        Selector::Fields(document.as_map().clone())
    }
}

impl From<&DocumentId> for Selector {
    fn from(id: &DocumentId) -> Self {
        let mut fields = Map::new();
        fields.insert(ID_FIELD.to_string(), id.to_value());
        Selector::Fields(fields)
    }
}

/// Options for update operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert `predicate ∪ patch` as a new document when nothing matches.
    pub upsert: bool,
}

impl UpdateOptions {
    /// Creates options with the given upsert flag.
    pub fn new(upsert: bool) -> Self {
        Self { upsert }
    }

    /// Options that insert a new document when nothing matches.
    pub fn upsert() -> Self {
        Self::new(true)
    }
}

/// Result of a `find`.
#[derive(Debug, Clone, PartialEq)]
pub enum FindResult {
    /// The predicate named an identity and that document matched.
    One(Document),
    /// All matches of a scan in natural order, or every document when no
    /// predicate was given (possibly empty in that case only).
    Many(Vec<Document>),
    /// Nothing matched.
    NotFound,
    /// The predicate was not an object.
    Invalid,
}

impl FindResult {
    pub fn is_found(&self) -> bool {
        matches!(self, FindResult::One(_) | FindResult::Many(_))
    }

    /// Number of documents carried by the result.
    pub fn len(&self) -> usize {
        match self {
            FindResult::One(_) => 1,
            FindResult::Many(documents) => documents.len(),
            FindResult::NotFound | FindResult::Invalid => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&Document> {
        match self {
            FindResult::One(document) => Some(document),
            FindResult::Many(documents) => documents.first(),
            FindResult::NotFound | FindResult::Invalid => None,
        }
    }

    /// Flattens the result into a list, empty for the sentinels.
    pub fn into_documents(self) -> Vec<Document> {
        match self {
            FindResult::One(document) => vec![document],
            FindResult::Many(documents) => documents,
            FindResult::NotFound | FindResult::Invalid => Vec::new(),
        }
    }
}

/// Documents stored by an insert or update.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteResult {
    One(Document),
    Many(Vec<Document>),
}

impl WriteResult {
    pub fn len(&self) -> usize {
        match self {
            WriteResult::One(_) => 1,
            WriteResult::Many(documents) => documents.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_documents(self) -> Vec<Document> {
        match self {
            WriteResult::One(document) => vec![document],
            WriteResult::Many(documents) => documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selector_shapes() {
        assert_eq!(Selector::from(None::<Value>), Selector::All);
        assert!(matches!(Selector::from(json!({})), Selector::Fields(f) if f.is_empty()));
        assert_eq!(Selector::from(json!("Doe")), Selector::Invalid(json!("Doe")));
        assert_eq!(Selector::from(Value::Null), Selector::Invalid(Value::Null));
    }

    #[test]
    fn test_selector_identity() {
        let selector = Selector::from(json!({ "_id": 0, "name": "John" }));
        assert_eq!(selector.id_value(), Some(&json!(0)));
        assert_eq!(Selector::from(json!({ "name": "John" })).id_value(), None);
        assert_eq!(
            Selector::from(&DocumentId::from("abc")).id_value(),
            Some(&json!("abc"))
        );
    }

    #[test]
    fn test_find_result_flattening() {
        let doc = Document::try_from(json!({ "_id": 1 })).unwrap();
        assert_eq!(FindResult::One(doc.clone()).into_documents(), vec![doc.clone()]);
        assert_eq!(FindResult::NotFound.len(), 0);
        assert!(!FindResult::Invalid.is_found());
        assert!(FindResult::Many(vec![]).is_found());
        assert_eq!(FindResult::Many(vec![doc.clone()]).first(), Some(&doc));
    }
}
