//! The synchronous collection engine.
//!
//! [`MemoryStore`] holds one collection's documents in natural order and
//! implements every CRUD operation without suspending. [`Collection`](crate::Collection)
//! wraps it in an async lock and adds persistence; anything that needs the
//! exact semantics of an operation should read this module.
//!
//! Natural order is insertion order. Overwriting an existing identity keeps
//! the document's position; removing a document shifts later ones up.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::trace;

use docshelf_core::{
    document::{Document, DocumentId, ID_FIELD},
    error::DocumentStoreResult,
    identity::{IdentityAssigner, UuidAssigner},
    query::{FindResult, Selector, UpdateOptions, WriteResult},
};

use crate::evaluator::DocumentEvaluator;

type DocumentMap = IndexMap<DocumentId, Document>;

/// Documents a selector resolved to.
enum Selection {
    /// No predicate was given.
    All,
    /// The predicate named an identity; at most one document.
    ById(Option<DocumentId>),
    /// Matches of a full scan, in natural order.
    Scan(Vec<DocumentId>),
    Invalid,
}

/// In-memory document map of a single collection.
///
/// # Example
///
/// ```ignore
/// use docshelf_memory::MemoryStore;
/// use docshelf_core::query::Selector;
/// use serde_json::json;
///
/// let mut store = MemoryStore::default();
/// store.insert(json!([{ "_id": 0, "name": "John" }, { "_id": 1, "name": "Jane" }]));
///
/// let jane = store.find_one(&Selector::from(json!({ "name": "Jane" })));
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    documents: DocumentMap,
    assigner: Arc<dyn IdentityAssigner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(UuidAssigner))
    }
}

impl MemoryStore {
    /// Creates an empty store that stamps documents with `assigner`.
    pub fn new(assigner: Arc<dyn IdentityAssigner>) -> Self {
        Self {
            documents: DocumentMap::new(),
            assigner,
        }
    }

    /// Assigns identity and timestamp to `document` and stores it, replacing
    /// any document with the same identity.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDocument`](docshelf_core::error::DocumentStoreError::InvalidDocument)
    /// if the document's identity is an array or object.
    pub fn insert_document(&mut self, document: Document) -> DocumentStoreResult<Document> {
        let (id, document) = self.assigner.assign(document)?;
        self.documents.insert(id, document.clone());

        Ok(document)
    }

    /// Stores either every document or none of them.
    fn insert_all(&mut self, documents: Vec<Document>) -> Option<Vec<Document>> {
        let assigned = documents
            .into_iter()
            .map(|document| self.assigner.assign(document))
            .collect::<DocumentStoreResult<Vec<_>>>()
            .ok()?;

        Some(
            assigned
                .into_iter()
                .map(|(id, document)| {
                    self.documents.insert(id, document.clone());
                    document
                })
                .collect(),
        )
    }

    /// Inserts one document or, given an array, a batch of them.
    ///
    /// `null` stands for an empty document. Returns `None` for any other
    /// non-object payload or if an element cannot be stored, in which case
    /// nothing is stored.
    pub fn insert(&mut self, payload: Value) -> Option<WriteResult> {
        match payload {
            Value::Array(items) => self.insert_many(Value::Array(items)).map(WriteResult::Many),
            Value::Null => self
                .insert_document(Document::new())
                .ok()
                .map(WriteResult::One),
            Value::Object(fields) => self
                .insert_document(Document::from(fields))
                .ok()
                .map(WriteResult::One),
            _ => None,
        }
    }

    /// Inserts a single object; any other payload is rejected.
    pub fn insert_one(&mut self, payload: Value) -> Option<Document> {
        match payload {
            Value::Object(fields) => self.insert_document(Document::from(fields)).ok(),
            _ => None,
        }
    }

    /// Inserts an array of objects (`null` elements become empty documents);
    /// any other payload is rejected.
    pub fn insert_many(&mut self, payload: Value) -> Option<Vec<Document>> {
        let Value::Array(items) = payload else {
            return None;
        };

        let documents = items
            .into_iter()
            .map(|item| match item {
                Value::Null => Some(Document::new()),
                Value::Object(fields) => Some(Document::from(fields)),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        let inserted = self.insert_all(documents)?;
        trace!(documents = inserted.len(), "inserted batch");

        Some(inserted)
    }

    /// Returns true if a document is stored under `id`.
    pub fn has(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id)
    }

    /// Returns the document stored under `id`.
    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.get(id)
    }

    /// Identities in natural order.
    pub fn ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.documents.keys()
    }

    /// Documents in natural order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Number of stored documents.
    pub fn count(&self) -> usize {
        self.documents.len()
    }

    /// Clones every document in natural order.
    pub fn snapshot(&self) -> Vec<Document> {
        self.documents.values().cloned().collect()
    }

    fn select(&self, selector: &Selector, first_only: bool) -> Selection {
        let predicate = match selector {
            Selector::All => return Selection::All,
            Selector::Invalid(_) => return Selection::Invalid,
            Selector::Fields(predicate) => predicate,
        };

        // An identity in the predicate settles the lookup: the named document
        // either matches every field or nothing does.
        if let Some(id_value) = predicate.get(ID_FIELD) {
            return Selection::ById(DocumentId::from_value(id_value).filter(|id| {
                self.documents
                    .get(id)
                    .is_some_and(|document| DocumentEvaluator::new(document).matches(predicate))
            }));
        }

        let limit = if first_only { 1 } else { usize::MAX };

        Selection::Scan(
            self.documents
                .iter()
                .filter(|(_, document)| DocumentEvaluator::new(document).matches(predicate))
                .map(|(id, _)| id.clone())
                .take(limit)
                .collect(),
        )
    }

    fn cloned(&self, ids: &[DocumentId]) -> Vec<Document> {
        ids.iter()
            .filter_map(|id| self.documents.get(id))
            .cloned()
            .collect()
    }

    /// Finds documents matching `selector`.
    ///
    /// - [`Selector::All`]: every document, in natural order.
    /// - A predicate with an identity: [`FindResult::One`] or [`FindResult::NotFound`].
    /// - Any other predicate: [`FindResult::Many`] of all matches, or [`FindResult::NotFound`].
    /// - [`Selector::Invalid`]: [`FindResult::Invalid`].
    pub fn find(&self, selector: &Selector) -> FindResult {
        match self.select(selector, false) {
            Selection::All => FindResult::Many(self.snapshot()),
            Selection::ById(Some(id)) => self
                .documents
                .get(&id)
                .cloned()
                .map_or(FindResult::NotFound, FindResult::One),
            Selection::ById(None) => FindResult::NotFound,
            Selection::Scan(ids) if ids.is_empty() => FindResult::NotFound,
            Selection::Scan(ids) => FindResult::Many(self.cloned(&ids)),
            Selection::Invalid => FindResult::Invalid,
        }
    }

    /// Returns the first match in natural order, or the first document of the
    /// collection when no predicate is given.
    pub fn find_one(&self, selector: &Selector) -> Option<Document> {
        match self.select(selector, true) {
            Selection::All => self.documents.values().next().cloned(),
            Selection::ById(found) => found.and_then(|id| self.documents.get(&id).cloned()),
            Selection::Scan(ids) => ids.first().and_then(|id| self.documents.get(id).cloned()),
            Selection::Invalid => None,
        }
    }

    /// Removes and returns the first document matching a predicate.
    pub fn find_one_and_delete(&mut self, selector: &Selector) -> Option<Document> {
        if !matches!(selector, Selector::Fields(_)) {
            return None;
        }

        let found = self.find_one(selector)?;
        if let Some(id) = found.id() {
            self.delete_one_by_id(&id);
        }

        Some(found)
    }

    /// Merges `patch` into every match and stores the results.
    ///
    /// Returns `None` when nothing was written: the predicate or patch is not
    /// an object, the patch carries an unusable identity, or nothing matched
    /// and `options.upsert` is off.
    pub fn update(&mut self, selector: &Selector, patch: Value, options: UpdateOptions) -> Option<WriteResult> {
        self.apply_update(selector, patch, options, false)
    }

    /// Like [`update`](Self::update), limited to the first match.
    pub fn update_one(&mut self, selector: &Selector, patch: Value, options: UpdateOptions) -> Option<Document> {
        self.apply_update(selector, patch, options, true)
            .and_then(|written| written.into_documents().into_iter().next())
    }

    fn apply_update(
        &mut self,
        selector: &Selector,
        patch: Value,
        options: UpdateOptions,
        first_only: bool,
    ) -> Option<WriteResult> {
        let Value::Object(patch) = patch else {
            return None;
        };

        if patch
            .get(ID_FIELD)
            .is_some_and(|id| !id.is_null() && DocumentId::from_value(id).is_none())
        {
            return None;
        }

        let (targets, by_id) = match self.select(selector, first_only) {
            Selection::Invalid => return None,
            Selection::All => {
                let limit = if first_only { 1 } else { usize::MAX };
                (self.documents.keys().take(limit).cloned().collect(), false)
            }
            Selection::ById(found) => (found.into_iter().collect::<Vec<_>>(), true),
            Selection::Scan(ids) => (ids, false),
        };

        if targets.is_empty() {
            return options
                .upsert
                .then(|| self.upsert(selector, &patch))
                .flatten()
                .map(WriteResult::One);
        }

        let updated = targets
            .into_iter()
            .filter_map(|id| self.merge_into(id, &patch))
            .collect::<Vec<_>>();

        trace!(documents = updated.len(), "updated documents");

        match (by_id, updated.len()) {
            (true, 1) => updated.into_iter().next().map(WriteResult::One),
            _ => Some(WriteResult::Many(updated)),
        }
    }

    /// Merges `patch` into the document at `id` and re-stores it. A patch that
    /// changes the identity moves the document to the new key.
    fn merge_into(&mut self, id: DocumentId, patch: &Map<String, Value>) -> Option<Document> {
        let mut document = self.documents.get(&id)?.clone();
        document.merge(patch);

        let (new_id, document) = self.assigner.assign(document).ok()?;
        if new_id != id {
            self.documents.shift_remove(&id);
        }
        self.documents.insert(new_id, document.clone());

        Some(document)
    }

    fn upsert(&mut self, selector: &Selector, patch: &Map<String, Value>) -> Option<Document> {
        let mut document = selector
            .fields()
            .cloned()
            .map(Document::from)
            .unwrap_or_default();
        document.merge(patch);

        self.insert_document(document).ok()
    }

    /// Deletes the first document matching a predicate.
    pub fn delete_one(&mut self, selector: &Selector) -> bool {
        if !matches!(selector, Selector::Fields(_)) {
            return false;
        }

        match self.select(selector, true) {
            Selection::ById(Some(id)) => self.delete_one_by_id(&id),
            Selection::Scan(ids) => ids.first().is_some_and(|id| self.delete_one_by_id(id)),
            _ => false,
        }
    }

    /// Deletes every document matching a predicate; true iff at least one was removed.
    pub fn delete_many(&mut self, selector: &Selector) -> bool {
        let predicate = match selector {
            Selector::Fields(predicate) if !predicate.contains_key(ID_FIELD) => predicate,
            Selector::Fields(_) => return self.delete_one(selector),
            Selector::All | Selector::Invalid(_) => return false,
        };

        let before = self.documents.len();
        self.documents
            .retain(|_, document| !DocumentEvaluator::new(document).matches(predicate));
        let removed = before - self.documents.len();

        trace!(documents = removed, "deleted documents");

        removed > 0
    }

    /// Removes the document stored under `id`, shifting later documents up.
    pub fn delete_one_by_id(&mut self, id: &DocumentId) -> bool {
        self.documents.shift_remove(id).is_some()
    }

    /// Removes every document.
    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// Estimated size in bytes: the UTF-8 length of all documents serialized
    /// as one JSON array.
    pub fn estimated_size(&self) -> DocumentStoreResult<u64> {
        let documents = self.documents.values().collect::<Vec<_>>();

        Ok(serde_json::to_vec(&documents)?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sel(value: Value) -> Selector {
        Selector::from(value)
    }

    fn field<'a>(document: &'a Document, name: &str) -> Option<&'a Value> {
        document.get(name)
    }

    fn does() -> MemoryStore {
        let mut store = MemoryStore::default();
        store.insert(json!([
            { "_id": 0, "first_name": "John", "last_name": "Doe" },
            { "_id": 1, "first_name": "Jane", "last_name": "Doe" }
        ]));
        store
    }

    #[test]
    fn test_insert_assigns_stable_identity() {
        let mut store = MemoryStore::default();
        let stored = store.insert_one(json!({ "name": "Alice" })).unwrap();
        let id = stored.id().unwrap();

        assert!(store.has(&id));
        assert_eq!(store.get(&id).and_then(Document::id), Some(id.clone()));
        assert!(stored.created_at().is_some());
    }

    #[test]
    fn test_insert_overwrites_existing_identity() {
        let mut store = MemoryStore::default();
        store.insert(json!({ "_id": "a", "old": true }));
        store.insert(json!({ "_id": "b" }));
        store.insert(json!({ "_id": "a", "new": true }));

        let stored = store.get(&DocumentId::from("a")).unwrap();
        assert_eq!(field(stored, "old"), None);
        assert_eq!(field(stored, "new"), Some(&json!(true)));
        assert_eq!(store.count(), 2);

        // Position of the overwritten document is kept.
        let ids: Vec<_> = store.ids().cloned().collect();
        assert_eq!(ids, vec![DocumentId::from("a"), DocumentId::from("b")]);
    }

    #[test]
    fn test_insert_shapes() {
        let mut store = MemoryStore::default();

        assert!(matches!(store.insert(Value::Null), Some(WriteResult::One(_))));
        assert!(matches!(store.insert(json!([{}, {}])), Some(WriteResult::Many(d)) if d.len() == 2));
        assert_eq!(store.insert(json!(5)), None);
        assert_eq!(store.insert(json!("doc")), None);

        assert_eq!(store.insert_one(json!([{}])), None);
        assert_eq!(store.insert_one(Value::Null), None);
        assert_eq!(store.insert_many(json!({})), None);

        assert_eq!(store.count(), 3);
    }

    #[test]
    fn test_insert_batch_is_all_or_nothing() {
        let mut store = MemoryStore::default();

        assert_eq!(store.insert_many(json!([{ "a": 1 }, 2])), None);
        assert_eq!(store.insert_many(json!([{ "a": 1 }, { "_id": [1] }])), None);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_find_without_predicate_returns_everything() {
        let store = does();

        assert_eq!(store.find(&Selector::All).len(), 2);
        assert_eq!(store.find(&sel(json!({}))), store.find(&Selector::All));
        assert_eq!(MemoryStore::default().find(&Selector::All), FindResult::Many(vec![]));
    }

    #[test]
    fn test_find_scan_and_shortcut() {
        let store = does();

        let found = store.find(&sel(json!({ "last_name": "Doe" }))).into_documents();
        let names: Vec<_> = found.iter().map(|d| field(d, "first_name").cloned()).collect();
        assert_eq!(names, vec![Some(json!("John")), Some(json!("Jane"))]);

        assert!(matches!(store.find(&sel(json!({ "_id": 1 }))), FindResult::One(d) if field(&d, "first_name") == Some(&json!("Jane"))));
        assert_eq!(store.find(&sel(json!({ "last_name": "Roe" }))), FindResult::NotFound);
        assert_eq!(store.find(&sel(json!("Doe"))), FindResult::Invalid);
        assert_eq!(store.find(&sel(json!(42))), FindResult::Invalid);
    }

    #[test]
    fn test_identity_shortcut_never_falls_back() {
        let store = does();

        // _id 0 exists but is John, so nothing matches even though Jane would.
        assert_eq!(
            store.find(&sel(json!({ "_id": 0, "first_name": "Jane" }))),
            FindResult::NotFound
        );
        assert_eq!(store.find_one(&sel(json!({ "_id": 0, "first_name": "Jane" }))), None);
        assert_eq!(store.find(&sel(json!({ "_id": [0] }))), FindResult::NotFound);
    }

    #[test]
    fn test_find_one_returns_first_inserted() {
        let store = does();

        let found = store.find_one(&sel(json!({ "last_name": "Doe" }))).unwrap();
        assert_eq!(field(&found, "first_name"), Some(&json!("John")));
        assert_eq!(store.find_one(&Selector::All).and_then(|d| d.id()), Some(DocumentId::Int(0)));
        assert_eq!(store.find_one(&sel(json!({ "last_name": "Roe" }))), None);
        assert_eq!(store.find_one(&sel(json!(true))), None);
        assert_eq!(MemoryStore::default().find_one(&Selector::All), None);
    }

    #[test]
    fn test_find_one_and_delete() {
        let mut store = does();

        let removed = store.find_one_and_delete(&sel(json!({ "last_name": "Doe" }))).unwrap();
        assert_eq!(removed.id(), Some(DocumentId::Int(0)));
        assert!(!store.has(&DocumentId::Int(0)));

        assert_eq!(store.find_one_and_delete(&sel(json!({ "last_name": "Roe" }))), None);
        assert_eq!(store.find_one_and_delete(&Selector::All), None);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_update_merges_and_restamps() {
        let mut store = does();
        let before = store.get(&DocumentId::Int(1)).cloned().unwrap();

        let written = store
            .update(&sel(json!({ "last_name": "Doe" })), json!({ "last_name": "Smith", "age": 30 }), UpdateOptions::default())
            .unwrap();
        assert_eq!(written.len(), 2);

        let jane = store.find_one(&sel(json!({ "_id": 1 }))).unwrap();
        assert_eq!(field(&jane, "last_name"), Some(&json!("Smith")));
        assert_eq!(field(&jane, "first_name"), Some(&json!("Jane")));
        assert_eq!(field(&jane, "age"), Some(&json!(30)));
        assert!(jane.created_at() >= before.created_at());
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_update_by_identity_returns_single_document() {
        let mut store = does();

        let written = store.update(&sel(json!({ "_id": 0 })), json!({ "x": 1 }), UpdateOptions::default());
        assert!(matches!(written, Some(WriteResult::One(d)) if field(&d, "x") == Some(&json!(1))));
    }

    #[test]
    fn test_update_without_match_is_noop() {
        let mut store = does();
        let snapshot = store.snapshot();

        assert_eq!(
            store.update(&sel(json!({ "last_name": "Roe" })), json!({ "a": 1 }), UpdateOptions::default()),
            None
        );
        assert_eq!(store.snapshot(), snapshot);
    }

    #[test]
    fn test_upsert_inserts_merged_predicate_and_patch() {
        let mut store = does();

        let written = store
            .update(&sel(json!({ "last_name": "Roe" })), json!({ "first_name": "Richard" }), UpdateOptions::upsert())
            .unwrap()
            .into_documents();

        assert_eq!(written.len(), 1);
        assert_eq!(store.count(), 3);
        assert_eq!(field(&written[0], "last_name"), Some(&json!("Roe")));
        assert_eq!(field(&written[0], "first_name"), Some(&json!("Richard")));
        assert!(written[0].id().is_some());
    }

    #[test]
    fn test_update_one_touches_first_match_only() {
        let mut store = does();

        let updated = store
            .update_one(&sel(json!({ "last_name": "Doe" })), json!({ "flag": true }), UpdateOptions::default())
            .unwrap();
        assert_eq!(updated.id(), Some(DocumentId::Int(0)));
        assert_eq!(store.get(&DocumentId::Int(1)).and_then(|d| d.get("flag")), None);
    }

    #[test]
    fn test_update_moving_identity() {
        let mut store = does();

        store.update_one(&sel(json!({ "_id": 0 })), json!({ "_id": "john" }), UpdateOptions::default());
        assert!(!store.has(&DocumentId::Int(0)));
        assert!(store.has(&DocumentId::from("john")));
        assert_eq!(store.count(), 2);

        assert_eq!(
            store.update(&sel(json!({ "_id": 1 })), json!({ "_id": {} }), UpdateOptions::default()),
            None
        );
        assert!(store.has(&DocumentId::Int(1)));
    }

    #[test]
    fn test_update_rejects_invalid_arguments() {
        let mut store = does();

        assert_eq!(store.update(&sel(json!("Doe")), json!({ "a": 1 }), UpdateOptions::upsert()), None);
        assert_eq!(store.update(&sel(json!({ "last_name": "Doe" })), json!(7), UpdateOptions::upsert()), None);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_delete_many_removes_only_matches() {
        let mut store = does();
        store.insert(json!({ "_id": 2, "first_name": "Jim", "last_name": "Roe" }));

        assert!(store.delete_many(&sel(json!({ "last_name": "Doe" }))));
        let ids: Vec<_> = store.ids().cloned().collect();
        assert_eq!(ids, vec![DocumentId::Int(2)]);

        assert!(!store.delete_many(&sel(json!({ "last_name": "Doe" }))));
        assert!(!store.delete_many(&Selector::All));
        assert!(!store.delete_many(&sel(json!("Roe"))));
    }

    #[test]
    fn test_delete_one_and_by_id() {
        let mut store = does();

        assert!(store.delete_one(&sel(json!({ "last_name": "Doe" }))));
        assert_eq!(store.ids().cloned().collect::<Vec<_>>(), vec![DocumentId::Int(1)]);
        assert!(!store.delete_one(&sel(json!({ "_id": 1, "first_name": "John" }))));
        assert!(store.delete_many(&sel(json!({ "_id": 1 }))));
        assert!(!store.delete_one_by_id(&DocumentId::Int(1)));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_estimated_size_counts_utf8_bytes() {
        let mut store = MemoryStore::default();
        assert_eq!(store.estimated_size().unwrap(), 2);

        store.insert(json!({ "_id": "ø" }));
        let expected = serde_json::to_vec(&store.snapshot()).unwrap().len() as u64;
        assert_eq!(store.estimated_size().unwrap(), expected);
        store.clear();
        assert_eq!(store.count(), 0);
    }
}
