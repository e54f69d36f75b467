//! Predicate evaluation for in-memory document matching.
//!
//! A predicate matches a document when every predicate field is strictly
//! equal to the document field of the same name. Strict equality means same
//! JSON type and same value, with no coercion between types. Numbers form a
//! single type, so `1` and `1.0` are equal.
//!
//! Arrays and objects are compared by identity. A predicate is always built
//! apart from the store and never shares a value with a stored document, so
//! a nested predicate value never matches, however similar it looks.

use serde_json::{Map, Number, Value};

use docshelf_core::document::Document;

pub struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns true if every field of `predicate` matches. An empty predicate
    /// matches everything; a field missing from the document never matches.
    pub fn matches(&self, predicate: &Map<String, Value>) -> bool {
        predicate.iter().all(|(field, expected)| {
            self.document
                .get(field)
                .is_some_and(|actual| strictly_equal(actual, expected))
        })
    }
}

/// Strict equality between two JSON values.
pub fn strictly_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (left.as_u64(), right.as_u64()) {
        return a == b;
    }

    left.as_f64() == right.as_f64()
}
