//! Core data types for Sift.
//!
//! This module defines the document-side data structures the prefilter works
//! against:
//!
//! - **Collection**: an ordered set of JSON documents with a stable instance
//!   identity and a generation counter bumped on every mutation
//! - **DocumentId**: the key a document is indexed under
//! - **Field paths**: dotted traversal into nested objects

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_COLLECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a collection instance.
///
/// Clones of a [`Collection`] receive a fresh identifier, so an index built for
/// one instance is never served for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub u64);

impl CollectionId {
    fn next() -> Self {
        CollectionId(NEXT_COLLECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a document within a collection.
///
/// Explicit identifiers come from the configured id field; documents without
/// one fall back to their position at index-build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentId {
    Explicit(String),
    Position(usize),
}

impl DocumentId {
    /// Resolve the identity of the document at `position`.
    ///
    /// String ids are used verbatim; other scalar ids use their JSON
    /// rendering. Null, array and object ids are ignored.
    pub fn resolve(document: &Value, position: usize, id_field: &str) -> Self {
        match resolve_path(document, id_field) {
            Some(Value::String(s)) => DocumentId::Explicit(s.clone()),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => DocumentId::Explicit(v.to_string()),
            _ => DocumentId::Position(position),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Explicit(id) => write!(f, "{}", id),
            DocumentId::Position(pos) => write!(f, "#{}", pos),
        }
    }
}

/// Resolve a dotted field path inside a document.
///
/// Any non-object encountered mid-path, a missing key, or an empty segment
/// yields `None`.
pub fn resolve_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Resolve a dotted field path to string text, if it is one.
pub fn resolve_text<'a>(document: &'a Value, path: &str) -> Option<&'a str> {
    resolve_path(document, path).and_then(Value::as_str)
}

/// An ordered document collection with instance identity and versioning.
///
/// Documents are only reachable mutably through methods that bump the
/// generation, which is what lets cached indexes detect staleness.
#[derive(Debug)]
pub struct Collection {
    id: CollectionId,
    generation: AtomicU64,
    documents: Vec<Value>,
    /// Dropped with the collection; caches hold a `Weak` to notice
    alive: Arc<()>,
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Collection {
    fn clone(&self) -> Self {
        Collection::from_documents(self.documents.clone())
    }
}

impl From<Vec<Value>> for Collection {
    fn from(documents: Vec<Value>) -> Self {
        Collection::from_documents(documents)
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Collection::from_documents(iter.into_iter().collect())
    }
}

impl Collection {
    /// Create a new empty collection.
    pub fn new() -> Self {
        Collection::from_documents(Vec::new())
    }

    /// Wrap existing documents.
    pub fn from_documents(documents: Vec<Value>) -> Self {
        Collection {
            id: CollectionId::next(),
            generation: AtomicU64::new(0),
            documents,
            alive: Arc::new(()),
        }
    }

    /// Parse a JSON array of documents.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Array(documents) => Ok(Collection::from_documents(documents)),
            other => Err(crate::SiftError::InvalidDocuments {
                reason: format!("expected a JSON array, found {}", json_kind(&other)),
            }),
        }
    }

    /// Instance identity.
    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// Token that stops upgrading once this collection is dropped.
    pub fn liveness(&self) -> Weak<()> {
        Arc::downgrade(&self.alive)
    }

    /// Get the current generation (modification counter).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.documents.get(position)
    }

    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.documents.iter()
    }

    /// Append a document.
    pub fn push(&mut self, document: Value) {
        self.documents.push(document);
        self.bump();
    }

    /// Append several documents.
    pub fn extend<I: IntoIterator<Item = Value>>(&mut self, documents: I) {
        self.documents.extend(documents);
        self.bump();
    }

    /// Replace the document at `position`, returning the old one.
    pub fn replace(&mut self, position: usize, document: Value) -> Option<Value> {
        let slot = self.documents.get_mut(position)?;
        let old = std::mem::replace(slot, document);
        self.bump();
        Some(old)
    }

    /// Remove the document at `position`, shifting later documents.
    pub fn remove(&mut self, position: usize) -> Option<Value> {
        if position >= self.documents.len() {
            return None;
        }
        let old = self.documents.remove(position);
        self.bump();
        Some(old)
    }

    /// Remove every document.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.bump();
    }

    /// Resolve the identity of the document at `position`.
    pub fn document_id(&self, position: usize, id_field: &str) -> Option<DocumentId> {
        self.documents
            .get(position)
            .map(|doc| DocumentId::resolve(doc, position, id_field))
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_path_nested() {
        let doc = json!({"a": {"b": {"c": "deep"}}, "top": "level"});
        assert_eq!(resolve_text(&doc, "a.b.c"), Some("deep"));
        assert_eq!(resolve_text(&doc, "top"), Some("level"));
    }

    #[test]
    fn test_resolve_path_missing_or_non_object() {
        let doc = json!({"a": {"b": 5}, "list": [{"x": "y"}], "s": "str"});
        assert!(resolve_path(&doc, "a.c").is_none());
        assert!(resolve_path(&doc, "a.b.c").is_none());
        assert!(resolve_path(&doc, "list.x").is_none());
        assert!(resolve_path(&doc, "s.len").is_none());
        assert!(resolve_path(&doc, "").is_none());
        assert!(resolve_path(&doc, "a..b").is_none());
        assert_eq!(resolve_path(&doc, "a.b"), Some(&json!(5)));
        assert!(resolve_text(&doc, "a.b").is_none());
    }

    #[test]
    fn test_document_id_resolution() {
        let explicit = json!({"_id": "abc", "text": "x"});
        let numeric = json!({"_id": 42});
        let missing = json!({"text": "x"});
        let nested = json!({"_id": {"$oid": "1"}});

        assert_eq!(
            DocumentId::resolve(&explicit, 0, "_id"),
            DocumentId::Explicit("abc".to_string())
        );
        assert_eq!(
            DocumentId::resolve(&numeric, 1, "_id"),
            DocumentId::Explicit("42".to_string())
        );
        assert_eq!(DocumentId::resolve(&missing, 2, "_id"), DocumentId::Position(2));
        assert_eq!(DocumentId::resolve(&nested, 3, "_id"), DocumentId::Position(3));
    }

    #[test]
    fn test_collection_generation_bumps_on_mutation() {
        let mut collection = Collection::from_documents(vec![json!({"text": "a"})]);
        let gen0 = collection.generation();

        collection.push(json!({"text": "b"}));
        let gen1 = collection.generation();
        assert!(gen1 > gen0);

        collection.replace(0, json!({"text": "c"}));
        assert!(collection.generation() > gen1);

        let before = collection.generation();
        assert!(collection.replace(9, json!(null)).is_none());
        assert!(collection.remove(9).is_none());
        assert_eq!(collection.generation(), before);
    }

    #[test]
    fn test_clone_gets_new_identity() {
        let collection = Collection::from_documents(vec![json!({"text": "a"})]);
        let copy = collection.clone();
        assert_ne!(collection.id(), copy.id());
        assert_eq!(collection.documents(), copy.documents());
    }

    #[test]
    fn test_liveness_ends_on_drop() {
        let collection = Collection::from_documents(vec![json!({"text": "a"})]);
        let token = collection.liveness();
        let copy = collection.clone();
        assert!(token.upgrade().is_some());

        drop(collection);
        assert!(token.upgrade().is_none());
        assert!(copy.liveness().upgrade().is_some());
    }

    #[test]
    fn test_from_json() {
        let collection = Collection::from_json(r#"[{"text": "a"}, {"text": "b"}]"#).unwrap();
        assert_eq!(collection.len(), 2);

        let err = Collection::from_json(r#"{"text": "a"}"#).unwrap_err();
        assert!(matches!(err, crate::SiftError::InvalidDocuments { .. }));
    }

    #[test]
    fn test_document_id_display() {
        assert_eq!(DocumentId::Explicit("x".into()).to_string(), "x");
        assert_eq!(DocumentId::Position(7).to_string(), "#7");
    }
}
