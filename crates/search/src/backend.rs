//! Search backend contract
//!
//! What the indexing and query engines need from a full-text engine:
//! replace-by-key document writes, the query primitives in `query`, per-doc
//! value lookup for hit resolution, and an applied-generation watermark that
//! readers can wait on.

use crate::document::IndexDocument;
use crate::query::Query;
use std::time::Duration;

/// A matching document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Engine-internal document id
    pub doc_id: u32,
    /// Relevance score
    pub score: f32,
}

/// A full-text engine holding one index
///
/// Writes are visible to `search` as soon as they return. The generation
/// watermark is set by the caller with `commit` and only ever moves forward.
pub trait SearchBackend: Send + Sync {
    /// Insert a document, replacing any document with the same key
    fn upsert(&self, document: IndexDocument);

    /// Remove a document by key; true if one was removed
    fn delete(&self, key: &str) -> bool;

    /// Remove every document whose field holds the exact term
    fn delete_by_term(&self, field: &str, term: &str) -> usize;

    /// Remove every document
    fn clear(&self);

    /// Matching documents, score descending, ties by ascending doc id
    fn search(&self, query: &Query) -> Vec<Hit>;

    /// Key of a document
    fn key(&self, doc_id: u32) -> Option<String>;

    /// Fast per-document numeric value
    fn doc_value(&self, doc_id: u32, field: &str) -> Option<i64>;

    /// Stored field value
    fn stored(&self, doc_id: u32, field: &str) -> Option<String>;

    /// The document as last written under a key
    fn document(&self, key: &str) -> Option<IndexDocument>;

    /// Number of live documents
    fn doc_count(&self) -> usize;

    /// Mark everything written so far as belonging to `generation`
    fn commit(&self, generation: u64);

    /// Highest committed generation
    fn applied_generation(&self) -> u64;

    /// Block until `applied_generation() >= generation`
    ///
    /// Returns false if `timeout` elapsed first. `None` waits indefinitely.
    fn wait_for_generation(&self, generation: u64, timeout: Option<Duration>) -> bool;
}
