//! Full-text engine for termstore
//!
//! This crate provides:
//! - Analyzer: tokenizing and whitespace-only text analysis
//! - IndexDocument: keyed documents with text, numeric, doc value and stored fields
//! - Query: term, prefix, typed numeric range and boolean queries
//! - SearchBackend: the contract the indexing and query engines program against
//! - InMemoryIndex: concurrent inverted index with BM25 scoring
//! - fields: field naming shared by index-time and query-time code
//!
//! # Usage
//!
//! ```
//! use termstore_search::{Analyzer, IndexDocument, IndexField, InMemoryIndex, Query, SearchBackend};
//!
//! let index = InMemoryIndex::new();
//! let mut doc = IndexDocument::new("-2147483647");
//! doc.add(IndexField::text("colData", "Hello World", Analyzer::Standard));
//! index.upsert(doc);
//!
//! let hits = index.search(&Query::term("colData", "hello"));
//! assert_eq!(hits.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analyzer;
pub mod backend;
pub mod document;
pub mod fields;
pub mod memory;
pub mod query;

pub use analyzer::Analyzer;
pub use backend::{Hit, SearchBackend};
pub use document::{FieldValue, IndexDocument, IndexField, NumericKind, NumericValue};
pub use memory::InMemoryIndex;
pub use query::{escape_query_text, parse_text, BoolQuery, NumericRange, Query};
