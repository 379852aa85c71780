//! Indexing engine
//!
//! Projects chronologies into index documents. Each `IndexKind` owns one
//! backend and is rebuilt independently of the others.
//!
//! A document covers a component's entire version list, not only the version
//! visible under some coordinate, so historical text and values stay
//! searchable. Re-deriving a document from an unchanged chronology yields the
//! same field set every time.

mod description;
mod rebuild;
mod semantic;

pub use description::{description_document, DescriptionIndexer};
pub use rebuild::{rebuild, CancellationToken, RebuildCheckpoint, RebuildOutcome};
pub use semantic::{semantic_document, SemanticIndexer};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use termstore_core::Nid;
use termstore_search::{
    fields, Analyzer, IndexDocument, IndexField, NumericKind, NumericValue, SearchBackend,
};
use tracing::debug;

/// Independently rebuildable index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexKind {
    /// Members of configured assemblages
    Semantic,
    /// Every description semantic
    Description,
}

impl IndexKind {
    /// Both kinds
    pub const ALL: [IndexKind; 2] = [IndexKind::Semantic, IndexKind::Description];

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Semantic => "semantic",
            IndexKind::Description => "description",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time statistics of one index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    /// Which index
    pub kind: IndexKind,
    /// Live documents
    pub documents: usize,
    /// Highest generation whose work is visible
    pub applied_generation: u64,
    /// Highest generation handed out
    pub requested_generation: u64,
    /// Index tasks waiting for the worker
    pub queue_depth: usize,
    /// Index tasks finished since open
    pub tasks_completed: u64,
}

/// Projection of one kind of component into one backend
pub trait Indexer: Send + Sync {
    /// Kind served
    fn kind(&self) -> IndexKind;

    /// Backend written to
    fn backend(&self) -> &Arc<dyn SearchBackend>;

    /// Rebuild units (assemblages), ascending
    fn units(&self) -> Vec<Nid>;

    /// Components of a unit this indexer may project
    fn members(&self, unit: Nid) -> Vec<Nid>;

    /// Document for a component, or `None` if it must not be indexed
    fn document(&self, nid: Nid) -> Option<IndexDocument>;

    /// Write or remove the component's document; true if written
    fn index(&self, nid: Nid) -> bool {
        match self.document(nid) {
            Some(document) => {
                self.backend().upsert(document);
                true
            }
            None => {
                self.backend().delete(&nid.to_string());
                false
            }
        }
    }

    /// Replace every document of a unit; returns documents written
    fn reindex_unit(&self, unit: Nid) -> usize {
        let removed = self
            .backend()
            .delete_by_term(fields::ASSEMBLAGE, &unit.to_string());
        let written = self
            .members(unit)
            .into_iter()
            .filter(|nid| self.index(*nid))
            .count();
        debug!(target: "termstore::index", kind = %self.kind(), %unit, removed, written, "Reindexed unit");
        written
    }
}

// ============================================================================
// Field collection
// ============================================================================

/// How a field's value is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Encoding {
    Tokenized,
    Whitespace,
    Numeric(NumericKind),
}

/// Fields of a document under construction, deduplicated
///
/// Two entries are the same when their field name, encoding and stringified
/// value agree. Iteration order is fixed, so equal inputs give equal documents.
#[derive(Debug, Default)]
pub(crate) struct FieldSet {
    entries: BTreeMap<(String, Encoding, String), IndexField>,
}

impl FieldSet {
    pub(crate) fn tokenized(&mut self, name: &str, text: &str) {
        self.entries
            .entry((name.to_string(), Encoding::Tokenized, text.to_string()))
            .or_insert_with(|| IndexField::text(name, text, Analyzer::Standard));
    }

    pub(crate) fn exact(&mut self, name: &str, text: &str) {
        self.entries
            .entry((name.to_string(), Encoding::Whitespace, text.to_string()))
            .or_insert_with(|| IndexField::text(name, text, Analyzer::Whitespace));
    }

    pub(crate) fn numeric(&mut self, name: &str, value: NumericValue) {
        self.entries
            .entry((name.to_string(), Encoding::Numeric(value.kind()), value.to_string()))
            .or_insert_with(|| IndexField::numeric(name, value));
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Document keyed by the component's nid
    pub(crate) fn into_document(self, nid: Nid, assemblage: Nid) -> IndexDocument {
        let mut document = IndexDocument::new(nid.to_string());
        document.add(IndexField::text(
            fields::ASSEMBLAGE,
            assemblage.to_string(),
            Analyzer::Whitespace,
        ));
        for field in self.entries.into_values() {
            document.add(field);
        }
        document.set_doc_value(fields::COMPONENT_NID, nid.as_i32() as i64);
        document.store(fields::COMPONENT_NID, nid.to_string());
        document.store(fields::ASSEMBLAGE, assemblage.to_string());
        document
    }
}
