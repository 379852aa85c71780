//! Semantic index documents
//!
//! Field rules, applied to every version of the chronology:
//!
//! 1. Every value goes to `colData`; when the assemblage has two or more
//!    indexed columns it also goes to `colData_<column>`
//! 2. Strings are written tokenized and, under the `_ws` twin, whitespace-only
//! 3. Booleans, nids and UUIDs are exact whitespace-field terms only
//! 4. Integer, Long, Float and Double are numeric points only
//! 5. Byte arrays are skipped with a warning
//! 6. `_assemblage_` always binds the document to its assemblage
//!
//! Non-dynamic payloads are encoded as column 0. Logic graphs contribute the
//! concepts they reference as nid values at column 0.

use super::{FieldSet, IndexKind, Indexer};
use crate::registry::SchemaRegistry;
use std::sync::Arc;
use termstore_core::{Chronology, DynamicValue, Nid, Payload};
use termstore_search::{fields, IndexDocument, NumericValue, SearchBackend};
use termstore_storage::ChronicleStore;
use tracing::{debug, warn};

/// Build the document of a semantic chronology indexed on `columns`
///
/// Returns `None` for concept chronologies.
pub fn semantic_document(chronology: &Chronology, columns: &[usize]) -> Option<IndexDocument> {
    let assemblage = chronology.assemblage()?;
    let nid = chronology.nid();
    let qualified = columns.len() >= 2;
    let mut set = FieldSet::default();
    let mut encoder = Encoder {
        set: &mut set,
        nid,
        assemblage,
        qualified,
    };

    for version in chronology.versions() {
        match version.payload() {
            Payload::Dynamic(data) => {
                for &column in columns {
                    if let Some(Some(value)) = data.get(column) {
                        encoder.value(value, column);
                    }
                }
            }
            Payload::String(text) => encoder.value(&DynamicValue::String(text.clone()), 0),
            Payload::Long(v) => encoder.value(&DynamicValue::Long(*v), 0),
            Payload::ComponentNid(target) => encoder.value(&DynamicValue::Nid(*target), 0),
            Payload::LogicGraph(graph) => {
                for concept in graph.referenced_concepts() {
                    encoder.value(&DynamicValue::Nid(concept), 0);
                }
            }
            Payload::Description(description) => {
                encoder.value(&DynamicValue::String(description.text.clone()), 0)
            }
            Payload::Concept => {}
        }
    }

    debug!(target: "termstore::index", %nid, %assemblage, fields = set.len(), "Built semantic document");
    Some(set.into_document(nid, assemblage))
}

struct Encoder<'a> {
    set: &'a mut FieldSet,
    nid: Nid,
    assemblage: Nid,
    qualified: bool,
}

impl Encoder<'_> {
    fn value(&mut self, value: &DynamicValue, column: usize) {
        let mut names = vec![fields::COL_DATA.to_string()];
        if self.qualified {
            names.push(fields::column(column));
        }
        for leaf in value.flatten() {
            for name in &names {
                self.leaf(name, leaf, column);
            }
        }
    }

    fn leaf(&mut self, name: &str, leaf: &DynamicValue, column: usize) {
        match leaf {
            DynamicValue::String(text) => {
                self.set.tokenized(name, text);
                self.set.exact(&fields::whitespace(name), text);
            }
            DynamicValue::Boolean(_) | DynamicValue::Uuid(_) | DynamicValue::Nid(_) => {
                self.set.exact(&fields::whitespace(name), &leaf.to_string());
            }
            DynamicValue::Integer(v) => self.set.numeric(name, NumericValue::Int(*v)),
            DynamicValue::Long(v) => self.set.numeric(name, NumericValue::Long(*v)),
            DynamicValue::Float(v) => self.set.numeric(name, NumericValue::Float(*v)),
            DynamicValue::Double(v) => self.set.numeric(name, NumericValue::Double(*v)),
            DynamicValue::ByteArray(bytes) => {
                warn!(
                    target: "termstore::index",
                    nid = %self.nid,
                    assemblage = %self.assemblage,
                    column,
                    len = bytes.len(),
                    "Byte array values are not indexed"
                );
            }
            // flatten() never yields arrays
            DynamicValue::Array(_) => {}
        }
    }
}

/// Indexes members of assemblages the registry marks as indexed
#[derive(Clone)]
pub struct SemanticIndexer {
    store: Arc<ChronicleStore>,
    registry: Arc<SchemaRegistry>,
    backend: Arc<dyn SearchBackend>,
}

impl SemanticIndexer {
    /// Indexer over a store, gated by a registry
    pub fn new(
        store: Arc<ChronicleStore>,
        registry: Arc<SchemaRegistry>,
        backend: Arc<dyn SearchBackend>,
    ) -> Self {
        SemanticIndexer {
            store,
            registry,
            backend,
        }
    }
}

impl Indexer for SemanticIndexer {
    fn kind(&self) -> IndexKind {
        IndexKind::Semantic
    }

    fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    fn units(&self) -> Vec<Nid> {
        let configuration = self.registry.configuration_assemblage();
        self.store
            .assemblages()
            .into_iter()
            .filter(|a| *a != configuration)
            .collect()
    }

    fn members(&self, unit: Nid) -> Vec<Nid> {
        self.store.members(unit)
    }

    fn document(&self, nid: Nid) -> Option<IndexDocument> {
        let chronology = self.store.chronology(nid)?;
        let assemblage = chronology.assemblage()?;
        if assemblage == self.registry.configuration_assemblage() {
            return None;
        }
        let columns = self.registry.indexed_columns(assemblage)?;
        semantic_document(&chronology, &columns)
    }
}
