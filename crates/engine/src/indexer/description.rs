//! Description index documents
//!
//! Every description semantic is indexed, regardless of the schema registry.
//! Text from every version is written tokenized and whitespace-only; the
//! description type and language are exact terms. The last version's text is
//! stored for diagnostics.

use super::{FieldSet, IndexKind, Indexer};
use std::collections::BTreeSet;
use std::sync::Arc;
use termstore_core::{Chronology, Nid, Payload, PayloadKind};
use termstore_search::{fields, IndexDocument, SearchBackend};
use termstore_storage::ChronicleStore;

/// Build the document of a description chronology
///
/// Returns `None` unless the chronology is a semantic holding descriptions.
pub fn description_document(chronology: &Chronology) -> Option<IndexDocument> {
    let assemblage = chronology.assemblage()?;
    if chronology.payload_kind() != Some(PayloadKind::Description) {
        return None;
    }
    let text_ws = fields::whitespace(fields::DESCRIPTION_TEXT);
    let mut set = FieldSet::default();
    let mut last_text = None;
    for version in chronology.versions() {
        let Payload::Description(description) = version.payload() else {
            continue;
        };
        set.tokenized(fields::DESCRIPTION_TEXT, &description.text);
        set.exact(&text_ws, &description.text);
        set.exact(
            fields::DESCRIPTION_TYPE,
            &description.description_type.to_string(),
        );
        set.exact(fields::DESCRIPTION_LANGUAGE, &description.language.to_string());
        last_text = Some(description.text.as_str());
    }
    let last_text = last_text.map(str::to_string);
    let mut document = set.into_document(chronology.nid(), assemblage);
    if let Some(text) = last_text {
        document.store(fields::DESCRIPTION_TEXT, text);
    }
    Some(document)
}

/// Indexes every description semantic
#[derive(Clone)]
pub struct DescriptionIndexer {
    store: Arc<ChronicleStore>,
    backend: Arc<dyn SearchBackend>,
}

impl DescriptionIndexer {
    /// Indexer over a store
    pub fn new(store: Arc<ChronicleStore>, backend: Arc<dyn SearchBackend>) -> Self {
        DescriptionIndexer { store, backend }
    }
}

impl Indexer for DescriptionIndexer {
    fn kind(&self) -> IndexKind {
        IndexKind::Description
    }

    fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    fn units(&self) -> Vec<Nid> {
        self.store
            .semantics_of_kind(PayloadKind::Description)
            .into_iter()
            .filter_map(|nid| self.store.chronology(nid)?.assemblage())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn members(&self, unit: Nid) -> Vec<Nid> {
        let descriptions: BTreeSet<Nid> = self
            .store
            .semantics_of_kind(PayloadKind::Description)
            .into_iter()
            .collect();
        self.store
            .members(unit)
            .into_iter()
            .filter(|nid| descriptions.contains(nid))
            .collect()
    }

    fn document(&self, nid: Nid) -> Option<IndexDocument> {
        description_document(&self.store.chronology(nid)?)
    }
}
