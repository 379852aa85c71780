//! termstore - a bitemporal, multi-path terminology content store
//!
//! Components (concepts and semantics) keep append-only chronologies of
//! STAMPed versions. Readers pick the visible version through a
//! `StampCoordinate`; a derived search index answers text, exact and numeric
//! range queries over the members of configured assemblages.
//!
//! # Quick Start
//!
//! ```ignore
//! use termstore::{Database, Payload, QueryRequest, IndexKind};
//!
//! let db = Database::cache()?;
//! let a = db.create_concept(assemblage_uuid, stamp)?;
//! db.configure_index(a, &[0], stamp)?;
//! db.create_semantic(uuid, a, concept, stamp, Payload::String("Hello World".into()))?;
//!
//! let g = db.requested_generation(IndexKind::Semantic);
//! let hits = db.query(&QueryRequest::prefix("hello").in_assemblage(a).at_generation(g))?;
//! ```
//!
//! # Architecture
//!
//! - `termstore-core`: identifiers, STAMPs, coordinates, dynamic values,
//!   chronologies and `resolve_latest`
//! - `termstore-storage`: the chronicle store and its image
//! - `termstore-search`: the in-memory search backend
//! - `termstore-engine`: registry, indexers, schedulers, queries and the
//!   `Database` facade

pub use termstore_core::*;
pub use termstore_engine::{
    CancellationToken, Database, IndexKind, IndexMode, IndexStats, IndexingState, NidQueryMode,
    QueryHit, QueryRequest, QueryValue, RebuildCheckpoint, RebuildOutcome, SystemConcepts,
    TermstoreConfig,
};
pub use termstore_search::IndexDocument;
pub use termstore_storage::ChronicleStore;
