//! Database engine for termstore
//!
//! This crate orchestrates the lower layers:
//! - Database: open/close, writes, reads and queries
//! - SchemaRegistry: which assemblages are indexed, on which columns
//! - Indexers: projection of chronologies into search documents
//! - IndexScheduler: per-index-kind worker with generation tracking
//! - Query building and hit resolution
//!
//! The engine is the only component that knows about:
//! - Index configuration facts and their effect on indexing
//! - Generations (read-your-writes for the derived index)
//! - Rebuild and nid-encoding migration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod background;
pub mod database;
pub mod indexer;
pub mod query;
pub mod registry;

pub use background::{IndexScheduler, SchedulerStats};
pub use database::{
    Database, IndexMode, NidQueryMode, SystemConcepts, TermstoreConfig, STORE_FILE_NAME,
};
pub use indexer::{
    rebuild, CancellationToken, DescriptionIndexer, IndexKind, IndexStats, Indexer,
    RebuildCheckpoint, RebuildOutcome, SemanticIndexer,
};
pub use query::{build_query, QueryHit, QueryRequest, QueryValue};
pub use registry::{IndexingState, SchemaRegistry};
