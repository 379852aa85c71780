//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use termstore::{
    ColumnDescriptor, Database, DynamicDataType, DynamicSchema, IndexKind, Nid, Payload,
    QueryHit, QueryRequest, Stamp, StampTime, Status, TermstoreConfig,
};
use uuid::Uuid;

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (`RUST_LOG` filters it).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// TestDb
// ============================================================================

/// In-memory database plus a default author/module/path
pub struct TestDb {
    pub db: Arc<Database>,
    pub author: Nid,
    pub module: Nid,
    pub path: Nid,
}

impl TestDb {
    /// Inline indexing: every write is searchable when it returns.
    pub fn new() -> Self {
        Self::with_config(TermstoreConfig::inline())
    }

    /// Background indexing: callers wait on generations.
    pub fn background() -> Self {
        Self::with_config(TermstoreConfig::default())
    }

    pub fn with_config(cfg: TermstoreConfig) -> Self {
        init_tracing();
        let db = Database::cache_with_config(cfg).expect("open cache database");
        let epoch = {
            let c = db.system_concepts().configuration;
            Stamp::new(Status::Active, StampTime::at_micros(0), c, c, c)
        };
        let author = db.create_concept(Uuid::new_v4(), epoch).unwrap();
        let module = db.create_concept(Uuid::new_v4(), epoch).unwrap();
        let path = db.create_concept(Uuid::new_v4(), epoch).unwrap();
        TestDb {
            db,
            author,
            module,
            path,
        }
    }

    /// Active stamp at `t` on the default path
    pub fn stamp(&self, t: u64) -> Stamp {
        self.stamp_on(self.path, t)
    }

    /// Active stamp at `t` on `path`
    pub fn stamp_on(&self, path: Nid, t: u64) -> Stamp {
        Stamp::new(
            Status::Active,
            StampTime::at_micros(t),
            self.author,
            self.module,
            path,
        )
    }

    /// New concept stamped at t=1
    pub fn concept(&self) -> Nid {
        self.db.create_concept(Uuid::new_v4(), self.stamp(1)).unwrap()
    }

    /// New assemblage indexed on column 0, no schema
    pub fn indexed_assemblage(&self) -> Nid {
        let a = self.concept();
        self.db.configure_index(a, &[0], self.stamp(1)).unwrap();
        a
    }

    /// New assemblage with a dynamic schema, indexed on `indexed` columns
    pub fn dynamic_assemblage(&self, types: &[DynamicDataType], indexed: &[usize]) -> Nid {
        let a = self.concept();
        let columns = types
            .iter()
            .enumerate()
            .map(|(i, t)| ColumnDescriptor::new(i, self.concept(), *t))
            .collect();
        self.db
            .define_schema(DynamicSchema::new(a, columns).unwrap())
            .unwrap();
        self.db.configure_index(a, indexed, self.stamp(1)).unwrap();
        a
    }

    /// New semantic on a fresh concept
    pub fn semantic(&self, assemblage: Nid, t: u64, payload: Payload) -> Nid {
        let referenced = self.concept();
        self.db
            .create_semantic(Uuid::new_v4(), assemblage, referenced, self.stamp(t), payload)
            .unwrap()
    }

    /// Query at the latest requested generation of the request's index
    pub fn query(&self, request: QueryRequest) -> Vec<Nid> {
        let g = self.db.requested_generation(request.kind);
        let hits: Vec<QueryHit> = self.db.query(&request.at_generation(g)).unwrap();
        hits.into_iter().map(|h| h.nid).collect()
    }

    /// Query the semantic index
    pub fn search(&self, request: QueryRequest) -> Vec<Nid> {
        self.query(request.on(IndexKind::Semantic))
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}
