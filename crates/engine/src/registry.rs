//! Assemblage Schema Registry
//!
//! Tracks which assemblages are indexed and on which columns. The source of
//! truth is a family of configuration semantics in the store: one dynamic
//! semantic per configured assemblage, member of the well-known
//! `INDEX_CONFIGURATION_ASSEMBLAGE`, referencing the configured assemblage and
//! holding `[Array<Integer> columns]`. An active latest version means
//! `Indexed(columns)`, an inactive one `NotIndexed`.
//!
//! ## Refresh protocol
//!
//! - Every configuration write bumps `generation_needed`
//! - Readers compare it with the snapshot's generation; a stale reader takes
//!   the refresh permit, re-checks, rebuilds the map and swaps it in whole
//! - Readers arriving during a refresh block on the permit; readers that
//!   already hold the prior `Arc` keep reading it
//!
//! The permit is a plain `parking_lot::Mutex`, so it is not reentrant.

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use termstore_core::{
    ColumnDescriptor, DynamicArray, DynamicDataType, DynamicSchema, DynamicValue, Error, Nid,
    Payload, Result, StampCoordinate, StampPosition, StampPrecedence, StampTime, Stamped,
    StatusSet, Version,
};
use termstore_storage::ChronicleStore;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Assemblage grouping the index configuration semantics
pub const INDEX_CONFIGURATION_ASSEMBLAGE: Uuid =
    Uuid::from_u128(0x7c0e_5b1a_3f2d_5e8b_9a41_c6d2_e0f3_1b57);

/// Concept naming the single column of a configuration semantic
pub const INDEX_CONFIGURATION_COLUMNS: Uuid =
    Uuid::from_u128(0x2e9a_41c3_8d06_5f7a_b215_94ce_7d38_a6f0);

/// Indexing state of one assemblage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexingState {
    /// Members are never projected into documents
    NotIndexed,
    /// Members are indexed on these columns, ascending
    Indexed(Vec<usize>),
}

impl IndexingState {
    /// True for `Indexed`
    pub fn is_indexed(&self) -> bool {
        matches!(self, IndexingState::Indexed(_))
    }
}

/// Schema of the configuration assemblage
pub fn configuration_schema(configuration: Nid, columns_name: Nid) -> Result<DynamicSchema> {
    DynamicSchema::new(
        configuration,
        vec![ColumnDescriptor::new(0, columns_name, DynamicDataType::Array).required()],
    )
}

/// Data vector of a configuration semantic
///
/// # Errors
///
/// `InvalidValue` if a column index does not fit an Integer.
pub fn configuration_payload(columns: &[usize]) -> Result<Payload> {
    let mut sorted = columns.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let elements = sorted
        .into_iter()
        .map(|c| {
            i32::try_from(c)
                .map(DynamicValue::Integer)
                .map_err(|_| Error::InvalidValue(format!("column index {} out of range", c)))
        })
        .collect::<Result<Vec<_>>>()?;
    let array = DynamicArray::new(DynamicDataType::Integer, elements)?;
    Ok(Payload::Dynamic(vec![Some(DynamicValue::Array(array))]))
}

/// Read a configuration version; `None` if it is malformed
pub fn parse_configuration(version: &Version) -> Option<IndexingState> {
    if !version.stamp().status.is_active() {
        return Some(IndexingState::NotIndexed);
    }
    let Payload::Dynamic(data) = version.payload() else {
        return None;
    };
    let Some(Some(DynamicValue::Array(array))) = data.first() else {
        return None;
    };
    let mut columns = Vec::with_capacity(array.len());
    for element in array.elements() {
        match element {
            DynamicValue::Integer(c) if *c >= 0 => columns.push(*c as usize),
            _ => return None,
        }
    }
    columns.sort_unstable();
    columns.dedup();
    Some(IndexingState::Indexed(columns))
}

#[derive(Debug, Default)]
struct Snapshot {
    generation: u64,
    indexed: FxHashMap<Nid, Vec<usize>>,
}

/// Single-flight cache of the index configuration
pub struct SchemaRegistry {
    store: Arc<ChronicleStore>,
    configuration: Nid,
    generation_needed: AtomicU64,
    snapshot: RwLock<Arc<Snapshot>>,
    refresh_permit: Mutex<()>,
    refreshes: AtomicU64,
}

impl SchemaRegistry {
    /// Registry reading configuration semantics of `configuration`
    pub fn new(store: Arc<ChronicleStore>, configuration: Nid) -> Self {
        SchemaRegistry {
            store,
            configuration,
            generation_needed: AtomicU64::new(1),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            refresh_permit: Mutex::new(()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Nid of the configuration assemblage
    pub fn configuration_assemblage(&self) -> Nid {
        self.configuration
    }

    /// Mark the snapshot stale; the next read refreshes
    ///
    /// Returns the generation the next refresh will reach.
    pub fn invalidate(&self) -> u64 {
        let generation = self.generation_needed.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(target: "termstore::registry", generation, "Invalidated");
        generation
    }

    /// Drop the snapshot entirely and force a refresh
    pub fn reset(&self) {
        let _permit = self.refresh_permit.lock();
        *self.snapshot.write() = Arc::new(Snapshot::default());
        self.generation_needed.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of refreshes performed
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Acquire)
    }

    /// Indexing state of an assemblage
    pub fn state(&self, assemblage: Nid) -> IndexingState {
        match self.current().indexed.get(&assemblage) {
            Some(columns) => IndexingState::Indexed(columns.clone()),
            None => IndexingState::NotIndexed,
        }
    }

    /// True if the assemblage's members are indexed
    pub fn is_indexed(&self, assemblage: Nid) -> bool {
        self.current().indexed.contains_key(&assemblage)
    }

    /// Indexed columns of an assemblage, ascending
    pub fn indexed_columns(&self, assemblage: Nid) -> Option<Vec<usize>> {
        self.current().indexed.get(&assemblage).cloned()
    }

    /// Number of indexed columns; 0 when not indexed
    pub fn indexed_column_count(&self, assemblage: Nid) -> usize {
        self.current()
            .indexed
            .get(&assemblage)
            .map_or(0, Vec::len)
    }

    /// Every indexed assemblage, ascending
    pub fn indexed_assemblages(&self) -> Vec<Nid> {
        let mut out: Vec<Nid> = self.current().indexed.keys().copied().collect();
        out.sort();
        out
    }

    fn current(&self) -> Arc<Snapshot> {
        let snapshot = self.snapshot.read().clone();
        if snapshot.generation >= self.generation_needed.load(Ordering::Acquire) {
            return snapshot;
        }

        let _permit = self.refresh_permit.lock();
        // Another reader may have refreshed while we waited
        let snapshot = self.snapshot.read().clone();
        let needed = self.generation_needed.load(Ordering::Acquire);
        if snapshot.generation >= needed {
            return snapshot;
        }
        let fresh = Arc::new(self.load(needed));
        *self.snapshot.write() = Arc::clone(&fresh);
        self.refreshes.fetch_add(1, Ordering::AcqRel);
        info!(
            target: "termstore::registry",
            generation = needed,
            indexed = fresh.indexed.len(),
            "Refreshed index configuration"
        );
        fresh
    }

    fn load(&self, generation: u64) -> Snapshot {
        let coordinate = StampCoordinate::new(
            StampPrecedence::Time,
            StampPosition::new(self.configuration, StampTime::Uncommitted),
        )
        .with_statuses(StatusSet::ANY);

        // assemblage -> (time of the deciding version, state)
        let mut decided: FxHashMap<Nid, (StampTime, IndexingState)> = FxHashMap::default();
        for fact in self.store.members(self.configuration) {
            let Some(chronology) = self.store.chronology(fact) else {
                continue;
            };
            let Some(assemblage) = chronology.referenced_component() else {
                continue;
            };
            let latest = chronology.latest(&coordinate, self.store.paths());
            let Some(version) = latest.value() else {
                continue;
            };
            let Some(state) = parse_configuration(version) else {
                warn!(target: "termstore::registry", %fact, %assemblage, "Malformed index configuration");
                continue;
            };
            let time = version.stamp().time;
            match decided.get(&assemblage) {
                Some((existing, _)) if *existing > time => {}
                _ => {
                    decided.insert(assemblage, (time, state));
                }
            }
        }

        let indexed = decided
            .into_iter()
            .filter_map(|(assemblage, (_, state))| match state {
                IndexingState::Indexed(columns) => Some((assemblage, columns)),
                IndexingState::NotIndexed => None,
            })
            .collect();
        Snapshot {
            generation,
            indexed,
        }
    }
}
