//! Database struct and open/close logic
//!
//! This module provides the main Database struct that orchestrates:
//! - The chronicle store (source of truth) and its persisted image
//! - The Assemblage Schema Registry
//! - One search backend, indexer and scheduler per index kind
//! - The write, read and query API
//!
//! ## Write path
//!
//! A write goes to the store first. Index work for the written component is
//! then submitted to each affected index kind's scheduler, waiting for queue
//! space when the queue is full; the call returns without waiting for the
//! work itself unless the database runs in inline mode. Readers
//! that need their own writes pass `requested_generation(kind)` as the
//! query's target generation.
//!
//! Writing an index configuration fact invalidates the registry and schedules
//! a rebuild of the configured assemblage.

pub mod config;

pub use config::{IndexMode, NidQueryMode, TermstoreConfig};

use crate::background::IndexScheduler;
use crate::indexer::{
    rebuild, CancellationToken, DescriptionIndexer, IndexKind, IndexStats, Indexer,
    RebuildCheckpoint, RebuildOutcome, SemanticIndexer,
};
use crate::query::{build_query, collect, QueryHit, QueryRequest};
use crate::registry::{
    configuration_payload, configuration_schema, IndexingState, SchemaRegistry,
    INDEX_CONFIGURATION_ASSEMBLAGE, INDEX_CONFIGURATION_COLUMNS,
};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use termstore_core::{
    relative_position, DynamicSchema, Error, LatestVersion, Nid, Payload, PayloadKind,
    RelativePosition, Result, Stamp, StampCoordinate, StampPosition, StampPrecedence, StampTime,
    Status, StatusSet, Timestamp, Version,
};
use termstore_search::{InMemoryIndex, IndexDocument, SearchBackend};
use termstore_storage::ChronicleStore;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Store image file name inside the data directory.
pub const STORE_FILE_NAME: &str = "store.tsim";

// ============================================================================
// Database Struct
// ============================================================================

/// Concepts every database bootstraps on open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemConcepts {
    /// Assemblage of the index configuration facts
    pub configuration: Nid,
    /// Name concept of the configuration's columns field
    pub columns: Nid,
}

struct IndexUnit {
    indexer: Arc<dyn Indexer>,
    scheduler: IndexScheduler,
}

impl IndexUnit {
    fn backend(&self) -> &Arc<dyn SearchBackend> {
        self.indexer.backend()
    }
}

/// Main database struct
///
/// Create a database by calling `Database::open()` or `Database::cache()`.
///
/// # Example
///
/// ```text
/// use termstore_engine::{Database, QueryRequest};
///
/// let db = Database::cache()?;
/// let a = db.create_concept(assemblage_uuid, stamp)?;
/// db.configure_index(a, &[0], stamp)?;
/// db.create_semantic(uuid, a, concept, stamp, Payload::String("Hello World".into()))?;
/// let g = db.requested_generation(IndexKind::Semantic);
/// let hits = db.query(&QueryRequest::prefix("hello").in_assemblage(a).at_generation(g))?;
/// ```
pub struct Database {
    /// Data directory path (empty for cache databases)
    data_dir: PathBuf,

    /// Whether the store image is written on flush and shutdown
    persistent: bool,

    /// Committed chronologies, the single source of truth
    store: Arc<ChronicleStore>,

    /// Which assemblages are indexed, on which columns
    registry: Arc<SchemaRegistry>,

    semantic: IndexUnit,
    description: IndexUnit,

    system: SystemConcepts,

    /// Configuration as opened (mirrors termstore.toml)
    config: TermstoreConfig,

    /// Switched to `Exact` by `migrate_nid_encoding`
    nid_mode: RwLock<NidQueryMode>,

    /// Set to false during shutdown to reject new writes
    accepting_writes: AtomicBool,
}

impl Database {
    /// Open a database at the given path
    ///
    /// Reads `termstore.toml` from the data directory, creating one with
    /// defaults if missing. An existing store image is loaded and both
    /// indexes are rebuilt from it.
    ///
    /// # Errors
    ///
    /// Config, directory creation or image loading failures.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join(config::CONFIG_FILE_NAME);
        TermstoreConfig::write_default_if_missing(&config_path)?;
        let cfg = TermstoreConfig::from_file(&config_path)?;

        Self::open_with_config(path, cfg)
    }

    /// Open a database at the given path with an explicit configuration.
    ///
    /// The supplied config is written to `termstore.toml` so that later
    /// `Database::open()` calls pick up the same settings.
    ///
    /// # Errors
    ///
    /// Invalid config, I/O or image loading failures.
    pub fn open_with_config<P: AsRef<Path>>(path: P, cfg: TermstoreConfig) -> Result<Arc<Self>> {
        cfg.validate()?;
        let data_dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        cfg.write_to_file(&data_dir.join(config::CONFIG_FILE_NAME))?;

        let image = data_dir.join(STORE_FILE_NAME);
        let store = if image.exists() {
            ChronicleStore::load(&image)?
        } else {
            ChronicleStore::new()
        };
        Self::assemble(data_dir, true, store, cfg)
    }

    /// Create an in-memory database with default configuration
    ///
    /// Nothing is written to disk.
    pub fn cache() -> Result<Arc<Self>> {
        Self::cache_with_config(TermstoreConfig::default())
    }

    /// Create an in-memory database
    ///
    /// # Errors
    ///
    /// Invalid config or a worker thread that cannot be spawned.
    pub fn cache_with_config(cfg: TermstoreConfig) -> Result<Arc<Self>> {
        cfg.validate()?;
        Self::assemble(PathBuf::new(), false, ChronicleStore::new(), cfg)
    }

    /// Create an in-memory database seeded from a store image
    ///
    /// # Errors
    ///
    /// Invalid config or image loading failures.
    pub fn from_image(image: &Path, cfg: TermstoreConfig) -> Result<Arc<Self>> {
        cfg.validate()?;
        let store = ChronicleStore::load(image)?;
        Self::assemble(PathBuf::new(), false, store, cfg)
    }

    fn assemble(
        data_dir: PathBuf,
        persistent: bool,
        store: ChronicleStore,
        cfg: TermstoreConfig,
    ) -> Result<Arc<Self>> {
        let store = Arc::new(store);
        let system = bootstrap(&store)?;
        let registry = Arc::new(SchemaRegistry::new(Arc::clone(&store), system.configuration));

        let semantic_backend: Arc<dyn SearchBackend> = Arc::new(InMemoryIndex::new());
        let semantic_indexer: Arc<dyn Indexer> = Arc::new(SemanticIndexer::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            semantic_backend,
        ));
        let description_backend: Arc<dyn SearchBackend> = Arc::new(InMemoryIndex::new());
        let description_indexer: Arc<dyn Indexer> = Arc::new(DescriptionIndexer::new(
            Arc::clone(&store),
            description_backend,
        ));

        let unit = |indexer: Arc<dyn Indexer>| -> Result<IndexUnit> {
            let scheduler = IndexScheduler::new(
                indexer.kind(),
                Arc::clone(indexer.backend()),
                cfg.index_mode,
                cfg.max_queue_depth,
            )?;
            Ok(IndexUnit { indexer, scheduler })
        };

        let semantic = unit(semantic_indexer)?;
        let description = unit(description_indexer)?;

        let db = Arc::new(Self {
            data_dir,
            persistent,
            semantic,
            description,
            store,
            registry,
            system,
            nid_mode: RwLock::new(cfg.nid_query_mode),
            config: cfg,
            accepting_writes: AtomicBool::new(true),
        });

        for kind in IndexKind::ALL {
            db.rebuild(kind, &CancellationToken::new(), None)?;
        }
        info!(
            target: "termstore::db",
            path = %db.data_dir.display(),
            components = db.store.len(),
            indexed_assemblages = db.registry.indexed_assemblages().len(),
            mode = ?db.config.index_mode,
            "Database opened"
        );
        Ok(db)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Chronicle store
    pub fn store(&self) -> &Arc<ChronicleStore> {
        &self.store
    }

    /// Assemblage Schema Registry
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Bootstrapped system concepts
    pub fn system_concepts(&self) -> SystemConcepts {
        self.system
    }

    /// Configuration the database was opened with
    pub fn config(&self) -> &TermstoreConfig {
        &self.config
    }

    /// Data directory (empty for cache databases)
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// True for databases backed by `open`
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// True until `shutdown`
    pub fn is_open(&self) -> bool {
        self.accepting_writes.load(Ordering::SeqCst)
    }

    /// Current nid query encoding
    pub fn nid_query_mode(&self) -> NidQueryMode {
        *self.nid_mode.read()
    }

    /// Nid bound to a UUID
    pub fn nid_for(&self, uuid: &Uuid) -> Option<Nid> {
        self.store.identifiers().nid_for(uuid)
    }

    fn unit(&self, kind: IndexKind) -> &IndexUnit {
        match kind {
            IndexKind::Semantic => &self.semantic,
            IndexKind::Description => &self.description,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::Backpressure("database is shut down".into()))
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Declare the dynamic schema of an assemblage
    ///
    /// # Errors
    ///
    /// As `ChronicleStore::define_schema`.
    pub fn define_schema(&self, schema: DynamicSchema) -> Result<()> {
        self.ensure_open()?;
        self.store.define_schema(schema)
    }

    /// Create a concept, or append a version if the UUID is known
    ///
    /// # Errors
    ///
    /// Nid exhaustion or a shut-down database.
    pub fn create_concept(&self, uuid: Uuid, stamp: Stamp) -> Result<Nid> {
        self.ensure_open()?;
        self.store.create_concept(uuid, stamp)
    }

    /// Create a semantic, or append a version if the UUID is known
    ///
    /// # Errors
    ///
    /// Unknown assemblage or referenced component, schema violations, or a
    /// shut-down database.
    pub fn create_semantic(
        &self,
        uuid: Uuid,
        assemblage: Nid,
        referenced_component: Nid,
        stamp: Stamp,
        payload: Payload,
    ) -> Result<Nid> {
        self.ensure_open()?;
        let nid = self
            .store
            .create_semantic(uuid, assemblage, referenced_component, stamp, payload)?;
        self.after_write(nid);
        Ok(nid)
    }

    /// Append a version to a component
    ///
    /// # Errors
    ///
    /// Unknown component, schema or payload-kind violations, or a shut-down
    /// database.
    pub fn commit(&self, nid: Nid, stamp: Stamp, payload: Payload) -> Result<()> {
        self.ensure_open()?;
        self.store.commit(nid, stamp, payload)?;
        self.after_write(nid);
        Ok(())
    }

    /// Retire a component and everything attached to it
    ///
    /// Returns the nids that received an inactive version.
    ///
    /// # Errors
    ///
    /// As `ChronicleStore::retire`.
    pub fn retire(&self, nid: Nid, stamp: Stamp) -> Result<Vec<Nid>> {
        self.ensure_open()?;
        let retired = self.store.retire(nid, stamp)?;
        for target in &retired {
            self.after_write(*target);
        }
        Ok(retired)
    }

    /// Schedule index work for a committed component
    ///
    /// The version is already in the store, so a scheduling failure is
    /// logged rather than returned. It only happens once the schedulers are
    /// shut down, and the indexes are rebuilt from the image on reopen.
    fn after_write(&self, nid: Nid) {
        if let Err(e) = self.schedule_write(nid) {
            warn!(target: "termstore::db", %nid, error = %e, "Index work not scheduled");
        }
    }

    fn schedule_write(&self, nid: Nid) -> Result<()> {
        let Some(chronology) = self.store.chronology(nid) else {
            return Ok(());
        };
        let Some(assemblage) = chronology.assemblage() else {
            // concepts are not indexed
            return Ok(());
        };

        if assemblage == self.system.configuration {
            self.registry.invalidate();
            if let Some(configured) = chronology.referenced_component() {
                self.schedule_unit(IndexKind::Semantic, configured)?;
            }
            return Ok(());
        }

        self.schedule_component(IndexKind::Semantic, nid)?;
        if chronology.payload_kind() == Some(PayloadKind::Description) {
            self.schedule_component(IndexKind::Description, nid)?;
        }
        Ok(())
    }

    fn schedule_component(&self, kind: IndexKind, nid: Nid) -> Result<u64> {
        let unit = self.unit(kind);
        let indexer = Arc::clone(&unit.indexer);
        let generation = unit.scheduler.submit(move || {
            indexer.index(nid);
        })?;
        debug!(target: "termstore::db", %kind, %nid, generation, "Scheduled index task");
        Ok(generation)
    }

    fn schedule_unit(&self, kind: IndexKind, assemblage: Nid) -> Result<u64> {
        let unit = self.unit(kind);
        let indexer = Arc::clone(&unit.indexer);
        let generation = unit.scheduler.submit(move || {
            indexer.reindex_unit(assemblage);
        })?;
        debug!(target: "termstore::db", %kind, %assemblage, generation, "Scheduled unit rebuild");
        Ok(generation)
    }

    // ========================================================================
    // Index configuration
    // ========================================================================

    /// Index the members of `assemblage` on `columns`
    ///
    /// Commits a configuration fact and schedules the assemblage's rebuild.
    /// Returns the generation at which the rebuild is visible.
    ///
    /// # Errors
    ///
    /// `UnknownComponent` if the assemblage does not exist.
    pub fn configure_index(&self, assemblage: Nid, columns: &[usize], stamp: Stamp) -> Result<u64> {
        self.ensure_open()?;
        let payload = configuration_payload(columns)?;
        let generation = self.write_configuration(assemblage, stamp, payload)?;
        info!(
            target: "termstore::registry",
            %assemblage,
            columns = ?columns,
            generation,
            "Configured index"
        );
        Ok(generation)
    }

    /// Stop indexing the members of `assemblage`
    ///
    /// Their documents are removed by the scheduled rebuild. Returns the
    /// generation at which the removal is visible.
    ///
    /// # Errors
    ///
    /// `UnknownComponent` if the assemblage does not exist.
    pub fn disable_index(&self, assemblage: Nid, stamp: Stamp) -> Result<u64> {
        self.ensure_open()?;
        let columns = match self.registry.state(assemblage) {
            IndexingState::Indexed(columns) => columns,
            IndexingState::NotIndexed => Vec::new(),
        };
        let payload = configuration_payload(&columns)?;
        let generation =
            self.write_configuration(assemblage, stamp.with_status(Status::Inactive), payload)?;
        info!(target: "termstore::registry", %assemblage, generation, "Disabled index");
        Ok(generation)
    }

    fn write_configuration(&self, assemblage: Nid, stamp: Stamp, payload: Payload) -> Result<u64> {
        let uuid = self.configuration_uuid(assemblage)?;
        self.store.create_semantic(
            uuid,
            self.system.configuration,
            assemblage,
            stamp,
            payload,
        )?;
        self.registry.invalidate();
        match self.schedule_unit(IndexKind::Semantic, assemblage) {
            Ok(generation) => Ok(generation),
            Err(e) => {
                // committed; the rebuild happens on reopen
                warn!(target: "termstore::db", %assemblage, error = %e, "Index rebuild not scheduled");
                Ok(self.requested_generation(IndexKind::Semantic))
            }
        }
    }

    /// Stable identity of an assemblage's configuration fact
    fn configuration_uuid(&self, assemblage: Nid) -> Result<Uuid> {
        let primary = self
            .store
            .identifiers()
            .uuids_for(assemblage)
            .first()
            .copied()
            .ok_or(Error::UnknownComponent(assemblage))?;
        if !self.store.contains(assemblage) {
            return Err(Error::UnknownComponent(assemblage));
        }
        Ok(Uuid::new_v5(&INDEX_CONFIGURATION_ASSEMBLAGE, primary.as_bytes()))
    }

    /// Indexing state of an assemblage
    pub fn indexing_state(&self, assemblage: Nid) -> IndexingState {
        self.registry.state(assemblage)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Visible version(s) of a component under a coordinate
    ///
    /// # Errors
    ///
    /// `UnknownComponent` if the nid has no chronology.
    pub fn resolve_latest(
        &self,
        nid: Nid,
        coordinate: &StampCoordinate,
    ) -> Result<LatestVersion<Version>> {
        self.store.latest(nid, coordinate)
    }

    /// Order of two stamps as seen from a coordinate
    pub fn relative_position(
        &self,
        a: &Stamp,
        b: &Stamp,
        coordinate: &StampCoordinate,
    ) -> RelativePosition {
        relative_position(a, b, coordinate, self.store.paths())
    }

    /// Record that `path` branches from `origin`
    pub fn add_path_origin(&self, path: Nid, origin: StampPosition) {
        self.store.paths().add_origin(path, origin);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Run a query and resolve its hits to component nids
    ///
    /// With a target generation, blocks until that generation is applied.
    ///
    /// # Errors
    ///
    /// Query misuse (see `build_query`), a target generation that was never
    /// handed out, or unresolvable hits under strict result resolution.
    pub fn query(&self, request: &QueryRequest) -> Result<Vec<QueryHit>> {
        let unit = self.unit(request.kind);
        if let Some(target) = request.target_generation {
            let requested = unit.scheduler.requested_generation();
            if target > requested {
                return Err(Error::InvalidQuery(format!(
                    "generation {} of the {} index has not been requested (latest {})",
                    target, request.kind, requested
                )));
            }
            unit.backend().wait_for_generation(target, None);
        }

        let query = build_query(request, &self.registry, self.nid_query_mode())?;
        let hits = unit.backend().search(&query);
        let matched = hits.len();
        let describe = |nid: Nid| self.describe(nid);
        let results = collect(
            unit.backend().as_ref(),
            hits,
            request,
            self.config.default_page_size,
            self.config.strict_result_resolution,
            &describe,
        )?;
        debug!(
            target: "termstore::query",
            kind = %request.kind,
            matched,
            returned = results.len(),
            "Query executed"
        );
        Ok(results)
    }

    /// Best-effort description text of a component, for diagnostics
    fn describe(&self, nid: Nid) -> Option<String> {
        // TIME precedence ignores the position's path: newest version on any path
        let coordinate = StampCoordinate::new(
            StampPrecedence::Time,
            StampPosition::latest(self.system.configuration),
        )
        .with_statuses(StatusSet::ANY);
        let text_of = |n: Nid| {
            let latest = self.store.latest(n, &coordinate).ok()?;
            match latest.value()?.payload() {
                Payload::Description(d) => Some(d.text.clone()),
                _ => None,
            }
        };
        text_of(nid).or_else(|| self.store.attachments(nid).into_iter().find_map(text_of))
    }

    /// Current document of a component in an index, if any
    pub fn index_document(&self, kind: IndexKind, nid: Nid) -> Option<IndexDocument> {
        self.unit(kind).backend().document(&nid.to_string())
    }

    /// Highest generation handed out for an index kind
    pub fn requested_generation(&self, kind: IndexKind) -> u64 {
        self.unit(kind).scheduler.requested_generation()
    }

    /// Point-in-time statistics of an index kind
    pub fn stats(&self, kind: IndexKind) -> IndexStats {
        let unit = self.unit(kind);
        let scheduler = unit.scheduler.stats();
        IndexStats {
            kind,
            documents: unit.backend().doc_count(),
            applied_generation: unit.backend().applied_generation(),
            requested_generation: scheduler.requested_generation,
            queue_depth: scheduler.queue_depth,
            tasks_completed: scheduler.tasks_completed,
        }
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Rebuild one index kind from the store on the calling thread
    ///
    /// Stops between assemblages once `token` is cancelled; pass the returned
    /// checkpoint back to resume.
    ///
    /// # Errors
    ///
    /// `InvalidValue` if the checkpoint belongs to another index kind.
    pub fn rebuild(
        &self,
        kind: IndexKind,
        token: &CancellationToken,
        checkpoint: Option<RebuildCheckpoint>,
    ) -> Result<RebuildOutcome> {
        rebuild(self.unit(kind).indexer.as_ref(), token, checkpoint)
    }

    /// Rewrite every semantic document, then query nids as exact terms only
    ///
    /// The mode is persisted to `termstore.toml` for disk databases.
    ///
    /// # Errors
    ///
    /// Config write failures.
    pub fn migrate_nid_encoding(&self) -> Result<RebuildOutcome> {
        self.semantic.scheduler.drain();
        let outcome = self.rebuild(IndexKind::Semantic, &CancellationToken::new(), None)?;
        *self.nid_mode.write() = NidQueryMode::Exact;
        if self.persistent {
            let cfg = TermstoreConfig {
                nid_query_mode: NidQueryMode::Exact,
                ..self.config.clone()
            };
            cfg.write_to_file(&self.data_dir.join(config::CONFIG_FILE_NAME))?;
        }
        info!(
            target: "termstore::db",
            documents = outcome.documents,
            "Migrated nid encoding to exact terms"
        );
        Ok(outcome)
    }

    /// Block until every scheduled index task has been applied
    pub fn drain(&self) {
        for kind in IndexKind::ALL {
            self.unit(kind).scheduler.drain();
        }
    }

    /// Drain index work and write the store image for disk databases
    ///
    /// # Errors
    ///
    /// I/O or serialization failures.
    pub fn flush(&self) -> Result<()> {
        self.drain();
        if self.persistent {
            self.store.save(&self.data_dir.join(STORE_FILE_NAME))?;
        }
        Ok(())
    }

    /// Write the store image to an explicit path
    ///
    /// # Errors
    ///
    /// I/O or serialization failures.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.store.save(path)
    }

    /// Graceful shutdown
    ///
    /// Rejects new writes, lets queued index work finish, stops the workers
    /// and writes the store image.
    ///
    /// # Errors
    ///
    /// I/O or serialization failures from the final flush.
    pub fn shutdown(&self) -> Result<()> {
        if !self.accepting_writes.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.drain();
        for kind in IndexKind::ALL {
            self.unit(kind).scheduler.shutdown();
        }
        self.flush()?;
        info!(target: "termstore::db", path = %self.data_dir.display(), "Database shut down");
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(target: "termstore::db", error = %e, "Final flush failed");
        }
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Create the configuration concepts and schema if missing
///
/// System concepts stamp themselves: author, module and path are the
/// configuration assemblage, at the epoch.
fn bootstrap(store: &ChronicleStore) -> Result<SystemConcepts> {
    let configuration = store.identifiers().assign(INDEX_CONFIGURATION_ASSEMBLAGE)?;
    let stamp = Stamp::new(
        Status::Active,
        StampTime::Committed(Timestamp::EPOCH),
        configuration,
        configuration,
        configuration,
    );
    if !store.contains(configuration) {
        store.create_concept(INDEX_CONFIGURATION_ASSEMBLAGE, stamp)?;
    }
    let columns = store.identifiers().assign(INDEX_CONFIGURATION_COLUMNS)?;
    if !store.contains(columns) {
        store.create_concept(INDEX_CONFIGURATION_COLUMNS, stamp)?;
    }
    store.define_schema(configuration_schema(configuration, columns)?)?;
    Ok(SystemConcepts {
        configuration,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryValue;
    use std::ops::Bound;
    use termstore_core::{
        ColumnDescriptor, DescriptionPayload, DynamicDataType, DynamicValue, Stamped,
    };

    fn stamp(db: &Database, t: u64) -> Stamp {
        let p = db.system_concepts().configuration;
        Stamp::new(Status::Active, StampTime::at_micros(t), p, p, p)
    }

    fn inline() -> Arc<Database> {
        Database::cache_with_config(TermstoreConfig::inline()).unwrap()
    }

    fn nids(hits: &[QueryHit]) -> Vec<Nid> {
        hits.iter().map(|h| h.nid).collect()
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let store = ChronicleStore::new();
        let first = bootstrap(&store).unwrap();
        let count = store.len();
        let second = bootstrap(&store).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), count);
        assert_eq!(
            store.chronology(first.configuration).unwrap().versions().len(),
            1
        );
    }

    #[test]
    fn test_configure_write_query() {
        let db = inline();
        let s = stamp(&db, 100);
        let a = db.create_concept(Uuid::new_v4(), s).unwrap();
        let c = db.create_concept(Uuid::new_v4(), s).unwrap();
        db.configure_index(a, &[0], s).unwrap();
        let sem = db
            .create_semantic(Uuid::new_v4(), a, c, s, Payload::String("Hello World".into()))
            .unwrap();

        let hits = db.query(&QueryRequest::prefix("hel").in_assemblage(a)).unwrap();
        assert_eq!(nids(&hits), vec![sem]);
        assert_eq!(db.stats(IndexKind::Semantic).documents, 1);
    }

    #[test]
    fn test_configuring_later_indexes_existing_members() {
        let db = inline();
        let s = stamp(&db, 100);
        let a = db.create_concept(Uuid::new_v4(), s).unwrap();
        let c = db.create_concept(Uuid::new_v4(), s).unwrap();
        let sem = db
            .create_semantic(Uuid::new_v4(), a, c, s, Payload::String("retinol".into()))
            .unwrap();
        assert!(db.query(&QueryRequest::text("retinol")).unwrap().is_empty());

        let g = db.configure_index(a, &[0], s).unwrap();
        let hits = db.query(&QueryRequest::text("retinol").at_generation(g)).unwrap();
        assert_eq!(nids(&hits), vec![sem]);
    }

    #[test]
    fn test_disable_removes_documents() {
        let db = inline();
        let s = stamp(&db, 100);
        let a = db.create_concept(Uuid::new_v4(), s).unwrap();
        let c = db.create_concept(Uuid::new_v4(), s).unwrap();
        db.configure_index(a, &[0], s).unwrap();
        db.create_semantic(Uuid::new_v4(), a, c, s, Payload::String("retinol".into()))
            .unwrap();

        db.disable_index(a, stamp(&db, 200)).unwrap();
        assert_eq!(db.indexing_state(a), IndexingState::NotIndexed);
        assert!(db.query(&QueryRequest::text("retinol")).unwrap().is_empty());
        assert_eq!(db.stats(IndexKind::Semantic).documents, 0);
    }

    #[test]
    fn test_background_mode_waits_for_generation() {
        let db = Database::cache().unwrap();
        let s = stamp(&db, 100);
        let a = db.create_concept(Uuid::new_v4(), s).unwrap();
        let c = db.create_concept(Uuid::new_v4(), s).unwrap();
        db.configure_index(a, &[0], s).unwrap();
        let sem = db
            .create_semantic(Uuid::new_v4(), a, c, s, Payload::Long(7))
            .unwrap();

        let g = db.requested_generation(IndexKind::Semantic);
        let request = QueryRequest::exact(DynamicValue::Long(7)).at_generation(g);
        assert_eq!(nids(&db.query(&request).unwrap()), vec![sem]);
        db.shutdown().unwrap();
    }

    #[test]
    fn test_unrequested_generation_rejected() {
        let db = inline();
        let g = db.requested_generation(IndexKind::Semantic);
        let err = db.query(&QueryRequest::text("x").at_generation(g + 10)).unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_description_query_by_type() {
        let db = inline();
        let s = stamp(&db, 100);
        let desc_asm = db.create_concept(Uuid::new_v4(), s).unwrap();
        let fqn = db.create_concept(Uuid::new_v4(), s).unwrap();
        let synonym = db.create_concept(Uuid::new_v4(), s).unwrap();
        let english = db.create_concept(Uuid::new_v4(), s).unwrap();
        let concept = db.create_concept(Uuid::new_v4(), s).unwrap();
        let description = |text: &str, description_type: Nid| {
            Payload::Description(DescriptionPayload {
                text: text.into(),
                language: english,
                case_significance: english,
                description_type,
            })
        };
        let d1 = db
            .create_semantic(Uuid::new_v4(), desc_asm, concept, s, description("Vitamin A", fqn))
            .unwrap();
        let d2 = db
            .create_semantic(Uuid::new_v4(), desc_asm, concept, s, description("Retinol vitamin", synonym))
            .unwrap();

        let all = db.query(&QueryRequest::descriptions("vitamin")).unwrap();
        assert_eq!(all.len(), 2);
        let synonyms = db
            .query(&QueryRequest::descriptions("vitamin").description_types([synonym]))
            .unwrap();
        assert_eq!(nids(&synonyms), vec![d2]);
        assert!(nids(&all).contains(&d1));
        assert_eq!(db.stats(IndexKind::Description).documents, 2);
    }

    #[test]
    fn test_describe_uses_newest_version_not_last_appended() {
        let db = inline();
        let s = stamp(&db, 100);
        let desc_asm = db.create_concept(Uuid::new_v4(), s).unwrap();
        let english = db.create_concept(Uuid::new_v4(), s).unwrap();
        let concept = db.create_concept(Uuid::new_v4(), s).unwrap();
        let description = |text: &str| {
            Payload::Description(DescriptionPayload {
                text: text.into(),
                language: english,
                case_significance: english,
                description_type: english,
            })
        };
        let d = db
            .create_semantic(Uuid::new_v4(), desc_asm, concept, stamp(&db, 200), description("Cholecalciferol"))
            .unwrap();
        // appended last but older
        db.commit(d, s, description("Calciferol")).unwrap();

        assert_eq!(db.describe(d).as_deref(), Some("Cholecalciferol"));
        assert_eq!(db.describe(concept).as_deref(), Some("Cholecalciferol"));
    }

    #[test]
    fn test_config_fact_written_through_commit_triggers_rebuild() {
        let db = inline();
        let s = stamp(&db, 100);
        let a = db.create_concept(Uuid::new_v4(), s).unwrap();
        let c = db.create_concept(Uuid::new_v4(), s).unwrap();
        db.create_semantic(Uuid::new_v4(), a, c, s, Payload::String("folate".into()))
            .unwrap();
        db.configure_index(a, &[0], s).unwrap();
        assert_eq!(db.query(&QueryRequest::text("folate")).unwrap().len(), 1);

        let fact = db
            .store()
            .members(db.system_concepts().configuration)
            .into_iter()
            .next()
            .unwrap();
        db.commit(
            fact,
            stamp(&db, 300).with_status(Status::Inactive),
            configuration_payload(&[0]).unwrap(),
        )
        .unwrap();
        assert!(db.query(&QueryRequest::text("folate")).unwrap().is_empty());
    }

    #[test]
    fn test_rebuild_cancel_and_resume() {
        let db = inline();
        let s = stamp(&db, 100);
        let c = db.create_concept(Uuid::new_v4(), s).unwrap();
        for _ in 0..3 {
            let a = db.create_concept(Uuid::new_v4(), s).unwrap();
            db.configure_index(a, &[0], s).unwrap();
            db.create_semantic(Uuid::new_v4(), a, c, s, Payload::Long(1))
                .unwrap();
        }

        let token = CancellationToken::new();
        token.cancel();
        let stopped = db.rebuild(IndexKind::Semantic, &token, None).unwrap();
        assert!(!stopped.complete);
        assert!(stopped.checkpoint.completed.is_empty());

        let done = db
            .rebuild(IndexKind::Semantic, &CancellationToken::new(), Some(stopped.checkpoint))
            .unwrap();
        assert!(done.complete);
        assert_eq!(done.documents, 3);
    }

    #[test]
    fn test_migrate_nid_encoding_switches_mode() {
        let db = inline();
        let s = stamp(&db, 100);
        let a = db.create_concept(Uuid::new_v4(), s).unwrap();
        let c = db.create_concept(Uuid::new_v4(), s).unwrap();
        db.configure_index(a, &[0], s).unwrap();
        let sem = db
            .create_semantic(Uuid::new_v4(), a, c, s, Payload::ComponentNid(c))
            .unwrap();

        assert_eq!(db.nid_query_mode(), NidQueryMode::Dual);
        db.migrate_nid_encoding().unwrap();
        assert_eq!(db.nid_query_mode(), NidQueryMode::Exact);
        let hits = db.query(&QueryRequest::exact(DynamicValue::Nid(c))).unwrap();
        assert_eq!(nids(&hits), vec![sem]);
    }

    #[test]
    fn test_dynamic_range_on_column() {
        let db = inline();
        let s = stamp(&db, 100);
        let a = db.create_concept(Uuid::new_v4(), s).unwrap();
        let name = db.create_concept(Uuid::new_v4(), s).unwrap();
        let c = db.create_concept(Uuid::new_v4(), s).unwrap();
        db.define_schema(
            DynamicSchema::new(
                a,
                vec![
                    ColumnDescriptor::new(0, name, DynamicDataType::String),
                    ColumnDescriptor::new(1, name, DynamicDataType::Integer),
                ],
            )
            .unwrap(),
        )
        .unwrap();
        db.configure_index(a, &[0, 1], s).unwrap();
        let sem = db
            .create_semantic(
                Uuid::new_v4(),
                a,
                c,
                s,
                Payload::Dynamic(vec![Some("dose".into()), Some(DynamicValue::Integer(42))]),
            )
            .unwrap();

        let range = |column: usize| {
            QueryRequest::range(
                Bound::Included(DynamicValue::Double(40.0)),
                Bound::Included(DynamicValue::Double(45.0)),
            )
            .in_assemblage(a)
            .columns([column])
        };
        assert_eq!(nids(&db.query(&range(1)).unwrap()), vec![sem]);
        assert!(db.query(&range(0)).unwrap().is_empty());
        assert!(matches!(range(1).value, QueryValue::Range { .. }));
    }

    #[test]
    fn test_retire_keeps_history_searchable() {
        let db = inline();
        let s = stamp(&db, 100);
        let a = db.create_concept(Uuid::new_v4(), s).unwrap();
        let c = db.create_concept(Uuid::new_v4(), s).unwrap();
        db.configure_index(a, &[0], s).unwrap();
        let sem = db
            .create_semantic(Uuid::new_v4(), a, c, s, Payload::String("niacin".into()))
            .unwrap();

        let retired = db.retire(c, stamp(&db, 200)).unwrap();
        assert_eq!(retired, vec![c, sem]);
        let latest = db
            .resolve_latest(sem, &StampCoordinate::latest_on(s.path))
            .unwrap();
        assert_eq!(latest.value().unwrap().stamp().status, Status::Inactive);
        assert_eq!(nids(&db.query(&QueryRequest::text("niacin")).unwrap()), vec![sem]);
    }

    #[test]
    fn test_writes_rejected_after_shutdown() {
        let db = inline();
        let s = stamp(&db, 100);
        db.shutdown().unwrap();
        assert!(!db.is_open());
        assert!(db.create_concept(Uuid::new_v4(), s).is_err());
        // idempotent
        db.shutdown().unwrap();
    }
}
