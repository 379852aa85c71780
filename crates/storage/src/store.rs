//! Chronicle store: the source of truth
//!
//! Holds every component's chronology plus the secondary maps the indexers
//! need (assemblage members, attachments, payload kinds).
//!
//! # Design
//!
//! - DashMap per concern: lock-free reads, writes only lock the target shard
//! - Chronologies are append-only; nothing is ever removed
//! - Dynamic payloads are checked against the assemblage schema before the
//!   write touches any map
//! - Retirement walks the owns-graph with an explicit worklist

use crate::identifiers::IdentifierService;
use crate::paths::PathRegistry;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use termstore_core::{
    Chronology, ChronologyKind, DynamicSchema, Error, LatestVersion, Nid, Payload, PayloadKind,
    Result, Stamp, StampCoordinate, Stamped, Status, Version,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Append-only store of component chronologies
#[derive(Debug, Default)]
pub struct ChronicleStore {
    pub(crate) identifiers: IdentifierService,
    pub(crate) paths: PathRegistry,
    pub(crate) schemas: DashMap<Nid, DynamicSchema>,
    pub(crate) chronologies: DashMap<Nid, Chronology>,
    /// assemblage -> member semantics
    members: DashMap<Nid, BTreeSet<Nid>>,
    /// component -> semantics referencing it
    attachments: DashMap<Nid, BTreeSet<Nid>>,
    by_payload_kind: DashMap<PayloadKind, BTreeSet<Nid>>,
    /// Count of successful writes
    sequence: AtomicU64,
}

impl ChronicleStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(identifiers: IdentifierService, paths: PathRegistry) -> Self {
        ChronicleStore {
            identifiers,
            paths,
            ..Self::default()
        }
    }

    /// UUID ↔ nid bindings
    pub fn identifiers(&self) -> &IdentifierService {
        &self.identifiers
    }

    /// Path origins
    pub fn paths(&self) -> &PathRegistry {
        &self.paths
    }

    /// Number of successful writes since the store was created or loaded
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    /// Declare the dynamic schema of an assemblage
    ///
    /// Declaring an identical schema again is a no-op.
    ///
    /// # Errors
    ///
    /// `UnknownComponent` if the assemblage concept does not exist;
    /// `InvalidValue` if a different schema is already declared.
    pub fn define_schema(&self, schema: DynamicSchema) -> Result<()> {
        let assemblage = schema.assemblage();
        if !self.chronologies.contains_key(&assemblage) {
            return Err(Error::UnknownComponent(assemblage));
        }
        match self.schemas.entry(assemblage) {
            Entry::Occupied(e) if *e.get() == schema => Ok(()),
            Entry::Occupied(_) => Err(Error::InvalidValue(format!(
                "assemblage {} already has a different schema",
                assemblage
            ))),
            Entry::Vacant(e) => {
                info!(target: "termstore::store", %assemblage, columns = schema.len(), "Defined schema");
                e.insert(schema);
                Ok(())
            }
        }
    }

    /// Schema of an assemblage
    pub fn schema(&self, assemblage: Nid) -> Option<DynamicSchema> {
        self.schemas.get(&assemblage).map(|e| e.value().clone())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create a concept, or append a version to it if the UUID is known
    pub fn create_concept(&self, uuid: Uuid, stamp: Stamp) -> Result<Nid> {
        let nid = self.identifiers.assign(uuid)?;
        self.append_or_create(nid, ChronologyKind::Concept, stamp, Payload::Concept)?;
        Ok(nid)
    }

    /// Create a semantic, or append a version to it if the UUID is known
    ///
    /// # Errors
    ///
    /// `UnknownComponent` if the assemblage or referenced component does not
    /// exist; schema violations for dynamic payloads.
    pub fn create_semantic(
        &self,
        uuid: Uuid,
        assemblage: Nid,
        referenced_component: Nid,
        stamp: Stamp,
        payload: Payload,
    ) -> Result<Nid> {
        for required in [assemblage, referenced_component] {
            if !self.chronologies.contains_key(&required) {
                return Err(Error::UnknownComponent(required));
            }
        }
        let kind = ChronologyKind::Semantic {
            assemblage,
            referenced_component,
        };
        // Checked before a nid is bound so a rejected write leaves no binding
        let owner = self.identifiers.nid_for(&uuid).unwrap_or(assemblage);
        let payload = self.check_payload(owner, kind, payload)?;
        let nid = self.identifiers.assign(uuid)?;
        self.append_or_create(nid, kind, stamp, payload)?;
        Ok(nid)
    }

    /// Append a version to an existing component
    pub fn commit(&self, nid: Nid, stamp: Stamp, payload: Payload) -> Result<()> {
        let mut chronology = self
            .chronologies
            .get_mut(&nid)
            .ok_or(Error::UnknownComponent(nid))?;
        let payload = self.check_payload(nid, chronology.kind(), payload)?;
        chronology.push(Version::new(stamp, payload))?;
        self.sequence.fetch_add(1, Ordering::AcqRel);
        debug!(target: "termstore::store", %nid, stamp = %stamp, "Committed version");
        Ok(())
    }

    /// Append an already checked payload, creating the chronology if needed
    fn append_or_create(
        &self,
        nid: Nid,
        kind: ChronologyKind,
        stamp: Stamp,
        payload: Payload,
    ) -> Result<()> {
        let version = Version::new(stamp, payload);
        match self.chronologies.entry(nid) {
            Entry::Occupied(mut e) => {
                if e.get().kind() != kind {
                    return Err(Error::InvalidValue(format!(
                        "{} already exists as {:?}",
                        nid,
                        e.get().kind()
                    )));
                }
                e.get_mut().push(version)?;
            }
            Entry::Vacant(e) => {
                let mut chronology = Chronology::new(nid, kind);
                chronology.push(version)?;
                self.index_chronology(&chronology);
                e.insert(chronology);
                debug!(target: "termstore::store", %nid, ?kind, "Created chronology");
            }
        }
        self.sequence.fetch_add(1, Ordering::AcqRel);
        debug!(target: "termstore::store", %nid, stamp = %stamp, "Committed version");
        Ok(())
    }

    /// Enforce the assemblage schema on dynamic payloads
    ///
    /// `nid` only names the component in a kind mismatch error.
    fn check_payload(&self, nid: Nid, kind: ChronologyKind, payload: Payload) -> Result<Payload> {
        let ChronologyKind::Semantic { assemblage, .. } = kind else {
            return Ok(payload);
        };
        match (self.schemas.get(&assemblage), payload) {
            (Some(schema), Payload::Dynamic(data)) => Ok(Payload::Dynamic(schema.complete(data)?)),
            (None, Payload::Dynamic(_)) => Err(Error::UndefinedAssemblage(assemblage)),
            (Some(_), other) => Err(Error::PayloadKindMismatch {
                nid,
                expected: PayloadKind::Dynamic,
                actual: other.kind(),
            }),
            (None, other) => Ok(other),
        }
    }

    /// Record a new chronology in the secondary maps
    pub(crate) fn index_chronology(&self, chronology: &Chronology) {
        let nid = chronology.nid();
        if let ChronologyKind::Semantic {
            assemblage,
            referenced_component,
        } = chronology.kind()
        {
            self.members.entry(assemblage).or_default().insert(nid);
            self.attachments
                .entry(referenced_component)
                .or_default()
                .insert(nid);
        }
        if let Some(kind) = chronology.payload_kind() {
            self.by_payload_kind.entry(kind).or_default().insert(nid);
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// True if the component has a chronology
    pub fn contains(&self, nid: Nid) -> bool {
        self.chronologies.contains_key(&nid)
    }

    /// Number of chronologies
    pub fn len(&self) -> usize {
        self.chronologies.len()
    }

    /// True if the store holds nothing
    pub fn is_empty(&self) -> bool {
        self.chronologies.is_empty()
    }

    /// Copy of a component's chronology
    pub fn chronology(&self, nid: Nid) -> Option<Chronology> {
        self.chronologies.get(&nid).map(|e| e.value().clone())
    }

    /// Visible version(s) of a component under a coordinate
    pub fn latest(&self, nid: Nid, coordinate: &StampCoordinate) -> Result<LatestVersion<Version>> {
        let chronology = self
            .chronologies
            .get(&nid)
            .ok_or(Error::UnknownComponent(nid))?;
        Ok(chronology.latest(coordinate, &self.paths).map(Clone::clone))
    }

    /// Semantics grouped under an assemblage, ascending
    pub fn members(&self, assemblage: Nid) -> Vec<Nid> {
        self.members
            .get(&assemblage)
            .map(|e| e.value().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Assemblages with at least one member, ascending
    pub fn assemblages(&self) -> Vec<Nid> {
        let mut out: Vec<Nid> = self.members.iter().map(|e| *e.key()).collect();
        out.sort();
        out
    }

    /// Semantics whose referenced component is `nid`, ascending
    pub fn attachments(&self, nid: Nid) -> Vec<Nid> {
        self.attachments
            .get(&nid)
            .map(|e| e.value().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Semantics whose versions carry the given payload kind, ascending
    pub fn semantics_of_kind(&self, kind: PayloadKind) -> Vec<Nid> {
        self.by_payload_kind
            .get(&kind)
            .map(|e| e.value().iter().copied().collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Retirement
    // ========================================================================

    /// Retire a component and every semantic transitively attached to it
    ///
    /// Each target whose visible version (on `stamp.path`) is active gets a
    /// copy of that version stamped inactive with the given stamp's time,
    /// author, module and path. Already-inactive targets and targets with no
    /// version visible on that path are left alone.
    /// Returns the nids that received a new version, root first.
    ///
    /// # Errors
    ///
    /// `UnknownComponent` for an unknown root; `OwnershipCycle` if the
    /// owns-graph below the root is cyclic. No version is written on error.
    pub fn retire(&self, nid: Nid, stamp: Stamp) -> Result<Vec<Nid>> {
        let targets = self.attachment_closure(nid)?;
        let coordinate = StampCoordinate::latest_on(stamp.path);
        let retired_stamp = stamp.with_status(Status::Inactive);
        let mut retired = Vec::new();
        for target in targets {
            let Some(mut chronology) = self.chronologies.get_mut(&target) else {
                continue;
            };
            let visible = chronology
                .latest(&coordinate, &self.paths)
                .value()
                .map(|v| (*v).clone());
            let Some(source) = visible else {
                debug!(target: "termstore::store", %target, path = %stamp.path, "Not visible, skipped");
                continue;
            };
            if !source.stamp().status.is_active() {
                continue;
            }
            chronology.push(source.restamped(retired_stamp))?;
            self.sequence.fetch_add(1, Ordering::AcqRel);
            retired.push(target);
        }
        info!(target: "termstore::store", root = %nid, count = retired.len(), "Retired components");
        Ok(retired)
    }

    /// Root plus everything reachable over attachments, depth-first preorder
    fn attachment_closure(&self, root: Nid) -> Result<Vec<Nid>> {
        if !self.contains(root) {
            return Err(Error::UnknownComponent(root));
        }
        let pending = |nid: Nid| -> Vec<Nid> {
            let mut children = self.attachments(nid);
            children.reverse();
            children
        };
        let mut order = vec![root];
        let mut on_path: FxHashSet<Nid> = FxHashSet::default();
        let mut done: FxHashSet<Nid> = FxHashSet::default();
        on_path.insert(root);
        let mut stack = vec![(root, pending(root))];
        while let Some(frame) = stack.last_mut() {
            match frame.1.pop() {
                Some(child) => {
                    if on_path.contains(&child) {
                        return Err(Error::OwnershipCycle(child));
                    }
                    if done.contains(&child) {
                        continue;
                    }
                    on_path.insert(child);
                    order.push(child);
                    stack.push((child, pending(child)));
                }
                None => {
                    if let Some((finished, _)) = stack.pop() {
                        on_path.remove(&finished);
                        done.insert(finished);
                    }
                }
            }
        }
        Ok(order)
    }
}
