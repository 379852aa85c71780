//! Identifier service: UUID ↔ nid
//!
//! Every component has one nid and one or more UUIDs. The UUID → nid map is
//! many-to-one (a merge aliases extra UUIDs onto an existing nid) and a
//! binding never changes once made.
//!
//! Nids are allocated upward from `Nid::FIRST` and stay negative.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use termstore_core::{Error, Nid, Result};
use tracing::debug;
use uuid::Uuid;

/// Concurrent UUID ↔ nid bindings
#[derive(Debug)]
pub struct IdentifierService {
    uuid_to_nid: DashMap<Uuid, Nid>,
    nid_to_uuids: DashMap<Nid, Vec<Uuid>>,
    next: AtomicI32,
}

impl Default for IdentifierService {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierService {
    /// Empty service
    pub fn new() -> Self {
        IdentifierService {
            uuid_to_nid: DashMap::new(),
            nid_to_uuids: DashMap::new(),
            next: AtomicI32::new(Nid::FIRST.as_i32()),
        }
    }

    /// Nid for a UUID, allocating one if the UUID is new
    pub fn assign(&self, uuid: Uuid) -> Result<Nid> {
        match self.uuid_to_nid.entry(uuid) {
            Entry::Occupied(e) => Ok(*e.get()),
            Entry::Vacant(e) => {
                let nid = self.allocate()?;
                e.insert(nid);
                self.nid_to_uuids.entry(nid).or_default().push(uuid);
                debug!(target: "termstore::store", %uuid, %nid, "Assigned nid");
                Ok(nid)
            }
        }
    }

    /// Nid bound to a UUID
    pub fn nid_for(&self, uuid: &Uuid) -> Option<Nid> {
        self.uuid_to_nid.get(uuid).map(|e| *e.value())
    }

    /// UUIDs bound to a nid, in binding order (the first is the primary)
    pub fn uuids_for(&self, nid: Nid) -> Vec<Uuid> {
        self.nid_to_uuids
            .get(&nid)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// True if the nid has been allocated
    pub fn is_allocated(&self, nid: Nid) -> bool {
        self.nid_to_uuids.contains_key(&nid)
    }

    /// Bind an additional UUID to an existing nid
    ///
    /// Binding a UUID to the nid it already has is a no-op.
    ///
    /// # Errors
    ///
    /// `UnknownComponent` if the nid was never allocated, `UuidConflict` if the
    /// UUID is already bound elsewhere.
    pub fn alias(&self, uuid: Uuid, nid: Nid) -> Result<()> {
        if !self.is_allocated(nid) {
            return Err(Error::UnknownComponent(nid));
        }
        match self.uuid_to_nid.entry(uuid) {
            Entry::Occupied(e) if *e.get() == nid => Ok(()),
            Entry::Occupied(e) => Err(Error::UuidConflict {
                uuid,
                existing: *e.get(),
                requested: nid,
            }),
            Entry::Vacant(e) => {
                e.insert(nid);
                self.nid_to_uuids.entry(nid).or_default().push(uuid);
                debug!(target: "termstore::store", %uuid, %nid, "Aliased uuid");
                Ok(())
            }
        }
    }

    /// Number of allocated nids
    pub fn len(&self) -> usize {
        self.nid_to_uuids.len()
    }

    /// True if nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.nid_to_uuids.is_empty()
    }

    /// All bindings, for persistence
    pub(crate) fn bindings(&self) -> Vec<(Nid, Vec<Uuid>)> {
        let mut out: Vec<_> = self
            .nid_to_uuids
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        out.sort_by_key(|(nid, _)| *nid);
        out
    }

    /// Next nid to hand out, for persistence
    pub(crate) fn next_raw(&self) -> i32 {
        self.next.load(Ordering::Acquire)
    }

    /// Rebuild from persisted bindings
    pub(crate) fn restore(bindings: Vec<(Nid, Vec<Uuid>)>, next: i32) -> Self {
        let service = IdentifierService::new();
        for (nid, uuids) in bindings {
            for uuid in &uuids {
                service.uuid_to_nid.insert(*uuid, nid);
            }
            service.nid_to_uuids.insert(nid, uuids);
        }
        service.next.store(next, Ordering::Release);
        service
    }

    fn allocate(&self) -> Result<Nid> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                if raw >= 0 {
                    None
                } else {
                    Some(raw + 1)
                }
            })
            .map(Nid::new)
            .map_err(|_| Error::NidsExhausted)
    }
}
