//! Chronologies: append-only version histories
//!
//! A chronology is owned by exactly one component and is only ever extended.
//! Versions are kept in insertion order (oldest first); the visible version
//! is chosen at read time by `resolve_latest`, never by position.

use crate::contract::StampCoordinate;
use crate::error::{Error, Result};
use crate::ids::Nid;
use crate::latest::{resolve_latest_with, LatestVersion, PathOrigins};
use crate::version::{Payload, PayloadKind, Version};
use serde::{Deserialize, Serialize};

/// What kind of component owns the chronology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChronologyKind {
    /// A concept
    Concept,
    /// A semantic attached to `referenced_component`, grouped by `assemblage`
    Semantic {
        /// Grouping / schema concept
        assemblage: Nid,
        /// Component the fact is about
        referenced_component: Nid,
    },
}

/// Append-only version list of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chronology {
    nid: Nid,
    kind: ChronologyKind,
    versions: Vec<Version>,
}

impl Chronology {
    /// Empty chronology for a component
    pub fn new(nid: Nid, kind: ChronologyKind) -> Self {
        Chronology {
            nid,
            kind,
            versions: Vec::new(),
        }
    }

    /// Owning component
    pub fn nid(&self) -> Nid {
        self.nid
    }

    /// Concept or semantic
    pub fn kind(&self) -> ChronologyKind {
        self.kind
    }

    /// Assemblage, for semantics
    pub fn assemblage(&self) -> Option<Nid> {
        match self.kind {
            ChronologyKind::Semantic { assemblage, .. } => Some(assemblage),
            ChronologyKind::Concept => None,
        }
    }

    /// Referenced component, for semantics
    pub fn referenced_component(&self) -> Option<Nid> {
        match self.kind {
            ChronologyKind::Semantic {
                referenced_component,
                ..
            } => Some(referenced_component),
            ChronologyKind::Concept => None,
        }
    }

    /// Every version, oldest first
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Payload kind shared by all versions, once the first is appended
    pub fn payload_kind(&self) -> Option<PayloadKind> {
        self.versions.first().map(|v| v.payload().kind())
    }

    /// Append a version
    ///
    /// # Errors
    ///
    /// `PayloadKindMismatch` if the payload kind differs from earlier versions,
    /// or if a concept chronology receives a non-concept payload (and vice versa).
    pub fn push(&mut self, version: Version) -> Result<()> {
        let actual = version.payload().kind();
        let expected = match (self.kind, self.payload_kind()) {
            (_, Some(existing)) => existing,
            (ChronologyKind::Concept, None) => PayloadKind::Concept,
            (ChronologyKind::Semantic { .. }, None) => {
                if matches!(version.payload(), Payload::Concept) {
                    return Err(Error::PayloadKindMismatch {
                        nid: self.nid,
                        expected: PayloadKind::String,
                        actual,
                    });
                }
                actual
            }
        };
        if expected != actual {
            return Err(Error::PayloadKindMismatch {
                nid: self.nid,
                expected,
                actual,
            });
        }
        self.versions.push(version);
        Ok(())
    }

    /// Visible version(s) under a coordinate
    pub fn latest<O: PathOrigins + ?Sized>(
        &self,
        coordinate: &StampCoordinate,
        origins: &O,
    ) -> LatestVersion<&Version> {
        resolve_latest_with(&self.versions, coordinate, origins)
    }
}
