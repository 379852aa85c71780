//! Versions and their payloads
//!
//! A version is immutable once appended: a STAMP plus a kind-specific payload.
//! All versions of one chronology share a payload kind.

use crate::contract::Stamp;
use crate::dynamic::DynamicValue;
use crate::ids::Nid;
use crate::logic::LogicGraph;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything that carries a STAMP
///
/// `resolve_latest` is generic over this so that callers can resolve versions,
/// references to versions, or their own wrappers with the same algorithm.
pub trait Stamped {
    /// The version's stamp
    fn stamp(&self) -> &Stamp;
}

impl<T: Stamped + ?Sized> Stamped for &T {
    fn stamp(&self) -> &Stamp {
        (**self).stamp()
    }
}

/// Description text attached to a concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionPayload {
    /// The description text
    pub text: String,
    /// Language concept
    pub language: Nid,
    /// Case significance concept
    pub case_significance: Nid,
    /// Description type concept (e.g. fully specified name, regular name)
    pub description_type: Nid,
}

/// Kind-specific content of a version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Concept versions carry no data beyond the stamp
    Concept,
    /// Plain string semantic
    String(String),
    /// Plain long semantic
    Long(i64),
    /// Component-reference semantic
    ComponentNid(Nid),
    /// Logic-graph semantic
    LogicGraph(LogicGraph),
    /// Dynamic semantic: one slot per schema column
    Dynamic(Vec<Option<DynamicValue>>),
    /// Description semantic
    Description(DescriptionPayload),
}

/// Discriminant of `Payload`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    /// `Payload::Concept`
    Concept,
    /// `Payload::String`
    String,
    /// `Payload::Long`
    Long,
    /// `Payload::ComponentNid`
    ComponentNid,
    /// `Payload::LogicGraph`
    LogicGraph,
    /// `Payload::Dynamic`
    Dynamic,
    /// `Payload::Description`
    Description,
}

impl PayloadKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Concept => "Concept",
            PayloadKind::String => "String",
            PayloadKind::Long => "Long",
            PayloadKind::ComponentNid => "ComponentNid",
            PayloadKind::LogicGraph => "LogicGraph",
            PayloadKind::Dynamic => "Dynamic",
            PayloadKind::Description => "Description",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Payload {
    /// Discriminant
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Concept => PayloadKind::Concept,
            Payload::String(_) => PayloadKind::String,
            Payload::Long(_) => PayloadKind::Long,
            Payload::ComponentNid(_) => PayloadKind::ComponentNid,
            Payload::LogicGraph(_) => PayloadKind::LogicGraph,
            Payload::Dynamic(_) => PayloadKind::Dynamic,
            Payload::Description(_) => PayloadKind::Description,
        }
    }
}

/// One immutable version of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    stamp: Stamp,
    payload: Payload,
}

impl Version {
    /// Create a version
    pub fn new(stamp: Stamp, payload: Payload) -> Self {
        Version { stamp, payload }
    }

    /// The payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Copy of this version's payload under a new stamp
    pub fn restamped(&self, stamp: Stamp) -> Self {
        Version {
            stamp,
            payload: self.payload.clone(),
        }
    }
}

impl Stamped for Version {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }
}
