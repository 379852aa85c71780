//! Core types for termstore
//!
//! This crate defines the foundational types used throughout the system:
//! - Nid: process-local integer handle for a component
//! - Timestamp / StampTime: commit instants and the uncommitted sentinel
//! - Stamp / Status: the STAMP tuple carried by every version
//! - StampCoordinate: read-time visibility filter and resolution policy
//! - DynamicValue / DynamicDataType / DynamicSchema: the closed typed-value system
//! - LogicGraph: definition DAGs whose concept leaves are indexed
//! - Version / Payload / Chronology: append-only component histories
//! - resolve_latest: the single "which version is visible" algorithm
//! - Error: error type shared by every layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chronology;
pub mod contract;
pub mod dynamic;
pub mod error;
pub mod ids;
pub mod latest;
pub mod logic;
pub mod version;

pub use chronology::{Chronology, ChronologyKind};
pub use contract::{
    Stamp, StampCoordinate, StampPosition, StampPrecedence, StampTime, Status, StatusSet,
    Timestamp,
};
pub use dynamic::{
    ColumnDescriptor, ColumnValidator, DynamicArray, DynamicDataType, DynamicSchema,
    DynamicValue,
};
pub use error::{Error, Result};
pub use ids::Nid;
pub use latest::{
    relative_position, resolve_latest, resolve_latest_with, LatestVersion, NoPathOrigins,
    PathOrigins, RelativePosition,
};
pub use logic::{LogicGraph, LogicGraphBuilder, LogicNode, LogicNodeKind, NodeId};
pub use version::{DescriptionPayload, Payload, PayloadKind, Stamped, Version};
