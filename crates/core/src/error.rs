//! Error types for termstore
//!
//! One error enum is shared by every layer (core, storage, search, engine).
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::dynamic::DynamicDataType;
use crate::ids::Nid;
use crate::version::PayloadKind;
use std::io;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for termstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for termstore
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No chronology exists for the nid
    #[error("Unknown component: {0}")]
    UnknownComponent(Nid),

    /// No nid is bound to the UUID
    #[error("Unknown UUID: {0}")]
    UnknownUuid(Uuid),

    /// A UUID is already bound to a different nid (UUID -> nid never reverses)
    #[error("UUID {uuid} is bound to {existing}, cannot alias to {requested}")]
    UuidConflict {
        /// The UUID being aliased
        uuid: Uuid,
        /// Nid it is already bound to
        existing: Nid,
        /// Nid the caller asked for
        requested: Nid,
    },

    /// Nid space exhausted
    #[error("Nid space exhausted")]
    NidsExhausted,

    /// A version's payload kind differs from the chronology's kind
    #[error("Payload kind mismatch on {nid}: chronology holds {expected}, got {actual}")]
    PayloadKindMismatch {
        /// Component being written
        nid: Nid,
        /// Kind fixed by the chronology
        expected: PayloadKind,
        /// Kind supplied
        actual: PayloadKind,
    },

    /// A dynamic payload was written against an assemblage with no schema
    #[error("Assemblage {0} has no dynamic schema")]
    UndefinedAssemblage(Nid),

    /// Dynamic data vector length differs from the schema length
    #[error("Arity mismatch for assemblage {assemblage}: expected {expected} columns, got {actual}")]
    ArityMismatch {
        /// Assemblage whose schema was violated
        assemblage: Nid,
        /// Schema column count
        expected: usize,
        /// Supplied column count
        actual: usize,
    },

    /// A slot's value tag differs from the column's declared type
    #[error("Column {column} expects {expected}, got {actual}")]
    ColumnTypeMismatch {
        /// Column index
        column: usize,
        /// Declared type
        expected: DynamicDataType,
        /// Supplied type
        actual: DynamicDataType,
    },

    /// A required column was left empty
    #[error("Column {column} is required")]
    MissingRequiredColumn {
        /// Column index
        column: usize,
    },

    /// A column validator rejected a value
    #[error("Column {column} rejected value: {reason}")]
    ValidatorRejected {
        /// Column index
        column: usize,
        /// Human readable reason
        reason: String,
    },

    /// Array elements do not share one type
    #[error("Array of {expected} cannot hold {actual}")]
    HeterogeneousArray {
        /// Declared element type
        expected: DynamicDataType,
        /// Offending element type
        actual: DynamicDataType,
    },

    /// Malformed schema or value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Attachment traversal found a component twice on one path
    #[error("Ownership cycle detected at {0}")]
    OwnershipCycle(Nid),

    /// Column restriction requires exactly one assemblage id
    #[error("Column restriction requires exactly one assemblage, got {assemblage_count}")]
    ColumnRestriction {
        /// Number of assemblage ids supplied
        assemblage_count: usize,
    },

    /// A range query bound is not numeric
    #[error("Range queries need a numeric bound, got {0}")]
    NonNumericRange(DynamicDataType),

    /// The value kind can never be indexed or queried
    #[error("{0} values are not indexable")]
    NotIndexable(DynamicDataType),

    /// Query could not be built
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A raw hit could not be mapped back to a component
    #[error("Could not resolve hit {doc_id}: {reason}")]
    ResultResolution {
        /// Backend document id
        doc_id: u32,
        /// What went wrong
        reason: String,
    },

    /// A long running operation observed its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// Background work queue is full or shut down
    #[error("Index scheduler rejected work: {0}")]
    Backpressure(String),

    /// Invariant violated inside the engine
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}
