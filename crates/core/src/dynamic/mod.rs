//! Dynamic values: the closed typed-value system
//!
//! Dynamic semantic versions carry an ordered, fixed-arity vector of
//! `DynamicValue`s. The shape of that vector is declared by the assemblage's
//! `DynamicSchema` and enforced on write.
//!
//! ## Type Rules
//!
//! - Every concrete value carries exactly one tag and a matching payload
//! - `Polymorphic` is a schema-only type: a column may accept any value, but no
//!   stored value is ever polymorphic
//! - Arrays are homogeneous; nested arrays are allowed
//! - `ByteArray` is opaque and never indexed

pub mod schema;
pub mod value;

pub use schema::{ColumnDescriptor, ColumnValidator, DynamicSchema};
pub use value::{DynamicArray, DynamicDataType, DynamicValue};
