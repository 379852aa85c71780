//! Contract types for versioned reads
//!
//! Every version carries a STAMP (Status, Time, Author, Module, Path), and every
//! read goes through a `StampCoordinate` that filters and orders those stamps.
//!
//! ## Module Structure
//!
//! - `timestamp`: commit instants and the uncommitted sentinel
//! - `stamp`: the STAMP tuple and status values
//! - `coordinate`: stamp positions, precedence and coordinates
//!
//! ## Usage
//!
//! ```
//! use termstore_core::contract::{Stamp, StampCoordinate, StampPosition, Status};
//! ```

pub mod coordinate;
pub mod stamp;
pub mod timestamp;

// Re-exports
pub use coordinate::{StampCoordinate, StampPosition, StampPrecedence, StatusSet};
pub use stamp::{Stamp, Status};
pub use timestamp::{StampTime, Timestamp};
