//! Storage layer for termstore
//!
//! This crate holds the committed chronicle store, the single source of truth:
//! - IdentifierService: UUID ↔ nid bindings (many-to-one, never reversed)
//! - PathRegistry: path origins consulted by PATH-precedence resolution
//! - ChronicleStore: append-only chronologies with schema enforcement on write,
//!   assemblage/attachment maps and the retire worklist
//! - Persistence: one MessagePack image written atomically
//!
//! # Concurrency
//!
//! Every map is a DashMap: reads never block each other, writes lock only the
//! shard holding the target component.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod identifiers;
pub mod paths;
pub mod persist;
pub mod store;

pub use identifiers::IdentifierService;
pub use paths::PathRegistry;
pub use store::ChronicleStore;
