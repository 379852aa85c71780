//! End-to-end scenarios
//!
//! Each module drives the public `termstore` API through one concern:
//! - resolution: visibility of versions across time and paths
//! - indexing: what reaches the derived index and when
//! - queries: text, exact and numeric queries, restrictions and errors
//! - properties: randomized determinism and idempotence checks

#[path = "../common/mod.rs"]
mod common;

mod indexing;
mod properties;
mod queries;
mod resolution;
