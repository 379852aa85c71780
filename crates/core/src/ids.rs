//! Component identifiers
//!
//! A component is addressed by a stable, process-local integer handle (`Nid`)
//! and by one or more portable UUIDs. The UUID side lives in the storage
//! crate's identifier service; this module only defines the handle.
//!
//! Nids are negative by convention: they are allocated upward from
//! `i32::MIN + 1`. That keeps them distinguishable from ordinary integer
//! column data in the index ("nid-shaped" values).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable internal handle of a component (concept or semantic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nid(i32);

impl Nid {
    /// First nid handed out by an empty identifier service
    pub const FIRST: Nid = Nid(i32::MIN + 1);

    /// Wrap a raw handle
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Nid(raw)
    }

    /// Raw handle value
    #[inline]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    /// The handle following this one, if any remain
    pub fn next(&self) -> Option<Nid> {
        self.0.checked_add(1).map(Nid)
    }

    /// True if the raw value looks like an allocated nid (negative)
    #[inline]
    pub fn is_nid_shaped(raw: i64) -> bool {
        raw < 0 && raw >= i32::MIN as i64
    }
}

impl fmt::Display for Nid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Nid> for i32 {
    fn from(nid: Nid) -> i32 {
        nid.0
    }
}
