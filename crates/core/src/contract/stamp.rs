//! The STAMP tuple
//!
//! Status, Time, Author, Module, Path. A stamp is immutable once the version
//! carrying it is appended to a chronology; retirement is expressed by a new
//! version whose status is `Inactive`.

use super::timestamp::StampTime;
use crate::ids::Nid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Version asserts the component/fact
    Active,
    /// Version retires the component/fact
    Inactive,
}

impl Status {
    /// Check if status is active
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Active)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "Active",
            Status::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status, Time, Author, Module, Path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stamp {
    /// Active or inactive
    pub status: Status,
    /// Commit instant or uncommitted sentinel
    pub time: StampTime,
    /// Authoring user concept
    pub author: Nid,
    /// Module concept the change belongs to
    pub module: Nid,
    /// Path (branch) concept the change was made on
    pub path: Nid,
}

impl Stamp {
    /// Create a stamp
    pub fn new(status: Status, time: StampTime, author: Nid, module: Nid, path: Nid) -> Self {
        Stamp {
            status,
            time,
            author,
            module,
            path,
        }
    }

    /// Same stamp with a different status
    pub fn with_status(&self, status: Status) -> Self {
        Stamp { status, ..*self }
    }

    /// Same stamp with a different time
    pub fn with_time(&self, time: StampTime) -> Self {
        Stamp { time, ..*self }
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} t:{} a:{} m:{} p:{}>",
            self.status, self.time, self.author, self.module, self.path
        )
    }
}
