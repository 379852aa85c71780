//! Stamp coordinates
//!
//! A coordinate is an immutable read-time filter plus resolution policy:
//! which modules and statuses are visible, the position (path + not-after
//! time) to read from, and whether time or path wins when choosing the
//! latest version.
//!
//! Coordinates are never mutated. "Analog" coordinates differing in one field
//! are derived with the `with_*` methods.

use super::stamp::{Stamp, Status};
use super::timestamp::StampTime;
use crate::ids::Nid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which dimension wins when resolving the latest version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StampPrecedence {
    /// Latest time wins, regardless of path
    Time,
    /// Versions on the position's own path win; origins are consulted only
    /// when the path itself has nothing visible
    Path,
}

/// A path plus a not-after time bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StampPosition {
    /// Path concept
    pub path: Nid,
    /// Versions later than this are invisible
    pub time: StampTime,
}

impl StampPosition {
    /// Create a position
    pub fn new(path: Nid, time: StampTime) -> Self {
        StampPosition { path, time }
    }

    /// Position at the tip of a path, including uncommitted work
    pub fn latest(path: Nid) -> Self {
        StampPosition {
            path,
            time: StampTime::Uncommitted,
        }
    }
}

impl fmt::Display for StampPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.time)
    }
}

/// Set of allowed statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusSet {
    active: bool,
    inactive: bool,
}

impl StatusSet {
    /// Both statuses
    pub const ANY: StatusSet = StatusSet {
        active: true,
        inactive: true,
    };
    /// Active versions only
    pub const ACTIVE_ONLY: StatusSet = StatusSet {
        active: true,
        inactive: false,
    };
    /// Inactive versions only
    pub const INACTIVE_ONLY: StatusSet = StatusSet {
        active: false,
        inactive: true,
    };

    /// Check membership
    #[inline]
    pub fn contains(&self, status: Status) -> bool {
        match status {
            Status::Active => self.active,
            Status::Inactive => self.inactive,
        }
    }
}

impl Default for StatusSet {
    fn default() -> Self {
        StatusSet::ANY
    }
}

/// Read-time visibility filter and resolution policy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StampCoordinate {
    precedence: StampPrecedence,
    position: StampPosition,
    /// Empty means every module is allowed
    allowed_modules: BTreeSet<Nid>,
    allowed_statuses: StatusSet,
}

impl StampCoordinate {
    /// Coordinate with every module and status allowed
    pub fn new(precedence: StampPrecedence, position: StampPosition) -> Self {
        StampCoordinate {
            precedence,
            position,
            allowed_modules: BTreeSet::new(),
            allowed_statuses: StatusSet::ANY,
        }
    }

    /// Path-precedence coordinate at the tip of `path`
    pub fn latest_on(path: Nid) -> Self {
        StampCoordinate::new(StampPrecedence::Path, StampPosition::latest(path))
    }

    /// Path-precedence coordinate on `path` as of `time`
    pub fn on_path_at(path: Nid, time: StampTime) -> Self {
        StampCoordinate::new(StampPrecedence::Path, StampPosition::new(path, time))
    }

    /// Precedence policy
    pub fn precedence(&self) -> StampPrecedence {
        self.precedence
    }

    /// Read position
    pub fn position(&self) -> StampPosition {
        self.position
    }

    /// Allowed modules (empty = all)
    pub fn allowed_modules(&self) -> &BTreeSet<Nid> {
        &self.allowed_modules
    }

    /// Allowed statuses
    pub fn allowed_statuses(&self) -> StatusSet {
        self.allowed_statuses
    }

    /// True if a stamp passes the module and status filters
    pub fn admits(&self, stamp: &Stamp) -> bool {
        (self.allowed_modules.is_empty() || self.allowed_modules.contains(&stamp.module))
            && self.allowed_statuses.contains(stamp.status)
    }

    // =========================================================================
    // Analogs
    // =========================================================================

    /// Analog with a different precedence
    pub fn with_precedence(&self, precedence: StampPrecedence) -> Self {
        StampCoordinate {
            precedence,
            ..self.clone()
        }
    }

    /// Analog with a different position
    pub fn with_position(&self, position: StampPosition) -> Self {
        StampCoordinate {
            position,
            ..self.clone()
        }
    }

    /// Analog with a different time bound on the same path
    pub fn with_time(&self, time: StampTime) -> Self {
        self.with_position(StampPosition::new(self.position.path, time))
    }

    /// Analog with a different module filter
    pub fn with_modules(&self, modules: impl IntoIterator<Item = Nid>) -> Self {
        StampCoordinate {
            allowed_modules: modules.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Analog with a different status filter
    pub fn with_statuses(&self, statuses: StatusSet) -> Self {
        StampCoordinate {
            allowed_statuses: statuses,
            ..self.clone()
        }
    }
}

impl fmt::Display for StampCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {} modules:{:?} statuses:{:?}",
            self.precedence, self.position, self.allowed_modules, self.allowed_statuses
        )
    }
}
