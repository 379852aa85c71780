//! Latest-version resolution
//!
//! `resolve_latest` is the one place that decides which version of a
//! chronology is visible under a coordinate. Indexers, the query engine and
//! the store all go through it.
//!
//! ## Rules
//!
//! Versions are first filtered by the coordinate's allowed modules and
//! statuses. Then:
//!
//! - TIME precedence: keep versions with `time <= position.time` and take
//!   the maximum time.
//! - PATH precedence: keep versions on `position.path` up to `position.time`
//!   and apply the TIME rule among them. If none qualify, fall back to the
//!   path's origins, each bounded by `min(origin time, inherited bound)`, one
//!   breadth level at a time.
//!
//! When several versions share the winning time, the first in insertion
//! order is the value and the others are reported as contradictions.

use crate::contract::{Stamp, StampCoordinate, StampPosition, StampPrecedence, StampTime};
use crate::ids::Nid;
use crate::version::Stamped;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;

// =============================================================================
// Result
// =============================================================================

/// Outcome of resolving a version list under a coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct LatestVersion<V> {
    value: Option<V>,
    contradictions: Vec<V>,
}

impl<V> LatestVersion<V> {
    /// Nothing visible
    pub fn empty() -> Self {
        LatestVersion {
            value: None,
            contradictions: Vec::new(),
        }
    }

    /// The visible version, if any
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Versions tied with the value at the winning time
    pub fn contradictions(&self) -> &[V] {
        &self.contradictions
    }

    /// True if a version is visible
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// True if the winning time was shared by more than one version
    pub fn is_contradicted(&self) -> bool {
        !self.contradictions.is_empty()
    }

    /// Split into value and contradictions
    pub fn into_parts(self) -> (Option<V>, Vec<V>) {
        (self.value, self.contradictions)
    }

    /// Transform the contained versions
    pub fn map<U, F: FnMut(V) -> U>(self, mut f: F) -> LatestVersion<U> {
        LatestVersion {
            value: self.value.map(&mut f),
            contradictions: self.contradictions.into_iter().map(f).collect(),
        }
    }
}

impl<V> Default for LatestVersion<V> {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// Path origins
// =============================================================================

/// Lookup of the positions a path branched from
pub trait PathOrigins {
    /// Origin positions of `path`; empty for a root path
    fn origins(&self, path: Nid) -> Vec<StampPosition>;
}

/// Every path is a root path
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPathOrigins;

impl PathOrigins for NoPathOrigins {
    fn origins(&self, _path: Nid) -> Vec<StampPosition> {
        Vec::new()
    }
}

/// Breadth-first walk over a path and its origins
///
/// Each item is one level: the positions first reachable at that distance.
/// A path already reached is never revisited, which also cuts origin cycles.
struct OriginWalk<'o, O: ?Sized> {
    origins: &'o O,
    visited: FxHashSet<Nid>,
    frontier: Vec<StampPosition>,
}

impl<'o, O: PathOrigins + ?Sized> OriginWalk<'o, O> {
    fn new(start: StampPosition, origins: &'o O) -> Self {
        let mut visited = FxHashSet::default();
        visited.insert(start.path);
        OriginWalk {
            origins,
            visited,
            frontier: vec![start],
        }
    }
}

impl<O: PathOrigins + ?Sized> Iterator for OriginWalk<'_, O> {
    type Item = Vec<StampPosition>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frontier.is_empty() {
            return None;
        }
        let level = std::mem::take(&mut self.frontier);
        for position in &level {
            for origin in self.origins.origins(position.path) {
                if self.visited.insert(origin.path) {
                    let time = origin.time.min(position.time);
                    self.frontier.push(StampPosition::new(origin.path, time));
                }
            }
        }
        Some(level)
    }
}

/// Bound of every path reachable from `start`
fn reachable_bounds<O: PathOrigins + ?Sized>(
    start: StampPosition,
    origins: &O,
) -> FxHashMap<Nid, StampTime> {
    OriginWalk::new(start, origins)
        .flatten()
        .map(|p| (p.path, p.time))
        .collect()
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve with no path origins
///
/// See the module docs for the rules.
pub fn resolve_latest<'a, V: Stamped>(
    versions: &'a [V],
    coordinate: &StampCoordinate,
) -> LatestVersion<&'a V> {
    resolve_latest_with(versions, coordinate, &NoPathOrigins)
}

/// Resolve, following path origins for PATH precedence
pub fn resolve_latest_with<'a, V: Stamped, O: PathOrigins + ?Sized>(
    versions: &'a [V],
    coordinate: &StampCoordinate,
    origins: &O,
) -> LatestVersion<&'a V> {
    let admitted: Vec<&'a V> = versions
        .iter()
        .filter(|v| coordinate.admits(v.stamp()))
        .collect();
    if admitted.is_empty() {
        return LatestVersion::empty();
    }

    let position = coordinate.position();
    match coordinate.precedence() {
        StampPrecedence::Time => {
            latest_by_time(admitted.into_iter().filter(|v| v.stamp().time <= position.time))
        }
        StampPrecedence::Path => {
            for level in OriginWalk::new(position, origins) {
                let found = latest_by_time(admitted.iter().copied().filter(|v| {
                    let stamp = v.stamp();
                    level
                        .iter()
                        .any(|p| p.path == stamp.path && stamp.time <= p.time)
                }));
                if found.is_present() {
                    return found;
                }
            }
            LatestVersion::empty()
        }
    }
}

/// Maximum-time version; later versions tied at that time are contradictions
fn latest_by_time<'a, V: Stamped, I: Iterator<Item = &'a V>>(candidates: I) -> LatestVersion<&'a V> {
    let mut best: Option<&'a V> = None;
    let mut tied: Vec<&'a V> = Vec::new();
    for candidate in candidates {
        let time = candidate.stamp().time;
        match best.map(|b| time.cmp(&b.stamp().time)) {
            None | Some(Ordering::Greater) => {
                best = Some(candidate);
                tied.clear();
            }
            Some(Ordering::Equal) => tied.push(candidate),
            Some(Ordering::Less) => {}
        }
    }
    LatestVersion {
        value: best,
        contradictions: tied,
    }
}

// =============================================================================
// Relative position
// =============================================================================

/// Ordering of two stamps as seen from a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelativePosition {
    /// First stamp precedes the second on a shared history
    Before,
    /// First stamp follows the second on a shared history
    After,
    /// Same path and time
    Equal,
    /// Both visible, but on divergent paths
    Contradiction,
    /// At least one stamp is not visible from the coordinate
    Unreachable,
}

/// Position of `a` relative to `b`
///
/// A stamp is visible when its path is reachable from the coordinate's
/// position and its time is within that path's inherited bound. Two visible
/// stamps on different paths are ordered only when one path is an ancestor of
/// the other and the earlier stamp lies before the branch point.
pub fn relative_position<O: PathOrigins + ?Sized>(
    a: &Stamp,
    b: &Stamp,
    coordinate: &StampCoordinate,
    origins: &O,
) -> RelativePosition {
    let reach = reachable_bounds(coordinate.position(), origins);
    let visible = |s: &Stamp| reach.get(&s.path).map_or(false, |bound| s.time <= *bound);
    if !visible(a) || !visible(b) {
        return RelativePosition::Unreachable;
    }

    if a.path == b.path {
        return match a.time.cmp(&b.time) {
            Ordering::Less => RelativePosition::Before,
            Ordering::Greater => RelativePosition::After,
            Ordering::Equal => RelativePosition::Equal,
        };
    }

    if precedes_via_origin(a, b, origins) {
        RelativePosition::Before
    } else if precedes_via_origin(b, a, origins) {
        RelativePosition::After
    } else {
        RelativePosition::Contradiction
    }
}

/// True if `earlier` lies on an ancestor of `later`'s path before the branch
fn precedes_via_origin<O: PathOrigins + ?Sized>(earlier: &Stamp, later: &Stamp, origins: &O) -> bool {
    reachable_bounds(StampPosition::new(later.path, later.time), origins)
        .get(&earlier.path)
        .map_or(false, |bound| earlier.time <= *bound)
}
