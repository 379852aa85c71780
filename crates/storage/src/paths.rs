//! Path registry
//!
//! A path (branch) may originate from one or more positions on other paths.
//! PATH-precedence resolution falls back to those origins when the path itself
//! has no visible version.

use dashmap::DashMap;
use termstore_core::{Nid, PathOrigins, StampPosition};
use tracing::info;

/// Origins of every known path
#[derive(Debug, Default)]
pub struct PathRegistry {
    origins: DashMap<Nid, Vec<StampPosition>>,
}

impl PathRegistry {
    /// Empty registry: every path is a root path
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `path` branched from `origin`
    ///
    /// Re-adding the same origin is a no-op. Adding an origin that closes a
    /// cycle is accepted; resolution walks each path at most once.
    pub fn add_origin(&self, path: Nid, origin: StampPosition) {
        let mut entry = self.origins.entry(path).or_default();
        if !entry.contains(&origin) {
            info!(target: "termstore::store", %path, origin = %origin, "Added path origin");
            entry.push(origin);
        }
    }

    /// Paths with at least one origin
    pub fn paths(&self) -> Vec<Nid> {
        let mut out: Vec<Nid> = self.origins.iter().map(|e| *e.key()).collect();
        out.sort();
        out
    }

    pub(crate) fn entries(&self) -> Vec<(Nid, Vec<StampPosition>)> {
        let mut out: Vec<_> = self
            .origins
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        out.sort_by_key(|(path, _)| *path);
        out
    }

    pub(crate) fn restore(entries: Vec<(Nid, Vec<StampPosition>)>) -> Self {
        let registry = PathRegistry::new();
        for (path, origins) in entries {
            registry.origins.insert(path, origins);
        }
        registry
    }
}

impl PathOrigins for PathRegistry {
    fn origins(&self, path: Nid) -> Vec<StampPosition> {
        self.origins
            .get(&path)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }
}
