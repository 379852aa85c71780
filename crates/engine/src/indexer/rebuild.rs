//! Cancellable, resumable full reindex
//!
//! A rebuild walks an indexer's units (assemblages) in ascending order and
//! replaces each unit's documents in one step. Cancellation is observed
//! between units, so a unit is either fully rebuilt or untouched. The
//! returned checkpoint lists completed units; passing it back resumes after
//! them.

use super::{IndexKind, Indexer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use termstore_core::{Error, Nid, Result};
use tracing::{info, warn};

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// True once `cancel` was called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Units already rebuilt for one index kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildCheckpoint {
    /// Index being rebuilt
    pub kind: IndexKind,
    /// Completed units
    pub completed: BTreeSet<Nid>,
}

impl RebuildCheckpoint {
    /// Nothing completed yet
    pub fn new(kind: IndexKind) -> Self {
        RebuildCheckpoint {
            kind,
            completed: BTreeSet::new(),
        }
    }
}

/// Result of a rebuild call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildOutcome {
    /// Progress so far, including units from the input checkpoint
    pub checkpoint: RebuildCheckpoint,
    /// Documents written by this call
    pub documents: usize,
    /// False if cancellation stopped the rebuild early
    pub complete: bool,
}

/// Rebuild an index, optionally resuming from a checkpoint
///
/// # Errors
///
/// `InvalidValue` if the checkpoint belongs to another index kind.
pub fn rebuild(
    indexer: &dyn Indexer,
    token: &CancellationToken,
    checkpoint: Option<RebuildCheckpoint>,
) -> Result<RebuildOutcome> {
    let kind = indexer.kind();
    let mut checkpoint = checkpoint.unwrap_or_else(|| RebuildCheckpoint::new(kind));
    if checkpoint.kind != kind {
        return Err(Error::InvalidValue(format!(
            "checkpoint for the {} index cannot resume a {} rebuild",
            checkpoint.kind, kind
        )));
    }

    let pending: Vec<Nid> = indexer
        .units()
        .into_iter()
        .filter(|unit| !checkpoint.completed.contains(unit))
        .collect();
    info!(
        target: "termstore::index",
        %kind,
        pending = pending.len(),
        resumed = checkpoint.completed.len(),
        "Rebuild started"
    );

    let mut documents = 0;
    for unit in pending {
        if token.is_cancelled() {
            warn!(
                target: "termstore::index",
                %kind,
                completed = checkpoint.completed.len(),
                "Rebuild cancelled"
            );
            return Ok(RebuildOutcome {
                checkpoint,
                documents,
                complete: false,
            });
        }
        documents += indexer.reindex_unit(unit);
        checkpoint.completed.insert(unit);
    }

    info!(target: "termstore::index", %kind, documents, "Rebuild finished");
    Ok(RebuildOutcome {
        checkpoint,
        documents,
        complete: true,
    })
}
