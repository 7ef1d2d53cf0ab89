//! Restore points indexed by phase sequence number.
//!
//! A snapshot is an `Arc` to the immutable pre-phase state plus the backup of
//! the file bytes. Rolling back is a swap of the `Arc`, not a replay.

use std::sync::Arc;

use super::collaborators::RestorePoint;
use super::types::ExecutionState;

#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub state: Arc<ExecutionState>,
    pub restore_point: RestorePoint,
}

#[derive(Debug, Default)]
pub(crate) struct SnapshotArena {
    slots: Vec<Option<Snapshot>>,
}

impl SnapshotArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the snapshot taken before phase `sequence`.
    pub fn record(
        &mut self,
        sequence: usize,
        state: Arc<ExecutionState>,
        restore_point: RestorePoint,
    ) {
        if self.slots.len() <= sequence {
            self.slots.resize(sequence + 1, None);
        }
        self.slots[sequence] = Some(Snapshot {
            state,
            restore_point,
        });
    }

    /// Remove and return the snapshot of phase `sequence`.
    ///
    /// Used both to commit (dropping it) and to roll back (restoring it).
    pub fn take(&mut self, sequence: usize) -> Option<Snapshot> {
        self.slots.get_mut(sequence).and_then(Option::take)
    }

    /// Number of phases with a live snapshot.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
