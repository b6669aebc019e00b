//! Undo/redo for placement: per-cell change records, the bounded history
//! resource and the budgeted job that replays a change set.

use bevy::prelude::*;

use crate::config::MAX_CACHED_CHANGES;
use crate::model::SidePayload;
use crate::placement::{JobStatus, WorldAccess};
use crate::state::BlockState;

// ---------------------------------------------------------------------------
// Change records
// ---------------------------------------------------------------------------

/// Contents of one world cell at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct CellSnapshot {
    pub state: BlockState,
    pub payload: Option<SidePayload>,
}

/// One mutated cell, captured before and after the write.
#[derive(Debug, Clone, PartialEq)]
pub struct CellChange {
    pub pos: IVec3,
    pub before: CellSnapshot,
    pub after: CellSnapshot,
}

/// Every change made by one placement, in write order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeSet {
    pub label: String,
    pub changes: Vec<CellChange>,
}

impl ChangeSet {
    pub fn new(label: impl Into<String>, changes: Vec<CellChange>) -> Self {
        Self {
            label: label.into(),
            changes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ChangeHistory resource
// ---------------------------------------------------------------------------

/// Undo and redo stacks of completed change sets.
#[derive(Resource, Debug)]
pub struct ChangeHistory {
    pub undo_stack: Vec<ChangeSet>,
    pub redo_stack: Vec<ChangeSet>,
    capacity: usize,
}

impl Default for ChangeHistory {
    fn default() -> Self {
        Self::with_capacity(MAX_CACHED_CHANGES)
    }
}

impl ChangeHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.trim();
    }

    /// Record a fresh change set. Clears the redo stack and evicts the
    /// oldest entry once over capacity. Empty sets are ignored.
    pub fn push(&mut self, set: ChangeSet) {
        if set.is_empty() {
            return;
        }
        self.redo_stack.clear();
        self.undo_stack.push(set);
        self.trim();
    }

    pub fn pop_undo(&mut self) -> Option<ChangeSet> {
        self.undo_stack.pop()
    }

    pub fn pop_redo(&mut self) -> Option<ChangeSet> {
        self.redo_stack.pop()
    }

    pub fn push_redo(&mut self, set: ChangeSet) {
        self.redo_stack.push(set);
    }

    /// Push after a redo, keeping the rest of the redo stack.
    pub fn push_undo_no_clear(&mut self, set: ChangeSet) {
        self.undo_stack.push(set);
        self.trim();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn trim(&mut self) {
        if self.undo_stack.len() > self.capacity {
            let excess = self.undo_stack.len() - self.capacity;
            self.undo_stack.drain(..excess);
        }
    }
}

// ---------------------------------------------------------------------------
// RevertJob
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertDirection {
    /// Restore `before` snapshots, newest change first.
    Undo,
    /// Restore `after` snapshots, oldest change first.
    Redo,
}

/// Replays a change set against the world under the same per-tick budget
/// as placement.
#[derive(Debug, Clone)]
pub struct RevertJob {
    set: ChangeSet,
    direction: RevertDirection,
    applied: usize,
}

impl RevertJob {
    pub fn undo(set: ChangeSet) -> Self {
        Self {
            set,
            direction: RevertDirection::Undo,
            applied: 0,
        }
    }

    pub fn redo(set: ChangeSet) -> Self {
        Self {
            set,
            direction: RevertDirection::Redo,
            applied: 0,
        }
    }

    pub fn direction(&self) -> RevertDirection {
        self.direction
    }

    pub fn label(&self) -> &str {
        &self.set.label
    }

    pub fn applied(&self) -> usize {
        self.applied
    }

    pub fn into_set(self) -> ChangeSet {
        self.set
    }

    /// Apply up to `budget` changes. A refused write stops the tick and is
    /// retried on the next call.
    pub fn tick<W: WorldAccess + ?Sized>(&mut self, world: &mut W, budget: usize) -> JobStatus {
        let total = self.set.changes.len();
        let mut remaining = budget.max(1);
        while remaining > 0 && self.applied < total {
            let (change, target) = match self.direction {
                RevertDirection::Undo => {
                    let change = &self.set.changes[total - 1 - self.applied];
                    (change, &change.before)
                }
                RevertDirection::Redo => {
                    let change = &self.set.changes[self.applied];
                    (change, &change.after)
                }
            };
            if !world.set_block_state(change.pos, &target.state) {
                return JobStatus::InProgress;
            }
            world.set_payload(change.pos, target.payload.clone());
            self.applied += 1;
            remaining -= 1;
        }
        if self.applied >= total {
            JobStatus::Complete
        } else {
            JobStatus::InProgress
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BlockKind;
    use crate::test_harness::MemoryWorld;

    fn set_with(n: usize) -> ChangeSet {
        let changes = (0..n)
            .map(|i| CellChange {
                pos: IVec3::new(i as i32, 0, 0),
                before: CellSnapshot {
                    state: BlockState::air(),
                    payload: None,
                },
                after: CellSnapshot {
                    state: BlockState::new("stone", BlockKind::Solid),
                    payload: None,
                },
            })
            .collect();
        ChangeSet::new(format!("set{n}"), changes)
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = ChangeHistory::default();
        history.push(set_with(1));
        let undone = history.pop_undo().unwrap();
        history.push_redo(undone);
        assert!(history.can_redo());
        history.push(set_with(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = ChangeHistory::with_capacity(3);
        for n in 1..=5 {
            history.push(set_with(n));
        }
        assert_eq!(history.undo_stack.len(), 3);
        assert_eq!(history.undo_stack[0].label, "set3");
        assert_eq!(history.pop_undo().unwrap().label, "set5");
    }

    #[test]
    fn test_empty_set_not_recorded() {
        let mut history = ChangeHistory::default();
        history.push(ChangeSet::new("nothing", Vec::new()));
        assert!(!history.can_undo());
    }

    #[test]
    fn test_shrinking_capacity_trims() {
        let mut history = ChangeHistory::with_capacity(5);
        for n in 1..=5 {
            history.push(set_with(n));
        }
        history.set_capacity(2);
        assert_eq!(history.undo_stack.len(), 2);
        assert_eq!(history.undo_stack[0].label, "set4");
    }

    #[test]
    fn test_revert_job_undo_then_redo() {
        let mut world = MemoryWorld::default();
        let set = set_with(4);
        for change in &set.changes {
            world.set_block_state(change.pos, &change.after.state);
        }

        let mut undo = RevertJob::undo(set);
        assert_eq!(undo.tick(&mut world, 3), JobStatus::InProgress);
        assert_eq!(undo.applied(), 3);
        assert_eq!(undo.tick(&mut world, 3), JobStatus::Complete);
        for x in 0..4 {
            assert!(world.block_state(IVec3::new(x, 0, 0)).is_air());
        }

        let mut redo = RevertJob::redo(undo.into_set());
        assert_eq!(redo.tick(&mut world, 10), JobStatus::Complete);
        assert_eq!(world.block_state(IVec3::new(2, 0, 0)).name, "stone");
    }

    #[test]
    fn test_revert_job_retries_refused_write() {
        let mut world = MemoryWorld::default();
        world.lock(IVec3::new(0, 0, 0));
        let mut undo = RevertJob::undo(set_with(2));
        // newest first: x=1 succeeds, x=0 is locked
        assert_eq!(undo.tick(&mut world, 10), JobStatus::InProgress);
        assert_eq!(undo.applied(), 1);
        world.unlock(IVec3::new(0, 0, 0));
        assert_eq!(undo.tick(&mut world, 10), JobStatus::Complete);
    }
}
