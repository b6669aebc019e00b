//! The live-world interface placement runs against, plus a wrapper that
//! records every successful write for undo.

use bevy::math::IVec3;

use crate::history::{CellChange, CellSnapshot};
use crate::model::{LooseEntity, SidePayload};
use crate::state::{states_match, BlockState};

/// Access to the mutable world a blueprint is placed into.
///
/// Writes report success with a `bool`; a `false` means the world refused
/// (unloaded region, protected cell) and the caller should retry later.
pub trait WorldAccess {
    /// Block at `pos`. Unset cells read as air.
    fn block_state(&self, pos: IVec3) -> BlockState;

    fn set_block_state(&mut self, pos: IVec3, state: &BlockState) -> bool;

    fn remove_block(&mut self, pos: IVec3) -> bool {
        self.set_block_state(pos, &BlockState::air())
    }

    fn payload(&self, pos: IVec3) -> Option<SidePayload>;

    fn set_payload(&mut self, pos: IVec3, payload: Option<SidePayload>) -> bool;

    /// Local ground material used to resolve solid wildcards and to prop up
    /// gravity-affected blocks.
    fn surface_filler(&self, pos: IVec3) -> BlockState;

    /// Loose world objects inside the cell at `pos`.
    fn entities_in(&self, pos: IVec3) -> Vec<LooseEntity>;

    fn spawn_entity(&mut self, entity: LooseEntity) -> bool;

    /// Remove non-essential loose objects overlapping `pos`. Returns how many
    /// were removed.
    fn evict_objects(&mut self, pos: IVec3) -> usize;

    /// Whether `actual` already satisfies `expected`.
    fn states_equivalent(&self, expected: &BlockState, actual: &BlockState, fancy: bool) -> bool {
        states_match(expected, actual, fancy)
    }
}

// =============================================================================
// RecordingWorld
// =============================================================================

/// Forwards to an inner world, capturing a before/after snapshot of every
/// cell it successfully changes.
pub struct RecordingWorld<'a, W: WorldAccess + ?Sized> {
    inner: &'a mut W,
    log: &'a mut Vec<CellChange>,
}

impl<'a, W: WorldAccess + ?Sized> RecordingWorld<'a, W> {
    pub fn new(inner: &'a mut W, log: &'a mut Vec<CellChange>) -> Self {
        Self { inner, log }
    }

    fn snapshot(&self, pos: IVec3) -> CellSnapshot {
        CellSnapshot {
            state: self.inner.block_state(pos),
            payload: self.inner.payload(pos),
        }
    }

    fn record(&mut self, pos: IVec3, before: CellSnapshot) {
        let after = self.snapshot(pos);
        if after != before {
            self.log.push(CellChange { pos, before, after });
        }
    }
}

impl<W: WorldAccess + ?Sized> WorldAccess for RecordingWorld<'_, W> {
    fn block_state(&self, pos: IVec3) -> BlockState {
        self.inner.block_state(pos)
    }

    fn set_block_state(&mut self, pos: IVec3, state: &BlockState) -> bool {
        let before = self.snapshot(pos);
        if !self.inner.set_block_state(pos, state) {
            return false;
        }
        self.record(pos, before);
        true
    }

    fn payload(&self, pos: IVec3) -> Option<SidePayload> {
        self.inner.payload(pos)
    }

    fn set_payload(&mut self, pos: IVec3, payload: Option<SidePayload>) -> bool {
        let before = self.snapshot(pos);
        if !self.inner.set_payload(pos, payload) {
            return false;
        }
        self.record(pos, before);
        true
    }

    fn surface_filler(&self, pos: IVec3) -> BlockState {
        self.inner.surface_filler(pos)
    }

    fn entities_in(&self, pos: IVec3) -> Vec<LooseEntity> {
        self.inner.entities_in(pos)
    }

    fn spawn_entity(&mut self, entity: LooseEntity) -> bool {
        self.inner.spawn_entity(entity)
    }

    fn evict_objects(&mut self, pos: IVec3) -> usize {
        self.inner.evict_objects(pos)
    }

    fn states_equivalent(&self, expected: &BlockState, actual: &BlockState, fancy: bool) -> bool {
        self.inner.states_equivalent(expected, actual, fancy)
    }
}
