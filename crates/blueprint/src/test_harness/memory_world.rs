//! HashMap-backed `WorldAccess` for tests and benches.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::model::{Blueprint, LooseEntity, SidePayload};
use crate::placement::WorldAccess;
use crate::state::BlockState;

/// An unbounded in-memory world. Unset cells are air.
#[derive(Resource, Debug, Clone)]
pub struct MemoryWorld {
    blocks: HashMap<IVec3, BlockState>,
    payloads: HashMap<IVec3, SidePayload>,
    objects: Vec<LooseEntity>,
    locked: HashSet<IVec3>,
    payload_locked: HashSet<IVec3>,
    /// Returned by `surface_filler`.
    pub filler: BlockState,
    /// Successful block writes.
    pub writes: usize,
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self {
            blocks: HashMap::new(),
            payloads: HashMap::new(),
            objects: Vec::new(),
            locked: HashSet::new(),
            payload_locked: HashSet::new(),
            filler: BlockState::dirt(),
            writes: 0,
        }
    }
}

impl MemoryWorld {
    /// Refuse every write to `pos` until unlocked.
    pub fn lock(&mut self, pos: IVec3) {
        self.locked.insert(pos);
    }

    pub fn unlock(&mut self, pos: IVec3) {
        self.locked.remove(&pos);
        self.payload_locked.remove(&pos);
    }

    /// Refuse payload writes to `pos` while still accepting blocks.
    pub fn lock_payload(&mut self, pos: IVec3) {
        self.payload_locked.insert(pos);
    }

    /// Remove the block at `pos`, ignoring locks.
    pub fn clear(&mut self, pos: IVec3) {
        self.blocks.remove(&pos);
        self.payloads.remove(&pos);
    }

    /// Write a block directly, ignoring locks and the write counter.
    pub fn put(&mut self, pos: IVec3, state: BlockState) {
        if state.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state);
        }
    }

    /// Copy every real cell of `blueprint` into the world at `origin`.
    /// Placeholders leave the world untouched.
    pub fn fill_from(&mut self, blueprint: &Blueprint, origin: IVec3) {
        for cell in blueprint.cell_list() {
            if cell.state.kind.is_placeholder() {
                continue;
            }
            self.put(origin + cell.pos, cell.state.clone());
            if let Some(payload) = &cell.payload {
                self.payloads.insert(origin + cell.pos, payload.clone());
            }
        }
    }

    /// Non-air cells.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn objects(&self) -> &[LooseEntity] {
        &self.objects
    }

    pub fn add_object(&mut self, entity: LooseEntity) {
        self.objects.push(entity);
    }
}

impl WorldAccess for MemoryWorld {
    fn block_state(&self, pos: IVec3) -> BlockState {
        self.blocks.get(&pos).cloned().unwrap_or_else(BlockState::air)
    }

    fn set_block_state(&mut self, pos: IVec3, state: &BlockState) -> bool {
        if self.locked.contains(&pos) {
            return false;
        }
        self.put(pos, state.clone());
        self.writes += 1;
        true
    }

    fn payload(&self, pos: IVec3) -> Option<SidePayload> {
        self.payloads.get(&pos).cloned()
    }

    fn set_payload(&mut self, pos: IVec3, payload: Option<SidePayload>) -> bool {
        if self.locked.contains(&pos) || self.payload_locked.contains(&pos) {
            return false;
        }
        match payload {
            Some(payload) => self.payloads.insert(pos, payload),
            None => self.payloads.remove(&pos),
        };
        true
    }

    fn surface_filler(&self, _pos: IVec3) -> BlockState {
        self.filler.clone()
    }

    fn entities_in(&self, pos: IVec3) -> Vec<LooseEntity> {
        self.objects
            .iter()
            .filter(|e| e.cell() == pos)
            .cloned()
            .collect()
    }

    fn spawn_entity(&mut self, entity: LooseEntity) -> bool {
        if self.locked.contains(&entity.cell()) {
            return false;
        }
        self.objects.push(entity);
        true
    }

    fn evict_objects(&mut self, pos: IVec3) -> usize {
        let before = self.objects.len();
        self.objects
            .retain(|e| e.cell() != pos || e.kind().is_some_and(|k| k.is_essential()));
        before - self.objects.len()
    }
}
