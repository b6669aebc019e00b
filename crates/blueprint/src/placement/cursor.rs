//! Resumable raster scan over a blueprint volume.
//!
//! The cursor walks x fastest, then z, then y. It starts at the `NULL_POS`
//! sentinel (unstarted), and running off either end resets it back to the
//! sentinel. The skipping steps examine at most `max_cells` cells per call
//! so a scan over a large blueprint can be spread across many ticks.

use bevy::math::IVec3;

use crate::model::{Blueprint, Extent, PositionInfo};

use super::world::WorldAccess;

/// Cursor position before the first step and after the last.
pub const NULL_POS: IVec3 = IVec3::splat(-1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Unstarted,
    Scanning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// The cursor stopped on a cell that needs work.
    NewCell,
    /// Ran past the end; the cursor is back at `NULL_POS`.
    Exhausted,
    /// The per-call budget ran out. Call again to resume.
    BudgetStopped,
}

/// Outcome of a skipping step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStep {
    pub result: StepResult,
    /// Cells looked at during this call, including the one stopped on.
    pub examined: usize,
}

/// What a skipping step needs to look at.
pub struct ScanContext<'a, W: WorldAccess + ?Sized> {
    pub blueprint: &'a Blueprint,
    pub world: &'a W,
    /// World position of the blueprint's local origin.
    pub origin: IVec3,
    pub fancy: bool,
    pub max_cells: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueprintCursor {
    pos: IVec3,
    size: Extent,
    include_entities: bool,
    removing: bool,
}

impl BlueprintCursor {
    pub fn new(size: Extent) -> Self {
        Self {
            pos: NULL_POS,
            size,
            include_entities: false,
            removing: false,
        }
    }

    pub fn position(&self) -> IVec3 {
        self.pos
    }

    pub fn state(&self) -> CursorState {
        if self.pos == NULL_POS {
            CursorState::Unstarted
        } else {
            CursorState::Scanning
        }
    }

    /// Attach loose entities to the cell info handed to skip predicates.
    pub fn include_entities(&mut self) {
        self.include_entities = true;
    }

    pub fn includes_entities(&self) -> bool {
        self.include_entities
    }

    /// Removal visits every cell; nothing is auto-skipped as already placed.
    pub fn mark_removing(&mut self) {
        self.removing = true;
    }

    pub fn is_removing(&self) -> bool {
        self.removing
    }

    /// Back to the sentinel with both mode flags cleared.
    pub fn reset(&mut self) {
        self.pos = NULL_POS;
        self.include_entities = false;
        self.removing = false;
    }

    /// Place the cursor directly, wrapping each axis into the volume.
    pub fn jump_to(&mut self, pos: IVec3) {
        if pos == NULL_POS || self.size.is_empty() {
            self.pos = NULL_POS;
            return;
        }
        let size = self.size.as_ivec3();
        self.pos = IVec3::new(
            pos.x.rem_euclid(size.x),
            pos.y.rem_euclid(size.y),
            pos.z.rem_euclid(size.z),
        );
    }

    // -------------------------------------------------------------------------
    // Plain steps
    // -------------------------------------------------------------------------

    pub fn step_forward(&mut self) -> StepResult {
        if self.size.is_empty() {
            self.pos = NULL_POS;
            return StepResult::Exhausted;
        }
        let size = self.size.as_ivec3();
        if self.pos == NULL_POS {
            self.pos = IVec3::new(-1, 0, 0);
        }
        self.pos.x += 1;
        if self.pos.x >= size.x {
            self.pos.x = 0;
            self.pos.z += 1;
            if self.pos.z >= size.z {
                self.pos.z = 0;
                self.pos.y += 1;
                if self.pos.y >= size.y {
                    self.pos = NULL_POS;
                    return StepResult::Exhausted;
                }
            }
        }
        StepResult::NewCell
    }

    pub fn step_backward(&mut self) -> StepResult {
        if self.size.is_empty() {
            self.pos = NULL_POS;
            return StepResult::Exhausted;
        }
        let size = self.size.as_ivec3();
        if self.pos == NULL_POS {
            self.pos = IVec3::new(size.x, size.y - 1, size.z - 1);
        }
        self.pos.x -= 1;
        if self.pos.x < 0 {
            self.pos.x = size.x - 1;
            self.pos.z -= 1;
            if self.pos.z < 0 {
                self.pos.z = size.z - 1;
                self.pos.y -= 1;
                if self.pos.y < 0 {
                    self.pos = NULL_POS;
                    return StepResult::Exhausted;
                }
            }
        }
        StepResult::NewCell
    }

    // -------------------------------------------------------------------------
    // Skipping steps
    // -------------------------------------------------------------------------

    /// Step forward past every cell `skip` rejects or the world already
    /// satisfies. `on_satisfied` is told about each already-satisfied cell.
    pub fn step_forward_skipping<W, S, F>(
        &mut self,
        ctx: &ScanContext<'_, W>,
        skip: S,
        on_satisfied: F,
    ) -> ScanStep
    where
        W: WorldAccess + ?Sized,
        S: FnMut(&PositionInfo, IVec3, &W) -> bool,
        F: FnMut(&PositionInfo, IVec3),
    {
        self.scan(ctx, Self::step_forward, skip, on_satisfied)
    }

    pub fn step_backward_skipping<W, S, F>(
        &mut self,
        ctx: &ScanContext<'_, W>,
        skip: S,
        on_satisfied: F,
    ) -> ScanStep
    where
        W: WorldAccess + ?Sized,
        S: FnMut(&PositionInfo, IVec3, &W) -> bool,
        F: FnMut(&PositionInfo, IVec3),
    {
        self.scan(ctx, Self::step_backward, skip, on_satisfied)
    }

    fn scan<W, S, F>(
        &mut self,
        ctx: &ScanContext<'_, W>,
        step: fn(&mut Self) -> StepResult,
        mut skip: S,
        mut on_satisfied: F,
    ) -> ScanStep
    where
        W: WorldAccess + ?Sized,
        S: FnMut(&PositionInfo, IVec3, &W) -> bool,
        F: FnMut(&PositionInfo, IVec3),
    {
        let mut examined = 0;
        loop {
            if examined >= ctx.max_cells {
                return ScanStep {
                    result: StepResult::BudgetStopped,
                    examined,
                };
            }
            if step(self) == StepResult::Exhausted {
                return ScanStep {
                    result: StepResult::Exhausted,
                    examined,
                };
            }
            examined += 1;

            let Some(info) = ctx.blueprint.position_info(self.pos, self.include_entities) else {
                continue;
            };
            let world_pos = ctx.origin + self.pos;
            if skip(&info, world_pos, ctx.world) {
                continue;
            }
            if !self.removing
                && info.entities.is_empty()
                && ctx.world.states_equivalent(
                    &info.cell.state,
                    &ctx.world.block_state(world_pos),
                    ctx.fancy,
                )
            {
                on_satisfied(&info, world_pos);
                continue;
            }
            return ScanStep {
                result: StepResult::NewCell,
                examined,
            };
        }
    }
}
