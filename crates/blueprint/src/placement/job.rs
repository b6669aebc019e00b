//! One blueprint being placed or removed, advanced a budgeted slice per
//! tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use crate::error::BlueprintError;
use crate::history::{CellChange, ChangeSet};
use crate::model::{Blueprint, CellInfo, PositionInfo};
use crate::state::BlockState;

use super::cursor::{BlueprintCursor, ScanContext, ScanStep, StepResult, NULL_POS};
use super::strategy::{
    PlaceContext, PlacementOutcome, PlacementSettings, PlacementStrategy, ResourceCost,
    StrategyRegistry,
};
use super::world::{RecordingWorld, WorldAccess};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum PlacementMode {
    Place,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Complete,
    Failed,
}

/// Where a job stands, in a form that can be persisted and resumed.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PlacementProgress {
    pub cursor: [i32; 3],
    pub mode: PlacementMode,
    /// The cell under the cursor was refused and must be retried.
    pub retry_current: bool,
}

/// Running totals for a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    pub ticks: u32,
    pub cells_examined: u64,
    pub placed: u32,
    pub accepted: u32,
    pub already_satisfied: u32,
    pub denied: u32,
    pub entities_spawned: u32,
    pub resources: BTreeMap<String, u32>,
}

impl JobStats {
    pub fn resources_used(&self) -> Vec<ResourceCost> {
        self.resources
            .iter()
            .map(|(item, &count)| ResourceCost::new(item.clone(), count))
            .collect()
    }

    fn charge(&mut self, costs: impl IntoIterator<Item = ResourceCost>) {
        for cost in costs {
            *self.resources.entry(cost.item).or_default() += cost.count;
        }
    }
}

/// Caller-specific exclusion: cells for which this returns `true` are
/// never placed.
pub type CellFilter = Box<dyn Fn(&CellInfo) -> bool + Send + Sync>;

pub struct PlacementJob {
    blueprint: Arc<Blueprint>,
    cursor: BlueprintCursor,
    /// World position of the blueprint's local origin.
    origin: IVec3,
    settings: PlacementSettings,
    mode: PlacementMode,
    exclude: Option<CellFilter>,
    retry_current: bool,
    status: JobStatus,
    changes: Vec<CellChange>,
    stats: JobStats,
}

impl PlacementJob {
    /// Place `blueprint` so its anchor lands on `world_anchor`.
    pub fn place(blueprint: Arc<Blueprint>, world_anchor: IVec3, settings: PlacementSettings) -> Self {
        Self::build(blueprint, world_anchor, settings, PlacementMode::Place)
    }

    /// Clear every real cell of `blueprint` from the world, last cell first.
    pub fn remove(blueprint: Arc<Blueprint>, world_anchor: IVec3, settings: PlacementSettings) -> Self {
        Self::build(blueprint, world_anchor, settings, PlacementMode::Remove)
    }

    fn build(
        blueprint: Arc<Blueprint>,
        world_anchor: IVec3,
        settings: PlacementSettings,
        mode: PlacementMode,
    ) -> Self {
        let mut cursor = BlueprintCursor::new(blueprint.size());
        if settings.include_entities && mode == PlacementMode::Place {
            cursor.include_entities();
        }
        if mode == PlacementMode::Remove {
            cursor.mark_removing();
        }
        let origin = world_anchor - blueprint.anchor();
        Self {
            blueprint,
            cursor,
            origin,
            settings,
            mode,
            exclude: None,
            retry_current: false,
            status: JobStatus::InProgress,
            changes: Vec::new(),
            stats: JobStats::default(),
        }
    }

    pub fn with_filter(mut self, filter: CellFilter) -> Self {
        self.exclude = Some(filter);
        self
    }

    pub fn blueprint(&self) -> &Arc<Blueprint> {
        &self.blueprint
    }

    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    pub fn mode(&self) -> PlacementMode {
        self.mode
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn stats(&self) -> &JobStats {
        &self.stats
    }

    /// Abandon the job. Persisted progress is simply discarded by the caller.
    pub fn cancel(&mut self) {
        self.cursor.reset();
        self.retry_current = false;
        self.status = JobStatus::Failed;
    }

    pub fn progress(&self) -> PlacementProgress {
        PlacementProgress {
            cursor: self.cursor.position().to_array(),
            mode: self.mode,
            retry_current: self.retry_current,
        }
    }

    /// Continue from persisted progress.
    pub fn resume(&mut self, progress: &PlacementProgress) {
        let pos = IVec3::from_array(progress.cursor);
        self.cursor.jump_to(pos);
        self.retry_current = progress.retry_current && pos != NULL_POS;
    }

    /// Hand over the recorded changes as an undo entry.
    pub fn take_change_set(&mut self) -> ChangeSet {
        ChangeSet::new(
            self.blueprint.name().to_string(),
            std::mem::take(&mut self.changes),
        )
    }

    /// Examine up to `budget` cells. Stops early on a refused write so the
    /// same cell is retried next tick.
    pub fn tick<W: WorldAccess + ?Sized>(
        &mut self,
        registry: &StrategyRegistry,
        world: &mut W,
        budget: usize,
    ) -> JobStatus {
        if self.status != JobStatus::InProgress {
            return self.status;
        }
        self.stats.ticks += 1;
        let mut remaining = budget.max(1);
        loop {
            if remaining == 0 {
                return JobStatus::InProgress;
            }
            if self.retry_current {
                self.retry_current = false;
                remaining -= 1;
                self.stats.cells_examined += 1;
            } else {
                let step = self.advance(&*world, remaining);
                remaining = remaining.saturating_sub(step.examined);
                self.stats.cells_examined += step.examined as u64;
                match step.result {
                    StepResult::Exhausted => {
                        self.status = JobStatus::Complete;
                        return JobStatus::Complete;
                    }
                    StepResult::BudgetStopped => return JobStatus::InProgress,
                    StepResult::NewCell => {}
                }
            }

            match self.handle_current(registry, world) {
                Ok(PlacementOutcome::Denied) => {
                    self.retry_current = true;
                    self.stats.denied += 1;
                    return JobStatus::InProgress;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(
                        "Placement of '{}' failed at {}: {e}",
                        self.blueprint.name(),
                        self.origin + self.cursor.position()
                    );
                    self.status = JobStatus::Failed;
                    return JobStatus::Failed;
                }
            }
        }
    }

    fn advance<W: WorldAccess + ?Sized>(&mut self, world: &W, max_cells: usize) -> ScanStep {
        let ctx = ScanContext {
            blueprint: &*self.blueprint,
            world,
            origin: self.origin,
            fancy: self.settings.fancy,
            max_cells,
        };
        let exclude = &self.exclude;
        let mut satisfied = 0;
        let step = match self.mode {
            PlacementMode::Place => self.cursor.step_forward_skipping(
                &ctx,
                |info: &PositionInfo, _, _: &W| exclude.as_ref().is_some_and(|f| f(&info.cell)),
                |_, _| satisfied += 1,
            ),
            PlacementMode::Remove => self.cursor.step_backward_skipping(
                &ctx,
                |info: &PositionInfo, _, _: &W| info.cell.state.kind.is_placeholder(),
                |_, _| satisfied += 1,
            ),
        };
        self.stats.already_satisfied += satisfied;
        step
    }

    fn handle_current<W: WorldAccess + ?Sized>(
        &mut self,
        registry: &StrategyRegistry,
        world: &mut W,
    ) -> Result<PlacementOutcome, BlueprintError> {
        let blueprint = Arc::clone(&self.blueprint);
        let local = self.cursor.position();
        let Some(cell) = blueprint.cell_at(local) else {
            return Ok(PlacementOutcome::Accepted);
        };
        let world_pos = self.origin + local;
        let ctx = PlaceContext {
            payload: cell.payload.as_ref(),
            settings: &self.settings,
            anchor: self.origin + blueprint.anchor(),
        };

        let mut recorder = RecordingWorld::new(world, &mut self.changes);
        let outcome = match self.mode {
            PlacementMode::Remove => {
                PlacementStrategy::Clear.place(&mut recorder, world_pos, &BlockState::air(), &ctx)?
            }
            PlacementMode::Place => {
                let strategy = registry.select(&recorder, world_pos, &cell.state);
                let cost = strategy.required_resources(
                    &recorder,
                    world_pos,
                    &cell.state,
                    cell.payload.as_ref(),
                    self.settings.complete,
                );
                let outcome = strategy.place(&mut recorder, world_pos, &cell.state, &ctx)?;
                if matches!(outcome, PlacementOutcome::Placed(_)) {
                    self.stats.charge(cost);
                }
                outcome
            }
        };

        match outcome {
            PlacementOutcome::Accepted => self.stats.accepted += 1,
            PlacementOutcome::Placed(_) => self.stats.placed += 1,
            PlacementOutcome::Denied => return Ok(outcome),
        }
        if self.mode == PlacementMode::Place && self.cursor.includes_entities() {
            self.spawn_entities(&blueprint, local, world);
        }
        Ok(outcome)
    }

    /// Spawn the blueprint's loose entities for one cell unless an identical
    /// one is already there.
    fn spawn_entities<W: WorldAccess + ?Sized>(&mut self, blueprint: &Blueprint, local: IVec3, world: &mut W) {
        let offset = self.origin.as_dvec3();
        for entity in blueprint.entities_at(local) {
            let mut spawned = entity.clone();
            spawned.position += offset;
            let present = world.entities_in(spawned.cell()).iter().any(|e| {
                e.type_id == spawned.type_id && e.position.distance_squared(spawned.position) < 1e-6
            });
            if present || !world.spawn_entity(spawned) {
                continue;
            }
            self.stats.entities_spawned += 1;
            if let Some(item) = entity.kind().and_then(|k| k.item_id()) {
                self.stats.charge([ResourceCost::new(item, 1)]);
            }
        }
    }
}

#[cfg(test)]
mod tests;
