//! Blueprint placement events, the work queue, systems and Bevy plugin
//! registration.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use bevy::prelude::*;

use crate::config::PlacementConfig;
use crate::history::{ChangeHistory, RevertDirection, RevertJob};
use crate::model::Blueprint;
use crate::placement::{
    JobStatus, PlacementJob, PlacementMode, PlacementSettings, ResourceCost, StrategyRegistry,
    WorldAccess,
};
use crate::transform::{Mirror, Rotation};

// =============================================================================
// Events
// =============================================================================

/// Place a blueprint so its anchor lands on `position`.
#[derive(Event, Debug, Clone)]
pub struct PlaceBlueprint {
    pub blueprint: Arc<Blueprint>,
    pub position: IVec3,
    pub rotation: Rotation,
    pub mirror: Mirror,
    pub include_entities: bool,
}

impl PlaceBlueprint {
    pub fn new(blueprint: Arc<Blueprint>, position: IVec3) -> Self {
        Self {
            blueprint,
            position,
            rotation: Rotation::None,
            mirror: Mirror::None,
            include_entities: false,
        }
    }

    pub fn rotated(mut self, rotation: Rotation, mirror: Mirror) -> Self {
        self.rotation = rotation;
        self.mirror = mirror;
        self
    }

    pub fn with_entities(mut self) -> Self {
        self.include_entities = true;
        self
    }
}

/// Clear a previously placed blueprint. Uses the same anchor and transform
/// it was placed with.
#[derive(Event, Debug, Clone)]
pub struct RemoveBlueprint {
    pub blueprint: Arc<Blueprint>,
    pub position: IVec3,
    pub rotation: Rotation,
    pub mirror: Mirror,
}

/// Fired when a queued placement or removal stops.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct PlacementFinished {
    pub name: String,
    pub mode: PlacementMode,
    pub status: JobStatus,
    pub cells_placed: u32,
    pub ticks: u32,
    pub resources: Vec<ResourceCost>,
}

/// Marker event: revert the most recent placement.
#[derive(Event)]
pub struct UndoRequested;

/// Marker event: re-apply the most recently undone placement.
#[derive(Event)]
pub struct RedoRequested;

/// Fired when an undo or redo has been fully written back.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct RevertFinished {
    pub label: String,
    pub direction: RevertDirection,
    pub cells: usize,
}

// =============================================================================
// Queue
// =============================================================================

pub enum QueuedWork {
    Place(PlacementJob),
    Revert(RevertJob),
}

/// Pending work, processed front first. Only the front item advances each
/// tick so jobs never interleave their writes.
#[derive(Resource, Default)]
pub struct PlacementQueue {
    pub work: VecDeque<QueuedWork>,
}

impl PlacementQueue {
    pub fn len(&self) -> usize {
        self.work.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work.is_empty()
    }

    /// Drop all pending work, cancelling the job in flight.
    pub fn clear(&mut self) {
        if let Some(QueuedWork::Place(job)) = self.work.front_mut() {
            job.cancel();
        }
        self.work.clear();
    }
}

// =============================================================================
// Systems
// =============================================================================

fn settings_for(
    config: &PlacementConfig,
    rotation: Rotation,
    mirror: Mirror,
    include_entities: bool,
) -> PlacementSettings {
    PlacementSettings {
        rotation,
        mirror,
        fancy: config.fancy_placement,
        complete: config.complete_placement,
        include_entities,
    }
}

/// The blueprint as it will be placed. Clones only when a transform applies.
fn oriented(blueprint: &Arc<Blueprint>, rotation: Rotation, mirror: Mirror) -> Arc<Blueprint> {
    if rotation == Rotation::None && mirror == Mirror::None {
        return Arc::clone(blueprint);
    }
    let mut turned = Blueprint::clone(blueprint);
    let dropped = turned.apply_transform(rotation, mirror);
    if !dropped.is_empty() {
        warn!(
            "Blueprint '{}': {} entities could not be transformed and were dropped",
            turned.name(),
            dropped.len()
        );
    }
    Arc::new(turned)
}

fn sync_history_capacity(config: Res<PlacementConfig>, mut history: ResMut<ChangeHistory>) {
    if history.capacity() != config.max_cached_changes {
        history.set_capacity(config.max_cached_changes);
    }
}

fn enqueue_placements(
    mut events: EventReader<PlaceBlueprint>,
    config: Res<PlacementConfig>,
    mut queue: ResMut<PlacementQueue>,
) {
    for ev in events.read() {
        let blueprint = oriented(&ev.blueprint, ev.rotation, ev.mirror);
        let settings = settings_for(&config, ev.rotation, ev.mirror, ev.include_entities);
        info!(
            "Queued placement of '{}' at {} ({:?}, {:?})",
            blueprint.name(),
            ev.position,
            ev.rotation,
            ev.mirror
        );
        queue
            .work
            .push_back(QueuedWork::Place(PlacementJob::place(blueprint, ev.position, settings)));
    }
}

fn enqueue_removals(
    mut events: EventReader<RemoveBlueprint>,
    config: Res<PlacementConfig>,
    mut queue: ResMut<PlacementQueue>,
) {
    for ev in events.read() {
        let blueprint = oriented(&ev.blueprint, ev.rotation, ev.mirror);
        let settings = settings_for(&config, ev.rotation, ev.mirror, false);
        info!("Queued removal of '{}' at {}", blueprint.name(), ev.position);
        queue
            .work
            .push_back(QueuedWork::Place(PlacementJob::remove(blueprint, ev.position, settings)));
    }
}

fn enqueue_undo(
    mut events: EventReader<UndoRequested>,
    mut history: ResMut<ChangeHistory>,
    mut queue: ResMut<PlacementQueue>,
) {
    for _ in events.read() {
        match history.pop_undo() {
            Some(set) => queue.work.push_back(QueuedWork::Revert(RevertJob::undo(set))),
            None => warn!("Undo requested with an empty history"),
        }
    }
}

fn enqueue_redo(
    mut events: EventReader<RedoRequested>,
    mut history: ResMut<ChangeHistory>,
    mut queue: ResMut<PlacementQueue>,
) {
    for _ in events.read() {
        match history.pop_redo() {
            Some(set) => queue.work.push_back(QueuedWork::Revert(RevertJob::redo(set))),
            None => warn!("Redo requested with nothing to redo"),
        }
    }
}

/// Advance the front of the queue by one tick's budget and retire it once
/// it stops.
fn advance_queue<W: WorldAccess + Resource>(
    mut queue: ResMut<PlacementQueue>,
    mut world: ResMut<W>,
    registry: Res<StrategyRegistry>,
    config: Res<PlacementConfig>,
    mut history: ResMut<ChangeHistory>,
    mut finished: EventWriter<PlacementFinished>,
    mut reverted: EventWriter<RevertFinished>,
) {
    let budget = config.cells_per_tick;
    let status = match queue.work.front_mut() {
        None => return,
        Some(QueuedWork::Place(job)) => job.tick(&registry, &mut *world, budget),
        Some(QueuedWork::Revert(job)) => job.tick(&mut *world, budget),
    };
    if status == JobStatus::InProgress {
        return;
    }

    match queue.work.pop_front() {
        Some(QueuedWork::Place(mut job)) => {
            let stats = job.stats().clone();
            let name = job.blueprint().name().to_string();
            // partial work from a failed job is still undoable
            history.push(job.take_change_set());
            info!(
                "Blueprint '{}' {:?} finished with {:?}: {} placed, {} already in place, {} ticks",
                name,
                job.mode(),
                status,
                stats.placed,
                stats.already_satisfied,
                stats.ticks
            );
            finished.send(PlacementFinished {
                name,
                mode: job.mode(),
                status,
                cells_placed: stats.placed,
                ticks: stats.ticks,
                resources: stats.resources_used(),
            });
        }
        Some(QueuedWork::Revert(job)) => {
            let direction = job.direction();
            let label = job.label().to_string();
            let cells = job.applied();
            let set = job.into_set();
            match direction {
                RevertDirection::Undo => history.push_redo(set),
                RevertDirection::Redo => history.push_undo_no_clear(set),
            }
            info!("{direction:?} of '{label}' restored {cells} cells");
            reverted.send(RevertFinished {
                label,
                direction,
                cells,
            });
        }
        None => {}
    }
}

// =============================================================================
// Plugin
// =============================================================================

/// Runs queued placements against the world resource `W` in `FixedUpdate`.
pub struct BlueprintPlacementPlugin<W> {
    _world: PhantomData<fn() -> W>,
}

impl<W> Default for BlueprintPlacementPlugin<W> {
    fn default() -> Self {
        Self {
            _world: PhantomData,
        }
    }
}

impl<W: WorldAccess + Resource> Plugin for BlueprintPlacementPlugin<W> {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlacementConfig>()
            .init_resource::<StrategyRegistry>()
            .init_resource::<ChangeHistory>()
            .init_resource::<PlacementQueue>()
            .add_event::<PlaceBlueprint>()
            .add_event::<RemoveBlueprint>()
            .add_event::<PlacementFinished>()
            .add_event::<UndoRequested>()
            .add_event::<RedoRequested>()
            .add_event::<RevertFinished>()
            .add_systems(
                FixedUpdate,
                (
                    sync_history_capacity,
                    enqueue_placements,
                    enqueue_removals,
                    enqueue_undo,
                    enqueue_redo,
                    advance_queue::<W>,
                )
                    .chain(),
            );
    }
}
