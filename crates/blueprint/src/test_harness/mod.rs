//! # TestSite: headless harness for placement tests
//!
//! Wraps a `bevy::app::App` running `BlueprintPlacementPlugin` against an
//! in-memory world, so whole place/undo/redo flows can be driven tick by
//! tick without a game.

mod memory_world;

pub use memory_world::MemoryWorld;

use std::sync::Arc;

use bevy::app::App;
use bevy::ecs::event::Events;
use bevy::prelude::*;

use crate::config::PlacementConfig;
use crate::history::ChangeHistory;
use crate::model::Blueprint;
use crate::plugin::{
    BlueprintPlacementPlugin, PlaceBlueprint, PlacementFinished, PlacementQueue, RedoRequested,
    RemoveBlueprint, RevertFinished, UndoRequested,
};
use crate::transform::{Mirror, Rotation};

/// A headless App with the placement plugin and an empty `MemoryWorld`.
pub struct TestSite {
    app: App,
}

impl Default for TestSite {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSite {
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.init_resource::<MemoryWorld>();
        app.add_plugins(BlueprintPlacementPlugin::<MemoryWorld>::default());
        app.update();
        Self { app }
    }

    /// Replace the placement config.
    pub fn with_config(mut self, config: PlacementConfig) -> Self {
        self.app.insert_resource(config);
        self
    }

    /// Seed the world before any placement runs.
    pub fn with_world(mut self, world: MemoryWorld) -> Self {
        self.app.insert_resource(world);
        self
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Run `FixedUpdate` `n` times.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    /// Tick until the queue drains. Returns the ticks taken, or `None` if
    /// work is still pending after `max_ticks`.
    pub fn run_until_idle(&mut self, max_ticks: u32) -> Option<u32> {
        // one tick so freshly sent events reach the queue
        self.tick(1);
        let mut ticks = 1;
        while !self.resource::<PlacementQueue>().is_empty() {
            if ticks >= max_ticks {
                return None;
            }
            self.tick(1);
            ticks += 1;
        }
        Some(ticks)
    }

    pub fn place(&mut self, blueprint: &Arc<Blueprint>, position: IVec3) {
        self.send(PlaceBlueprint::new(Arc::clone(blueprint), position));
    }

    pub fn place_rotated(
        &mut self,
        blueprint: &Arc<Blueprint>,
        position: IVec3,
        rotation: Rotation,
        mirror: Mirror,
    ) {
        self.send(PlaceBlueprint::new(Arc::clone(blueprint), position).rotated(rotation, mirror));
    }

    pub fn remove(&mut self, blueprint: &Arc<Blueprint>, position: IVec3) {
        self.send(RemoveBlueprint {
            blueprint: Arc::clone(blueprint),
            position,
            rotation: Rotation::None,
            mirror: Mirror::None,
        });
    }

    pub fn undo(&mut self) {
        self.send(UndoRequested);
    }

    pub fn redo(&mut self) {
        self.send(RedoRequested);
    }

    pub fn send<E: Event>(&mut self, event: E) {
        self.app.world_mut().send_event(event);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world(&self) -> &MemoryWorld {
        self.resource::<MemoryWorld>()
    }

    pub fn world_mut(&mut self) -> Mut<'_, MemoryWorld> {
        self.app.world_mut().resource_mut::<MemoryWorld>()
    }

    pub fn history(&self) -> &ChangeHistory {
        self.resource::<ChangeHistory>()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    /// Placement results emitted since the last call.
    pub fn drain_finished(&mut self) -> Vec<PlacementFinished> {
        self.app
            .world_mut()
            .resource_mut::<Events<PlacementFinished>>()
            .drain()
            .collect()
    }

    /// Undo/redo results emitted since the last call.
    pub fn drain_reverted(&mut self) -> Vec<RevertFinished> {
        self.app
            .world_mut()
            .resource_mut::<Events<RevertFinished>>()
            .drain()
            .collect()
    }
}
