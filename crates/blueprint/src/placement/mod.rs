//! Incremental placement of a blueprint into a live world.
//!
//! A `BlueprintCursor` scans the volume and skips cells the world already
//! satisfies, a `StrategyRegistry` picks the rule for each remaining cell,
//! and a `PlacementJob` ties both to a world under a per-tick budget.

pub mod cursor;
pub mod job;
pub mod strategy;
pub mod world;

pub use cursor::{BlueprintCursor, CursorState, ScanContext, ScanStep, StepResult, NULL_POS};
pub use job::{
    CellFilter, JobStats, JobStatus, PlacementJob, PlacementMode, PlacementProgress,
};
pub use strategy::{
    merge_costs, PlaceContext, PlacementOutcome, PlacementSettings, PlacementStrategy,
    ResourceCost, StrategyRegistry, DEFAULT_ORDER,
};
pub use world::{RecordingWorld, WorldAccess};
