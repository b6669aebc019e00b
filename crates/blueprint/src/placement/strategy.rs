//! Block-type-specific placement rules.
//!
//! `PlacementStrategy` is a closed set of rules. `StrategyRegistry` holds
//! them in an explicit priority order; the first strategy whose
//! `can_handle` accepts a cell wins, and `Generic` accepts everything.

use std::collections::{BTreeMap, HashSet};

use bevy::prelude::*;

use crate::error::BlueprintError;
use crate::model::SidePayload;
use crate::state::{BlockKind, BlockState, HALF, PART};
use crate::transform::{Mirror, Rotation};

use super::world::WorldAccess;

// =============================================================================
// Types
// =============================================================================

/// How a blueprint is being placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementSettings {
    /// Transform already applied to the blueprint; re-applied to payload
    /// orientation when payloads are replayed.
    pub rotation: Rotation,
    pub mirror: Mirror,
    pub fancy: bool,
    /// Write placeholders literally.
    pub complete: bool,
    pub include_entities: bool,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            rotation: Rotation::None,
            mirror: Mirror::None,
            fancy: true,
            complete: false,
            include_entities: false,
        }
    }
}

/// Per-cell inputs to [`PlacementStrategy::place`].
#[derive(Debug, Clone, Copy)]
pub struct PlaceContext<'a> {
    pub payload: Option<&'a SidePayload>,
    pub settings: &'a PlacementSettings,
    /// World position of the blueprint's anchor.
    pub anchor: IVec3,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceCost {
    pub item: String,
    pub count: u32,
}

impl ResourceCost {
    pub fn new(item: impl Into<String>, count: u32) -> Self {
        Self {
            item: item.into(),
            count,
        }
    }
}

/// Sum costs per item, sorted by item id.
pub fn merge_costs(costs: impl IntoIterator<Item = ResourceCost>) -> Vec<ResourceCost> {
    let mut totals: BTreeMap<String, u32> = BTreeMap::new();
    for cost in costs {
        *totals.entry(cost.item).or_default() += cost.count;
    }
    totals
        .into_iter()
        .map(|(item, count)| ResourceCost { item, count })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// The world already holds the target. Nothing was written.
    Accepted,
    /// The world refused a write. Retry the same cell later.
    Denied,
    /// Written; carries the state used for cost bookkeeping.
    Placed(BlockState),
}

// =============================================================================
// PlacementStrategy
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlacementStrategy {
    /// Empties the cell after evicting loose objects.
    Clear,
    Ignition,
    /// Path and lawn blocks: a surface state over dirt.
    CarvedSurface,
    PairedDoor,
    PairedBed,
    TallPlant,
    NonPlaceable,
    /// Stairs whose neighbours have already reshaped them.
    AdjacentStairs,
    Gravity,
    WildcardSubstitution,
    Generic,
}

impl PlacementStrategy {
    pub fn name(self) -> &'static str {
        match self {
            PlacementStrategy::Clear => "clear",
            PlacementStrategy::Ignition => "ignition",
            PlacementStrategy::CarvedSurface => "carved_surface",
            PlacementStrategy::PairedDoor => "paired_door",
            PlacementStrategy::PairedBed => "paired_bed",
            PlacementStrategy::TallPlant => "tall_plant",
            PlacementStrategy::NonPlaceable => "non_placeable",
            PlacementStrategy::AdjacentStairs => "adjacent_stairs",
            PlacementStrategy::Gravity => "gravity",
            PlacementStrategy::WildcardSubstitution => "wildcard_substitution",
            PlacementStrategy::Generic => "generic",
        }
    }

    /// Block kinds this strategy is allowed to place.
    fn handles_kind(self, kind: BlockKind) -> bool {
        match self {
            PlacementStrategy::Clear => kind == BlockKind::Air,
            PlacementStrategy::Ignition => kind == BlockKind::Fire,
            PlacementStrategy::CarvedSurface => {
                matches!(kind, BlockKind::Grass | BlockKind::GrassPath)
            }
            PlacementStrategy::PairedDoor => kind == BlockKind::Door,
            PlacementStrategy::PairedBed => kind == BlockKind::Bed,
            PlacementStrategy::TallPlant => kind == BlockKind::DoublePlant,
            PlacementStrategy::NonPlaceable => {
                matches!(kind, BlockKind::NonPlaceable | BlockKind::StructureVoid)
            }
            PlacementStrategy::AdjacentStairs => kind == BlockKind::Stairs,
            PlacementStrategy::Gravity => kind == BlockKind::Falling,
            PlacementStrategy::WildcardSubstitution => {
                matches!(kind, BlockKind::Substitution | BlockKind::SolidSubstitution)
            }
            PlacementStrategy::Generic => true,
        }
    }

    pub fn can_handle<W: WorldAccess + ?Sized>(
        self,
        world: &W,
        pos: IVec3,
        state: &BlockState,
    ) -> bool {
        if !self.handles_kind(state.kind) {
            return false;
        }
        match self {
            // Stair shape follows the neighbours, so only name, facing and
            // half have to line up.
            PlacementStrategy::AdjacentStairs => {
                let current = world.block_state(pos);
                current.kind == BlockKind::Stairs && current.same_orientation(state)
            }
            _ => true,
        }
    }

    /// Items needed to place `state` at `pos`. Reads the world but never
    /// writes, and does not assume placement will succeed.
    pub fn required_resources<W: WorldAccess + ?Sized>(
        self,
        world: &W,
        pos: IVec3,
        state: &BlockState,
        payload: Option<&SidePayload>,
        complete: bool,
    ) -> Vec<ResourceCost> {
        let own_item = || {
            state
                .item_id()
                .map(|item| vec![ResourceCost::new(item, 1)])
                .unwrap_or_default()
        };
        match self {
            PlacementStrategy::Clear
            | PlacementStrategy::NonPlaceable
            | PlacementStrategy::AdjacentStairs => Vec::new(),
            PlacementStrategy::Ignition => vec![ResourceCost::new("flint_and_steel", 1)],
            PlacementStrategy::CarvedSurface => vec![ResourceCost::new("dirt", 1)],
            PlacementStrategy::PairedDoor
            | PlacementStrategy::PairedBed
            | PlacementStrategy::TallPlant => {
                if state.is_secondary_half() {
                    Vec::new()
                } else {
                    own_item()
                }
            }
            PlacementStrategy::Gravity => {
                let mut costs = own_item();
                let below = pos - IVec3::Y;
                if !world.block_state(below).is_solid() {
                    costs.extend(filler_cost(&world.surface_filler(below)));
                }
                costs
            }
            PlacementStrategy::WildcardSubstitution => {
                if complete
                    || state.kind == BlockKind::Substitution
                    || world.block_state(pos).is_solid()
                {
                    Vec::new()
                } else {
                    filler_cost(&world.surface_filler(pos))
                }
            }
            PlacementStrategy::Generic => {
                let mut costs = own_item();
                if let Some(payload) = payload {
                    costs.extend(
                        payload
                            .items
                            .iter()
                            .map(|stack| ResourceCost::new(stack.item.clone(), stack.count)),
                    );
                }
                costs
            }
        }
    }

    /// Materialize `state` at `pos`.
    ///
    /// Returns `Accepted` without writing when the world already matches.
    /// A kind outside this strategy's domain is a wiring error.
    pub fn place<W: WorldAccess + ?Sized>(
        self,
        world: &mut W,
        pos: IVec3,
        state: &BlockState,
        ctx: &PlaceContext<'_>,
    ) -> Result<PlacementOutcome, BlueprintError> {
        if !self.handles_kind(state.kind) {
            return Err(BlueprintError::StrategyMismatch {
                strategy: self.name(),
                kind: state.kind,
            });
        }
        let outcome = match self {
            PlacementStrategy::Clear => {
                world.evict_objects(pos);
                if world.block_state(pos).is_air() {
                    PlacementOutcome::Accepted
                } else if world.remove_block(pos) {
                    PlacementOutcome::Placed(BlockState::air())
                } else {
                    PlacementOutcome::Denied
                }
            }
            PlacementStrategy::Ignition => write_if_needed(world, pos, state),
            PlacementStrategy::CarvedSurface => match write_if_needed(world, pos, state) {
                PlacementOutcome::Placed(_) => PlacementOutcome::Placed(BlockState::dirt()),
                other => other,
            },
            PlacementStrategy::PairedDoor | PlacementStrategy::TallPlant => {
                if state.is_secondary_half() {
                    PlacementOutcome::Accepted
                } else {
                    let upper = state.clone().with(HALF, "upper");
                    place_pair(world, pos, state, pos + IVec3::Y, &upper)
                }
            }
            PlacementStrategy::PairedBed => {
                if state.is_secondary_half() {
                    PlacementOutcome::Accepted
                } else if let Some(facing) = state.facing() {
                    let foot_pos = pos - facing.offset();
                    let foot = state.clone().with(PART, "foot");
                    let before = [snapshot(world, pos), snapshot(world, foot_pos)];
                    let outcome = place_pair(world, pos, state, foot_pos, &foot);
                    if let (PlacementOutcome::Placed(_), Some(payload)) = (&outcome, ctx.payload) {
                        let payload = oriented_payload(payload, state, ctx);
                        if !world.set_payload(pos, Some(payload.clone()))
                            || !world.set_payload(foot_pos, Some(payload))
                        {
                            for cell in before {
                                restore(world, cell);
                            }
                            return Ok(PlacementOutcome::Denied);
                        }
                    }
                    outcome
                } else {
                    write_if_needed(world, pos, state)
                }
            }
            PlacementStrategy::NonPlaceable | PlacementStrategy::AdjacentStairs => {
                PlacementOutcome::Accepted
            }
            PlacementStrategy::Gravity => {
                if world.block_state(pos) == *state {
                    return Ok(PlacementOutcome::Accepted);
                }
                let below = pos - IVec3::Y;
                if !world.block_state(below).is_solid() {
                    let filler = world.surface_filler(below);
                    if !world.set_block_state(below, &filler) {
                        return Ok(PlacementOutcome::Denied);
                    }
                }
                write_if_needed(world, pos, state)
            }
            PlacementStrategy::WildcardSubstitution => {
                if ctx.settings.complete {
                    write_if_needed(world, pos, state)
                } else if state.kind == BlockKind::Substitution || world.block_state(pos).is_solid()
                {
                    PlacementOutcome::Accepted
                } else {
                    let filler = world.surface_filler(pos);
                    if world.set_block_state(pos, &filler) {
                        PlacementOutcome::Placed(filler)
                    } else {
                        PlacementOutcome::Denied
                    }
                }
            }
            PlacementStrategy::Generic => place_generic(world, pos, state, ctx),
        };
        Ok(outcome)
    }
}

fn filler_cost(filler: &BlockState) -> Vec<ResourceCost> {
    filler
        .item_id()
        .map(|item| vec![ResourceCost::new(item, 1)])
        .unwrap_or_default()
}

fn write_if_needed<W: WorldAccess + ?Sized>(
    world: &mut W,
    pos: IVec3,
    state: &BlockState,
) -> PlacementOutcome {
    if world.block_state(pos) == *state {
        PlacementOutcome::Accepted
    } else if world.set_block_state(pos, state) {
        PlacementOutcome::Placed(state.clone())
    } else {
        PlacementOutcome::Denied
    }
}

/// Write two cells as a unit. If the second write is refused the first is
/// rolled back.
fn place_pair<W: WorldAccess + ?Sized>(
    world: &mut W,
    first_pos: IVec3,
    first: &BlockState,
    second_pos: IVec3,
    second: &BlockState,
) -> PlacementOutcome {
    let previous_first = world.block_state(first_pos);
    if previous_first == *first && world.block_state(second_pos) == *second {
        return PlacementOutcome::Accepted;
    }
    if !world.set_block_state(first_pos, first) {
        return PlacementOutcome::Denied;
    }
    if !world.set_block_state(second_pos, second) {
        world.set_block_state(first_pos, &previous_first);
        return PlacementOutcome::Denied;
    }
    PlacementOutcome::Placed(first.clone())
}

/// Payload as it should land in the world: orientation turned by the
/// placement transform, anchor blocks stamped with the structure origin.
fn oriented_payload(payload: &SidePayload, state: &BlockState, ctx: &PlaceContext<'_>) -> SidePayload {
    let mut out = payload.clone();
    out.facing = payload
        .facing
        .map(|f| f.mirrored(ctx.settings.mirror).rotated(ctx.settings.rotation));
    if state.kind == BlockKind::Anchor {
        let a = ctx.anchor;
        out.extra
            .insert("anchor".to_string(), format!("{},{},{}", a.x, a.y, a.z));
    }
    out
}

fn place_generic<W: WorldAccess + ?Sized>(
    world: &mut W,
    pos: IVec3,
    state: &BlockState,
    ctx: &PlaceContext<'_>,
) -> PlacementOutcome {
    let payload = ctx.payload.map(|p| oriented_payload(p, state, ctx));
    if world.block_state(pos) == *state {
        if payload.is_none() || world.payload(pos) == payload {
            return PlacementOutcome::Accepted;
        }
        if !world.set_payload(pos, payload) {
            return PlacementOutcome::Denied;
        }
        return PlacementOutcome::Placed(state.clone());
    }
    let before = snapshot(world, pos);
    if !world.set_block_state(pos, state) {
        return PlacementOutcome::Denied;
    }
    if payload.is_some() && !world.set_payload(pos, payload) {
        restore(world, before);
        return PlacementOutcome::Denied;
    }
    PlacementOutcome::Placed(state.clone())
}

/// Block and payload at one position.
type CellSnapshot = (IVec3, BlockState, Option<SidePayload>);

fn snapshot<W: WorldAccess + ?Sized>(world: &W, pos: IVec3) -> CellSnapshot {
    (pos, world.block_state(pos), world.payload(pos))
}

/// Put a snapshotted cell back after a partial write was refused.
fn restore<W: WorldAccess + ?Sized>(world: &mut W, (pos, state, payload): CellSnapshot) {
    world.set_block_state(pos, &state);
    world.set_payload(pos, payload);
}

// =============================================================================
// StrategyRegistry
// =============================================================================

/// Priority order used by [`StrategyRegistry::default`].
pub const DEFAULT_ORDER: [PlacementStrategy; 11] = [
    PlacementStrategy::Clear,
    PlacementStrategy::Ignition,
    PlacementStrategy::CarvedSurface,
    PlacementStrategy::PairedDoor,
    PlacementStrategy::PairedBed,
    PlacementStrategy::TallPlant,
    PlacementStrategy::NonPlaceable,
    PlacementStrategy::AdjacentStairs,
    PlacementStrategy::Gravity,
    PlacementStrategy::WildcardSubstitution,
    PlacementStrategy::Generic,
];

/// Ordered strategy list. Always ends with `Generic`.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct StrategyRegistry {
    strategies: Vec<PlacementStrategy>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self {
            strategies: DEFAULT_ORDER.to_vec(),
        }
    }
}

impl StrategyRegistry {
    /// Registry with a custom order. Repeats keep their first position.
    /// `Generic` is moved to the end, or appended if missing.
    pub fn new(order: impl IntoIterator<Item = PlacementStrategy>) -> Self {
        let mut seen = HashSet::new();
        let mut strategies: Vec<PlacementStrategy> = order
            .into_iter()
            .filter(|s| *s != PlacementStrategy::Generic && seen.insert(*s))
            .collect();
        strategies.push(PlacementStrategy::Generic);
        Self { strategies }
    }

    pub fn strategies(&self) -> &[PlacementStrategy] {
        &self.strategies
    }

    /// First strategy that accepts the cell.
    pub fn select<W: WorldAccess + ?Sized>(
        &self,
        world: &W,
        pos: IVec3,
        state: &BlockState,
    ) -> PlacementStrategy {
        self.strategies
            .iter()
            .copied()
            .find(|s| s.can_handle(world, pos, state))
            .unwrap_or(PlacementStrategy::Generic)
    }
}

#[cfg(test)]
mod tests;
