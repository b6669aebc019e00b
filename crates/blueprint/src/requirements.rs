//! Dry-run bill of materials for placing a blueprint.

use bevy::math::IVec3;

use crate::model::Blueprint;
use crate::placement::{merge_costs, PlacementSettings, ResourceCost, StrategyRegistry, WorldAccess};

/// Items a placement of `blueprint` at `world_anchor` would consume, merged
/// per item and sorted by item id.
///
/// `blueprint` is taken as already transformed. Cells the world already
/// satisfies cost nothing, matching what a `PlacementJob` charges. Nothing
/// is written to `world`.
pub fn items_required<W: WorldAccess + ?Sized>(
    blueprint: &Blueprint,
    world: &W,
    world_anchor: IVec3,
    registry: &StrategyRegistry,
    settings: &PlacementSettings,
) -> Vec<ResourceCost> {
    let origin = world_anchor - blueprint.anchor();
    let mut costs = Vec::new();
    for cell in blueprint.cell_list() {
        let pos = origin + cell.pos;
        if world.states_equivalent(&cell.state, &world.block_state(pos), settings.fancy) {
            continue;
        }
        let strategy = registry.select(world, pos, &cell.state);
        costs.extend(strategy.required_resources(
            world,
            pos,
            &cell.state,
            cell.payload.as_ref(),
            settings.complete,
        ));
    }
    if settings.include_entities {
        costs.extend(
            blueprint
                .entities()
                .iter()
                .filter_map(|e| e.kind().and_then(|k| k.item_id()))
                .map(|item| ResourceCost::new(item, 1)),
        );
    }
    merge_costs(costs)
}
