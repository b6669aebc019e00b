use bevy::math::DVec3;

use super::*;
use crate::model::{EntityKind, ItemStack, LooseEntity};
use crate::state::{Facing, FACING, SHAPE};
use crate::test_harness::MemoryWorld;

fn stone() -> BlockState {
    BlockState::new("stone", BlockKind::Solid)
}

fn door(half: &str) -> BlockState {
    BlockState::new("oak_door", BlockKind::Door)
        .with(FACING, "north")
        .with(HALF, half)
}

fn bed(part: &str) -> BlockState {
    BlockState::new("red_bed", BlockKind::Bed)
        .with(FACING, "east")
        .with(PART, part)
}

fn place(
    strategy: PlacementStrategy,
    world: &mut MemoryWorld,
    pos: IVec3,
    state: &BlockState,
    settings: &PlacementSettings,
    payload: Option<&SidePayload>,
) -> PlacementOutcome {
    let ctx = PlaceContext {
        payload,
        settings,
        anchor: IVec3::ZERO,
    };
    strategy.place(world, pos, state, &ctx).unwrap()
}

// -----------------------------------------------------------------------------
// Registry
// -----------------------------------------------------------------------------

#[test]
fn test_default_order_ends_with_generic() {
    let registry = StrategyRegistry::default();
    assert_eq!(registry.strategies().len(), 11);
    assert_eq!(registry.strategies()[0], PlacementStrategy::Clear);
    assert_eq!(
        registry.strategies().last(),
        Some(&PlacementStrategy::Generic)
    );
}

#[test]
fn test_custom_order_moves_generic_last() {
    let registry = StrategyRegistry::new([
        PlacementStrategy::Generic,
        PlacementStrategy::PairedDoor,
        PlacementStrategy::Clear,
    ]);
    assert_eq!(
        registry.strategies(),
        &[
            PlacementStrategy::PairedDoor,
            PlacementStrategy::Clear,
            PlacementStrategy::Generic
        ]
    );
}

#[test]
fn test_custom_order_drops_repeats() {
    let registry = StrategyRegistry::new([
        PlacementStrategy::Clear,
        PlacementStrategy::PairedDoor,
        PlacementStrategy::Clear,
        PlacementStrategy::PairedDoor,
    ]);
    assert_eq!(
        registry.strategies(),
        &[
            PlacementStrategy::Clear,
            PlacementStrategy::PairedDoor,
            PlacementStrategy::Generic
        ]
    );
}

#[test]
fn test_select_by_kind() {
    let registry = StrategyRegistry::default();
    let world = MemoryWorld::default();
    let cases = [
        (BlockState::air(), PlacementStrategy::Clear),
        (
            BlockState::new("fire", BlockKind::Fire),
            PlacementStrategy::Ignition,
        ),
        (
            BlockState::new("dirt_path", BlockKind::GrassPath),
            PlacementStrategy::CarvedSurface,
        ),
        (door("lower"), PlacementStrategy::PairedDoor),
        (bed("head"), PlacementStrategy::PairedBed),
        (
            BlockState::new("tall_grass", BlockKind::DoublePlant),
            PlacementStrategy::TallPlant,
        ),
        (
            BlockState::structure_void(),
            PlacementStrategy::NonPlaceable,
        ),
        (
            BlockState::new("sand", BlockKind::Falling),
            PlacementStrategy::Gravity,
        ),
        (
            BlockState::solid_substitution(),
            PlacementStrategy::WildcardSubstitution,
        ),
        (stone(), PlacementStrategy::Generic),
    ];
    for (state, expected) in cases {
        assert_eq!(
            registry.select(&world, IVec3::ZERO, &state),
            expected,
            "state {}",
            state.name
        );
    }
}

#[test]
fn test_stairs_fall_through_to_generic_when_world_differs() {
    let registry = StrategyRegistry::default();
    let world = MemoryWorld::default();
    let stairs = BlockState::new("oak_stairs", BlockKind::Stairs).with(FACING, "north");
    assert_eq!(
        registry.select(&world, IVec3::ZERO, &stairs),
        PlacementStrategy::Generic
    );
}

#[test]
fn test_stairs_reshaped_by_neighbours_are_accepted() {
    let registry = StrategyRegistry::default();
    let mut world = MemoryWorld::default();
    let wanted = BlockState::new("oak_stairs", BlockKind::Stairs)
        .with(FACING, "north")
        .with(SHAPE, "straight");
    world.put(IVec3::ZERO, wanted.clone().with(SHAPE, "outer_left"));

    let strategy = registry.select(&world, IVec3::ZERO, &wanted);
    assert_eq!(strategy, PlacementStrategy::AdjacentStairs);
    let outcome = place(
        strategy,
        &mut world,
        IVec3::ZERO,
        &wanted,
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Accepted);
    assert_eq!(world.block_state(IVec3::ZERO).property(SHAPE), Some("outer_left"));
}

// -----------------------------------------------------------------------------
// Paired blocks
// -----------------------------------------------------------------------------

#[test]
fn test_door_lower_writes_both_halves() {
    let mut world = MemoryWorld::default();
    let pos = IVec3::new(2, 5, 2);
    let outcome = place(
        PlacementStrategy::PairedDoor,
        &mut world,
        pos,
        &door("lower"),
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Placed(door("lower")));
    assert_eq!(world.block_state(pos), door("lower"));
    assert_eq!(world.block_state(pos + IVec3::Y), door("upper"));

    let again = place(
        PlacementStrategy::PairedDoor,
        &mut world,
        pos,
        &door("lower"),
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(again, PlacementOutcome::Accepted);
}

#[test]
fn test_door_upper_half_is_left_to_partner() {
    let mut world = MemoryWorld::default();
    let outcome = place(
        PlacementStrategy::PairedDoor,
        &mut world,
        IVec3::Y,
        &door("upper"),
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Accepted);
    assert_eq!(world.block_count(), 0);
}

#[test]
fn test_door_rolls_back_when_upper_refused() {
    let mut world = MemoryWorld::default();
    world.lock(IVec3::Y);
    let outcome = place(
        PlacementStrategy::PairedDoor,
        &mut world,
        IVec3::ZERO,
        &door("lower"),
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Denied);
    assert!(world.block_state(IVec3::ZERO).is_air());
}

#[test]
fn test_bed_head_writes_foot_and_payload() {
    let mut world = MemoryWorld::default();
    let head_pos = IVec3::new(4, 0, 0);
    let mut payload = SidePayload::new("bed");
    payload.facing = Some(Facing::East);
    let settings = PlacementSettings {
        rotation: Rotation::Clockwise90,
        ..Default::default()
    };

    let outcome = place(
        PlacementStrategy::PairedBed,
        &mut world,
        head_pos,
        &bed("head"),
        &settings,
        Some(&payload),
    );
    assert!(matches!(outcome, PlacementOutcome::Placed(_)));

    // facing east: the foot sits one cell west of the head
    let foot_pos = IVec3::new(3, 0, 0);
    assert_eq!(world.block_state(foot_pos), bed("foot"));
    let stored = world.payload(foot_pos).unwrap();
    assert_eq!(stored.facing, Some(Facing::South));
    assert_eq!(world.payload(head_pos), Some(stored));
}

#[test]
fn test_bed_denied_and_rolled_back_when_payload_refused() {
    let mut world = MemoryWorld::default();
    let head_pos = IVec3::new(4, 0, 0);
    let foot_pos = IVec3::new(3, 0, 0);
    world.lock_payload(foot_pos);
    let payload = SidePayload::new("bed");

    let outcome = place(
        PlacementStrategy::PairedBed,
        &mut world,
        head_pos,
        &bed("head"),
        &PlacementSettings::default(),
        Some(&payload),
    );
    assert_eq!(outcome, PlacementOutcome::Denied);
    assert!(world.block_state(head_pos).is_air());
    assert!(world.block_state(foot_pos).is_air());
    assert!(world.payload(head_pos).is_none());
}

#[test]
fn test_bed_foot_is_accepted_without_cost() {
    let world = MemoryWorld::default();
    let foot = bed("foot");
    assert!(PlacementStrategy::PairedBed
        .required_resources(&world, IVec3::ZERO, &foot, None, false)
        .is_empty());
    assert_eq!(
        PlacementStrategy::PairedBed.required_resources(&world, IVec3::ZERO, &bed("head"), None, false),
        vec![ResourceCost::new("red_bed", 1)]
    );
}

#[test]
fn test_tall_plant_writes_upper_half() {
    let mut world = MemoryWorld::default();
    let lower = BlockState::new("sunflower", BlockKind::DoublePlant).with(HALF, "lower");
    let outcome = place(
        PlacementStrategy::TallPlant,
        &mut world,
        IVec3::ZERO,
        &lower,
        &PlacementSettings::default(),
        None,
    );
    assert!(matches!(outcome, PlacementOutcome::Placed(_)));
    assert_eq!(world.block_state(IVec3::Y).property(HALF), Some("upper"));
}

// -----------------------------------------------------------------------------
// Terrain-dependent strategies
// -----------------------------------------------------------------------------

#[test]
fn test_gravity_block_gets_filler_below() {
    let mut world = MemoryWorld::default();
    let sand = BlockState::new("sand", BlockKind::Falling);
    let pos = IVec3::new(0, 3, 0);

    let cost = PlacementStrategy::Gravity.required_resources(&world, pos, &sand, None, false);
    assert_eq!(
        cost,
        vec![ResourceCost::new("sand", 1), ResourceCost::new("dirt", 1)]
    );

    let outcome = place(
        PlacementStrategy::Gravity,
        &mut world,
        pos,
        &sand,
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Placed(sand.clone()));
    assert_eq!(world.block_state(pos - IVec3::Y), BlockState::dirt());
}

#[test]
fn test_gravity_block_on_solid_ground_needs_no_filler() {
    let mut world = MemoryWorld::default();
    world.put(IVec3::ZERO, stone());
    let sand = BlockState::new("sand", BlockKind::Falling);
    let cost = PlacementStrategy::Gravity.required_resources(&world, IVec3::Y, &sand, None, false);
    assert_eq!(cost, vec![ResourceCost::new("sand", 1)]);
    place(
        PlacementStrategy::Gravity,
        &mut world,
        IVec3::Y,
        &sand,
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(world.block_state(IVec3::ZERO), stone());
}

#[test]
fn test_wildcard_accepts_anything() {
    let mut world = MemoryWorld::default();
    let outcome = place(
        PlacementStrategy::WildcardSubstitution,
        &mut world,
        IVec3::ZERO,
        &BlockState::substitution(),
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Accepted);
    assert_eq!(world.writes, 0);
}

#[test]
fn test_solid_wildcard_resolves_to_filler() {
    let mut world = MemoryWorld::default();
    let wildcard = BlockState::solid_substitution();
    let outcome = place(
        PlacementStrategy::WildcardSubstitution,
        &mut world,
        IVec3::ZERO,
        &wildcard,
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Placed(BlockState::dirt()));
    assert_eq!(world.block_state(IVec3::ZERO), BlockState::dirt());

    world.put(IVec3::X, stone());
    let outcome = place(
        PlacementStrategy::WildcardSubstitution,
        &mut world,
        IVec3::X,
        &wildcard,
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Accepted);
    assert_eq!(world.block_state(IVec3::X), stone());
}

#[test]
fn test_complete_mode_writes_placeholder_literally() {
    let mut world = MemoryWorld::default();
    let settings = PlacementSettings {
        complete: true,
        ..Default::default()
    };
    let outcome = place(
        PlacementStrategy::WildcardSubstitution,
        &mut world,
        IVec3::ZERO,
        &BlockState::solid_substitution(),
        &settings,
        None,
    );
    assert_eq!(
        outcome,
        PlacementOutcome::Placed(BlockState::solid_substitution())
    );
    assert!(PlacementStrategy::WildcardSubstitution
        .required_resources(&world, IVec3::X, &BlockState::solid_substitution(), None, true)
        .is_empty());
}

#[test]
fn test_carved_surface_costs_dirt() {
    let mut world = MemoryWorld::default();
    let path = BlockState::new("dirt_path", BlockKind::GrassPath);
    let outcome = place(
        PlacementStrategy::CarvedSurface,
        &mut world,
        IVec3::ZERO,
        &path,
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Placed(BlockState::dirt()));
    assert_eq!(world.block_state(IVec3::ZERO), path);
}

#[test]
fn test_non_placeable_never_writes() {
    let mut world = MemoryWorld::default();
    let portal = BlockState::new("nether_portal", BlockKind::NonPlaceable);
    let outcome = place(
        PlacementStrategy::NonPlaceable,
        &mut world,
        IVec3::ZERO,
        &portal,
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Accepted);
    assert_eq!(world.writes, 0);
}

// -----------------------------------------------------------------------------
// Clear
// -----------------------------------------------------------------------------

#[test]
fn test_clear_removes_block_and_loose_objects() {
    let mut world = MemoryWorld::default();
    let pos = IVec3::new(1, 0, 1);
    world.put(pos, stone());
    world.add_object(LooseEntity::new(
        "item",
        EntityKind::DroppedItem,
        DVec3::new(1.5, 0.2, 1.5),
    ));
    world.add_object(LooseEntity::new(
        "frame",
        EntityKind::ItemFrame,
        DVec3::new(1.5, 0.5, 1.5),
    ));

    let outcome = place(
        PlacementStrategy::Clear,
        &mut world,
        pos,
        &BlockState::air(),
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Placed(BlockState::air()));
    assert!(world.block_state(pos).is_air());
    assert_eq!(world.objects().len(), 1);
    assert_eq!(world.objects()[0].type_id, "frame");
}

#[test]
fn test_clear_on_empty_cell_is_accepted() {
    let mut world = MemoryWorld::default();
    let outcome = place(
        PlacementStrategy::Clear,
        &mut world,
        IVec3::ZERO,
        &BlockState::air(),
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Accepted);
}

// -----------------------------------------------------------------------------
// Generic
// -----------------------------------------------------------------------------

#[test]
fn test_generic_writes_payload_with_transformed_facing() {
    let mut world = MemoryWorld::default();
    let chest = BlockState::new("chest", BlockKind::Container).with(FACING, "east");
    let mut payload = SidePayload::new("chest");
    payload.facing = Some(Facing::North);
    payload.items.push(ItemStack {
        item: "bread".to_string(),
        count: 3,
    });
    let settings = PlacementSettings {
        rotation: Rotation::Clockwise90,
        ..Default::default()
    };

    let outcome = place(
        PlacementStrategy::Generic,
        &mut world,
        IVec3::ZERO,
        &chest,
        &settings,
        Some(&payload),
    );
    assert_eq!(outcome, PlacementOutcome::Placed(chest.clone()));
    let stored = world.payload(IVec3::ZERO).unwrap();
    assert_eq!(stored.facing, Some(Facing::East));
    assert_eq!(stored.items, payload.items);

    let again = place(
        PlacementStrategy::Generic,
        &mut world,
        IVec3::ZERO,
        &chest,
        &settings,
        Some(&payload),
    );
    assert_eq!(again, PlacementOutcome::Accepted);
}

#[test]
fn test_generic_denied_on_locked_cell() {
    let mut world = MemoryWorld::default();
    world.lock(IVec3::ZERO);
    let outcome = place(
        PlacementStrategy::Generic,
        &mut world,
        IVec3::ZERO,
        &stone(),
        &PlacementSettings::default(),
        None,
    );
    assert_eq!(outcome, PlacementOutcome::Denied);
    assert!(world.block_state(IVec3::ZERO).is_air());
}

#[test]
fn test_generic_denied_when_payload_refused() {
    let mut world = MemoryWorld::default();
    let chest = BlockState::new("chest", BlockKind::Container);
    let payload = SidePayload::new("chest");
    world.lock_payload(IVec3::ZERO);

    let outcome = place(
        PlacementStrategy::Generic,
        &mut world,
        IVec3::ZERO,
        &chest,
        &PlacementSettings::default(),
        Some(&payload),
    );
    assert_eq!(outcome, PlacementOutcome::Denied);
    assert!(world.block_state(IVec3::ZERO).is_air());

    // block already right, only the payload is missing
    world.put(IVec3::ZERO, chest.clone());
    let outcome = place(
        PlacementStrategy::Generic,
        &mut world,
        IVec3::ZERO,
        &chest,
        &PlacementSettings::default(),
        Some(&payload),
    );
    assert_eq!(outcome, PlacementOutcome::Denied);
    assert!(world.payload(IVec3::ZERO).is_none());
}

#[test]
fn test_anchor_payload_records_world_anchor() {
    let mut world = MemoryWorld::default();
    let anchor = BlockState::new("blueprint_anchor", BlockKind::Anchor);
    let payload = SidePayload::new("anchor");
    let settings = PlacementSettings::default();
    let ctx = PlaceContext {
        payload: Some(&payload),
        settings: &settings,
        anchor: IVec3::new(10, 64, -5),
    };
    let outcome = PlacementStrategy::Generic
        .place(&mut world, IVec3::new(10, 64, -5), &anchor, &ctx)
        .unwrap();
    assert!(matches!(outcome, PlacementOutcome::Placed(_)));
    let stored = world.payload(IVec3::new(10, 64, -5)).unwrap();
    assert_eq!(stored.extra.get("anchor").map(String::as_str), Some("10,64,-5"));
}

#[test]
fn test_generic_cost_includes_payload_items() {
    let world = MemoryWorld::default();
    let mut payload = SidePayload::new("chest");
    payload.items.push(ItemStack {
        item: "torch".to_string(),
        count: 8,
    });
    let chest = BlockState::new("chest", BlockKind::Container);
    let cost = PlacementStrategy::Generic.required_resources(
        &world,
        IVec3::ZERO,
        &chest,
        Some(&payload),
        false,
    );
    assert_eq!(
        cost,
        vec![ResourceCost::new("chest", 1), ResourceCost::new("torch", 8)]
    );
    assert_eq!(world.writes, 0, "cost queries never write");
}

#[test]
fn test_mismatched_kind_is_an_error() {
    let mut world = MemoryWorld::default();
    let settings = PlacementSettings::default();
    let ctx = PlaceContext {
        payload: None,
        settings: &settings,
        anchor: IVec3::ZERO,
    };
    let err = PlacementStrategy::PairedDoor
        .place(&mut world, IVec3::ZERO, &stone(), &ctx)
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("paired_door"), "got: {msg}");
    assert_eq!(world.writes, 0);
}

#[test]
fn test_merge_costs_sums_and_sorts() {
    let merged = merge_costs([
        ResourceCost::new("stone", 2),
        ResourceCost::new("dirt", 1),
        ResourceCost::new("stone", 3),
    ]);
    assert_eq!(
        merged,
        vec![ResourceCost::new("dirt", 1), ResourceCost::new("stone", 5)]
    );
}
