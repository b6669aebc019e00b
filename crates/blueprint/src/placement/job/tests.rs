use bevy::math::DVec3;

use super::*;
use crate::history::RevertJob;
use crate::model::{EntityKind, Extent, LooseEntity};
use crate::state::BlockKind;
use crate::test_harness::MemoryWorld;

fn stone() -> BlockState {
    BlockState::new("stone", BlockKind::Solid)
}

fn stone_box(x: u16, y: u16, z: u16) -> Arc<Blueprint> {
    Arc::new(Blueprint::filled(Extent::new(x, y, z), stone()).with_name("box"))
}

/// A job whose local origin lands on the world origin.
fn job_at_origin(bp: &Arc<Blueprint>, settings: PlacementSettings) -> PlacementJob {
    PlacementJob::place(Arc::clone(bp), bp.anchor(), settings)
}

fn run_to_end(job: &mut PlacementJob, world: &mut MemoryWorld, budget: usize) -> JobStatus {
    let registry = StrategyRegistry::default();
    for _ in 0..1000 {
        let status = job.tick(&registry, world, budget);
        if status != JobStatus::InProgress {
            return status;
        }
    }
    JobStatus::InProgress
}

#[test]
fn test_places_every_cell() {
    let bp = stone_box(3, 2, 3);
    let mut world = MemoryWorld::default();
    let mut job = job_at_origin(&bp, PlacementSettings::default());

    let status = job.tick(&StrategyRegistry::default(), &mut world, 1000);
    assert_eq!(status, JobStatus::Complete);
    assert_eq!(world.block_count(), 18);
    assert_eq!(job.stats().placed, 18);
    assert_eq!(job.stats().cells_examined, 18);
    assert_eq!(job.stats().resources_used(), vec![ResourceCost::new("stone", 18)]);
}

#[test]
fn test_origin_offsets_by_anchor() {
    let bp = stone_box(3, 1, 3);
    let job = PlacementJob::place(Arc::clone(&bp), IVec3::new(100, 64, 100), PlacementSettings::default());
    assert_eq!(bp.anchor(), IVec3::new(1, 0, 1));
    assert_eq!(job.origin(), IVec3::new(99, 64, 99));
}

#[test]
fn test_matching_world_needs_no_writes() {
    let bp = stone_box(3, 2, 3);
    let mut world = MemoryWorld::default();
    world.fill_from(&bp, IVec3::ZERO);
    let mut job = job_at_origin(&bp, PlacementSettings::default());

    assert_eq!(run_to_end(&mut job, &mut world, 1000), JobStatus::Complete);
    assert_eq!(world.writes, 0);
    assert_eq!(job.stats().placed, 0);
    assert_eq!(job.stats().already_satisfied, 18);
    assert!(job.stats().resources_used().is_empty());
    assert!(job.take_change_set().is_empty());
}

#[test]
fn test_budget_spreads_work_over_ticks() {
    let bp = stone_box(4, 1, 4);
    let mut world = MemoryWorld::default();
    let registry = StrategyRegistry::default();
    let mut job = job_at_origin(&bp, PlacementSettings::default());

    assert_eq!(job.tick(&registry, &mut world, 5), JobStatus::InProgress);
    assert_eq!(job.stats().placed, 5);
    assert_eq!(job.tick(&registry, &mut world, 5), JobStatus::InProgress);
    assert_eq!(job.tick(&registry, &mut world, 5), JobStatus::InProgress);
    assert_eq!(job.tick(&registry, &mut world, 5), JobStatus::Complete);
    assert_eq!(job.stats().placed, 16);
    assert_eq!(job.stats().ticks, 4);
    assert_eq!(job.stats().cells_examined, 16);
}

#[test]
fn test_refused_cell_is_retried_without_advancing() {
    let bp = stone_box(3, 1, 1);
    let mut world = MemoryWorld::default();
    let registry = StrategyRegistry::default();
    world.lock(IVec3::new(1, 0, 0));
    let mut job = job_at_origin(&bp, PlacementSettings::default());
    assert_eq!(job.origin(), IVec3::ZERO);

    assert_eq!(job.tick(&registry, &mut world, 100), JobStatus::InProgress);
    let progress = job.progress();
    assert_eq!(progress.cursor, [1, 0, 0]);
    assert!(progress.retry_current);

    assert_eq!(job.tick(&registry, &mut world, 100), JobStatus::InProgress);
    assert_eq!(job.progress().cursor, [1, 0, 0]);
    assert_eq!(job.stats().denied, 2);
    assert!(world.block_state(IVec3::new(2, 0, 0)).is_air());

    world.unlock(IVec3::new(1, 0, 0));
    assert_eq!(job.tick(&registry, &mut world, 100), JobStatus::Complete);
    assert_eq!(job.stats().placed, 3);
}

#[test]
fn test_progress_survives_encode_and_resume() {
    let bp = stone_box(4, 1, 4);
    let mut world = MemoryWorld::default();
    let mut first = job_at_origin(&bp, PlacementSettings::default());
    first.tick(&StrategyRegistry::default(), &mut world, 5);

    let bytes = bitcode::encode(&first.progress());
    let restored: PlacementProgress = bitcode::decode(&bytes).unwrap();
    assert_eq!(restored.cursor, [0, 0, 1]);
    assert_eq!(restored.mode, PlacementMode::Place);

    let mut resumed = job_at_origin(&bp, PlacementSettings::default());
    resumed.resume(&restored);
    assert_eq!(run_to_end(&mut resumed, &mut world, 100), JobStatus::Complete);
    assert_eq!(resumed.stats().cells_examined, 11);
    assert_eq!(resumed.stats().placed, 11);
    assert_eq!(world.block_count(), 16);
}

#[test]
fn test_cancel_stops_job() {
    let bp = stone_box(2, 1, 2);
    let mut world = MemoryWorld::default();
    let mut job = job_at_origin(&bp, PlacementSettings::default());
    job.cancel();
    assert_eq!(job.status(), JobStatus::Failed);
    assert_eq!(
        job.tick(&StrategyRegistry::default(), &mut world, 100),
        JobStatus::Failed
    );
    assert_eq!(world.writes, 0);
}

#[test]
fn test_remove_clears_last_cell_first() {
    let bp = stone_box(4, 1, 4);
    let mut world = MemoryWorld::default();
    world.fill_from(&bp, IVec3::ZERO);
    let mut job = PlacementJob::remove(Arc::clone(&bp), bp.anchor(), PlacementSettings::default());
    assert_eq!(job.mode(), PlacementMode::Remove);

    assert_eq!(run_to_end(&mut job, &mut world, 1000), JobStatus::Complete);
    assert_eq!(world.block_count(), 0);
    let set = job.take_change_set();
    assert_eq!(set.changes.len(), 16);
    assert_eq!(set.changes[0].pos, IVec3::new(3, 0, 3));
    assert_eq!(set.changes[15].pos, IVec3::ZERO);
    assert!(job.stats().resources_used().is_empty());
}

#[test]
fn test_remove_leaves_placeholder_cells_alone() {
    let mut bp = Blueprint::new(Extent::new(2, 1, 1));
    bp.set_cell(IVec3::ZERO, stone()).unwrap();
    let bp = Arc::new(bp);
    let mut world = MemoryWorld::default();
    world.put(IVec3::ZERO, stone());
    world.put(IVec3::X, stone());

    let mut job = PlacementJob::remove(Arc::clone(&bp), bp.anchor(), PlacementSettings::default());
    assert_eq!(job.origin(), IVec3::ZERO);
    assert_eq!(run_to_end(&mut job, &mut world, 100), JobStatus::Complete);
    assert!(world.block_state(IVec3::ZERO).is_air());
    assert_eq!(world.block_state(IVec3::X), stone());
}

#[test]
fn test_filter_excludes_cells() {
    let bp = stone_box(3, 1, 3);
    let mut world = MemoryWorld::default();
    let mut job = job_at_origin(&bp, PlacementSettings::default())
        .with_filter(Box::new(|cell: &CellInfo| cell.pos.x == 0));

    assert_eq!(run_to_end(&mut job, &mut world, 100), JobStatus::Complete);
    assert_eq!(world.block_count(), 6);
    assert!(world.block_state(IVec3::new(0, 0, 2)).is_air());
    assert_eq!(world.block_state(IVec3::new(2, 0, 2)), stone());
}

#[test]
fn test_wildcards_in_job() {
    let mut bp = Blueprint::new(Extent::new(2, 1, 2));
    bp.set_cell(IVec3::ZERO, BlockState::solid_substitution()).unwrap();
    let bp = Arc::new(bp);
    let mut world = MemoryWorld::default();
    let mut job = job_at_origin(&bp, PlacementSettings::default());

    assert_eq!(run_to_end(&mut job, &mut world, 100), JobStatus::Complete);
    // plain wildcards match air; the solid one is resolved to ground filler
    assert_eq!(job.stats().already_satisfied, 3);
    assert_eq!(job.stats().placed, 1);
    assert_eq!(world.block_state(job.origin()), BlockState::dirt());
    assert_eq!(job.stats().resources_used(), vec![ResourceCost::new("dirt", 1)]);
}

#[test]
fn test_strict_mode_visits_wildcards_without_writing() {
    let bp = Arc::new(Blueprint::new(Extent::new(2, 1, 2)));
    let mut world = MemoryWorld::default();
    let settings = PlacementSettings {
        fancy: false,
        ..Default::default()
    };
    let mut job = job_at_origin(&bp, settings);

    assert_eq!(run_to_end(&mut job, &mut world, 100), JobStatus::Complete);
    assert_eq!(job.stats().accepted, 4);
    assert_eq!(world.writes, 0);
}

#[test]
fn test_cost_charged_only_for_written_cells() {
    let bp = stone_box(3, 1, 1);
    let mut world = MemoryWorld::default();
    world.put(IVec3::ZERO, stone());
    let mut job = job_at_origin(&bp, PlacementSettings::default());
    run_to_end(&mut job, &mut world, 100);
    assert_eq!(job.stats().resources_used(), vec![ResourceCost::new("stone", 2)]);
}

#[test]
fn test_entities_spawned_once() {
    let mut bp = Blueprint::filled(Extent::new(2, 1, 1), stone());
    bp.push_entity(LooseEntity::new(
        "item_frame",
        EntityKind::ItemFrame,
        DVec3::new(1.5, 0.5, 0.5),
    ));
    let bp = Arc::new(bp);
    let settings = PlacementSettings {
        include_entities: true,
        ..Default::default()
    };
    let mut world = MemoryWorld::default();

    let mut job = PlacementJob::place(Arc::clone(&bp), IVec3::new(11, 0, 0), settings);
    assert_eq!(job.origin(), IVec3::new(10, 0, 0));
    assert_eq!(run_to_end(&mut job, &mut world, 100), JobStatus::Complete);
    assert_eq!(job.stats().entities_spawned, 1);
    assert_eq!(world.objects().len(), 1);
    assert_eq!(world.objects()[0].position, DVec3::new(11.5, 0.5, 0.5));
    assert_eq!(
        job.stats().resources_used(),
        vec![
            ResourceCost::new("item_frame", 1),
            ResourceCost::new("stone", 2)
        ]
    );

    let mut again = PlacementJob::place(Arc::clone(&bp), IVec3::new(11, 0, 0), settings);
    assert_eq!(run_to_end(&mut again, &mut world, 100), JobStatus::Complete);
    assert_eq!(again.stats().entities_spawned, 0);
    assert_eq!(world.objects().len(), 1);
}

#[test]
fn test_entities_ignored_unless_requested() {
    let mut bp = Blueprint::filled(Extent::new(1, 1, 1), stone());
    bp.push_entity(LooseEntity::new(
        "armor_stand",
        EntityKind::ArmorStand,
        DVec3::new(0.5, 0.0, 0.5),
    ));
    let bp = Arc::new(bp);
    let mut world = MemoryWorld::default();
    let mut job = job_at_origin(&bp, PlacementSettings::default());
    run_to_end(&mut job, &mut world, 100);
    assert!(world.objects().is_empty());
}

#[test]
fn test_change_set_reverts_placement() {
    let bp = stone_box(3, 1, 1);
    let mut world = MemoryWorld::default();
    world.put(IVec3::new(2, 0, 0), BlockState::dirt());
    let mut job = job_at_origin(&bp, PlacementSettings::default());
    run_to_end(&mut job, &mut world, 100);

    let set = job.take_change_set();
    assert_eq!(set.label, "box");
    assert_eq!(set.changes.len(), 3);
    assert_eq!(set.changes[2].before.state, BlockState::dirt());

    let mut undo = RevertJob::undo(set);
    assert_eq!(undo.tick(&mut world, 100), JobStatus::Complete);
    assert!(world.block_state(IVec3::ZERO).is_air());
    assert_eq!(world.block_state(IVec3::new(2, 0, 0)), BlockState::dirt());
}
