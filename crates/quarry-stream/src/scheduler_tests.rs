//! Tests for the rebuild scheduler, run over small worlds with an 8-cube
//! coarse level.

use std::time::Duration;

use glam::IVec3;
use quarry_physics::DEFAULT_DEBRIS_LIFETIME;
use quarry_voxel::ChunkLevel;

use super::*;
use crate::sink::{RecordingSink, SinkEvent};

fn small_policy() -> LodPolicy {
    LodPolicy {
        coarse_level: ChunkLevel::Cube8,
        subdivide_distance: 12.0,
        size2_distance: 24.0,
        cull_distance: 16.0,
        sync_level: ChunkLevel::Cube2,
        ..LodPolicy::default()
    }
}

struct Harness {
    tree: ChunkTree,
    grid: VoxelGrid,
    tables: LevelTables,
    template: CubeTemplate,
    pool: WorkerPool,
    physics: PhysicsWorld,
    debris: DebrisTracker<MeshId>,
    sink: RecordingSink,
    interest: Vec<Vec3>,
}

impl Harness {
    fn new(grid: VoxelGrid, tree: ChunkTree) -> Self {
        Self {
            tree,
            grid,
            tables: LevelTables::for_coarse_level(ChunkLevel::Cube8),
            template: CubeTemplate::unit(),
            pool: WorkerPool::new(2, 32).unwrap(),
            physics: PhysicsWorld::new(),
            debris: DebrisTracker::new(DEFAULT_DEBRIS_LIFETIME),
            sink: RecordingSink::new(),
            interest: Vec::new(),
        }
    }

    fn step(&mut self, scheduler: &mut ChunkScheduler, camera: CameraPose, budget: usize) -> StepOutcome {
        let mut ctx = StreamContext {
            tree: &mut self.tree,
            grid: &mut self.grid,
            tables: &mut self.tables,
            template: &self.template,
            pool: &self.pool,
            physics: &mut self.physics,
            debris: &mut self.debris,
            sink: &mut self.sink,
            camera,
            interest: &self.interest,
        };
        scheduler.step(&mut ctx, budget)
    }

    /// Steps until the scheduler is idle. Returns the outcomes seen.
    fn settle(&mut self, scheduler: &mut ChunkScheduler, camera: CameraPose, budget: usize) -> Vec<StepOutcome> {
        let mut outcomes = Vec::new();
        for _ in 0..10_000 {
            let outcome = self.step(scheduler, camera, budget);
            if outcome == StepOutcome::Idle {
                return outcomes;
            }
            outcomes.push(outcome);
        }
        panic!("scheduler did not settle");
    }

    fn rebuild(&mut self, scheduler: &mut ChunkScheduler, camera: CameraPose) {
        scheduler.request();
        self.settle(scheduler, camera, 4);
    }
}

fn slab(edge: usize, height: i32) -> VoxelGrid {
    let mut grid = VoxelGrid::new(edge);
    grid.fill_box(IVec3::ZERO, IVec3::new(edge as i32, height, edge as i32), 1);
    grid
}

fn looking_at(position: Vec3, target: Vec3) -> CameraPose {
    CameraPose::new(position, target - position)
}

#[test]
fn test_idle_without_request() {
    let mut harness = Harness::new(slab(8, 2), ChunkTree::tiling(8, ChunkLevel::Cube8));
    let mut scheduler = ChunkScheduler::new(small_policy());
    assert_eq!(harness.step(&mut scheduler, CameraPose::default(), 8), StepOutcome::Idle);
    assert_eq!(scheduler.stats().started, 0);
}

#[test]
fn test_empty_world_creates_no_meshes() {
    let mut harness = Harness::new(VoxelGrid::new(16), ChunkTree::tiling(16, ChunkLevel::Cube8));
    let mut scheduler = ChunkScheduler::new(small_policy());
    let camera = looking_at(Vec3::new(8.0, 100.0, 8.0), Vec3::splat(8.0));

    harness.rebuild(&mut scheduler, camera);
    assert!(harness.sink.events.is_empty());
    assert_eq!(harness.tree.mesh_count(), 0);
    assert_eq!(scheduler.stats().empty_builds, 8);
    assert!(harness.tree.roots().iter().all(|r| r.built_empty));

    // Built-empty roots are not rebuilt on the next pass.
    harness.rebuild(&mut scheduler, camera);
    assert_eq!(scheduler.stats().empty_builds, 8);
    assert_eq!(scheduler.stats().completed, 2);
}

#[test]
fn test_far_camera_meshes_roots_coarsely() {
    let mut harness = Harness::new(slab(16, 2), ChunkTree::tiling(16, ChunkLevel::Cube8));
    let mut scheduler = ChunkScheduler::new(small_policy());
    let camera = looking_at(Vec3::new(8.0, 100.0, 8.0), Vec3::splat(8.0));

    harness.rebuild(&mut scheduler, camera);
    // Only the four bottom roots hold voxels.
    assert_eq!(harness.tree.mesh_count(), 4);
    assert_eq!(harness.sink.live_meshes(), 4);
    for root in harness.tree.roots() {
        assert_eq!(root.cube_size, CubeSize::Size4);
        assert_eq!(root.mesh.is_some(), root.offset().y == 0);
    }
    assert!(harness.sink.events.iter().all(|e| match e {
        SinkEvent::Created { level, .. } => *level == ChunkLevel::Cube8,
        _ => true,
    }));
    assert_eq!(harness.sink.count(|e| matches!(e, SinkEvent::ColliderAttached(_))), 4);
    assert_eq!(harness.physics.collider_set.len(), 4);
}

#[test]
fn test_roots_processed_nearest_first() {
    let mut harness = Harness::new(slab(24, 2), ChunkTree::grid(ChunkLevel::Cube8, [3, 1, 1]));
    let mut scheduler = ChunkScheduler::new(small_policy());
    let camera = looking_at(Vec3::new(19.5, 60.0, 3.5), Vec3::new(11.5, 0.0, 3.5));

    harness.rebuild(&mut scheduler, camera);
    let ids: Vec<MeshId> = harness
        .tree
        .roots()
        .iter()
        .map(|r| r.mesh.as_ref().unwrap().id)
        .collect();
    assert!(ids[2] < ids[1]);
    assert!(ids[1] < ids[0]);
}

#[test]
fn test_close_camera_subdivides_then_collapses() {
    let mut harness = Harness::new(slab(16, 2), ChunkTree::tiling(16, ChunkLevel::Cube8));
    let mut scheduler = ChunkScheduler::new(small_policy());
    let near = looking_at(Vec3::new(4.0, 4.0, 4.0), Vec3::new(8.0, 0.0, 8.0));

    harness.rebuild(&mut scheduler, near);
    let root = &harness.tree.roots()[0];
    assert!(root.mesh.is_none());
    let children = root.children().unwrap();
    for child in children {
        assert_eq!(child.level(), ChunkLevel::Cube4);
        assert_eq!(child.mesh.is_some(), child.offset().y == 0);
    }
    assert_eq!(harness.sink.live_meshes(), harness.tree.mesh_count());
    assert_eq!(harness.physics.collider_set.len(), harness.tree.mesh_count());

    let far = looking_at(Vec3::new(8.0, 100.0, 8.0), Vec3::splat(8.0));
    harness.rebuild(&mut scheduler, far);
    assert_eq!(harness.tree.mesh_count(), 4);
    assert_eq!(harness.sink.live_meshes(), 4);
    // Colliders of collapsed children went with their meshes.
    assert_eq!(harness.physics.collider_set.len(), 4);
    for child in harness.tree.roots()[0].children().unwrap() {
        assert!(child.mesh.is_none());
    }
}

#[test]
fn test_budget_splits_pass_across_steps() {
    let mut harness = Harness::new(slab(16, 2), ChunkTree::tiling(16, ChunkLevel::Cube8));
    let mut scheduler = ChunkScheduler::new(small_policy());
    let camera = looking_at(Vec3::new(8.0, 100.0, 8.0), Vec3::splat(8.0));

    scheduler.request();
    let outcomes = harness.settle(&mut scheduler, camera, 1);
    // 8 root visits and 8 excavation checks, one per step.
    assert_eq!(outcomes.len(), 17);
    assert!(outcomes[..16].iter().all(|o| *o == StepOutcome::Working));
    assert_eq!(outcomes[16], StepOutcome::Completed);
}

#[test]
fn test_requests_during_pass_coalesce_into_one_restart() {
    let mut harness = Harness::new(slab(16, 2), ChunkTree::tiling(16, ChunkLevel::Cube8));
    let mut scheduler = ChunkScheduler::new(small_policy());
    let camera = looking_at(Vec3::new(8.0, 100.0, 8.0), Vec3::splat(8.0));

    scheduler.request();
    assert_eq!(harness.step(&mut scheduler, camera, 1), StepOutcome::Working);
    assert!(scheduler.is_running());

    scheduler.request();
    scheduler.request();
    let outcomes = harness.settle(&mut scheduler, camera, 1);
    // The first root's excavation still runs before the restart.
    assert_eq!(outcomes[0], StepOutcome::Working);
    assert_eq!(outcomes[1], StepOutcome::Restarted);
    assert_eq!(
        outcomes.iter().filter(|o| **o == StepOutcome::Restarted).count(),
        1
    );

    let stats = scheduler.stats();
    assert_eq!(stats.requested, 3);
    assert_eq!(stats.started, 2);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.completed, 1);
    // The mesh built before cancelling was still baked.
    assert_eq!(harness.physics.collider_set.len(), harness.tree.mesh_count());
}

#[test]
fn test_request_waits_for_subdivided_subtree() {
    let mut harness = Harness::new(slab(8, 2), ChunkTree::tiling(8, ChunkLevel::Cube8));
    let mut scheduler = ChunkScheduler::new(small_policy());
    let far = looking_at(Vec3::new(4.0, 100.0, 4.0), Vec3::splat(4.0));
    harness.rebuild(&mut scheduler, far);
    let root_mesh = harness.tree.roots()[0].mesh.as_ref().unwrap().id;
    assert_eq!(harness.tree.roots()[0].cube_size, CubeSize::Size4);

    // Subdivide the root and mesh its first two children, one item per step.
    let near = looking_at(Vec3::new(4.0, 6.0, 4.0), Vec3::new(4.0, 0.0, 4.0));
    scheduler.request();
    for _ in 0..3 {
        assert_eq!(harness.step(&mut scheduler, near, 1), StepOutcome::Working);
    }
    let children = harness.tree.roots()[0].children().unwrap();
    assert!(children[0].mesh.is_some());
    assert!(children[1].mesh.is_some());
    assert!(harness.tree.roots()[0].mesh.is_some());

    // The next pass would cull the root: the camera is far away, facing off.
    let behind = CameraPose::new(Vec3::new(100.0, 4.0, 4.0), Vec3::X);
    scheduler.request();
    let outcomes = harness.settle(&mut scheduler, behind, 1);
    assert_eq!(outcomes.last(), Some(&StepOutcome::Completed));
    assert_eq!(scheduler.stats().cancelled, 1);
    assert_eq!(scheduler.stats().started, 3);

    // The interrupted subtree was finished: the parent mesh is gone and only
    // the children holding voxels are meshed.
    let root = &harness.tree.roots()[0];
    assert!(root.mesh.is_none());
    assert_eq!(harness.tree.mesh_count(), 4);
    assert_eq!(harness.sink.live_meshes(), 4);
    assert_eq!(harness.sink.count(|e| *e == SinkEvent::Destroyed(root_mesh)), 1);
    assert_eq!(harness.physics.collider_set.len(), 4);
}

#[test]
fn test_mining_detaches_voxel_as_debris() {
    let mut grid = VoxelGrid::new(8);
    grid.set(3, 3, 3, 1);
    let mut harness = Harness::new(grid, ChunkTree::tiling(8, ChunkLevel::Cube8));
    let mut scheduler = ChunkScheduler::new(small_policy());
    let camera = looking_at(Vec3::new(4.0, 100.0, 4.0), Vec3::splat(4.0));
    harness.interest.push(Vec3::new(3.0, 3.0, 3.0));

    harness.rebuild(&mut scheduler, camera);
    assert_eq!(harness.grid.get(3, 3, 3), 0);
    assert_eq!(harness.sink.count(|e| matches!(e, SinkEvent::Detached(_))), 1);
    assert_eq!(harness.sink.live_meshes(), 0);
    assert_eq!(harness.tree.mesh_count(), 0);
    assert_eq!(harness.debris.len(), 1);
    // Only the debris hull is left in the physics world.
    assert_eq!(harness.physics.collider_set.len(), 1);
    assert_eq!(harness.sink.count(|e| matches!(e, SinkEvent::ColliderAttached(_))), 0);

    // The cleared voxel produces no geometry on the next pass.
    let created = harness.sink.count(|e| matches!(e, SinkEvent::Created { .. }));
    harness.rebuild(&mut scheduler, camera);
    assert_eq!(harness.sink.count(|e| matches!(e, SinkEvent::Created { .. })), created);
    assert_eq!(harness.debris.len(), 1);

    let step = Duration::from_secs(1);
    for _ in 0..29 {
        assert!(harness.debris.tick(&mut harness.physics, step).is_empty());
    }
    assert_eq!(harness.debris.tick(&mut harness.physics, step).len(), 1);
    assert_eq!(harness.physics.rigid_body_set.len(), 0);
}

#[test]
fn test_mining_leaves_distant_voxels() {
    let mut harness = Harness::new(slab(8, 1), ChunkTree::tiling(8, ChunkLevel::Cube8));
    let mut scheduler = ChunkScheduler::new(small_policy());
    let camera = looking_at(Vec3::new(4.0, 100.0, 4.0), Vec3::splat(4.0));
    harness.interest.push(Vec3::new(0.0, 0.0, 0.0));

    harness.rebuild(&mut scheduler, camera);
    // Leaves whose centre is within 2.5 of the point on every axis: x, z in 0..=2.
    assert_eq!(harness.debris.len(), 9);
    for x in 0..8 {
        for z in 0..8 {
            assert_eq!(harness.grid.get(x, 0, z) == 0, x <= 2 && z <= 2, "voxel ({x}, 0, {z})");
        }
    }
}
