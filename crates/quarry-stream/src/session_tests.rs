//! End-to-end tests for the world session lifecycle.

use std::path::PathBuf;

use glam::IVec3;
use quarry_voxel::CubeSize;

use super::*;
use crate::sink::{RecordingSink, SinkEvent};

fn small_config() -> Config {
    let mut config = Config::default();
    config.lod.coarse_level = 8;
    config.lod.subdivide_distance = 12.0;
    config.lod.size2_distance = 24.0;
    config.lod.cull_distance = 16.0;
    config.lod.sync_level = 2;
    config.workers.threads = 2;
    config.workers.grain = 32;
    config.stream.nodes_per_step = 8;
    config
}

fn slab(edge: usize, height: i32) -> VoxelGrid {
    let mut grid = VoxelGrid::new(edge);
    grid.fill_box(IVec3::ZERO, IVec3::new(edge as i32, height, edge as i32), 1);
    grid
}

fn overhead(edge: f32) -> CameraPose {
    let center = Vec3::splat(edge * 0.5);
    let position = Vec3::new(center.x, 100.0, center.z);
    CameraPose::new(position, center - position)
}

fn session(grid: VoxelGrid) -> WorldSession<RecordingSink> {
    WorldSession::init(&small_config(), grid, CubeTemplate::unit(), RecordingSink::new()).unwrap()
}

#[test]
fn test_lod_policy_from_config() {
    let policy = lod_policy(&LodConfig::default()).unwrap();
    assert_eq!(policy, LodPolicy::default());

    let bad = LodConfig {
        sync_level: 3,
        ..LodConfig::default()
    };
    assert!(matches!(
        lod_policy(&bad),
        Err(ConfigError::Invalid { field: "lod.sync_level", .. })
    ));
}

#[test]
fn test_init_rejects_invalid_config() {
    let mut config = small_config();
    config.stream.nodes_per_step = 0;
    let result = WorldSession::init(&config, slab(8, 2), CubeTemplate::unit(), RecordingSink::new());
    assert!(matches!(result, Err(SessionError::Config(_))));
}

#[test]
fn test_init_rejects_coarse_level_without_tables() {
    let mut config = small_config();
    config.lod.coarse_level = 2;
    config.lod.sync_level = 1;
    let result = WorldSession::init(&config, slab(8, 2), CubeTemplate::unit(), RecordingSink::new());
    assert!(matches!(
        result,
        Err(SessionError::Config(ConfigError::Invalid { field: "lod.coarse_level", .. }))
    ));
}

#[test]
fn test_first_rebuild_runs_on_init() {
    let mut session = session(slab(16, 2));
    assert!(session.is_rebuilding());
    let ticks = session.settle(overhead(16.0), 1000);
    assert!(ticks > 0);
    assert!(!session.is_rebuilding());

    let stats = *session.stats();
    assert_eq!(stats.started, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(session.tree().mesh_count(), 4);
    assert_eq!(session.meshes().len(), 4);
    assert_eq!(session.sink().live_meshes(), 4);
    assert!(session.tree().roots().iter().all(|r| r.cube_size == CubeSize::Size4));
}

#[test]
fn test_root_grid_override() {
    let mut config = small_config();
    config.world.root_grid = Some([1, 1, 2]);
    let session =
        WorldSession::init(&config, slab(32, 2), CubeTemplate::unit(), RecordingSink::new()).unwrap();
    let offsets: Vec<IVec3> = session.tree().roots().iter().map(|r| r.offset()).collect();
    assert_eq!(offsets, vec![IVec3::ZERO, IVec3::new(0, 0, 8)]);
}

#[test]
fn test_grid_cell_crossing_requests_rebuild() {
    let mut session = session(slab(16, 2));
    let camera = overhead(16.0);
    session.tick(Duration::from_secs(1), camera);
    session.settle(camera, 1000);
    assert_eq!(session.stats().started, 1);

    let moved = CameraPose::new(Vec3::new(300.0, 100.0, 8.0), Vec3::NEG_X);
    session.tick(Duration::from_secs(1), moved);
    assert_eq!(session.stats().started, 2);
    assert_eq!(session.camera(), moved);
}

#[test]
fn test_interact_mines_and_debris_expires() {
    let mut grid = VoxelGrid::new(8);
    grid.set(4, 4, 4, 1);
    let mut session = session(grid);
    let camera = overhead(8.0);
    session.settle(camera, 1000);
    // The coarse root samples every fourth voxel, (4, 4, 4) included.
    assert_eq!(session.sink().live_meshes(), 1);

    assert_eq!(session.interact(Vec3::new(4.2, 3.9, 4.4)), Vec3::splat(4.0));
    session.settle(camera, 1000);
    assert_eq!(session.grid().get(4, 4, 4), 0);
    assert_eq!(session.debris_count(), 1);
    assert_eq!(session.sink().live_meshes(), 0);
    assert_eq!(session.sink().count(|e| matches!(e, SinkEvent::Detached(_))), 1);

    for _ in 0..29 {
        session.tick(Duration::from_secs(1), camera);
    }
    assert_eq!(session.debris_count(), 1);
    session.tick(Duration::from_secs(1), camera);
    assert_eq!(session.debris_count(), 0);
    assert_eq!(session.sink().count(|e| matches!(e, SinkEvent::DebrisRemoved(_))), 1);
}

#[test]
fn test_pick_registers_hit_and_requests_rebuild() {
    let mut session = session(slab(8, 2));
    let camera = overhead(8.0);
    session.settle(camera, 1000);

    let ray = VoxelRay::new(Vec3::new(4.0, 6.0, 4.0), Vec3::NEG_Y, 10.0).unwrap();
    let hit = session.pick(&ray).unwrap();
    assert_eq!(hit.voxel, IVec3::new(4, 1, 4));
    assert_eq!(session.interest_points(), vec![Vec3::new(4.0, 1.0, 4.0)]);
    assert!(session.is_rebuilding());

    let miss = VoxelRay::new(Vec3::new(4.0, 6.0, 4.0), Vec3::Y, 10.0).unwrap();
    assert!(session.pick(&miss).is_none());
    assert_eq!(session.interest_points().len(), 1);
}

#[test]
fn test_shutdown_releases_everything() {
    let mut grid = slab(8, 2);
    grid.set(4, 5, 4, 1);
    let mut session = session(grid);
    let camera = overhead(8.0);
    session.settle(camera, 1000);
    session.interact(Vec3::new(4.0, 5.0, 4.0));
    session.settle(camera, 1000);
    assert_eq!(session.debris_count(), 1);

    let sink = session.shutdown();
    assert_eq!(sink.live_meshes(), 0);
    assert_eq!(sink.live_vertices(), 0);
    assert_eq!(sink.count(|e| matches!(e, SinkEvent::DebrisRemoved(_))), 1);
}

#[test]
fn test_open_loads_world_and_template_files() {
    let dir = tempfile::tempdir().unwrap();
    let world_path: PathBuf = dir.path().join("world.qwld");
    let template_path = dir.path().join("cube.qcub");
    slab(8, 2).save(&world_path).unwrap();
    std::fs::write(&template_path, CubeTemplate::unit().encode()).unwrap();

    let mut config = small_config();
    config.world.path = Some(world_path);
    config.world.template = Some(template_path);
    let mut session = WorldSession::open(&config, RecordingSink::new()).unwrap();
    session.settle(overhead(8.0), 1000);
    assert_eq!(session.tree().mesh_count(), 1);
}

#[test]
fn test_open_without_world_path() {
    let result = WorldSession::open(&small_config(), RecordingSink::new());
    assert!(matches!(result, Err(SessionError::NoWorld)));
}

#[test]
fn test_open_reports_corrupt_world() {
    let dir = tempfile::tempdir().unwrap();
    let world_path = dir.path().join("broken.qwld");
    std::fs::write(&world_path, b"QWLD").unwrap();
    let mut config = small_config();
    config.world.path = Some(world_path);
    let result = WorldSession::open(&config, RecordingSink::new());
    assert!(matches!(result, Err(SessionError::World(_))));
}
