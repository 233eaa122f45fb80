//! Owner of all streaming state, driven by the host once per frame.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use quarry_config::{Config, ConfigError, LodConfig};
use quarry_lod::{CameraPose, LodPolicy};
use quarry_mesh::{CubeTemplate, LevelTables, PoolError, TemplateError, WorkerPool};
use quarry_physics::{DebrisTracker, PhysicsWorld};
use quarry_voxel::{ChunkLevel, VoxelGrid, VoxelHit, VoxelRay, WorldError};

use crate::mining::MiningController;
use crate::scheduler::{ChunkScheduler, RebuildStats, StepOutcome, StreamContext};
use crate::sink::RenderSink;
use crate::tree::{ChunkTree, MeshId};
use crate::watcher::GridWatcher;

/// Errors from setting up a [`WorldSession`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// No world file is configured.
    #[error("no world path configured")]
    NoWorld,
}

/// Builds the LOD policy described by a config section.
pub fn lod_policy(config: &LodConfig) -> Result<LodPolicy, ConfigError> {
    let level = |field: &'static str, edge: u32| {
        ChunkLevel::from_edge(edge).ok_or_else(|| ConfigError::Invalid {
            field,
            reason: format!("{edge} is not a chunk level"),
        })
    };
    Ok(LodPolicy {
        coarse_level: level("lod.coarse_level", config.coarse_level)?,
        subdivide_distance: config.subdivide_distance,
        size2_distance: config.size2_distance,
        cull_distance: config.cull_distance,
        interest_margin: config.interest_margin,
        excavation_margin: config.excavation_margin,
        sync_level: level("lod.sync_level", config.sync_level)?,
    })
}

/// Voxel world, chunk tree, physics and rebuild scheduling behind one
/// `init` / `tick` / `shutdown` lifecycle.
pub struct WorldSession<S: RenderSink> {
    grid: VoxelGrid,
    template: CubeTemplate,
    tables: LevelTables,
    pool: WorkerPool,
    physics: PhysicsWorld,
    debris: DebrisTracker<MeshId>,
    tree: ChunkTree,
    scheduler: ChunkScheduler,
    mining: MiningController,
    watcher: GridWatcher,
    sink: S,
    nodes_per_step: usize,
    camera: CameraPose,
}

impl<S: RenderSink> WorldSession<S> {
    /// Allocates everything the session needs and requests the first rebuild.
    pub fn init(
        config: &Config,
        grid: VoxelGrid,
        template: CubeTemplate,
        sink: S,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let policy = lod_policy(&config.lod)?;
        let pool = WorkerPool::new(config.workers.threads, config.workers.grain)?;
        let tree = match config.world.root_grid {
            Some(counts) => ChunkTree::grid(policy.coarse_level, counts),
            None => ChunkTree::tiling(grid.edge(), policy.coarse_level),
        };
        tracing::info!(
            "World session: edge {}, {} roots at {:?}, {} workers",
            grid.edge(),
            tree.roots().len(),
            policy.coarse_level,
            pool.threads()
        );

        let mut scheduler = ChunkScheduler::new(policy.clone());
        scheduler.request();
        Ok(Self {
            tables: LevelTables::for_coarse_level(policy.coarse_level),
            grid,
            template,
            pool,
            physics: PhysicsWorld::new(),
            debris: DebrisTracker::new(config.mining.debris_lifetime()),
            tree,
            scheduler,
            mining: MiningController::new(config.mining.max_interest_points),
            watcher: GridWatcher::new(config.stream.grid_cell_size, config.stream.check_interval()),
            sink,
            nodes_per_step: config.stream.nodes_per_step,
            camera: CameraPose::default(),
        })
    }

    /// Loads the configured world and template files, then calls [`init`](Self::init).
    pub fn open(config: &Config, sink: S) -> Result<Self, SessionError> {
        let path = config.world.path.as_deref().ok_or(SessionError::NoWorld)?;
        let grid = VoxelGrid::load(path)?;
        let template = match config.world.template.as_deref() {
            Some(path) => CubeTemplate::load(path)?,
            None => CubeTemplate::unit(),
        };
        Self::init(config, grid, template, sink)
    }

    /// Advances the session by one frame.
    pub fn tick(&mut self, dt: Duration, camera: CameraPose) -> StepOutcome {
        self.camera = camera;
        if self.watcher.tick(dt, camera.position) {
            self.scheduler.request();
        }

        let interest = self.mining.interest().snapshot();
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
            interest: &interest,
        };
        let outcome = self.scheduler.step(&mut ctx, self.nodes_per_step);

        self.physics.advance(dt);
        for id in self.debris.tick(&mut self.physics, dt) {
            self.sink.debris_removed(id);
        }
        outcome
    }

    /// Ticks with zero elapsed time until no rebuild is active or pending.
    /// Returns the number of ticks taken.
    pub fn settle(&mut self, camera: CameraPose, max_ticks: usize) -> usize {
        for ticks in 0..max_ticks {
            if self.tick(Duration::ZERO, camera) == StepOutcome::Idle {
                return ticks;
            }
        }
        max_ticks
    }

    /// Records an interaction point and requests a rebuild. Returns the
    /// rounded point that was stored.
    pub fn interact(&mut self, point: Vec3) -> Vec3 {
        let stored = self.mining.interact(point);
        self.scheduler.request();
        stored
    }

    /// Casts a ray into the world. On a hit, records the voxel as an
    /// interest point and requests a rebuild.
    pub fn pick(&mut self, ray: &VoxelRay) -> Option<VoxelHit> {
        let hit = self.mining.pick(&self.grid, ray)?;
        self.scheduler.request();
        Some(hit)
    }

    /// Manual rebuild trigger.
    pub fn request_rebuild(&mut self) {
        self.scheduler.request();
    }

    /// Destroys every mesh and debris piece, notifying the sink, and returns it.
    pub fn shutdown(mut self) -> S {
        self.scheduler.reset();
        let meshes = self.tree.take_all_meshes();
        let mesh_count = meshes.len();
        for mesh in meshes {
            if let Some(collider) = mesh.collider {
                self.physics.remove_collider(collider);
            }
            self.sink.mesh_destroyed(mesh.id);
        }
        let debris = self.debris.clear(&mut self.physics);
        for &id in &debris {
            self.sink.debris_removed(id);
        }
        tracing::info!(
            "World session shut down: {} meshes and {} debris released; {:?}",
            mesh_count,
            debris.len(),
            self.scheduler.stats()
        );
        self.sink
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn tree(&self) -> &ChunkTree {
        &self.tree
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn stats(&self) -> &RebuildStats {
        self.scheduler.stats()
    }

    pub fn is_rebuilding(&self) -> bool {
        self.scheduler.is_running() || self.scheduler.is_pending()
    }

    pub fn camera(&self) -> CameraPose {
        self.camera
    }

    pub fn interest_points(&self) -> Vec<Vec3> {
        self.mining.interest().snapshot()
    }

    pub fn debris_count(&self) -> usize {
        self.debris.len()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Meshes currently attached to the tree, with their buffers.
    pub fn meshes(&self) -> Vec<(MeshId, Arc<quarry_mesh::MeshBuffers>)> {
        let mut out = Vec::new();
        for root in self.tree.roots() {
            root.for_each(&mut |node| {
                if let Some(mesh) = &node.mesh {
                    out.push((mesh.id, Arc::clone(&mesh.buffers)));
                }
            });
        }
        out
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
