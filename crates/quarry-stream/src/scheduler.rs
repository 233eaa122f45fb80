//! Resumable rebuild loop over the chunk tree.
//!
//! A rebuild pass snapshots the camera and interest points, sorts the roots
//! nearest-first and walks each root subtree applying the LOD policy. Work is
//! kept on an explicit stack so [`ChunkScheduler::step`] can stop after a
//! budget of work items and pick up where it left off on the next call.
//!
//! Only one pass is ever active. A request arriving mid-pass cancels it once
//! the current root subtree and its excavation are done (after baking what it
//! already built) and starts a single fresh pass, however many requests came
//! in. A subtree is never left half subdivided.

use std::sync::Arc;

use glam::Vec3;
use quarry_lod::{CameraPose, LodDecision, LodInput, LodPolicy, ViewMetrics, sort_by_distance};
use quarry_mesh::{CubeTemplate, LevelTables, SurfaceExtractor, WorkerPool};
use quarry_physics::{ColliderBaker, DebrisTracker, PhysicsWorld};
use quarry_voxel::{CubeSize, VoxelGrid};

use crate::mining::Excavation;
use crate::sink::RenderSink;
use crate::tree::{ChunkMesh, ChunkTree, MeshId, NodePath};

/// Everything a rebuild step reads or mutates, borrowed from the owner for
/// the duration of one [`ChunkScheduler::step`] call.
pub struct StreamContext<'a> {
    pub tree: &'a mut ChunkTree,
    pub grid: &'a mut VoxelGrid,
    pub tables: &'a mut LevelTables,
    pub template: &'a CubeTemplate,
    pub pool: &'a WorkerPool,
    pub physics: &'a mut PhysicsWorld,
    pub debris: &'a mut DebrisTracker<MeshId>,
    pub sink: &'a mut dyn RenderSink,
    /// Camera used if this step starts a pass.
    pub camera: CameraPose,
    /// Interest points used if this step starts a pass.
    pub interest: &'a [Vec3],
}

/// Cumulative rebuild counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub requested: u64,
    pub started: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub meshes_built: u64,
    pub meshes_destroyed: u64,
    pub empty_builds: u64,
}

/// Result of one [`ChunkScheduler::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// No pass active and none requested.
    Idle,
    /// A pass is in progress.
    Working,
    /// The active pass finished during this step.
    Completed,
    /// The active pass was cancelled by a newer request and a fresh one started.
    Restarted,
}

#[derive(Debug)]
enum WorkItem {
    Visit(NodePath),
    /// Drops a subdivided node's own mesh once its children have been visited.
    Finish(NodePath),
}

#[derive(Clone, Copy, Debug, Default)]
struct PassCounts {
    built: u64,
    destroyed: u64,
    empty: u64,
}

struct RebuildPass {
    camera: CameraPose,
    interest: Vec<Vec3>,
    roots: Vec<usize>,
    next_root: usize,
    current_root: Option<usize>,
    work: Vec<WorkItem>,
    /// Meshes created by this pass, baked when it ends.
    created: Vec<(NodePath, MeshId)>,
    counts: PassCounts,
}

impl RebuildPass {
    /// No root subtree is partly processed.
    fn between_roots(&self) -> bool {
        self.work.is_empty() && self.current_root.is_none()
    }
}

/// Drives rebuild passes over a [`ChunkTree`].
pub struct ChunkScheduler {
    policy: LodPolicy,
    baker: ColliderBaker,
    requested: bool,
    active: Option<RebuildPass>,
    next_mesh_id: u64,
    stats: RebuildStats,
}

impl ChunkScheduler {
    pub fn new(policy: LodPolicy) -> Self {
        Self {
            policy,
            baker: ColliderBaker::default(),
            requested: false,
            active: None,
            next_mesh_id: 0,
            stats: RebuildStats::default(),
        }
    }

    pub fn policy(&self) -> &LodPolicy {
        &self.policy
    }

    pub fn stats(&self) -> &RebuildStats {
        &self.stats
    }

    /// A pass is in progress.
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// A request is waiting to be picked up.
    pub fn is_pending(&self) -> bool {
        self.requested
    }

    /// Asks for a rebuild. Requests made while one is pending coalesce.
    pub fn request(&mut self) {
        self.requested = true;
        self.stats.requested += 1;
    }

    /// Forgets the active pass and any pending request without touching the tree.
    pub fn reset(&mut self) {
        self.active = None;
        self.requested = false;
    }

    /// Processes up to `budget` work items (at least one).
    pub fn step(&mut self, ctx: &mut StreamContext<'_>, budget: usize) -> StepOutcome {
        let mut pass = match self.active.take() {
            Some(pass) => pass,
            None if self.requested => self.begin(ctx),
            None => return StepOutcome::Idle,
        };

        let mut outcome = StepOutcome::Working;
        for _ in 0..budget.max(1) {
            if self.requested && pass.between_roots() {
                self.cancel(&mut pass, ctx);
                pass = self.begin(ctx);
                outcome = StepOutcome::Restarted;
            }
            if !self.advance(&mut pass, ctx) {
                self.complete(pass, ctx);
                return StepOutcome::Completed;
            }
        }
        self.active = Some(pass);
        outcome
    }

    fn begin(&mut self, ctx: &mut StreamContext<'_>) -> RebuildPass {
        self.requested = false;
        self.stats.started += 1;

        let camera = ctx.camera;
        let mut roots = Vec::with_capacity(ctx.tree.roots().len());
        for (index, root) in ctx.tree.roots_mut().iter_mut().enumerate() {
            root.view = ViewMetrics::compute(&camera, root.center());
            if self.policy.should_cull_root(&root.view, root.cube_size) {
                tracing::trace!("Skipping root {index} behind the camera");
                continue;
            }
            roots.push((index, root.view.distance));
        }
        sort_by_distance(&mut roots, |&(_, distance)| distance);

        tracing::debug!(
            "Rebuild #{} started: {} roots, {} interest points",
            self.stats.started,
            roots.len(),
            ctx.interest.len()
        );
        RebuildPass {
            camera,
            interest: ctx.interest.to_vec(),
            roots: roots.into_iter().map(|(index, _)| index).collect(),
            next_root: 0,
            current_root: None,
            work: Vec::new(),
            created: Vec::new(),
            counts: PassCounts::default(),
        }
    }

    /// Runs one work item. Returns `false` once the pass has nothing left.
    fn advance(&mut self, pass: &mut RebuildPass, ctx: &mut StreamContext<'_>) -> bool {
        loop {
            if let Some(item) = pass.work.pop() {
                match item {
                    WorkItem::Visit(path) => self.visit(pass, ctx, path),
                    WorkItem::Finish(path) => Self::drop_own_mesh(pass, ctx, &path),
                }
                return true;
            }
            if let Some(root) = pass.current_root.take() {
                self.excavate(pass, ctx, root);
                return true;
            }
            let Some(&root) = pass.roots.get(pass.next_root) else {
                return false;
            };
            pass.next_root += 1;
            pass.current_root = Some(root);
            pass.work.push(WorkItem::Visit(NodePath::root(root)));
        }
    }

    fn visit(&mut self, pass: &mut RebuildPass, ctx: &mut StreamContext<'_>, path: NodePath) {
        let Some(node) = ctx.tree.node_mut(&path) else {
            return;
        };
        node.view = ViewMetrics::compute(&pass.camera, node.center());
        let input = LodInput {
            level: node.level(),
            distance: node.view.distance,
            interest_near: self.policy.is_interest_near(node.bounds(), &pass.interest),
            built: node.is_built(),
            cube_size: node.cube_size,
        };
        let decision = self.policy.decide(&input);
        tracing::trace!("{:?} at {}: {decision:?}", input.level, node.offset());

        match decision {
            LodDecision::Subdivide => {
                let Some(children) = node.ensure_children() else {
                    return;
                };
                if children[0].level() <= self.policy.sync_level {
                    for index in 0..children.len() {
                        self.visit(pass, ctx, path.child(index));
                    }
                    Self::drop_own_mesh(pass, ctx, &path);
                } else {
                    pass.work.push(WorkItem::Finish(path.clone()));
                    for index in (0..children.len()).rev() {
                        pass.work.push(WorkItem::Visit(path.child(index)));
                    }
                }
            }
            LodDecision::Rebuild(cube_size) => self.rebuild(pass, ctx, &path, cube_size),
            LodDecision::Keep => {}
        }
    }

    /// Meshes the node at `cube_size` and drops every mesh below it.
    fn rebuild(
        &mut self,
        pass: &mut RebuildPass,
        ctx: &mut StreamContext<'_>,
        path: &NodePath,
        cube_size: CubeSize,
    ) {
        let Some(node) = ctx.tree.node_mut(path) else {
            return;
        };
        node.cube_size = cube_size;

        let extractor = SurfaceExtractor::new(ctx.grid, ctx.template, ctx.pool);
        let mut stale = Vec::new();
        match extractor.extract(ctx.tables, node.offset(), node.level(), cube_size) {
            Ok(Some(buffers)) => {
                if let Some(old) = node.mesh.take() {
                    destroy_mesh(old, ctx.physics, &mut *ctx.sink, &mut pass.counts);
                }
                let id = MeshId(self.next_mesh_id);
                self.next_mesh_id += 1;
                let buffers = Arc::new(buffers);
                ctx.sink.mesh_created(id, node.level(), &buffers);
                node.mesh = Some(ChunkMesh {
                    id,
                    buffers,
                    collider: None,
                });
                node.built_empty = false;
                pass.created.push((path.clone(), id));
                pass.counts.built += 1;
            }
            Ok(None) => {
                if let Some(old) = node.mesh.take() {
                    stale.push(old);
                }
                node.built_empty = true;
                pass.counts.empty += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to mesh {:?} at {}: {e}", node.level(), node.offset());
            }
        }

        node.take_descendant_meshes(&mut stale);
        for mesh in stale {
            destroy_mesh(mesh, ctx.physics, &mut *ctx.sink, &mut pass.counts);
        }
    }

    fn drop_own_mesh(pass: &mut RebuildPass, ctx: &mut StreamContext<'_>, path: &NodePath) {
        let Some(node) = ctx.tree.node_mut(path) else {
            return;
        };
        node.built_empty = false;
        if let Some(mesh) = node.mesh.take() {
            destroy_mesh(mesh, ctx.physics, &mut *ctx.sink, &mut pass.counts);
        }
    }

    fn excavate(&self, pass: &mut RebuildPass, ctx: &mut StreamContext<'_>, root: usize) {
        let Some(node) = ctx.tree.roots_mut().get_mut(root) else {
            return;
        };
        Excavation {
            policy: &self.policy,
            points: &pass.interest,
            grid: &mut *ctx.grid,
            physics: &mut *ctx.physics,
            debris: &mut *ctx.debris,
            sink: &mut *ctx.sink,
        }
        .run(node);
    }

    /// Bakes colliders for meshes this pass created that are still in the tree.
    fn bake(&self, pass: &mut RebuildPass, ctx: &mut StreamContext<'_>) {
        let mut paths = Vec::new();
        let mut meshes = Vec::new();
        for (path, id) in pass.created.drain(..) {
            let Some(mesh) = ctx.tree.node(&path).and_then(|n| n.mesh.as_ref()) else {
                continue;
            };
            if mesh.id == id {
                paths.push(path);
                meshes.push(Arc::clone(&mesh.buffers));
            }
        }
        if meshes.is_empty() {
            return;
        }

        let handles = self.baker.bake(ctx.physics, ctx.pool, &meshes);
        for (path, handle) in paths.iter().zip(handles) {
            let Some(handle) = handle else {
                continue;
            };
            if let Some(mesh) = ctx.tree.node_mut(path).and_then(|n| n.mesh.as_mut()) {
                mesh.collider = Some(handle);
                ctx.sink.collider_attached(mesh.id, handle);
            }
        }
    }

    fn cancel(&mut self, pass: &mut RebuildPass, ctx: &mut StreamContext<'_>) {
        self.bake(pass, ctx);
        self.stats.cancelled += 1;
        self.absorb(pass.counts);
        tracing::debug!(
            "Rebuild cancelled after {} of {} roots: {} built, {} destroyed, {} empty",
            pass.next_root,
            pass.roots.len(),
            pass.counts.built,
            pass.counts.destroyed,
            pass.counts.empty
        );
    }

    fn complete(&mut self, mut pass: RebuildPass, ctx: &mut StreamContext<'_>) {
        self.bake(&mut pass, ctx);
        self.stats.completed += 1;
        self.absorb(pass.counts);
        tracing::debug!(
            "Rebuild completed: {} built, {} destroyed, {} empty; totals {:?}",
            pass.counts.built,
            pass.counts.destroyed,
            pass.counts.empty,
            self.stats
        );
    }

    fn absorb(&mut self, counts: PassCounts) {
        self.stats.meshes_built += counts.built;
        self.stats.meshes_destroyed += counts.destroyed;
        self.stats.empty_builds += counts.empty;
    }
}

fn destroy_mesh(
    mesh: ChunkMesh,
    physics: &mut PhysicsWorld,
    sink: &mut dyn RenderSink,
    counts: &mut PassCounts,
) {
    if let Some(collider) = mesh.collider {
        physics.remove_collider(collider);
    }
    sink.mesh_destroyed(mesh.id);
    counts.destroyed += 1;
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
