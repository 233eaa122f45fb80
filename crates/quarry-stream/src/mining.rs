//! Interest points from player interaction and the excavation pass that turns
//! finest-level leaves near them into falling debris.

use std::collections::VecDeque;

use glam::Vec3;
use quarry_lod::LodPolicy;
use quarry_physics::{DebrisTracker, PhysicsWorld};
use quarry_voxel::{VoxelGrid, VoxelHit, VoxelRay, raycast};

use crate::sink::RenderSink;
use crate::tree::{ChunkNode, MeshId};

/// Default number of interest points kept.
pub const DEFAULT_MAX_INTEREST_POINTS: usize = 10;

/// Bounded history of interest points, oldest first.
#[derive(Clone, Debug)]
pub struct InterestPoints {
    points: VecDeque<Vec3>,
    capacity: usize,
}

impl InterestPoints {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Rounds `point` to voxel coordinates and records it, evicting the
    /// oldest point past capacity. Returns the stored point.
    pub fn push(&mut self, point: Vec3) -> Vec3 {
        let rounded = point.round();
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(rounded);
        rounded
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.points.iter().copied()
    }

    /// Copy of the current points, as a rebuild snapshot.
    pub fn snapshot(&self) -> Vec<Vec3> {
        self.points.iter().copied().collect()
    }
}

/// Records interaction points and ray picks.
#[derive(Clone, Debug)]
pub struct MiningController {
    interest: InterestPoints,
}

impl MiningController {
    pub fn new(max_points: usize) -> Self {
        Self {
            interest: InterestPoints::new(max_points),
        }
    }

    pub fn interest(&self) -> &InterestPoints {
        &self.interest
    }

    /// Records a world-space interaction point. Returns the rounded point.
    pub fn interact(&mut self, point: Vec3) -> Vec3 {
        let stored = self.interest.push(point);
        tracing::debug!("Interest point recorded at {stored}");
        stored
    }

    /// Casts `ray` through the grid and records the first occupied voxel hit.
    pub fn pick(&mut self, grid: &VoxelGrid, ray: &VoxelRay) -> Option<VoxelHit> {
        let hit = raycast(grid, ray)?;
        self.interact(hit.voxel.as_vec3());
        Some(hit)
    }
}

impl Default for MiningController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INTEREST_POINTS)
    }
}

/// Everything an excavation touches besides the subtree itself.
pub struct Excavation<'a> {
    pub policy: &'a LodPolicy,
    pub points: &'a [Vec3],
    pub grid: &'a mut VoxelGrid,
    pub physics: &'a mut PhysicsWorld,
    pub debris: &'a mut DebrisTracker<MeshId>,
    pub sink: &'a mut dyn RenderSink,
}

impl Excavation<'_> {
    /// Walks `node`'s subtree and mines every finest-level leaf that has a
    /// mesh and lies within the excavation margin of an interest point.
    ///
    /// Mined leaves get their voxel cleared, lose their static collider, and
    /// hand their mesh to a debris body. Returns the ids of detached meshes.
    pub fn run(&mut self, node: &mut ChunkNode) -> Vec<MeshId> {
        let mut detached = Vec::new();
        if !self.points.is_empty() {
            self.visit(node, &mut detached);
        }
        if !detached.is_empty() {
            tracing::debug!("Excavated {} voxels", detached.len());
        }
        detached
    }

    fn visit(&mut self, node: &mut ChunkNode, detached: &mut Vec<MeshId>) {
        if let Some(children) = node.children_mut() {
            for child in children.iter_mut() {
                self.visit(child, detached);
            }
        }
        if !node.level().is_finest()
            || node.mesh.is_none()
            || !self.policy.is_excavation_target(node.bounds(), self.points)
        {
            return;
        }
        let Some(mesh) = node.mesh.take() else {
            return;
        };

        self.grid.clear(node.offset());
        node.built_empty = true;
        if let Some(collider) = mesh.collider {
            self.physics.remove_collider(collider);
        }
        match self.debris.spawn(self.physics, mesh.id, &mesh.buffers) {
            Some(body) => self.sink.mesh_detached(mesh.id, body),
            None => self.sink.mesh_destroyed(mesh.id),
        }
        tracing::trace!("Mined voxel {} as {}", node.offset(), mesh.id);
        detached.push(mesh.id);
    }
}
