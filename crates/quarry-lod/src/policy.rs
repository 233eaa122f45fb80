//! Per-node subdivide / rebuild / keep decisions with configurable thresholds.

use glam::Vec3;
use quarry_voxel::{ChunkLevel, CubeSize};

use crate::aabb::Aabb;
use crate::view::ViewMetrics;

/// Thresholds driving the chunk LOD decisions.
#[derive(Clone, Debug, PartialEq)]
pub struct LodPolicy {
    /// Coarsest leaf-building level. Nodes at or above it mesh at reduced
    /// resolution and subdivide when the camera is close.
    pub coarse_level: ChunkLevel,
    /// Nodes at or above `coarse_level` closer than this subdivide.
    pub subdivide_distance: f32,
    /// Below this distance coarse nodes mesh with [`CubeSize::Size2`], beyond it with `Size4`.
    pub size2_distance: f32,
    /// Roots behind the camera and farther than this are skipped.
    pub cull_distance: f32,
    /// Bounds expansion when looking for nearby interest points.
    pub interest_margin: f32,
    /// Bounds expansion when selecting finest-level leaves to excavate.
    pub excavation_margin: f32,
    /// Children at or below this level are processed without yielding.
    pub sync_level: ChunkLevel,
}

impl Default for LodPolicy {
    fn default() -> Self {
        Self {
            coarse_level: ChunkLevel::Cube256,
            subdivide_distance: 512.0,
            size2_distance: 768.0,
            cull_distance: 256.0,
            interest_margin: 3.0,
            excavation_margin: 2.0,
            sync_level: ChunkLevel::Cube16,
        }
    }
}

/// Node state a decision is made from.
#[derive(Clone, Copy, Debug)]
pub struct LodInput {
    pub level: ChunkLevel,
    pub distance: f32,
    /// An interest point lies within the node's bounds expanded by the interest margin.
    pub interest_near: bool,
    /// The node has been built before (with a mesh or as built-empty).
    pub built: bool,
    /// Resolution of the node's last build.
    pub cube_size: CubeSize,
}

/// What the scheduler does with a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LodDecision {
    /// Recurse into the 8 children, then drop this node's own mesh.
    Subdivide,
    /// Mesh this node at the given resolution and drop the children's meshes.
    Rebuild(CubeSize),
    /// Nothing to do.
    Keep,
}

impl LodPolicy {
    /// Meshing resolution for a node at `level` seen from `distance`.
    ///
    /// Only coarse nodes are meshed at reduced resolution.
    pub fn cube_size_for(&self, level: ChunkLevel, distance: f32) -> CubeSize {
        if level < self.coarse_level {
            CubeSize::Size1
        } else if distance < self.size2_distance {
            CubeSize::Size2
        } else {
            CubeSize::Size4
        }
    }

    /// Applies the decision table in order: interest subdivision, proximity
    /// subdivision, rebuild, keep.
    pub fn decide(&self, input: &LodInput) -> LodDecision {
        if input.interest_near && !input.level.is_finest() {
            return LodDecision::Subdivide;
        }
        if input.level >= self.coarse_level
            && input.distance < self.subdivide_distance
            && !input.level.is_finest()
        {
            return LodDecision::Subdivide;
        }
        let next = self.cube_size_for(input.level, input.distance);
        if input.interest_near || !input.built || input.cube_size != next {
            return LodDecision::Rebuild(next);
        }
        LodDecision::Keep
    }

    /// `true` if a root should be skipped this pass: behind the camera, far
    /// away, and already meshed coarsely.
    pub fn should_cull_root(&self, view: &ViewMetrics, cube_size: CubeSize) -> bool {
        view.dot < 0.0 && view.distance > self.cull_distance && cube_size >= CubeSize::Size2
    }

    /// `true` if any point lies strictly inside `bounds` grown by the interest margin.
    pub fn is_interest_near(&self, bounds: &Aabb, points: &[Vec3]) -> bool {
        any_strictly_inside(&bounds.expanded(self.interest_margin), points)
    }

    /// `true` if any point lies strictly inside `bounds` grown by the excavation margin.
    pub fn is_excavation_target(&self, bounds: &Aabb, points: &[Vec3]) -> bool {
        any_strictly_inside(&bounds.expanded(self.excavation_margin), points)
    }
}

fn any_strictly_inside(bounds: &Aabb, points: &[Vec3]) -> bool {
    points.iter().any(|&p| bounds.strictly_contains(p))
}
