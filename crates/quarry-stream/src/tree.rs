//! LOD chunk octree.
//!
//! Roots sit at the coarse level and tile the world. Children are created on
//! first subdivision and kept for the lifetime of the tree; collapsing a node
//! only drops meshes, never nodes. Nodes are addressed by [`NodePath`] from
//! their root, so no parent links are stored.

use std::fmt;
use std::sync::Arc;

use glam::{IVec3, Vec3};
use quarry_lod::{Aabb, ViewMetrics};
use quarry_mesh::MeshBuffers;
use quarry_physics::ColliderHandle;
use quarry_voxel::{ChunkLevel, CubeSize};

/// Identifier of a mesh object handed to the render sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

/// A node's live mesh object.
#[derive(Clone, Debug)]
pub struct ChunkMesh {
    pub id: MeshId,
    pub buffers: Arc<MeshBuffers>,
    /// Static collider, set once the mesh has been baked.
    pub collider: Option<ColliderHandle>,
}

/// One cubic region of the world at a given LOD level.
#[derive(Debug)]
pub struct ChunkNode {
    level: ChunkLevel,
    offset: IVec3,
    bounds: Aabb,
    /// Resolution of the last build.
    pub cube_size: CubeSize,
    /// View metrics from the most recent pass that visited this node.
    pub view: ViewMetrics,
    /// Live mesh, if any.
    pub mesh: Option<ChunkMesh>,
    /// The last build produced no geometry.
    pub built_empty: bool,
    children: Option<Box<[ChunkNode; 8]>>,
}

impl ChunkNode {
    pub fn new(level: ChunkLevel, offset: IVec3) -> Self {
        let edge = level.edge_cubes() as f32;
        let min = offset.as_vec3() - Vec3::splat(0.5);
        Self {
            level,
            offset,
            bounds: Aabb::new(min, min + Vec3::splat(edge)),
            cube_size: CubeSize::Size1,
            view: ViewMetrics::default(),
            mesh: None,
            built_empty: false,
            children: None,
        }
    }

    pub fn level(&self) -> ChunkLevel {
        self.level
    }

    /// Voxel coordinate of the node's minimum corner cube.
    pub fn offset(&self) -> IVec3 {
        self.offset
    }

    /// Voxel-centred bounds: `offset - 0.5 ..= offset + edge - 0.5`.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn center(&self) -> Vec3 {
        self.bounds.center()
    }

    /// The node has been built, with or without geometry.
    pub fn is_built(&self) -> bool {
        self.mesh.is_some() || self.built_empty
    }

    pub fn children(&self) -> Option<&[ChunkNode; 8]> {
        self.children.as_deref()
    }

    pub fn children_mut(&mut self) -> Option<&mut [ChunkNode; 8]> {
        self.children.as_deref_mut()
    }

    /// Returns the 8 children, creating them on first use. `None` at the finest level.
    ///
    /// Child `i` sits at `offset + (i>>2 & 1, i>>1 & 1, i & 1) * half`.
    pub fn ensure_children(&mut self) -> Option<&mut [ChunkNode; 8]> {
        let child_level = self.level.finer()?;
        let offset = self.offset;
        let half = child_level.edge_cubes() as i32;
        let children = self.children.get_or_insert_with(|| {
            Box::new(std::array::from_fn(|i| {
                ChunkNode::new(child_level, offset + child_corner(i) * half)
            }))
        });
        Some(&mut **children)
    }

    /// Takes every mesh in the subtree below this node (this node excluded).
    pub fn take_descendant_meshes(&mut self, out: &mut Vec<ChunkMesh>) {
        if let Some(children) = self.children_mut() {
            for child in children.iter_mut() {
                if let Some(mesh) = child.mesh.take() {
                    out.push(mesh);
                }
                child.built_empty = false;
                child.take_descendant_meshes(out);
            }
        }
    }

    /// Takes every mesh in the subtree including this node.
    pub fn take_all_meshes(&mut self, out: &mut Vec<ChunkMesh>) {
        if let Some(mesh) = self.mesh.take() {
            out.push(mesh);
        }
        self.built_empty = false;
        self.take_descendant_meshes(out);
    }

    /// Visits every node in the subtree depth-first, this node first.
    pub fn for_each(&self, f: &mut impl FnMut(&ChunkNode)) {
        f(self);
        if let Some(children) = self.children() {
            for child in children {
                child.for_each(f);
            }
        }
    }

    /// Mutable form of [`for_each`](Self::for_each).
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut ChunkNode)) {
        f(self);
        if let Some(children) = self.children_mut() {
            for child in children.iter_mut() {
                child.for_each_mut(f);
            }
        }
    }
}

fn child_corner(i: usize) -> IVec3 {
    IVec3::new((i >> 2 & 1) as i32, (i >> 1 & 1) as i32, (i & 1) as i32)
}

/// Address of a node: root index plus child indices from the root down.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodePath {
    pub root: usize,
    pub steps: Vec<u8>,
}

impl NodePath {
    pub fn root(root: usize) -> Self {
        Self {
            root,
            steps: Vec::new(),
        }
    }

    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(index as u8);
        Self {
            root: self.root,
            steps,
        }
    }
}

/// All root nodes of the world.
#[derive(Debug, Default)]
pub struct ChunkTree {
    roots: Vec<ChunkNode>,
}

impl ChunkTree {
    /// Coarse-level roots tiling a world of edge `world_edge`.
    pub fn tiling(world_edge: usize, root_level: ChunkLevel) -> Self {
        let per_axis = world_edge.div_ceil(root_level.edge_cubes() as usize).max(1) as u32;
        Self::grid(root_level, [per_axis; 3])
    }

    /// `counts[0] × counts[1] × counts[2]` roots placed from the origin.
    pub fn grid(root_level: ChunkLevel, counts: [u32; 3]) -> Self {
        let edge = root_level.edge_cubes() as i32;
        let mut roots = Vec::with_capacity((counts[0] * counts[1] * counts[2]) as usize);
        for x in 0..counts[0] as i32 {
            for y in 0..counts[1] as i32 {
                for z in 0..counts[2] as i32 {
                    roots.push(ChunkNode::new(root_level, IVec3::new(x, y, z) * edge));
                }
            }
        }
        Self { roots }
    }

    pub fn roots(&self) -> &[ChunkNode] {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut [ChunkNode] {
        &mut self.roots
    }

    pub fn node(&self, path: &NodePath) -> Option<&ChunkNode> {
        let mut node = self.roots.get(path.root)?;
        for &step in &path.steps {
            node = node.children()?.get(step as usize)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &NodePath) -> Option<&mut ChunkNode> {
        let mut node = self.roots.get_mut(path.root)?;
        for &step in &path.steps {
            node = node.children_mut()?.get_mut(step as usize)?;
        }
        Some(node)
    }

    /// Number of live meshes in the whole tree.
    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        for root in &self.roots {
            root.for_each(&mut |n| count += n.mesh.is_some() as usize);
        }
        count
    }

    /// Takes every mesh in the tree.
    pub fn take_all_meshes(&mut self) -> Vec<ChunkMesh> {
        let mut out = Vec::new();
        for root in &mut self.roots {
            root.take_all_meshes(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_bounds_are_voxel_centred() {
        let node = ChunkNode::new(ChunkLevel::Cube4, IVec3::new(8, 0, 4));
        assert_eq!(node.bounds().min, Vec3::new(7.5, -0.5, 3.5));
        assert_eq!(node.bounds().max, Vec3::new(11.5, 3.5, 7.5));
    }

    #[test]
    fn test_children_tile_parent() {
        let mut node = ChunkNode::new(ChunkLevel::Cube16, IVec3::new(16, 32, 0));
        let parent = *node.bounds();
        let children = node.ensure_children().unwrap();

        let mut volume = 0.0;
        for (i, child) in children.iter().enumerate() {
            assert_eq!(child.level(), ChunkLevel::Cube8);
            assert_eq!(child.level().edge_cubes() * 2, ChunkLevel::Cube16.edge_cubes());
            assert!(parent.contains_aabb(child.bounds()));
            volume += child.bounds().volume();
            for other in &children[i + 1..] {
                let a = child.bounds();
                let b = other.bounds();
                let overlap = (a.max.min(b.max) - a.min.max(b.min)).max(Vec3::ZERO);
                assert_eq!(overlap.x * overlap.y * overlap.z, 0.0);
            }
        }
        assert_eq!(volume, parent.volume());
    }

    #[test]
    fn test_finest_node_has_no_children() {
        let mut node = ChunkNode::new(ChunkLevel::Cube1, IVec3::ZERO);
        assert!(node.ensure_children().is_none());
    }

    #[test]
    fn test_children_are_created_once() {
        let mut node = ChunkNode::new(ChunkLevel::Cube4, IVec3::ZERO);
        node.ensure_children().unwrap()[3].built_empty = true;
        assert!(node.ensure_children().unwrap()[3].built_empty);
    }

    #[test]
    fn test_tiling_covers_world() {
        let tree = ChunkTree::tiling(20, ChunkLevel::Cube8);
        assert_eq!(tree.roots().len(), 27);
        assert_eq!(tree.roots()[26].offset(), IVec3::splat(16));
    }

    #[test]
    fn test_path_lookup() {
        let mut tree = ChunkTree::grid(ChunkLevel::Cube4, [2, 1, 1]);
        tree.roots_mut()[1].ensure_children().unwrap()[5]
            .ensure_children()
            .unwrap();
        let path = NodePath::root(1).child(5).child(2);
        let node = tree.node(&path).unwrap();
        assert_eq!(node.level(), ChunkLevel::Cube1);
        // Root 1 at x=4, child 5 at (2,0,2), grandchild 2 at (0,1,0).
        assert_eq!(node.offset(), IVec3::new(6, 1, 2));
        assert!(tree.node(&NodePath::root(0).child(0)).is_none());
    }
}
