//! Interleaved mesh output handed to renderers and the collider baker.
//!
//! ## Vertex Layout
//!
//! | Semantic | Offset | Format    |
//! |----------|--------|-----------|
//! | Position | 0      | Float32x3 |
//! | Normal   | 12     | Float32x3 |
//! | TexCoord | 24     | Float32x2 |
//!
//! One submesh, triangle list topology, `u32` indices.

use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use quarry_lod::Aabb;

/// A single vertex of a chunk mesh, in world space.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Face normal.
    pub normal: [f32; 3],
    /// Texture coordinates.
    pub uv: [f32; 2],
}

static_assertions::assert_eq_size!(MeshVertex, [u8; 32]);

impl MeshVertex {
    /// Position as a `Vec3`.
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// What a vertex attribute carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexSemantic {
    Position,
    Normal,
    TexCoord,
}

/// Storage format of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
}

impl VertexFormat {
    /// Size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
        }
    }
}

/// One attribute of [`MeshVertex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: VertexSemantic,
    pub format: VertexFormat,
    pub offset: usize,
}

/// Attribute description of [`MeshVertex`], for renderers that upload
/// [`MeshBuffers`] as raw bytes.
pub const VERTEX_LAYOUT: [VertexAttribute; 3] = [
    VertexAttribute {
        semantic: VertexSemantic::Position,
        format: VertexFormat::Float32x3,
        offset: mem::offset_of!(MeshVertex, position),
    },
    VertexAttribute {
        semantic: VertexSemantic::Normal,
        format: VertexFormat::Float32x3,
        offset: mem::offset_of!(MeshVertex, normal),
    },
    VertexAttribute {
        semantic: VertexSemantic::TexCoord,
        format: VertexFormat::Float32x2,
        offset: mem::offset_of!(MeshVertex, uv),
    },
];

/// Byte stride of one vertex.
pub const VERTEX_STRIDE: usize = mem::size_of::<MeshVertex>();

const _: () = assert!(VERTEX_LAYOUT[0].offset == 0);
const _: () = assert!(VERTEX_LAYOUT[1].offset == 12);
const _: () = assert!(VERTEX_LAYOUT[2].offset == 24);
const _: () = assert!(
    VERTEX_LAYOUT[2].offset + VERTEX_LAYOUT[2].format.size() == VERTEX_STRIDE,
    "MeshVertex has trailing padding"
);

/// Finished geometry of one chunk node.
///
/// Every vertex is unique to its face, so `indices` is always `0..vertices.len()`.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshBuffers {
    /// Vertex buffer.
    pub vertices: Vec<MeshVertex>,
    /// Index buffer (triangles, 3 indices per triangle).
    pub indices: Vec<u32>,
    /// Bounds enclosing every vertex the node can emit.
    pub bounds: Aabb,
}

impl MeshBuffers {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex buffer as raw bytes, laid out per [`VERTEX_LAYOUT`].
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Vertex positions as `Vec3`.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(MeshVertex::position)
    }

    /// Triangles as index triples.
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect()
    }
}
