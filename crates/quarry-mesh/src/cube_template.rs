//! Fixed per-face vertex template for one emitted cube.
//!
//! ## QCUB Binary Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes `[0x51, 0x43, 0x55, 0x42]` ("QCUB") |
//! | 4 | 1 | Format version (`u8`, currently 1) |
//! | 5 | 1 | Vertices per face (`u8`, must be 6) |
//! | 6 | 6·6·32 | Per face in [`FaceDirection`] order: 6 vertices of position (3×f32), normal (3×f32), uv (2×f32), little-endian |

use std::path::Path;

use glam::Vec3;

use crate::face_direction::FaceDirection;
use crate::mesh_buffers::MeshVertex;
use crate::visible_faces::VisibleFaces;

/// Magic bytes identifying the QCUB format.
const MAGIC: [u8; 4] = [0x51, 0x43, 0x55, 0x42];

/// Current format version.
const FORMAT_VERSION: u8 = 1;

/// Vertices emitted per visible face (two unshared triangles).
pub const VERTICES_PER_FACE: usize = 6;

const HEADER_LEN: usize = 6;
const FLOATS_PER_VERTEX: usize = 8;
const BODY_LEN: usize = 6 * VERTICES_PER_FACE * FLOATS_PER_VERTEX * 4;

/// Errors that can occur while loading a cube template asset.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Failed to read the file from disk.
    #[error("failed to read cube template: {0}")]
    Io(#[from] std::io::Error),
    /// The data does not start with the expected magic bytes.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    /// The asset declares a face vertex count other than 6.
    #[error("unsupported vertices per face: {0} (expected 6)")]
    UnsupportedFaceVertexCount(u8),
    /// The data length does not match the declared layout.
    #[error("template size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Exact expected byte count.
        expected: usize,
        /// Actual byte count received.
        actual: usize,
    },
}

/// Vertex template for a unit cube centred on the origin, plus the vertex
/// count for every visible-face mask.
#[derive(Clone, Debug, PartialEq)]
pub struct CubeTemplate {
    faces: [[MeshVertex; VERTICES_PER_FACE]; 6],
    vertex_counts: [u32; 64],
}

impl Default for CubeTemplate {
    fn default() -> Self {
        Self::unit()
    }
}

impl CubeTemplate {
    /// Builds a template from per-face vertices in [`FaceDirection`] order.
    pub fn from_faces(faces: [[MeshVertex; VERTICES_PER_FACE]; 6]) -> Self {
        let mut vertex_counts = [0u32; 64];
        for (mask, count) in vertex_counts.iter_mut().enumerate() {
            *count = VisibleFaces(mask as u8).count() * VERTICES_PER_FACE as u32;
        }
        Self {
            faces,
            vertex_counts,
        }
    }

    /// A unit cube spanning ±0.5 with counter-clockwise outward winding.
    pub fn unit() -> Self {
        Self::from_faces(FaceDirection::ALL.map(unit_face))
    }

    /// Template vertices of one face.
    pub fn face(&self, dir: FaceDirection) -> &[MeshVertex; VERTICES_PER_FACE] {
        &self.faces[dir.index()]
    }

    /// Number of vertices emitted for a cell with the given visible faces.
    #[inline]
    pub fn vertex_count(&self, mask: VisibleFaces) -> u32 {
        self.vertex_counts[(mask.0 & VisibleFaces::ALL.0) as usize]
    }

    /// Writes the visible faces of one cube, scaled by `scale` and centred on
    /// `center`, into `out`. Returns the number of vertices written.
    ///
    /// `out` must hold at least [`vertex_count(mask)`](Self::vertex_count) vertices.
    pub fn emit(&self, mask: VisibleFaces, center: Vec3, scale: f32, out: &mut [MeshVertex]) -> usize {
        let mut written = 0;
        for dir in mask.iter() {
            for (dst, src) in out[written..written + VERTICES_PER_FACE]
                .iter_mut()
                .zip(self.face(dir))
            {
                *dst = MeshVertex {
                    position: (src.position() * scale + center).to_array(),
                    normal: src.normal,
                    uv: src.uv,
                };
            }
            written += VERTICES_PER_FACE;
        }
        written
    }

    /// Serializes the template in the QCUB format.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + BODY_LEN);
        buf.extend_from_slice(&MAGIC);
        buf.push(FORMAT_VERSION);
        buf.push(VERTICES_PER_FACE as u8);
        for v in self.faces.iter().flatten() {
            for f in v.position.iter().chain(&v.normal).chain(&v.uv) {
                buf.extend_from_slice(&f.to_le_bytes());
            }
        }
        buf
    }

    /// Parses and validates QCUB bytes.
    pub fn decode(data: &[u8]) -> Result<Self, TemplateError> {
        if data.len() < 4 || data[0..4] != MAGIC {
            return Err(TemplateError::InvalidMagic);
        }
        if data.len() < HEADER_LEN {
            return Err(TemplateError::SizeMismatch {
                expected: HEADER_LEN + BODY_LEN,
                actual: data.len(),
            });
        }
        if data[4] != FORMAT_VERSION {
            return Err(TemplateError::UnsupportedVersion(data[4]));
        }
        if data[5] as usize != VERTICES_PER_FACE {
            return Err(TemplateError::UnsupportedFaceVertexCount(data[5]));
        }
        if data.len() != HEADER_LEN + BODY_LEN {
            return Err(TemplateError::SizeMismatch {
                expected: HEADER_LEN + BODY_LEN,
                actual: data.len(),
            });
        }

        let mut floats = data[HEADER_LEN..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        let mut faces = [[MeshVertex::default(); VERTICES_PER_FACE]; 6];
        for v in faces.iter_mut().flatten() {
            for f in v
                .position
                .iter_mut()
                .chain(v.normal.iter_mut())
                .chain(v.uv.iter_mut())
            {
                *f = floats.next().unwrap_or_default();
            }
        }
        Ok(Self::from_faces(faces))
    }

    /// Loads and validates a QCUB file from disk.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let bytes = std::fs::read(path)?;
        let template = Self::decode(&bytes)?;
        tracing::info!("Loaded cube template {}", path.display());
        Ok(template)
    }
}

/// Tangent axes `(u, v)` of a face with `u × v` equal to the outward normal.
fn face_axes(dir: FaceDirection) -> (Vec3, Vec3) {
    match dir {
        FaceDirection::PosX => (Vec3::Y, Vec3::Z),
        FaceDirection::NegX => (Vec3::Z, Vec3::Y),
        FaceDirection::PosY => (Vec3::Z, Vec3::X),
        FaceDirection::NegY => (Vec3::X, Vec3::Z),
        FaceDirection::PosZ => (Vec3::X, Vec3::Y),
        FaceDirection::NegZ => (Vec3::Y, Vec3::X),
    }
}

fn unit_face(dir: FaceDirection) -> [MeshVertex; VERTICES_PER_FACE] {
    let n = dir.normal();
    let (u, v) = face_axes(dir);
    let corner = |su: f32, sv: f32| MeshVertex {
        position: (n * 0.5 + u * (su * 0.5) + v * (sv * 0.5)).to_array(),
        normal: n.to_array(),
        uv: [(su + 1.0) * 0.5, (sv + 1.0) * 0.5],
    };
    let quad = [
        corner(-1.0, -1.0),
        corner(1.0, -1.0),
        corner(1.0, 1.0),
        corner(-1.0, 1.0),
    ];
    [quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]
}
