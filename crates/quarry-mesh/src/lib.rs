//! Surface extraction: cube templates, per-level index tables, the parallel
//! count / prefix-sum / write pipeline, and mesh buffer layout.

pub mod cube_template;
pub mod extractor;
pub mod face_direction;
pub mod level_table;
pub mod mesh_buffers;
pub mod parallel;
pub mod visible_faces;

pub use cube_template::{CubeTemplate, TemplateError, VERTICES_PER_FACE};
pub use extractor::{ExtractError, SurfaceExtractor, mesh_bounds};
pub use face_direction::FaceDirection;
pub use level_table::{LevelIndexTable, LevelTables};
pub use mesh_buffers::{
    MeshBuffers, MeshVertex, VERTEX_LAYOUT, VERTEX_STRIDE, VertexAttribute, VertexFormat,
    VertexSemantic,
};
pub use parallel::{DEFAULT_GRAIN, PoolError, WorkerPool};
pub use visible_faces::VisibleFaces;
