//! LOD chunk streaming over a dense voxel world.
//!
//! A [`WorldSession`] owns the voxel grid, an octree of [`ChunkNode`]s and the
//! physics world. Each tick it advances a resumable [`ChunkScheduler`] pass
//! that subdivides near the camera and around interest points, meshes nodes
//! through the parallel surface extractor, bakes static colliders, and mines
//! finest-level voxels into falling debris. Mesh lifecycle events go out
//! through a [`RenderSink`].

pub mod mining;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod tree;
pub mod watcher;

pub use mining::{DEFAULT_MAX_INTEREST_POINTS, Excavation, InterestPoints, MiningController};
pub use scheduler::{ChunkScheduler, RebuildStats, StepOutcome, StreamContext};
pub use session::{SessionError, WorldSession, lod_policy};
pub use sink::{NullSink, RecordingSink, RenderSink, SinkEvent};
pub use tree::{ChunkMesh, ChunkNode, ChunkTree, MeshId, NodePath};
pub use watcher::GridWatcher;
