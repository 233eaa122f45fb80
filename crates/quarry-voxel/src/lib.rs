//! World occupancy storage, LOD level tags, world file IO, and voxel picking.

pub mod grid;
pub mod level;
pub mod raycast;
pub mod world_file;

pub use grid::VoxelGrid;
pub use level::{ChunkLevel, CubeSize};
pub use raycast::{VoxelHit, VoxelRay, raycast};
pub use world_file::WorldError;
