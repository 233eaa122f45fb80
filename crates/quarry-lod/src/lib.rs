//! Chunk bounds, camera view metrics, and the subdivide / rebuild / keep LOD policy.

pub mod aabb;
pub mod policy;
pub mod view;

pub use aabb::Aabb;
pub use policy::{LodDecision, LodInput, LodPolicy};
pub use view::{CameraPose, ViewMetrics, sort_by_distance};
