//! Batch conversion of finished render meshes into static triangle-mesh colliders.
//!
//! Shapes are built on the worker pool, one mesh per unit of work; colliders
//! are inserted into the [`PhysicsWorld`] sequentially afterwards.

use std::sync::Arc;

use quarry_mesh::{MeshBuffers, WorkerPool};
use rapier3d::prelude::*;

use crate::{PhysicsWorld, to_vector};

/// Builds static chunk colliders from render meshes.
#[derive(Clone, Debug)]
pub struct ColliderBaker {
    /// Surface friction of baked colliders.
    pub friction: f32,
}

impl Default for ColliderBaker {
    fn default() -> Self {
        Self { friction: 0.7 }
    }
}

impl ColliderBaker {
    /// Computes a triangle-mesh shape for one mesh. Returns `None` for
    /// geometry Rapier rejects.
    pub fn bake_shape(mesh: &MeshBuffers) -> Option<SharedShape> {
        let vertices: Vec<Vector> = mesh.positions().map(to_vector).collect();
        match SharedShape::trimesh(vertices, mesh.triangles()) {
            Ok(shape) => Some(shape),
            Err(e) => {
                tracing::warn!(
                    "Skipping collider bake for mesh with {} vertices: {e:?}",
                    mesh.vertex_count()
                );
                None
            }
        }
    }

    /// Bakes every mesh in parallel, then inserts the static colliders.
    ///
    /// The result has one entry per input mesh, `None` where baking failed.
    pub fn bake(
        &self,
        physics: &mut PhysicsWorld,
        pool: &WorkerPool,
        meshes: &[Arc<MeshBuffers>],
    ) -> Vec<Option<ColliderHandle>> {
        let shapes = pool.map(meshes, |mesh| Self::bake_shape(mesh));
        let handles: Vec<_> = shapes
            .into_iter()
            .map(|shape| {
                shape.map(|shape| {
                    let collider = ColliderBuilder::new(shape)
                        .friction(self.friction)
                        .restitution(0.0)
                        .build();
                    physics.insert_static(collider)
                })
            })
            .collect();
        tracing::debug!(
            "Baked {} of {} chunk colliders",
            handles.iter().flatten().count(),
            meshes.len()
        );
        handles
    }
}

#[cfg(test)]
#[path = "baker_tests.rs"]
mod tests;
