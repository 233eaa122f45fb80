//! Free-falling debris detached from the chunk tree by mining.
//!
//! Each debris piece is a dynamic body with a convex-hull collider built from
//! its render mesh. Pieces are removed once their age reaches the configured
//! lifetime.

use std::time::Duration;

use quarry_mesh::MeshBuffers;
use rapier3d::prelude::*;

use crate::{PhysicsWorld, to_vector};

/// Default time a debris piece stays in the world.
pub const DEFAULT_DEBRIS_LIFETIME: Duration = Duration::from_secs(30);

struct Debris<K> {
    key: K,
    body: RigidBodyHandle,
    age: Duration,
}

/// Owns detached debris bodies and ages them out.
pub struct DebrisTracker<K> {
    lifetime: Duration,
    pieces: Vec<Debris<K>>,
}

impl<K: Copy> DebrisTracker<K> {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            pieces: Vec::new(),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Number of live debris pieces.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Turns a mesh into a dynamic body centred on its bounds and starts
    /// tracking it. Returns `None` if no convex hull can be built.
    pub fn spawn(
        &mut self,
        physics: &mut PhysicsWorld,
        key: K,
        mesh: &MeshBuffers,
    ) -> Option<RigidBodyHandle> {
        let center = mesh.bounds.center();
        let points: Vec<Vector> = mesh.positions().map(|p| to_vector(p - center)).collect();
        let Some(shape) = SharedShape::convex_hull(&points) else {
            tracing::warn!("Debris mesh has no convex hull, leaving it out of the simulation");
            return None;
        };

        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(center))
            .build();
        let body = physics.rigid_body_set.insert(body);
        let collider = ColliderBuilder::new(shape)
            .friction(0.7)
            .restitution(0.0)
            .build();
        physics
            .collider_set
            .insert_with_parent(collider, body, &mut physics.rigid_body_set);

        self.pieces.push(Debris {
            key,
            body,
            age: Duration::ZERO,
        });
        Some(body)
    }

    /// Ages every piece by `dt` and removes those that reached the lifetime.
    /// Returns the keys of removed pieces.
    pub fn tick(&mut self, physics: &mut PhysicsWorld, dt: Duration) -> Vec<K> {
        let lifetime = self.lifetime;
        let mut expired = Vec::new();
        self.pieces.retain_mut(|piece| {
            piece.age += dt;
            if piece.age >= lifetime {
                physics.remove_body(piece.body);
                expired.push(piece.key);
                false
            } else {
                true
            }
        });
        if !expired.is_empty() {
            tracing::debug!("Removed {} expired debris pieces", expired.len());
        }
        expired
    }

    /// Removes every piece immediately. Returns their keys.
    pub fn clear(&mut self, physics: &mut PhysicsWorld) -> Vec<K> {
        self.pieces
            .drain(..)
            .map(|piece| {
                physics.remove_body(piece.body);
                piece.key
            })
            .collect()
    }
}
