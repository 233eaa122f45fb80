//! Physics integration: static chunk colliders, detached debris bodies, and
//! fixed-step world stepping.
//!
//! Wraps the Rapier 3D physics engine behind a single [`PhysicsWorld`] that
//! owns all simulation state and exposes a minimal API.

pub mod baker;
pub mod debris;

use std::time::Duration;

use rapier3d::prelude::*;

pub use baker::ColliderBaker;
pub use debris::{DebrisTracker, DEFAULT_DEBRIS_LIFETIME};
pub use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

/// Fixed simulation timestep in seconds.
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Upper bound on fixed steps per [`PhysicsWorld::advance`] call.
const MAX_STEPS_PER_ADVANCE: u32 = 4;

/// Central physics simulation state owning all Rapier sets.
pub struct PhysicsWorld {
    /// World-space gravity vector.
    pub gravity: Vector,
    /// Timestep and solver configuration.
    pub integration_parameters: IntegrationParameters,
    /// The main simulation pipeline.
    pub physics_pipeline: PhysicsPipeline,
    /// Tracks sleeping/awake body islands.
    pub island_manager: IslandManager,
    /// Broad-phase collision detection.
    pub broad_phase: BroadPhaseBvh,
    /// Narrow-phase collision detection (contact manifolds).
    pub narrow_phase: NarrowPhase,
    /// All rigid bodies in the simulation.
    pub rigid_body_set: RigidBodySet,
    /// All colliders in the simulation.
    pub collider_set: ColliderSet,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    /// Continuous collision detection solver.
    pub ccd_solver: CCDSolver,
    accumulator: f32,
}

impl PhysicsWorld {
    /// Creates a new physics world with gravity `(0, -9.81, 0)` and a
    /// timestep of `1/60` seconds.
    pub fn new() -> Self {
        let integration_parameters = IntegrationParameters {
            dt: FIXED_DT,
            ..Default::default()
        };

        Self {
            gravity: Vector::new(0.0, -9.81, 0.0),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            accumulator: 0.0,
        }
    }

    /// Advances the simulation by one fixed timestep.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    /// Runs as many fixed steps as fit in the accumulated frame time.
    /// Returns the number of steps taken.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        self.accumulator += dt.as_secs_f32();
        let mut steps = 0;
        while self.accumulator >= FIXED_DT && steps < MAX_STEPS_PER_ADVANCE {
            self.step();
            self.accumulator -= FIXED_DT;
            steps += 1;
        }
        if steps == MAX_STEPS_PER_ADVANCE {
            // Drop the backlog instead of spiralling.
            self.accumulator = self.accumulator.min(FIXED_DT);
        }
        steps
    }

    /// Inserts a fixed collider not attached to any body.
    pub fn insert_static(&mut self, collider: Collider) -> ColliderHandle {
        self.collider_set.insert(collider)
    }

    /// Removes a collider. Returns `false` if the handle was stale.
    pub fn remove_collider(&mut self, handle: ColliderHandle) -> bool {
        self.collider_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.rigid_body_set,
                true,
            )
            .is_some()
    }

    /// Removes a rigid body together with its attached colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    /// Current translation of a body as a workspace `Vec3`.
    pub fn body_translation(&self, handle: RigidBodyHandle) -> Option<glam::Vec3> {
        let t = self.rigid_body_set.get(handle)?.translation();
        Some(glam::Vec3::new(t.x, t.y, t.z))
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a workspace `Vec3` into Rapier's vector type, which may come
/// from a different glam version.
pub(crate) fn to_vector(v: glam::Vec3) -> Vector {
    Vector::new(v.x, v.y, v.z)
}
