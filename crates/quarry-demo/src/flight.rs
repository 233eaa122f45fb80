//! Scripted camera path over the world.
//!
//! The camera circles the world centre at a fixed altitude, looking ahead and
//! slightly down, and periodically aims a mining ray straight below itself.

use glam::Vec3;
use quarry_lod::CameraPose;
use quarry_voxel::VoxelRay;

/// Orbit parameters.
#[derive(Debug, Clone)]
pub struct FlightPath {
    pub center: Vec3,
    pub radius: f32,
    pub altitude: f32,
    /// Angular speed in radians per second.
    pub angular_speed: f32,
}

impl FlightPath {
    /// A path circling a world of edge `edge`, at 40% of the edge from the
    /// centre and a quarter edge above the top.
    pub fn for_world(edge: usize) -> Self {
        let e = edge as f32;
        Self {
            center: Vec3::new(e * 0.5, 0.0, e * 0.5),
            radius: e * 0.4,
            altitude: e * 1.25,
            angular_speed: 0.2,
        }
    }

    /// Camera pose `t` seconds into the flight.
    pub fn pose_at(&self, t: f32) -> CameraPose {
        let angle = t * self.angular_speed;
        let position = self.center
            + Vec3::new(angle.cos() * self.radius, self.altitude, angle.sin() * self.radius);
        // Tangent of the circle, tilted down.
        let tangent = Vec3::new(-angle.sin(), 0.0, angle.cos());
        CameraPose::new(position, tangent - Vec3::Y * 0.5)
    }

    /// A ray straight down from the camera, long enough to reach the floor.
    pub fn mining_ray(&self, pose: &CameraPose) -> Option<VoxelRay> {
        VoxelRay::new(pose.position, Vec3::NEG_Y, self.altitude + 1.0)
    }
}
