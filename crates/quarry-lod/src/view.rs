//! Camera-relative distance and facing of chunk centres.

use glam::Vec3;

/// Camera position and normalized view direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub forward: Vec3,
}

impl CameraPose {
    /// Creates a pose, normalizing `forward` (zero falls back to `-Z`).
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: forward.try_normalize().unwrap_or(Vec3::NEG_Z),
        }
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::NEG_Z)
    }
}

/// Distance from the camera to a chunk centre, and how much the centre lies
/// in front of the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewMetrics {
    /// Euclidean distance from the camera position.
    pub distance: f32,
    /// `forward · normalize(center - position)`: 1 straight ahead, negative behind.
    pub dot: f32,
}

impl ViewMetrics {
    pub fn compute(camera: &CameraPose, center: Vec3) -> Self {
        let to_center = center - camera.position;
        let distance = to_center.length();
        let dot = to_center
            .try_normalize()
            .map_or(1.0, |dir| camera.forward.dot(dir));
        Self { distance, dot }
    }

    /// `true` when the centre lies behind the camera plane.
    pub fn is_behind(&self) -> bool {
        self.dot < 0.0
    }
}

/// Stable sort by ascending distance; ties keep their relative order.
pub fn sort_by_distance<T>(items: &mut [T], distance: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}
