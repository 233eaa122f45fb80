//! Voxel picking using the DDA (Amanatides & Woo) algorithm.
//!
//! Voxel `(x, y, z)` spans `[x - 0.5, x + 0.5]` on each axis, so a world
//! point maps to the voxel at `round(p)`.

use glam::{IVec3, Vec3};

use crate::grid::VoxelGrid;

/// A ray cast through the occupancy grid. `direction` must be normalized.
#[derive(Clone, Copy, Debug)]
pub struct VoxelRay {
    /// World-space origin.
    pub origin: Vec3,
    /// Normalized direction vector.
    pub direction: Vec3,
    /// Maximum ray distance in world units.
    pub max_distance: f32,
}

/// Result of a successful voxel raycast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelHit {
    /// Grid coordinate of the hit voxel.
    pub voxel: IVec3,
    /// Normal of the entry face. Zero when the ray starts inside the voxel.
    pub face_normal: IVec3,
    /// Distance from the ray origin to the entry point.
    pub distance: f32,
}

impl VoxelRay {
    /// Creates a ray, normalizing `direction`. Returns `None` for a zero
    /// direction, a non-finite origin, or a `max_distance` that is negative
    /// or not finite.
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Self> {
        if !origin.is_finite() || !max_distance.is_finite() || max_distance < 0.0 {
            return None;
        }
        let direction = direction.try_normalize()?;
        Some(Self {
            origin,
            direction,
            max_distance,
        })
    }
}

/// Returns the first occupied voxel along the ray, or `None` if the ray
/// travels `max_distance` without hitting anything.
pub fn raycast(grid: &VoxelGrid, ray: &VoxelRay) -> Option<VoxelHit> {
    let dir = ray.direction;
    let shifted = ray.origin + Vec3::splat(0.5);
    let mut voxel = shifted.floor().as_ivec3();
    let sub = shifted - shifted.floor();

    let step = IVec3::new(
        if dir.x >= 0.0 { 1 } else { -1 },
        if dir.y >= 0.0 { 1 } else { -1 },
        if dir.z >= 0.0 { 1 } else { -1 },
    );

    let t_delta = Vec3::new(
        safe_inv(dir.x.abs()),
        safe_inv(dir.y.abs()),
        safe_inv(dir.z.abs()),
    );
    let mut t_max = Vec3::new(
        initial_t_max(sub.x, dir.x, t_delta.x),
        initial_t_max(sub.y, dir.y, t_delta.y),
        initial_t_max(sub.z, dir.z, t_delta.z),
    );

    let mut normal = IVec3::ZERO;
    let mut t = 0.0_f32;

    loop {
        if grid.is_occupied_at(voxel) {
            return Some(VoxelHit {
                voxel,
                face_normal: normal,
                distance: t,
            });
        }

        if t_max.x < t_max.y && t_max.x < t_max.z {
            t = t_max.x;
            t_max.x += t_delta.x;
            voxel.x += step.x;
            normal = IVec3::new(-step.x, 0, 0);
        } else if t_max.y < t_max.z {
            t = t_max.y;
            t_max.y += t_delta.y;
            voxel.y += step.y;
            normal = IVec3::new(0, -step.y, 0);
        } else {
            t = t_max.z;
            t_max.z += t_delta.z;
            voxel.z += step.z;
            normal = IVec3::new(0, 0, -step.z);
        }

        if t > ray.max_distance || leaving_grid(voxel, step, grid.edge() as i32) {
            return None;
        }
    }
}

/// `true` once the walk is outside the grid on some axis and stepping away
/// from it, so no occupied voxel can follow.
fn leaving_grid(voxel: IVec3, step: IVec3, edge: i32) -> bool {
    (0..3).any(|axis| {
        (voxel[axis] < 0 && step[axis] < 0) || (voxel[axis] >= edge && step[axis] > 0)
    })
}

/// Safely compute 1.0 / x, clamping to `f32::MAX` when x ≈ 0.
fn safe_inv(x: f32) -> f32 {
    if x.abs() < f32::EPSILON {
        f32::MAX
    } else {
        1.0 / x
    }
}

fn initial_t_max(sub: f32, dir_component: f32, t_delta: f32) -> f32 {
    if dir_component > 0.0 {
        (1.0 - sub) * t_delta
    } else if dir_component < 0.0 {
        sub * t_delta
    } else {
        f32::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(points: &[IVec3]) -> VoxelGrid {
        let mut grid = VoxelGrid::new(16);
        for p in points {
            grid.set(p.x, p.y, p.z, 1);
        }
        grid
    }

    #[test]
    fn test_ray_hits_first_solid_voxel() {
        let grid = grid_with(&[IVec3::new(5, 2, 2), IVec3::new(8, 2, 2)]);
        let ray = VoxelRay::new(Vec3::new(0.0, 2.0, 2.0), Vec3::X, 20.0).unwrap();
        let hit = raycast(&grid, &ray).expect("should hit");
        assert_eq!(hit.voxel, IVec3::new(5, 2, 2));
        assert_eq!(hit.face_normal, IVec3::NEG_X);
        assert!((hit.distance - 4.5).abs() < 1e-4);
    }

    #[test]
    fn test_ray_misses_empty_space() {
        let grid = grid_with(&[]);
        let ray = VoxelRay::new(Vec3::splat(8.0), Vec3::new(1.0, 0.3, -0.2), 64.0).unwrap();
        assert!(raycast(&grid, &ray).is_none());
    }

    #[test]
    fn test_max_distance_limits_search() {
        let grid = grid_with(&[IVec3::new(2, 12, 2)]);
        let short = VoxelRay::new(Vec3::splat(2.0), Vec3::Y, 5.0).unwrap();
        assert!(raycast(&grid, &short).is_none());
        let long = VoxelRay::new(Vec3::splat(2.0), Vec3::Y, 15.0).unwrap();
        let hit = raycast(&grid, &long).unwrap();
        assert_eq!(hit.face_normal, IVec3::NEG_Y);
    }

    #[test]
    fn test_ray_from_above_reports_top_face() {
        let grid = grid_with(&[IVec3::new(3, 0, 3)]);
        let ray = VoxelRay::new(Vec3::new(3.0, 10.0, 3.0), Vec3::NEG_Y, 20.0).unwrap();
        let hit = raycast(&grid, &ray).unwrap();
        assert_eq!(hit.voxel, IVec3::new(3, 0, 3));
        assert_eq!(hit.face_normal, IVec3::Y);
    }

    #[test]
    fn test_origin_inside_solid_has_zero_normal() {
        let grid = grid_with(&[IVec3::new(4, 4, 4)]);
        let ray = VoxelRay::new(Vec3::new(4.2, 3.9, 4.1), Vec3::Z, 10.0).unwrap();
        let hit = raycast(&grid, &ray).unwrap();
        assert_eq!(hit.voxel, IVec3::new(4, 4, 4));
        assert_eq!(hit.face_normal, IVec3::ZERO);
        assert_eq!(hit.distance, 0.0);
    }

    #[test]
    fn test_zero_direction_rejected() {
        assert!(VoxelRay::new(Vec3::ZERO, Vec3::ZERO, 1.0).is_none());
    }

    #[test]
    fn test_ray_rejects_unbounded_distance() {
        assert!(VoxelRay::new(Vec3::ZERO, Vec3::X, f32::INFINITY).is_none());
        assert!(VoxelRay::new(Vec3::ZERO, Vec3::X, f32::NAN).is_none());
        assert!(VoxelRay::new(Vec3::ZERO, Vec3::X, -1.0).is_none());
        assert!(VoxelRay::new(Vec3::splat(f32::NAN), Vec3::X, 10.0).is_none());
        assert!(VoxelRay::new(Vec3::ZERO, Vec3::ZERO, 10.0).is_none());
    }

    #[test]
    fn test_long_miss_terminates() {
        let grid = grid_with(&[]);
        let ray = VoxelRay::new(Vec3::splat(8.0), Vec3::new(0.3, 0.5, 0.8), 1.0e5).unwrap();
        assert!(raycast(&grid, &ray).is_none());
    }
}
