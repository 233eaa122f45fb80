//! Rolling height-field fixture so the demo can run without a `QWLD` file.
//!
//! Scenery for the fly-over only. Real worlds come from `QWLD` files or
//! from the host through `WorldSession::init`.

use glam::IVec3;
use quarry_voxel::VoxelGrid;

/// Height of the terrain column at `(x, z)`, between roughly a quarter and a
/// half of the world edge.
pub fn column_height(edge: usize, x: i32, z: i32) -> i32 {
    let e = edge as f32;
    let (fx, fz) = (x as f32 / e, z as f32 / e);
    let waves = (fx * std::f32::consts::TAU * 2.0).sin() * (fz * std::f32::consts::TAU * 1.5).cos();
    let ridge = ((fx + fz) * std::f32::consts::TAU).sin();
    let h = e * (0.35 + 0.08 * waves + 0.04 * ridge);
    (h as i32).clamp(1, edge as i32)
}

/// Fills a grid of edge `edge` with solid columns up to [`column_height`].
pub fn generate(edge: usize) -> VoxelGrid {
    let mut grid = VoxelGrid::new(edge);
    for x in 0..edge as i32 {
        for z in 0..edge as i32 {
            let h = column_height(edge, x, z);
            grid.fill_box(IVec3::new(x, 0, z), IVec3::new(x + 1, h, z + 1), 1);
        }
    }
    tracing::info!(
        "Generated {edge}^3 terrain with {} solid voxels",
        grid.occupied_count()
    );
    grid
}
