//! Bitmask for tracking which of a cell's six faces are exposed.

use glam::IVec3;
use quarry_voxel::VoxelGrid;

use crate::face_direction::FaceDirection;

/// Bitmask indicating which of a cell's 6 faces are visible.
///
/// Bit 0 = +X, Bit 1 = −X, Bit 2 = +Y, Bit 3 = −Y, Bit 4 = +Z, Bit 5 = −Z.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisibleFaces(pub u8);

impl VisibleFaces {
    /// No faces visible.
    pub const NONE: Self = Self(0);
    /// All six faces visible.
    pub const ALL: Self = Self(0b0011_1111);

    /// Returns `true` if the face in the given direction is visible.
    pub fn is_visible(self, direction: FaceDirection) -> bool {
        self.0 & (1 << direction as u8) != 0
    }

    /// Marks the face in the given direction as visible.
    pub fn set_visible(&mut self, direction: FaceDirection) {
        self.0 |= 1 << direction as u8;
    }

    /// Returns the number of visible faces (0–6).
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterates the visible directions in [`FaceDirection::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = FaceDirection> {
        FaceDirection::ALL
            .into_iter()
            .filter(move |&dir| self.is_visible(dir))
    }

    /// Exposed faces of the cell sampled at `base` when cells are `stride`
    /// voxels apart.
    ///
    /// An empty base voxel yields [`VisibleFaces::NONE`]. A face is exposed
    /// when the voxel one stride away is empty or outside the grid.
    pub fn of_cell(grid: &VoxelGrid, base: IVec3, stride: i32) -> Self {
        if !grid.is_occupied_at(base) {
            return Self::NONE;
        }
        let mut mask = Self::NONE;
        for dir in FaceDirection::ALL {
            if !grid.is_occupied_at(base + dir.step() * stride) {
                mask.set_visible(dir);
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_has_zero_count() {
        assert_eq!(VisibleFaces::NONE.count(), 0);
    }

    #[test]
    fn test_all_has_six_count() {
        assert_eq!(VisibleFaces::ALL.count(), 6);
    }

    #[test]
    fn test_set_and_query_individual_face() {
        let mut vf = VisibleFaces::NONE;
        vf.set_visible(FaceDirection::PosZ);
        assert!(vf.is_visible(FaceDirection::PosZ));
        assert!(!vf.is_visible(FaceDirection::NegZ));
        assert_eq!(vf.count(), 1);
        assert_eq!(vf.iter().collect::<Vec<_>>(), vec![FaceDirection::PosZ]);
    }

    #[test]
    fn test_corner_voxel_exposes_all_faces() {
        let mut grid = VoxelGrid::new(4);
        grid.set(0, 0, 0, 1);
        assert_eq!(VisibleFaces::of_cell(&grid, IVec3::ZERO, 1), VisibleFaces::ALL);
    }

    #[test]
    fn test_buried_voxel_exposes_nothing() {
        let mut grid = VoxelGrid::new(3);
        grid.fill_box(IVec3::ZERO, IVec3::splat(3), 1);
        assert_eq!(VisibleFaces::of_cell(&grid, IVec3::ONE, 1), VisibleFaces::NONE);
        // Outer cells still face the world boundary.
        assert_eq!(VisibleFaces::of_cell(&grid, IVec3::ZERO, 1).count(), 3);
    }

    #[test]
    fn test_stride_skips_intermediate_voxels() {
        let mut grid = VoxelGrid::new(8);
        grid.set(0, 0, 0, 1);
        grid.set(1, 0, 0, 1);
        grid.set(2, 0, 0, 1);
        // With a stride of 2 the +X neighbour is (2, 0, 0), not (1, 0, 0).
        let mask = VisibleFaces::of_cell(&grid, IVec3::ZERO, 2);
        assert!(!mask.is_visible(FaceDirection::PosX));
        assert_eq!(mask.count(), 5);
    }

    #[test]
    fn test_empty_base_has_no_faces() {
        let grid = VoxelGrid::new(2);
        assert_eq!(VisibleFaces::of_cell(&grid, IVec3::ZERO, 1), VisibleFaces::NONE);
    }
}
