//! Dense byte occupancy grid covering the whole world.
//!
//! The grid is a cube of `edge³` bytes laid out x-major / z-minor
//! (`index = x·edge² + y·edge + z`). A zero byte is empty space; any other
//! value is an occupied unit cube.

use glam::IVec3;

/// Dense occupancy buffer for the entire world.
///
/// Lookups outside `0..edge` on any axis (including negative coordinates)
/// read as empty, so neighbour sampling at the world boundary is always
/// defined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelGrid {
    edge: usize,
    cells: Vec<u8>,
}

impl VoxelGrid {
    /// Creates an all-empty grid with the given edge length.
    pub fn new(edge: usize) -> Self {
        Self {
            edge,
            cells: vec![0; edge * edge * edge],
        }
    }

    /// Wraps an existing byte buffer. Returns `None` if `cells.len() != edge³`.
    pub fn from_bytes(edge: usize, cells: Vec<u8>) -> Option<Self> {
        if edge.checked_pow(3)? != cells.len() {
            return None;
        }
        Some(Self { edge, cells })
    }

    /// Edge length in unit cubes.
    pub fn edge(&self) -> usize {
        self.edge
    }

    /// Raw bytes in x-major / z-minor order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    /// Linear index of an in-range coordinate, or `None` if any axis is out of range.
    pub fn index_of(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let n = self.edge as i64;
        let (x, y, z) = (x as i64, y as i64, z as i64);
        if x < 0 || y < 0 || z < 0 || x >= n || y >= n || z >= n {
            return None;
        }
        Some((x * n * n + y * n + z) as usize)
    }

    /// Returns the stored byte, or 0 for out-of-range coordinates.
    pub fn get(&self, x: i32, y: i32, z: i32) -> u8 {
        self.index_of(x, y, z).map_or(0, |i| self.cells[i])
    }

    /// Returns `true` if the cube at `(x, y, z)` is occupied.
    #[inline]
    pub fn is_occupied(&self, x: i32, y: i32, z: i32) -> bool {
        self.get(x, y, z) != 0
    }

    /// Vector form of [`is_occupied`](Self::is_occupied).
    #[inline]
    pub fn is_occupied_at(&self, p: IVec3) -> bool {
        self.is_occupied(p.x, p.y, p.z)
    }

    /// Writes a byte. Out-of-range writes are ignored and return `false`.
    pub fn set(&mut self, x: i32, y: i32, z: i32, value: u8) -> bool {
        match self.index_of(x, y, z) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }

    /// Clears a cell to empty. Returns `true` if the cell was occupied.
    pub fn clear(&mut self, p: IVec3) -> bool {
        match self.index_of(p.x, p.y, p.z) {
            Some(i) => std::mem::replace(&mut self.cells[i], 0) != 0,
            None => false,
        }
    }

    /// Fills an axis-aligned box `[min, max)` with `value`, clipped to the grid.
    pub fn fill_box(&mut self, min: IVec3, max: IVec3, value: u8) {
        let lo = min.max(IVec3::ZERO);
        let hi = max.min(IVec3::splat(self.edge as i32));
        for x in lo.x..hi.x {
            for y in lo.y..hi.y {
                for z in lo.z..hi.z {
                    self.set(x, y, z, value);
                }
            }
        }
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }
}
