//! LOD level and meshing resolution tags.

/// Chunk LOD level. The discriminant is `log2` of the edge cube count.
///
/// `Cube1` is the finest level (one unit cube per chunk), `Cube256` the
/// coarsest (256 unit cubes per chunk edge).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ChunkLevel {
    Cube1 = 0,
    Cube2 = 1,
    Cube4 = 2,
    Cube8 = 3,
    Cube16 = 4,
    Cube32 = 5,
    Cube64 = 6,
    Cube128 = 7,
    Cube256 = 8,
}

impl ChunkLevel {
    /// All levels from finest to coarsest.
    pub const ALL: [ChunkLevel; 9] = [
        Self::Cube1,
        Self::Cube2,
        Self::Cube4,
        Self::Cube8,
        Self::Cube16,
        Self::Cube32,
        Self::Cube64,
        Self::Cube128,
        Self::Cube256,
    ];

    /// Finest level.
    pub const FINEST: ChunkLevel = ChunkLevel::Cube1;

    /// Coarsest level.
    pub const COARSEST: ChunkLevel = ChunkLevel::Cube256;

    /// Level from its `log2` index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Level whose edge cube count is exactly `edge`.
    pub fn from_edge(edge: u32) -> Option<Self> {
        if !edge.is_power_of_two() {
            return None;
        }
        Self::from_index(edge.trailing_zeros() as usize)
    }

    /// `log2` of the edge cube count.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Number of unit cubes along one edge of a chunk at this level.
    pub fn edge_cubes(self) -> u32 {
        1 << self as u32
    }

    /// Next finer level, or `None` at [`ChunkLevel::FINEST`].
    pub fn finer(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// Level `steps` finer than this one.
    pub fn finer_by(self, steps: usize) -> Option<Self> {
        self.index().checked_sub(steps).and_then(Self::from_index)
    }

    /// Next coarser level, or `None` at [`ChunkLevel::COARSEST`].
    pub fn coarser(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// `true` for [`ChunkLevel::FINEST`].
    pub fn is_finest(self) -> bool {
        self == Self::FINEST
    }
}

/// Meshing resolution: world units per emitted cube.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CubeSize {
    #[default]
    Size1 = 0,
    Size2 = 1,
    Size4 = 2,
}

impl CubeSize {
    /// `log2` of the cube edge.
    pub fn log2(self) -> usize {
        self as usize
    }

    /// Cube edge length in world units.
    pub fn edge(self) -> i32 {
        1 << self as i32
    }

    /// Offset from a cube's base voxel to its geometric centre.
    pub fn center_offset(self) -> f32 {
        (self.edge() - 1) as f32 * 0.5
    }
}
