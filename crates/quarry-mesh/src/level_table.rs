//! Per-level cell coordinate tables and reusable count/offset scratch.
//!
//! Tables are allocated once for every level a rebuild can mesh at and
//! reused by every rebuild. Handing them out by `&mut` keeps a
//! single build writing the scratch at a time.

use glam::IVec3;
use quarry_voxel::ChunkLevel;

/// Cell coordinates of one LOD level plus a scratch buffer of the same length.
#[derive(Debug)]
pub struct LevelIndexTable {
    level: ChunkLevel,
    coords: Vec<[u8; 3]>,
    scratch: Vec<u32>,
}

impl LevelIndexTable {
    /// Enumerates every cell of `level` in x-major / z-minor order.
    pub fn new(level: ChunkLevel) -> Self {
        let edge = level.edge_cubes();
        let len = (edge * edge * edge) as usize;
        let mut coords = Vec::with_capacity(len);
        for x in 0..edge {
            for y in 0..edge {
                for z in 0..edge {
                    coords.push([x as u8, y as u8, z as u8]);
                }
            }
        }
        Self {
            level,
            coords,
            scratch: vec![0; len],
        }
    }

    pub fn level(&self) -> ChunkLevel {
        self.level
    }

    /// Number of cells along one edge.
    pub fn edge(&self) -> u32 {
        self.level.edge_cubes()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Cell coordinate at `index` as a vector.
    #[inline]
    pub fn coord(&self, index: usize) -> IVec3 {
        let [x, y, z] = self.coords[index];
        IVec3::new(x as i32, y as i32, z as i32)
    }

    /// Coordinates and scratch, split so a pass can read one while writing the other.
    pub fn split_mut(&mut self) -> (&[[u8; 3]], &mut [u32]) {
        (&self.coords, &mut self.scratch)
    }

    /// Current scratch contents (counts before [`prefix_sum`](Self::prefix_sum),
    /// offsets after).
    pub fn scratch(&self) -> &[u32] {
        &self.scratch
    }

    /// Converts the per-cell counts in scratch into exclusive offsets in
    /// place and returns the total.
    pub fn prefix_sum(&mut self) -> usize {
        let mut running = 0usize;
        for slot in &mut self.scratch {
            let count = *slot as usize;
            *slot = running as u32;
            running += count;
        }
        running
    }
}

/// All level tables from [`ChunkLevel::FINEST`] to a configured coarsest level.
#[derive(Debug)]
pub struct LevelTables {
    tables: Vec<LevelIndexTable>,
}

impl LevelTables {
    /// Allocates tables for every level from the finest up to `coarsest` inclusive.
    pub fn new(coarsest: ChunkLevel) -> Self {
        let tables: Vec<_> = ChunkLevel::ALL[..=coarsest.index()]
            .iter()
            .map(|&level| LevelIndexTable::new(level))
            .collect();
        tracing::debug!(
            "Allocated {} level tables ({} cells)",
            tables.len(),
            tables.iter().map(LevelIndexTable::len).sum::<usize>()
        );
        Self { tables }
    }

    /// Tables for a tree whose roots sit at `coarse`.
    ///
    /// Coarse nodes mesh at cube size 2 or 4 and finer nodes at cube size 1,
    /// so nothing samples a table coarser than one level below the roots.
    pub fn for_coarse_level(coarse: ChunkLevel) -> Self {
        Self::new(coarse.finer().unwrap_or(ChunkLevel::FINEST))
    }

    /// Coarsest level with a table.
    pub fn coarsest(&self) -> ChunkLevel {
        self.tables
            .last()
            .map_or(ChunkLevel::FINEST, LevelIndexTable::level)
    }

    pub fn get(&self, level: ChunkLevel) -> Option<&LevelIndexTable> {
        self.tables.get(level.index())
    }

    pub fn get_mut(&mut self, level: ChunkLevel) -> Option<&mut LevelIndexTable> {
        self.tables.get_mut(level.index())
    }
}
