//! Two-pass parallel surface extraction.
//!
//! 1. **Count**: every table cell computes its visible-face mask and stores
//!    the vertex count in the table scratch.
//! 2. **Prefix sum**: counts become exclusive offsets; the total sizes the buffers.
//! 3. **Index / write**: the index buffer is filled with `0..total`, and
//!    contiguous blocks of cells write their faces into disjoint vertex ranges.
//!
//! No locks are needed: every cell's output range is known before writing starts.

use glam::{IVec3, Vec3};
use quarry_lod::Aabb;
use quarry_voxel::{ChunkLevel, CubeSize, VoxelGrid};

use crate::cube_template::CubeTemplate;
use crate::level_table::{LevelIndexTable, LevelTables};
use crate::mesh_buffers::{MeshBuffers, MeshVertex};
use crate::parallel::WorkerPool;
use crate::visible_faces::VisibleFaces;

/// Errors from a surface extraction request.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// No table exists for `level - log2(cube_size)`.
    #[error("no level table for {level:?} at {cube_size:?}")]
    NoTable {
        level: ChunkLevel,
        cube_size: CubeSize,
    },
}

/// Reads the voxel grid and writes mesh buffers for one chunk node at a time.
pub struct SurfaceExtractor<'a> {
    grid: &'a VoxelGrid,
    template: &'a CubeTemplate,
    pool: &'a WorkerPool,
}

impl<'a> SurfaceExtractor<'a> {
    pub fn new(grid: &'a VoxelGrid, template: &'a CubeTemplate, pool: &'a WorkerPool) -> Self {
        Self {
            grid,
            template,
            pool,
        }
    }

    /// Table level used to mesh a `level` node at `cube_size`.
    pub fn table_level(level: ChunkLevel, cube_size: CubeSize) -> Option<ChunkLevel> {
        level.finer_by(cube_size.log2())
    }

    /// Builds the mesh of the node at `offset`. Returns `Ok(None)` when the
    /// node has no visible faces.
    pub fn extract(
        &self,
        tables: &mut LevelTables,
        offset: IVec3,
        level: ChunkLevel,
        cube_size: CubeSize,
    ) -> Result<Option<MeshBuffers>, ExtractError> {
        let table = Self::table_level(level, cube_size)
            .and_then(|l| tables.get_mut(l))
            .ok_or(ExtractError::NoTable { level, cube_size })?;

        let total = self.count(table, offset, cube_size);
        if total == 0 {
            return Ok(None);
        }

        let indices = self.write_indices(total);
        let vertices = self.write_vertices(table, offset, cube_size, total);
        Ok(Some(MeshBuffers {
            vertices,
            indices,
            bounds: mesh_bounds(offset, table.edge(), cube_size),
        }))
    }

    /// Count pass followed by the prefix sum. Leaves per-cell offsets in the
    /// table scratch and returns the total vertex count.
    pub fn count(&self, table: &mut LevelIndexTable, offset: IVec3, cube_size: CubeSize) -> usize {
        let d = cube_size.edge();
        let (coords, counts) = table.split_mut();
        self.pool.for_each_chunk_mut(counts, |start, chunk| {
            for (slot, &[x, y, z]) in chunk.iter_mut().zip(&coords[start..]) {
                let base = offset + IVec3::new(x as i32, y as i32, z as i32) * d;
                let mask = VisibleFaces::of_cell(self.grid, base, d);
                *slot = self.template.vertex_count(mask);
            }
        });
        table.prefix_sum()
    }

    fn write_indices(&self, total: usize) -> Vec<u32> {
        let mut indices = vec![0u32; total];
        self.pool.for_each_chunk_mut(&mut indices, |start, chunk| {
            for (i, slot) in chunk.iter_mut().enumerate() {
                *slot = (start + i) as u32;
            }
        });
        indices
    }

    fn write_vertices(
        &self,
        table: &LevelIndexTable,
        offset: IVec3,
        cube_size: CubeSize,
        total: usize,
    ) -> Vec<MeshVertex> {
        let d = cube_size.edge();
        let half = Vec3::splat(cube_size.center_offset());
        let offsets = table.scratch();
        let cells = table.len();
        let grain = self.pool.grain();

        let mut vertices = vec![MeshVertex::default(); total];
        let mut blocks = Vec::with_capacity(cells.div_ceil(grain));
        let mut rest: &mut [MeshVertex] = &mut vertices;
        for first in (0..cells).step_by(grain) {
            let next = (first + grain).min(cells);
            let end = if next < cells {
                offsets[next] as usize
            } else {
                total
            };
            let (block, tail) = std::mem::take(&mut rest).split_at_mut(end - offsets[first] as usize);
            blocks.push((first, next, block));
            rest = tail;
        }

        self.pool.for_each_mut(&mut blocks, |(first, next, out)| {
            let base_offset = offsets[*first] as usize;
            for cell in *first..*next {
                let c = table.coord(cell);
                let base = offset + c * d;
                let mask = VisibleFaces::of_cell(self.grid, base, d);
                if mask == VisibleFaces::NONE {
                    continue;
                }
                let at = offsets[cell] as usize - base_offset;
                let center = base.as_vec3() + half;
                self.template.emit(mask, center, d as f32, &mut (**out)[at..]);
            }
        });
        drop(blocks);
        vertices
    }
}

/// Bounds of a node mesh: the node's full extent plus a half-unit margin.
pub fn mesh_bounds(offset: IVec3, edge: u32, cube_size: CubeSize) -> Aabb {
    let min = offset.as_vec3() - Vec3::splat(0.5);
    let max = offset.as_vec3() + Vec3::splat((edge as i32 * cube_size.edge()) as f32 + 0.5);
    Aabb::new(min, max)
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
