//! Binary world file loading and saving.
//!
//! The QWLD format stores the whole occupancy grid as one LZ4 block.
//!
//! ## Binary Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes `[0x51, 0x57, 0x4C, 0x44]` ("QWLD") |
//! | 4 | 1 | Format version (`u8`, currently 1) |
//! | 5 | 4 | Edge length N (`u32`, little-endian) |
//! | 9 | M | LZ4 block with prepended size, decompressing to N³ bytes |

use std::path::Path;

use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::grid::VoxelGrid;

/// Magic bytes identifying the QWLD format.
const MAGIC: [u8; 4] = [0x51, 0x57, 0x4C, 0x44];

/// Current format version.
const FORMAT_VERSION: u8 = 1;

/// Header size: magic + version + edge.
const HEADER_LEN: usize = 9;

/// Errors that can occur while loading a world file.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Failed to read the file from disk.
    #[error("failed to read world file: {0}")]
    Io(#[from] std::io::Error),
    /// The data does not start with the expected magic bytes.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    /// The header is shorter than expected.
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum expected byte count.
        expected: usize,
        /// Actual byte count received.
        actual: usize,
    },
    /// The declared edge length is zero or too large to address.
    #[error("invalid world edge: {0}")]
    InvalidEdge(u32),
    /// LZ4 decompression failed.
    #[error("LZ4 decompression failed: {0}")]
    Decompress(String),
    /// The decompressed payload does not hold exactly N³ bytes.
    #[error("voxel payload has {actual} bytes, expected {expected}")]
    SizeMismatch {
        /// N³ for the declared edge.
        expected: usize,
        /// Decompressed byte count.
        actual: usize,
    },
}

impl VoxelGrid {
    /// Serializes the grid in the QWLD format.
    pub fn encode(&self) -> Vec<u8> {
        let payload = compress_prepend_size(self.as_bytes());
        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.extend_from_slice(&MAGIC);
        buf.push(FORMAT_VERSION);
        buf.extend_from_slice(&(self.edge() as u32).to_le_bytes());
        buf.extend_from_slice(&payload);
        buf
    }

    /// Deserializes a grid from QWLD bytes, validating the header and payload size.
    pub fn decode(data: &[u8]) -> Result<Self, WorldError> {
        if data.len() < 4 || data[0..4] != MAGIC {
            return Err(WorldError::InvalidMagic);
        }
        if data.len() < HEADER_LEN {
            return Err(WorldError::Truncated {
                expected: HEADER_LEN,
                actual: data.len(),
            });
        }
        let version = data[4];
        if version != FORMAT_VERSION {
            return Err(WorldError::UnsupportedVersion(version));
        }

        let edge = u32::from_le_bytes([data[5], data[6], data[7], data[8]]);
        let expected = (edge as usize)
            .checked_pow(3)
            .filter(|_| edge > 0 && edge <= i32::MAX as u32)
            .ok_or(WorldError::InvalidEdge(edge))?;

        let cells = decompress_size_prepended(&data[HEADER_LEN..])
            .map_err(|e| WorldError::Decompress(e.to_string()))?;
        if cells.len() != expected {
            return Err(WorldError::SizeMismatch {
                expected,
                actual: cells.len(),
            });
        }

        VoxelGrid::from_bytes(edge as usize, cells).ok_or(WorldError::SizeMismatch {
            expected,
            actual: 0,
        })
    }

    /// Loads and validates a QWLD file from disk.
    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let bytes = std::fs::read(path)?;
        let grid = Self::decode(&bytes)?;
        tracing::info!(
            "Loaded world {} (edge {}, {} occupied)",
            path.display(),
            grid.edge(),
            grid.occupied_count()
        );
        Ok(grid)
    }

    /// Writes the grid to disk in the QWLD format.
    pub fn save(&self, path: &Path) -> Result<(), WorldError> {
        std::fs::write(path, self.encode())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    fn sample_grid() -> VoxelGrid {
        let mut grid = VoxelGrid::new(8);
        grid.fill_box(IVec3::ZERO, IVec3::new(8, 3, 8), 1);
        grid.set(4, 5, 2, 9);
        grid
    }

    #[test]
    fn test_decode_restores_grid() {
        let grid = sample_grid();
        let decoded = VoxelGrid::decode(&grid.encode()).unwrap();
        assert_eq!(decoded, grid);
    }

    #[test]
    fn test_invalid_magic() {
        let mut data = sample_grid().encode();
        data[0] = b'X';
        assert!(matches!(
            VoxelGrid::decode(&data),
            Err(WorldError::InvalidMagic)
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = sample_grid().encode();
        data[4] = 7;
        assert!(matches!(
            VoxelGrid::decode(&data),
            Err(WorldError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_truncated_header() {
        let data = &sample_grid().encode()[..6];
        assert!(matches!(
            VoxelGrid::decode(data),
            Err(WorldError::Truncated { expected: 9, .. })
        ));
    }

    #[test]
    fn test_zero_edge_rejected() {
        let mut data = sample_grid().encode();
        data[5..9].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            VoxelGrid::decode(&data),
            Err(WorldError::InvalidEdge(0))
        ));
    }

    #[test]
    fn test_payload_size_mismatch() {
        let mut data = sample_grid().encode();
        // Claim a 4³ world while the payload still holds 8³ bytes.
        data[5..9].copy_from_slice(&4u32.to_le_bytes());
        assert!(matches!(
            VoxelGrid::decode(&data),
            Err(WorldError::SizeMismatch {
                expected: 64,
                actual: 512
            })
        ));
    }

    #[test]
    fn test_corrupt_payload() {
        let mut data = sample_grid().encode();
        data.truncate(HEADER_LEN + 2);
        assert!(matches!(
            VoxelGrid::decode(&data),
            Err(WorldError::Decompress(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.qwld");
        let grid = sample_grid();
        grid.save(&path).unwrap();
        assert_eq!(VoxelGrid::load(&path).unwrap(), grid);
    }
}
