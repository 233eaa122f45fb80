//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World and asset locations.
    pub world: WorldConfig,
    /// LOD thresholds.
    pub lod: LodConfig,
    /// Rebuild triggering and pacing.
    pub stream: StreamConfig,
    /// Interest points and debris.
    pub mining: MiningConfig,
    /// Worker pool sizing.
    pub workers: WorkersConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// World and asset locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// `QWLD` voxel file. `None` lets the host supply a grid.
    pub path: Option<PathBuf>,
    /// `QCUB` cube template. `None` uses the built-in unit cube.
    pub template: Option<PathBuf>,
    /// Number of coarse roots per axis, placed from the origin.
    /// `None` tiles the whole world.
    pub root_grid: Option<[u32; 3]>,
}

/// LOD thresholds. Levels are given as cubes per edge (1, 2, 4 … 256).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Level of the root nodes; nodes at or above it mesh at reduced resolution.
    pub coarse_level: u32,
    /// Coarse nodes closer than this subdivide.
    pub subdivide_distance: f32,
    /// Coarse nodes closer than this mesh at cube size 2, farther at 4.
    pub size2_distance: f32,
    /// Roots behind the camera and farther than this are skipped.
    pub cull_distance: f32,
    /// Bounds expansion when looking for interest points.
    pub interest_margin: f32,
    /// Bounds expansion when selecting voxels to excavate.
    pub excavation_margin: f32,
    /// Children at or below this level are processed without yielding.
    pub sync_level: u32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            coarse_level: 256,
            subdivide_distance: 512.0,
            size2_distance: 768.0,
            cull_distance: 256.0,
            interest_margin: 3.0,
            excavation_margin: 2.0,
            sync_level: 16,
        }
    }
}

/// Rebuild triggering and pacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Edge of the grid cells whose crossing triggers a rebuild.
    pub grid_cell_size: f32,
    /// How often the camera cell is checked, in milliseconds.
    pub check_interval_ms: u64,
    /// Work items processed per tick.
    pub nodes_per_step: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            grid_cell_size: 128.0,
            check_interval_ms: 1000,
            nodes_per_step: 64,
        }
    }
}

impl StreamConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

/// Interest points and debris.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MiningConfig {
    /// Interest points kept; the oldest is dropped past this.
    pub max_interest_points: usize,
    /// How long mined debris stays in the world, in milliseconds.
    pub debris_lifetime_ms: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            max_interest_points: 10,
            debris_lifetime_ms: 30_000,
        }
    }
}

impl MiningConfig {
    pub fn debris_lifetime(&self) -> Duration {
        Duration::from_millis(self.debris_lifetime_ms)
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkersConfig {
    /// Worker threads. 0 uses one less than the number of CPUs.
    pub threads: usize,
    /// Cells per unit of work in the meshing passes.
    pub grain: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            grain: 128,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Platform config directory for this application, if the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("quarry"))
}

// --- Validation ---

impl Config {
    /// Checks values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = |field: &'static str, edge: u32| {
            if edge.is_power_of_two() && edge <= 256 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("{edge} is not a power of two up to 256"),
                })
            }
        };
        level("lod.coarse_level", self.lod.coarse_level)?;
        level("lod.sync_level", self.lod.sync_level)?;
        // Coarse roots mesh at cube size 4, which needs a level two steps finer.
        if self.lod.coarse_level < 4 {
            return Err(ConfigError::Invalid {
                field: "lod.coarse_level",
                reason: format!("{} is below the minimum of 4", self.lod.coarse_level),
            });
        }
        if self.lod.sync_level > self.lod.coarse_level {
            return Err(ConfigError::Invalid {
                field: "lod.sync_level",
                reason: format!(
                    "{} is coarser than lod.coarse_level {}",
                    self.lod.sync_level, self.lod.coarse_level
                ),
            });
        }
        if self.stream.nodes_per_step == 0 {
            return Err(ConfigError::Invalid {
                field: "stream.nodes_per_step",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.workers.grain == 0 {
            return Err(ConfigError::Invalid {
                field: "workers.grain",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(grid) = self.world.root_grid
            && grid.contains(&0)
        {
            return Err(ConfigError::Invalid {
                field: "world.root_grid",
                reason: format!("{grid:?} has an empty axis"),
            });
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
