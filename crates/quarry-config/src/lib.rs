//! Configuration for the voxel streaming runtime.
//!
//! Settings persist to disk as RON files and can be overridden from the
//! command line. Every section falls back to defaults for missing fields, so
//! older config files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, LodConfig, MiningConfig, StreamConfig, WorkersConfig, WorldConfig,
    default_config_dir,
};
pub use error::ConfigError;
