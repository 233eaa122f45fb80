//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments shared by the runtime binaries.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "quarry", about = "LOD voxel streaming with mining")]
pub struct CliArgs {
    /// `QWLD` world file to load.
    #[arg(long)]
    pub world: Option<PathBuf>,

    /// Worker thread count (0 = CPUs - 1).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref path) = args.world {
            self.world.path = Some(path.clone());
        }
        if let Some(threads) = args.threads {
            self.workers.threads = threads;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            world: Some(PathBuf::from("big.qwld")),
            threads: Some(2),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.world.path, Some(PathBuf::from("big.qwld")));
        assert_eq!(config.workers.threads, 2);
        // Non-overridden fields retain defaults
        assert_eq!(config.debug.log_level, "info");
        assert_eq!(config.workers.grain, 128);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::try_parse_from([
            "quarry",
            "--threads",
            "4",
            "--log-level",
            "debug",
            "--config",
            "/tmp/q",
        ])
        .unwrap();
        assert_eq!(args.threads, Some(4));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/q")));
        assert!(args.world.is_none());
    }
}
