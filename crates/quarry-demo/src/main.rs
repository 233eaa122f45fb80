//! Headless fly-over of a voxel world.
//!
//! Loads a `QWLD` world (or generates a rolling terrain fixture), then flies a camera
//! in a circle above it for a fixed number of ticks. The session streams LOD
//! meshes around the camera, and every few seconds the camera mines the voxel
//! straight below it. Progress is logged as a one-line status.
//!
//! Run with: `cargo run -p quarry-demo -- --edge 256 --ticks 1200`

mod flight;
mod report;
mod terrain;

use std::time::{Duration, Instant};

use clap::Parser;
use quarry_config::{CliArgs, Config, ConfigError, default_config_dir};
use quarry_mesh::CubeTemplate;
use quarry_stream::{SessionError, WorldSession};
use quarry_voxel::ChunkLevel;
use tracing::{error, info};

use crate::flight::FlightPath;
use crate::report::{StatsSink, Telemetry, format_status};

/// CLI arguments for the demo binary.
#[derive(Parser, Debug)]
#[command(name = "quarry-demo", about = "Headless LOD voxel streaming fly-over")]
struct DemoArgs {
    #[command(flatten)]
    common: CliArgs,

    /// Edge of the generated world when no world file is given.
    #[arg(long, default_value_t = 256)]
    edge: usize,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 1200)]
    ticks: u32,

    /// Simulated time per tick in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Ticks between mining picks (0 disables mining).
    #[arg(long, default_value_t = 180)]
    mine_every: u32,

    /// Ticks between status lines.
    #[arg(long, default_value_t = 120)]
    report_every: u32,
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

fn main() {
    let args = DemoArgs::parse();

    let mut config = match load_config(&args.common) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("quarry-demo: {e}");
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args.common);

    // Initialize structured logging.
    let log_dir = args.common.config.clone().map(|dir| dir.join("logs"));
    quarry_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    if let Err(e) = run(&args, &config) {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Config from `--config`, the platform config directory, or defaults.
fn load_config(args: &CliArgs) -> Result<Config, ConfigError> {
    match args.config.clone().or_else(default_config_dir) {
        Some(dir) => Config::load_or_create(&dir),
        None => Ok(Config::default()),
    }
}

/// Smallest coarse level that still meshes at cube size 4.
const MIN_ROOT_EDGE: u32 = 4;

/// Coarse level that fits the generated world: the world edge, kept
/// between 4 and 256.
fn generated_root_level(edge: usize) -> ChunkLevel {
    let edge = (edge.next_power_of_two() as u32)
        .clamp(MIN_ROOT_EDGE, ChunkLevel::COARSEST.edge_cubes());
    ChunkLevel::from_edge(edge).unwrap_or(ChunkLevel::COARSEST)
}

fn run(args: &DemoArgs, config: &Config) -> Result<(), DemoError> {
    let mut config = config.clone();
    let mut session = match config.world.path {
        Some(_) => WorldSession::open(&config, StatsSink::default())?,
        None => {
            let grid = terrain::generate(args.edge);
            let coarse = generated_root_level(args.edge).edge_cubes();
            config.lod.coarse_level = config.lod.coarse_level.min(coarse);
            config.lod.sync_level = config.lod.sync_level.min(config.lod.coarse_level);
            WorldSession::init(&config, grid, CubeTemplate::unit(), StatsSink::default())?
        }
    };
    let edge = session.grid().edge();
    info!("Quarry demo: {edge}^3 world, {} ticks", args.ticks);

    let path = FlightPath::for_world(edge);
    let dt = Duration::from_millis(args.tick_ms);
    let mut telemetry = Telemetry::default();
    let mut mined = 0u32;

    for tick in 0..args.ticks {
        let pose = path.pose_at(tick as f32 * dt.as_secs_f32());

        if args.mine_every > 0
            && tick > 0
            && tick % args.mine_every == 0
            && let Some(ray) = path.mining_ray(&pose)
            && let Some(hit) = session.pick(&ray)
        {
            mined += 1;
            info!("Mining voxel {} ({:.1} below the camera)", hit.voxel, hit.distance);
        }

        let started = Instant::now();
        session.tick(dt, pose);
        telemetry.record(started.elapsed());

        if args.report_every > 0 && (tick + 1) % args.report_every == 0 {
            info!(
                "{}",
                format_status(&telemetry, session.sink(), session.stats(), session.debris_count())
            );
        }
    }

    let stats = *session.stats();
    let finest = session.sink().live_at(ChunkLevel::FINEST);
    let sink = session.shutdown();
    info!(
        "Done: {} picks, {} meshes created, {} destroyed, {} detached, {} finest-level meshes at exit; {:?}",
        mined, sink.created, sink.destroyed, sink.detached, finest, stats
    );
    Ok(())
}
