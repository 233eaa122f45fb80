//! Running totals of what the session handed to the host, and a one-line
//! status summary logged periodically.

use std::sync::Arc;
use std::time::Duration;

use quarry_mesh::MeshBuffers;
use quarry_physics::{ColliderHandle, RigidBodyHandle};
use quarry_stream::{MeshId, RebuildStats, RenderSink};
use quarry_voxel::ChunkLevel;
use rustc_hash::FxHashMap;

/// Render sink that only keeps counts.
#[derive(Debug, Default)]
pub struct StatsSink {
    live: FxHashMap<MeshId, usize>,
    /// Live meshes per level, indexed by [`ChunkLevel::index`].
    per_level: [usize; ChunkLevel::ALL.len()],
    levels: FxHashMap<MeshId, ChunkLevel>,
    pub created: u64,
    pub destroyed: u64,
    pub colliders: u64,
    pub detached: u64,
    pub debris_removed: u64,
}

impl StatsSink {
    pub fn live_meshes(&self) -> usize {
        self.live.len()
    }

    pub fn live_vertices(&self) -> usize {
        self.live.values().sum()
    }

    pub fn live_at(&self, level: ChunkLevel) -> usize {
        self.per_level[level.index()]
    }

    fn retire(&mut self, id: MeshId) {
        self.live.remove(&id);
        if let Some(level) = self.levels.remove(&id) {
            self.per_level[level.index()] -= 1;
        }
    }
}

impl RenderSink for StatsSink {
    fn mesh_created(&mut self, id: MeshId, level: ChunkLevel, buffers: &Arc<MeshBuffers>) {
        self.live.insert(id, buffers.vertex_count());
        self.levels.insert(id, level);
        self.per_level[level.index()] += 1;
        self.created += 1;
    }

    fn mesh_destroyed(&mut self, id: MeshId) {
        self.retire(id);
        self.destroyed += 1;
    }

    fn collider_attached(&mut self, _id: MeshId, _collider: ColliderHandle) {
        self.colliders += 1;
    }

    fn mesh_detached(&mut self, id: MeshId, _body: RigidBodyHandle) {
        self.retire(id);
        self.detached += 1;
    }

    fn debris_removed(&mut self, _id: MeshId) {
        self.debris_removed += 1;
    }
}

/// Smoothed tick timing.
#[derive(Debug, Clone)]
pub struct Telemetry {
    /// Exponential moving average of tick time in seconds.
    tick_time_ema: f64,
    pub ticks: u64,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            tick_time_ema: 1.0 / 60.0,
            ticks: 0,
        }
    }
}

impl Telemetry {
    /// Records how long one tick took to compute.
    pub fn record(&mut self, elapsed: Duration) {
        self.ticks += 1;
        let dt = elapsed.as_secs_f64();
        // EMA with α = 0.1
        self.tick_time_ema = self.tick_time_ema * 0.9 + dt * 0.1;
    }

    pub fn tick_ms(&self) -> f64 {
        self.tick_time_ema * 1000.0
    }
}

/// Formats a status line.
///
/// Example: `TICK 120 | 3.2 ms | MESH 37 (12,345 verts) | REBUILD 4/5 | DEBRIS 2`
pub fn format_status(
    telemetry: &Telemetry,
    sink: &StatsSink,
    stats: &RebuildStats,
    debris: usize,
) -> String {
    format!(
        "TICK {} | {:.1} ms | MESH {} ({} verts) | REBUILD {}/{} | DEBRIS {}",
        telemetry.ticks,
        telemetry.tick_ms(),
        sink.live_meshes(),
        format_with_commas(sink.live_vertices() as u64),
        stats.completed,
        stats.started,
        debris,
    )
}

/// Format an integer with comma thousands separators.
fn format_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
