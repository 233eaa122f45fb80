//! Periodic check for the camera crossing a coarse grid cell.

use std::time::Duration;

use glam::{IVec3, Vec3};

/// Edge of a watched grid cell in world units.
pub const DEFAULT_CELL_SIZE: f32 = 128.0;
/// Time between camera cell checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Reports when the camera has moved into a different grid cell since the
/// last check. Checks run only when the interval has elapsed.
#[derive(Clone, Debug)]
pub struct GridWatcher {
    cell_size: f32,
    interval: Duration,
    elapsed: Duration,
    last_cell: Option<IVec3>,
}

impl GridWatcher {
    pub fn new(cell_size: f32, interval: Duration) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            interval,
            elapsed: Duration::ZERO,
            last_cell: None,
        }
    }

    pub fn cell_of(&self, position: Vec3) -> IVec3 {
        (position / self.cell_size).floor().as_ivec3()
    }

    /// Advances the timer. Returns `true` when a check ran and the camera
    /// is in a new cell. The first check only records the cell.
    pub fn tick(&mut self, dt: Duration, position: Vec3) -> bool {
        self.elapsed += dt;
        if self.elapsed < self.interval {
            return false;
        }
        self.elapsed = Duration::ZERO;

        let cell = self.cell_of(position);
        let changed = self.last_cell.is_some_and(|last| last != cell);
        self.last_cell = Some(cell);
        if changed {
            tracing::debug!("Camera entered grid cell {cell}");
        }
        changed
    }
}

impl Default for GridWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE, DEFAULT_CHECK_INTERVAL)
    }
}
