//! Terrain timing and activity counters.
//!
//! Each series keeps the last [`SAMPLE_CAPACITY`] frames. Counters are
//! monotonic totals since startup.

mod time_series;

use bevy::prelude::*;
pub use time_series::TimeSeries;

pub const SAMPLE_CAPACITY: usize = 300;

#[derive(Resource)]
pub struct TerrainMetrics {
  /// Milliseconds spent copying dirty regions into the density texture.
  pub upload_time: TimeSeries,
  /// Fixed ticks run per frame.
  pub ticks_per_frame: TimeSeries,
  /// Milliseconds spent inside the fixed tick loop.
  pub tick_time: TimeSeries,
  /// Edits that changed the field.
  pub edits_applied: u64,
  /// Edits skipped by distance gating, fill suppression or blocking.
  pub edits_skipped: u64,
  /// Region uploads that failed.
  pub sync_failures: u64,
}

impl Default for TerrainMetrics {
  fn default() -> Self {
    Self {
      upload_time: TimeSeries::new(SAMPLE_CAPACITY),
      ticks_per_frame: TimeSeries::new(SAMPLE_CAPACITY),
      tick_time: TimeSeries::new(SAMPLE_CAPACITY),
      edits_applied: 0,
      edits_skipped: 0,
      sync_failures: 0,
    }
  }
}

/// Logs a one-line summary every few seconds at debug level.
pub(crate) fn log_metrics_summary(
  time: Res<Time>,
  metrics: Res<TerrainMetrics>,
  mut since_last: Local<f32>,
) {
  *since_last += time.delta_secs();
  if *since_last < 5.0 {
    return;
  }
  *since_last = 0.0;
  debug!(
    "terrain: {:.2} ticks/frame, tick {:.2} ms, upload {:.3} ms, {} edits, {} skipped, {} sync failures",
    metrics.ticks_per_frame.avg(),
    metrics.tick_time.avg(),
    metrics.upload_time.avg(),
    metrics.edits_applied,
    metrics.edits_skipped,
    metrics.sync_failures,
  );
}
