//! Fixed-tick accumulator.
//!
//! Frame time arrives in variable steps; physics only ever advances in whole
//! ticks of constant length. All arithmetic is on [`Duration`] (integer
//! nanoseconds) so identical `dt` sequences always yield identical tick
//! counts.
//!
//! Catch-up after a stall is bounded: when the accumulator would hold more
//! than `max_catch_up_ticks` ticks, the excess is dropped (and counted in
//! [`SimulationClock::dropped`]). Dropping keeps the frame bounded at the cost
//! of simulated time falling behind wall time, so runs that stall differ from
//! runs that do not. With no bound every tick is replayed.

use std::time::Duration;

use bevy::prelude::*;

const NANOS_PER_SEC: u64 = 1_000_000_000;

#[derive(Resource, Clone, Debug, PartialEq, Eq)]
pub struct SimulationClock {
  tick: Duration,
  accumulator: Duration,
  elapsed: Duration,
  ticks: u64,
  max_catch_up_ticks: Option<u32>,
  dropped: Duration,
}

impl SimulationClock {
  /// Clock ticking `hz` times per simulated second.
  ///
  /// The tick length is truncated to whole nanoseconds.
  ///
  /// # Panics
  /// Panics if `hz` is zero.
  pub fn from_hz(hz: u32) -> Self {
    assert!(hz > 0, "tick rate must be positive");
    Self::from_tick(Duration::from_nanos(NANOS_PER_SEC / hz as u64))
  }

  /// Clock with an explicit tick length.
  ///
  /// # Panics
  /// Panics if `tick` is zero.
  pub fn from_tick(tick: Duration) -> Self {
    assert!(!tick.is_zero(), "tick length must be positive");
    Self {
      tick,
      accumulator: Duration::ZERO,
      elapsed: Duration::ZERO,
      ticks: 0,
      max_catch_up_ticks: None,
      dropped: Duration::ZERO,
    }
  }

  /// Bounds the number of ticks one frame may owe. `None` is unbounded.
  pub fn with_max_catch_up(mut self, max_ticks: Option<u32>) -> Self {
    self.max_catch_up_ticks = max_ticks;
    self
  }

  #[inline]
  pub fn tick(&self) -> Duration {
    self.tick
  }

  /// Unconsumed frame time.
  #[inline]
  pub fn accumulator(&self) -> Duration {
    self.accumulator
  }

  /// Total simulated time; always a whole multiple of the tick.
  #[inline]
  pub fn elapsed(&self) -> Duration {
    self.elapsed
  }

  /// Ticks completed since creation.
  #[inline]
  pub fn ticks(&self) -> u64 {
    self.ticks
  }

  /// Frame time discarded by the catch-up bound.
  #[inline]
  pub fn dropped(&self) -> Duration {
    self.dropped
  }

  /// Adds one frame's elapsed time.
  pub fn accumulate(&mut self, dt: Duration) {
    self.accumulator += dt;
    if let Some(max) = self.max_catch_up_ticks {
      let limit = self.tick * max;
      if self.accumulator > limit {
        let excess = self.accumulator - limit;
        debug!(
          "Simulation fell behind by {:.1} ms; dropping excess",
          excess.as_secs_f64() * 1000.0
        );
        self.dropped += excess;
        self.accumulator = limit;
      }
    }
  }

  /// True while at least one whole tick is owed.
  #[inline]
  pub fn tick_due(&self) -> bool {
    self.accumulator >= self.tick
  }

  /// Consumes one tick after it ran.
  ///
  /// # Panics
  /// Panics if no tick was due.
  pub fn complete_tick(&mut self) {
    assert!(self.tick_due(), "completed a tick that was not due");
    self.accumulator -= self.tick;
    self.elapsed += self.tick;
    self.ticks += 1;
  }

  /// Accumulates `dt` and drains every due tick, calling `step` once per
  /// tick. Returns the number of ticks run.
  pub fn advance(&mut self, dt: Duration, mut step: impl FnMut(Duration)) -> u32 {
    self.accumulate(dt);
    let mut ran = 0;
    while self.tick_due() {
      step(self.tick);
      self.complete_tick();
      ran += 1;
    }
    ran
  }
}

impl Default for SimulationClock {
  fn default() -> Self {
    Self::from_hz(240)
  }
}
