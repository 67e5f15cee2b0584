//! Gravity direction for the physics step.
//!
//! An external layer (accelerometer, debug UI) may report a tilt vector in
//! [`GravitySource`]; otherwise the configured fallback direction is used.
//! The result lands in [`TerrainGravity`] once per frame, before the fixed
//! ticks run.

use bevy::math::Vec2;
use bevy::prelude::*;

/// Tilt shorter than this is treated as "no reading".
const MIN_TILT: f32 = 1e-3;

/// Latest device tilt, written by the input layer.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct GravitySource {
  pub tilt: Option<Vec2>,
}

/// Gravity vector handed to the physics collaborator.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct TerrainGravity(pub Vec2);

/// Gravity from an optional tilt reading.
pub fn resolve_gravity(tilt: Option<Vec2>, fallback_dir: Vec2, magnitude: f32) -> Vec2 {
  let dir = tilt
    .filter(|t| t.length() > MIN_TILT)
    .unwrap_or(fallback_dir)
    .normalize_or(Vec2::NEG_Y);
  dir * magnitude
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn no_tilt_uses_fallback() {
    let g = resolve_gravity(None, Vec2::new(0.0, -2.0), 980.0);
    assert_eq!(g, Vec2::new(0.0, -980.0));
  }

  #[test]
  fn tilt_sets_direction_only() {
    let g = resolve_gravity(Some(Vec2::new(3.0, -4.0)), Vec2::NEG_Y, 10.0);
    assert!((g - Vec2::new(6.0, -8.0)).length() < 1e-5);
  }

  #[test]
  fn tiny_tilt_is_ignored() {
    let g = resolve_gravity(Some(Vec2::new(1e-5, 0.0)), Vec2::NEG_Y, 1.0);
    assert_eq!(g, Vec2::NEG_Y);
  }

  #[test]
  fn zero_fallback_points_down() {
    let g = resolve_gravity(None, Vec2::ZERO, 5.0);
    assert_eq!(g, Vec2::new(0.0, -5.0));
  }
}
