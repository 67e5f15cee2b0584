//! Terrain configuration.
//!
//! Loaded from TOML; every key is optional and falls back to
//! [`TerrainConfig::default`].
//!
//! ```toml
//! tick_hz = 240
//! max_catch_up_ticks = 24
//! texel_size = 1.0
//! origin = [0.0, 0.0]
//! stamp_radius = 25.0
//! ```

use std::fmt;
use std::path::Path;

use bevy::math::Vec2;
use bevy::prelude::*;
use serde::Deserialize;

use crate::coords::FieldTransform;

#[derive(Resource, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
  /// Fixed physics ticks per second.
  pub tick_hz: u32,
  /// Most ticks one frame may run; 0 replays every owed tick.
  pub max_catch_up_ticks: Option<u32>,
  /// World units per density texel.
  pub texel_size: f32,
  /// World position of the field's bottom-left corner.
  pub origin: [f32; 2],
  /// Density reported outside the field (1.0 = solid walls).
  pub border_density: f32,
  /// World radius of one edit stamp.
  pub stamp_radius: f32,
  /// Minimum travel of a contact between successive edits.
  pub min_edit_distance: f32,
  /// Fill edits closer than this to the actor are dropped.
  pub fill_exclusion_radius: f32,
  /// Density at or above which a new contact digs.
  pub dig_threshold: f32,
  /// Half-extent of the ensure rectangle around the actor.
  pub ensure_margin: [f32; 2],
  /// Geometry tile edge in world units.
  pub tile_size: f32,
  /// Gravity magnitude.
  pub gravity: f32,
  /// Gravity direction when no tilt is reported.
  pub fallback_gravity_dir: [f32; 2],
  /// Detail texture repeats across the terrain.
  pub detail_scale: [f32; 2],
  /// Overlay texture repeats across the terrain.
  pub overlay_scale: [f32; 2],
}

impl Default for TerrainConfig {
  fn default() -> Self {
    Self {
      tick_hz: 240,
      max_catch_up_ticks: Some(24),
      texel_size: 1.0,
      origin: [0.0, 0.0],
      border_density: 1.0,
      stamp_radius: 25.0,
      min_edit_distance: 4.0,
      fill_exclusion_radius: 40.0,
      dig_threshold: 0.5,
      ensure_margin: [128.0, 128.0],
      tile_size: 32.0,
      gravity: 980.0,
      fallback_gravity_dir: [0.0, -1.0],
      detail_scale: [8.0, 8.0],
      overlay_scale: [2.0, 2.0],
    }
  }
}

#[derive(Debug)]
pub enum ConfigError {
  Io(std::io::Error),
  Parse(toml::de::Error),
  Invalid(String),
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Io(e) => write!(f, "failed to read terrain config: {e}"),
      ConfigError::Parse(e) => write!(f, "failed to parse terrain config: {e}"),
      ConfigError::Invalid(msg) => write!(f, "invalid terrain config: {msg}"),
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ConfigError::Io(e) => Some(e),
      ConfigError::Parse(e) => Some(e),
      ConfigError::Invalid(_) => None,
    }
  }
}

impl From<std::io::Error> for ConfigError {
  fn from(e: std::io::Error) -> Self {
    ConfigError::Io(e)
  }
}

impl From<toml::de::Error> for ConfigError {
  fn from(e: toml::de::Error) -> Self {
    ConfigError::Parse(e)
  }
}

impl TerrainConfig {
  /// Parses and validates a TOML document.
  pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
    let config: TerrainConfig = toml::from_str(s)?;
    config.validate()?;
    Ok(config)
  }

  /// Reads, parses and validates a TOML file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    Self::from_toml_str(&text)
  }

  /// Rejects values the engine cannot run with.
  ///
  pub fn validate(&self) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::Invalid(msg.into()));
    if self.tick_hz == 0 {
      return invalid("tick_hz must be positive");
    }
    if !positive(self.texel_size) {
      return invalid("texel_size must be positive and finite");
    }
    if !positive(self.tile_size) {
      return invalid("tile_size must be positive and finite");
    }
    if !positive(self.stamp_radius) {
      return invalid("stamp_radius must be positive and finite");
    }
    if !(0.0..=1.0).contains(&self.border_density) {
      return invalid("border_density must be within 0..=1");
    }
    if !(0.0..=1.0).contains(&self.dig_threshold) {
      return invalid("dig_threshold must be within 0..=1");
    }
    if !non_negative(self.min_edit_distance) {
      return invalid("min_edit_distance must not be negative");
    }
    if !non_negative(self.fill_exclusion_radius) {
      return invalid("fill_exclusion_radius must not be negative");
    }
    if !self.ensure_margin.into_iter().all(non_negative) {
      return invalid("ensure_margin must not be negative");
    }
    Ok(())
  }

  /// Catch-up bound for the simulation clock; `None` when unbounded.
  pub fn catch_up_limit(&self) -> Option<u32> {
    self.max_catch_up_ticks.filter(|&ticks| ticks > 0)
  }

  pub fn field_transform(&self) -> FieldTransform {
    FieldTransform::new(self.texel_size, Vec2::from(self.origin))
  }

  pub fn ensure_margin(&self) -> Vec2 {
    Vec2::from(self.ensure_margin)
  }

  pub fn fallback_gravity_dir(&self) -> Vec2 {
    Vec2::from(self.fallback_gravity_dir)
  }
}

/// Finite and greater than zero; NaN fails.
fn positive(v: f32) -> bool {
  v.is_finite() && v > 0.0
}

fn non_negative(v: f32) -> bool {
  v.is_finite() && v >= 0.0
}
