//! Demo configuration.
//!
//! The game reads `game.config.toml` at startup; terrain tuning lives in the
//! separate file it points at and is parsed by [`TerrainConfig`].

use std::fmt;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use bevy_dirt_terrain::{ConfigError, TerrainConfig};
use serde::Deserialize;

#[derive(Resource, Deserialize, Debug, Clone)]
pub struct GameConfig {
  pub window: WindowConfig,
  pub camera: CameraConfig,
  pub ball: BallConfig,
  pub assets: AssetConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct WindowConfig {
  pub width: u32,
  pub height: u32,
  pub title: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CameraConfig {
  pub viewport_width: f32,
  pub viewport_height: f32,
  /// Follow smoothing rate; higher is snappier.
  pub smoothness: f32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BallConfig {
  pub spawn: [f32; 2],
  pub radius: f32,
  /// Force applied per tick while a move key is held.
  pub push_force: f32,
  pub restitution: f32,
  pub friction: f32,
  /// Degrees per second the gravity tilts while Q or E is held.
  pub tilt_rate: f32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AssetConfig {
  /// Path of the terrain config, relative to the game config file.
  pub terrain_config: PathBuf,
  /// Asset paths, relative to the asset root.
  pub density: String,
  pub detail: String,
  pub overlay: String,
  /// Edit mask; a disc of `brush_size` texels when absent.
  pub brush: Option<String>,
  pub brush_size: u32,
}

/// Startup configuration failure.
#[derive(Debug)]
pub enum LoadError {
  Read(PathBuf, std::io::Error),
  Parse(PathBuf, toml::de::Error),
  Terrain(PathBuf, ConfigError),
}

impl fmt::Display for LoadError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LoadError::Read(path, e) => write!(f, "failed to read {}: {e}", path.display()),
      LoadError::Parse(path, e) => write!(f, "failed to parse {}: {e}", path.display()),
      LoadError::Terrain(path, e) => write!(f, "{}: {e}", path.display()),
    }
  }
}

impl std::error::Error for LoadError {}

/// Reads the game config and the terrain config it references.
pub fn load(path: &Path) -> Result<(GameConfig, TerrainConfig), LoadError> {
  let text =
    std::fs::read_to_string(path).map_err(|e| LoadError::Read(path.to_path_buf(), e))?;
  let game: GameConfig =
    toml::from_str(&text).map_err(|e| LoadError::Parse(path.to_path_buf(), e))?;

  let terrain_path = path
    .parent()
    .unwrap_or(Path::new("."))
    .join(&game.assets.terrain_config);
  let terrain =
    TerrainConfig::load(&terrain_path).map_err(|e| LoadError::Terrain(terrain_path, e))?;
  Ok((game, terrain))
}
