//! Asset loading and terrain startup.
//!
//! The density image (and optional brush) must be resident on the CPU before
//! the field can be built. Until then no terrain exists and the tick driver
//! idles; a bad image aborts the app.

use bevy::asset::LoadState;
use bevy::image::ImageLoaderSettings;
use bevy::prelude::*;
use bevy_dirt_terrain::render::repeat_sampler;
use bevy_dirt_terrain::{
  DensityField, FieldLoadError, SpawnTerrain, Stamp, TerrainConfig, TerrainUniforms,
};

use crate::ball::spawn_ball;
use crate::config::GameConfig;

/// Terrain images still in flight.
#[derive(Resource)]
pub struct PendingTerrain {
  density: Handle<Image>,
  brush: Option<Handle<Image>>,
  detail: Handle<Image>,
  overlay: Handle<Image>,
}

pub struct LoadingPlugin;

impl Plugin for LoadingPlugin {
  fn build(&self, app: &mut App) {
    app.add_systems(Startup, start_loading).add_systems(
      Update,
      finish_loading.run_if(resource_exists::<PendingTerrain>),
    );
  }
}

fn start_loading(mut commands: Commands, config: Res<GameConfig>, asset_server: Res<AssetServer>) {
  let assets = &config.assets;
  let tiled = |path: &str| {
    asset_server.load_with_settings(path.to_string(), |settings: &mut ImageLoaderSettings| {
      settings.sampler = repeat_sampler();
    })
  };

  commands.insert_resource(PendingTerrain {
    density: asset_server.load(assets.density.clone()),
    brush: assets.brush.as_ref().map(|path| asset_server.load(path.clone())),
    detail: tiled(&assets.detail),
    overlay: tiled(&assets.overlay),
  });
  info!("Loading terrain from {}", assets.density);
}

#[allow(clippy::too_many_arguments)]
fn finish_loading(
  mut commands: Commands,
  pending: Res<PendingTerrain>,
  asset_server: Res<AssetServer>,
  images: Res<Assets<Image>>,
  game: Res<GameConfig>,
  terrain: Res<TerrainConfig>,
  mut meshes: ResMut<Assets<Mesh>>,
  mut materials: ResMut<Assets<ColorMaterial>>,
  mut exit: MessageWriter<AppExit>,
) {
  let mut required = vec![&pending.density];
  required.extend(pending.brush.as_ref());
  if let Some(failed) = required
    .iter()
    .find(|handle| matches!(asset_server.load_state(handle.id()), LoadState::Failed(_)))
  {
    error!("Terrain image {:?} failed to load", failed.path());
    exit.write(AppExit::error());
    commands.remove_resource::<PendingTerrain>();
    return;
  }
  let Some(density) = images.get(&pending.density) else {
    return;
  };
  let brush = match &pending.brush {
    Some(handle) => match images.get(handle) {
      Some(image) => Some(image),
      None => return,
    },
    None => None,
  };

  match build_terrain(density, brush, &game, &terrain) {
    Ok((field, stamp)) => {
      let uniforms = TerrainUniforms {
        detail_scale: Vec2::from(terrain.detail_scale),
        overlay_scale: Vec2::from(terrain.overlay_scale),
      };
      commands.queue(
        SpawnTerrain::new(field)
          .with_stamp(stamp)
          .with_layers(pending.detail.clone(), pending.overlay.clone())
          .with_uniforms(uniforms),
      );
      spawn_ball(&mut commands, &game.ball, &mut meshes, &mut materials);
    }
    Err(e) => {
      error!("Cannot build terrain: {}", e);
      exit.write(AppExit::error());
    }
  }
  commands.remove_resource::<PendingTerrain>();
}

/// Builds the density field and edit stamp from loaded images.
pub fn build_terrain(
  density: &Image,
  brush: Option<&Image>,
  game: &GameConfig,
  terrain: &TerrainConfig,
) -> Result<(DensityField, Stamp), FieldLoadError> {
  let field = DensityField::from_image(density, terrain.field_transform(), terrain.border_density)?;
  let stamp = match brush {
    Some(image) => Stamp::from_image(image)?,
    None => Stamp::disc(game.assets.brush_size),
  };
  Ok((field, stamp))
}
