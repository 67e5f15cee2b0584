mod ball;
mod camera;
mod config;
mod loading;

use std::path::PathBuf;

use bevy::{prelude::*, window::WindowResolution};
use bevy_dirt_terrain::{DirtTerrainPlugin, RapierTerrainPlugin};
use clap::Parser;

/// Deformable dirt terrain with a rolling ball.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
  /// Game config file.
  #[arg(long, default_value = "assets/config/game.config.toml")]
  config: PathBuf,

  /// Ticks per second, overriding the terrain config.
  #[arg(long)]
  tick_hz: Option<u32>,
}

fn main() -> AppExit {
  let args = Args::parse();
  let (game, mut terrain) = match config::load(&args.config) {
    Ok(configs) => configs,
    Err(e) => {
      eprintln!("{e}");
      return AppExit::error();
    }
  };
  if let Some(hz) = args.tick_hz {
    terrain.tick_hz = hz;
  }

  let mut app = App::new();
  app
    .add_plugins(
      DefaultPlugins
        .set(WindowPlugin {
          primary_window: Some(Window {
            resolution: WindowResolution::new(game.window.width, game.window.height),
            title: game.window.title.clone(),
            ..default()
          }),
          ..default()
        })
        .disable::<bevy::pbr::PbrPlugin>(),
    )
    .add_plugins(DirtTerrainPlugin::new(terrain))
    .add_plugins(RapierTerrainPlugin::default())
    .insert_resource(game)
    .add_plugins((
      loading::LoadingPlugin,
      camera::CameraPlugin,
      ball::BallPlugin,
    ));

  app.run()
}
