use bevy::{camera::ScalingMode, prelude::*};
use bevy_dirt_terrain::{ActorVisual, Terrain, TerrainCamera, TerrainSet};

use crate::config::GameConfig;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
  fn build(&self, app: &mut App) {
    app
      .add_systems(Startup, setup_camera)
      .add_systems(Update, camera_follow.after(TerrainSet::Resync));
  }
}

/// Orthographic 2D camera; also the one touches are mapped through.
fn setup_camera(mut commands: Commands, config: Res<GameConfig>) {
  commands.spawn((
    TerrainCamera,
    Camera2d,
    Camera {
      clear_color: ClearColorConfig::Custom(Color::srgb(0.45, 0.65, 0.85)),
      ..default()
    },
    Projection::Orthographic(OrthographicProjection {
      near: -1000.0,
      far: 1000.0,
      scale: 1.0,
      viewport_origin: Vec2::new(0.5, 0.5),
      scaling_mode: ScalingMode::AutoMin {
        min_width: config.camera.viewport_width,
        min_height: config.camera.viewport_height,
      },
      area: Rect::default(),
    }),
  ));
}

/// Eases toward the ball's visual, kept inside the terrain bounds.
fn camera_follow(
  time: Res<Time>,
  config: Res<GameConfig>,
  terrain: Option<Res<Terrain>>,
  visuals: Query<&Transform, (With<ActorVisual>, Without<TerrainCamera>)>,
  mut cameras: Query<&mut Transform, With<TerrainCamera>>,
) {
  let (Ok(target), Ok(mut camera)) = (visuals.single(), cameras.single_mut()) else {
    return;
  };
  let mut goal = target.translation.truncate();
  if let Some(terrain) = terrain {
    let bounds = terrain.world_bounds();
    goal = goal.clamp(bounds.min, bounds.max);
  }

  let t = 1.0 - (-config.camera.smoothness * time.delta_secs()).exp();
  let position = camera.translation.truncate().lerp(goal, t);
  camera.translation = position.extend(camera.translation.z);
}
