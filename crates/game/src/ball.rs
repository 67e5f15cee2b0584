//! The rolling ball: the one tracked actor.
//!
//! The physics body carries [`TrackedActor`] so the geometry window follows
//! it; a separate mesh entity with [`ActorVisual`] is resynced from it once
//! per frame.

use bevy::prelude::*;
use bevy_dirt_terrain::{
  ActorVisual, GravitySource, TerrainConfig, TerrainSet, TerrainTick, TickSet, TrackedActor,
};
use bevy_rapier2d::prelude::*;

use crate::config::{BallConfig, GameConfig};

/// Marker for the ball's physics body.
#[derive(Component)]
pub struct Ball {
  pub push_force: f32,
}

pub struct BallPlugin;

impl Plugin for BallPlugin {
  fn build(&self, app: &mut App) {
    app
      .add_systems(TerrainTick, push_ball.in_set(TickSet::Control))
      .add_systems(Update, tilt_gravity.in_set(TerrainSet::Input));
  }
}

pub fn spawn_ball(
  commands: &mut Commands,
  config: &BallConfig,
  meshes: &mut Assets<Mesh>,
  materials: &mut Assets<ColorMaterial>,
) {
  let spawn = Vec2::from(config.spawn);

  let body = commands
    .spawn((
      Ball {
        push_force: config.push_force,
      },
      TrackedActor {
        radius: config.radius,
      },
      Transform::from_translation(spawn.extend(0.0)),
      RigidBody::Dynamic,
      Collider::ball(config.radius),
      Restitution::coefficient(config.restitution),
      Friction::coefficient(config.friction),
      ExternalForce::default(),
      Velocity::zero(),
      Ccd::enabled(),
      Sleeping::default(),
    ))
    .id();

  commands.spawn((
    ActorVisual { follows: body },
    Mesh2d(meshes.add(Circle::new(config.radius))),
    MeshMaterial2d(materials.add(Color::srgb(0.85, 0.3, 0.2))),
    Transform::from_translation(spawn.extend(1.0)),
  ));
  info!("Ball spawned at {:?}", spawn);
}

/// Signed horizontal input from the keyboard.
fn horizontal_axis(keys: &ButtonInput<KeyCode>) -> f32 {
  let left = keys.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]);
  let right = keys.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]);
  (right as i8 - left as i8) as f32
}

/// Tick system: sets this tick's push force from held keys.
fn push_ball(
  keys: Option<Res<ButtonInput<KeyCode>>>,
  mut balls: Query<(&Ball, &mut ExternalForce)>,
) {
  let axis = keys.map_or(0.0, |keys| horizontal_axis(&keys));
  for (ball, mut force) in &mut balls {
    force.force = Vec2::new(axis * ball.push_force, 0.0);
  }
}

/// Rotates the gravity tilt while Q or E is held; R clears it.
fn tilt_gravity(
  time: Res<Time>,
  keys: Res<ButtonInput<KeyCode>>,
  game: Res<GameConfig>,
  terrain: Res<TerrainConfig>,
  mut source: ResMut<GravitySource>,
) {
  if keys.just_pressed(KeyCode::KeyR) {
    source.tilt = None;
    return;
  }
  let turn = keys.pressed(KeyCode::KeyE) as i8 - keys.pressed(KeyCode::KeyQ) as i8;
  if turn == 0 {
    return;
  }
  let angle = (turn as f32) * game.ball.tilt_rate.to_radians() * time.delta_secs();
  let current = source.tilt.unwrap_or(terrain.fallback_gravity_dir());
  source.tilt = Some(Vec2::from_angle(angle).rotate(current));
}
