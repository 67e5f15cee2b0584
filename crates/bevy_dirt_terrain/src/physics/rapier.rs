//! Rapier2d adapter.
//!
//! Rapier runs inside [`TerrainTick`] with a fixed timestep equal to the
//! simulation tick, so the solver never sees a variable `dt`. Tile colliders
//! follow the [`TileLedger`]: tiles built by an ensure get a fresh compound
//! collider, tiles that were invalidated or left the window lose theirs.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use super::{TileCollider, TileColliderRegistry};
use crate::clock::SimulationClock;
use crate::driver::{TerrainSet, TerrainTick, TickSet, ensure_geometry_window, update_gravity};
use crate::geometry::{TileLedger, solid_boxes};
use crate::gravity::TerrainGravity;
use crate::terrain::Terrain;

/// Steps rapier2d from the terrain's fixed tick.
///
/// Add after `DirtTerrainPlugin` so the tick length is known.
pub struct RapierTerrainPlugin {
  pub pixels_per_meter: f32,
}

impl Default for RapierTerrainPlugin {
  fn default() -> Self {
    Self {
      pixels_per_meter: 50.0,
    }
  }
}

impl Plugin for RapierTerrainPlugin {
  fn build(&self, app: &mut App) {
    let tick = match app.world().get_resource::<SimulationClock>() {
      Some(clock) => clock.tick(),
      None => {
        warn!("RapierTerrainPlugin added before DirtTerrainPlugin; assuming 240 Hz");
        SimulationClock::default().tick()
      }
    };

    app
      .add_plugins(
        RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(self.pixels_per_meter)
          .in_schedule(TerrainTick),
      )
      .insert_resource(TimestepMode::Fixed {
        dt: tick.as_secs_f32(),
        substeps: 1,
      })
      .init_resource::<TileColliderRegistry>()
      .configure_sets(
        TerrainTick,
        (
          PhysicsSet::SyncBackend,
          PhysicsSet::StepSimulation,
          PhysicsSet::Writeback,
        )
          .in_set(TickSet::Physics),
      )
      .add_systems(
        TerrainTick,
        sync_tile_colliders
          .in_set(TickSet::Ensure)
          .after(ensure_geometry_window),
      )
      .add_systems(
        Update,
        apply_terrain_gravity
          .in_set(TerrainSet::Gravity)
          .after(update_gravity),
      );
  }
}

/// Copies [`TerrainGravity`] into every rapier context.
fn apply_terrain_gravity(
  gravity: Res<TerrainGravity>,
  mut configs: Query<&mut RapierConfiguration>,
) {
  for mut config in &mut configs {
    if config.gravity != gravity.0 {
      config.gravity = gravity.0;
    }
  }
}

/// Compound collider for the solid texels of one tile, in tile-local space.
fn build_tile_collider(terrain: &Terrain, origin: Vec2, bounds: Rect) -> Option<Collider> {
  let shapes: Vec<(Vec2, f32, Collider)> = solid_boxes(terrain.field(), bounds)
    .into_iter()
    .map(|b| {
      let half = b.half_size();
      (b.center() - origin, 0.0, Collider::cuboid(half.x, half.y))
    })
    .collect();
  if shapes.is_empty() {
    return None;
  }
  Some(Collider::compound(shapes))
}

/// Wakes sleeping bodies within one tile of a rebuilt tile.
fn wake_bodies_near(
  rebuilt: &[Rect],
  tile_size: f32,
  sleeping_bodies: &mut Query<(&Transform, &mut Sleeping), With<RigidBody>>,
) {
  if rebuilt.is_empty() {
    return;
  }
  for (transform, mut sleeping) in sleeping_bodies.iter_mut() {
    if !sleeping.sleeping {
      continue;
    }
    let pos = transform.translation.truncate();
    if rebuilt.iter().any(|r| r.inflate(tile_size).contains(pos)) {
      sleeping.sleeping = false;
    }
  }
}

/// System (per tick): reconciles tile colliders with the ledger.
fn sync_tile_colliders(
  mut commands: Commands,
  terrain: Option<Res<Terrain>>,
  mut ledger: ResMut<TileLedger>,
  mut registry: ResMut<TileColliderRegistry>,
  mut sleeping_bodies: Query<(&Transform, &mut Sleeping), With<RigidBody>>,
) {
  let Some(terrain) = terrain else {
    return;
  };

  let evicted = ledger.take_evicted();
  if !evicted.is_empty() {
    trace!("{} geometry tiles left the window", evicted.len());
  }

  // Drop colliders whose tile was invalidated, rebuilt or evicted.
  registry.entities.retain(|tile, (entity, generation)| {
    let keep = ledger.generation_of(*tile) == Some(*generation);
    if !keep {
      commands.entity(*entity).despawn();
    }
    keep
  });

  let mut rebuilt = Vec::new();
  for tile in ledger.take_regenerated() {
    let Some(generation) = ledger.generation_of(tile) else {
      continue;
    };
    if registry.entities.contains_key(&tile) {
      continue;
    }
    let bounds = ledger.tile_rect(tile);
    rebuilt.push(bounds);
    let Some(collider) = build_tile_collider(&terrain, bounds.min, bounds) else {
      continue;
    };
    let entity = commands
      .spawn((
        RigidBody::Fixed,
        collider,
        Transform::from_translation(bounds.min.extend(0.0)),
        TileCollider { tile, generation },
      ))
      .id();
    registry.entities.insert(tile, (entity, generation));
  }

  wake_bodies_near(&rebuilt, ledger.tile_size(), &mut sleeping_bodies);
}
