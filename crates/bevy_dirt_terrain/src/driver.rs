//! Frame composition.
//!
//! Once per frame, in [`Update`], chained in [`TerrainSet`] order:
//!
//! 1. **Input** - touches and mouse become [`PendingEdits`].
//! 2. **Edit** - pending edits paint the field; each dirty region invalidates
//!    its geometry tiles and is queued for upload.
//! 3. **Sync** - queued regions are staged for the density texture; the
//!    render world writes them into the GPU texture.
//! 4. **Gravity** - [`TerrainGravity`] is recomputed.
//! 5. **Ticks** - the [`TerrainTick`] schedule runs once per whole tick owed
//!    by the [`SimulationClock`].
//! 6. **Resync** - [`ActorVisual`]s copy their physics body's transform.
//!
//! Inside each tick the [`TickSet`]s run Ensure, then Control, then Physics,
//! so the geometry window always covers the actor position the solver is
//! about to step from.

use std::time::Duration;

use bevy::ecs::query::QuerySingleError;
use bevy::ecs::schedule::ScheduleLabel;
use bevy::prelude::*;
// WASM compat: std::time::Instant panics on wasm32
use web_time::Instant;

use crate::clock::SimulationClock;
use crate::config::TerrainConfig;
use crate::contact::{ContactTracker, PendingEdits, fill_blocked, nearest_point_on_actor};
use crate::diagnostics::TerrainMetrics;
use crate::geometry::{GeometryWindow, TileLedger, ensure_rect_around};
use crate::gravity::{GravitySource, TerrainGravity, resolve_gravity};
use crate::render::{SyncError, TextureSync};
use crate::terrain::{ActorVisual, DirtyRegions, EditBlocked, Terrain, TrackedActor};

/// Schedule run once per fixed tick.
#[derive(ScheduleLabel, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TerrainTick;

/// Per-frame stages of the terrain, chained in declaration order.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TerrainSet {
  Input,
  Edit,
  Sync,
  Gravity,
  Ticks,
  Resync,
}

/// Per-tick stages inside [`TerrainTick`], chained in declaration order.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TickSet {
  /// Geometry window around the tracked actor is made current.
  Ensure,
  /// Game logic applying forces for this tick.
  Control,
  /// The rigid-body step.
  Physics,
}

/// System: applies [`PendingEdits`] to the field.
///
/// Requests closer than `min_edit_distance` to their contact's previous edit
/// are skipped, as are fills near the tracked actor. Every applied edit marks
/// its world rectangle dirty in the [`TileLedger`] before any tick of this
/// frame ensures the window again.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_pending_edits(
  config: Res<TerrainConfig>,
  terrain: Option<ResMut<Terrain>>,
  blocked: Option<Res<EditBlocked>>,
  mut pending: ResMut<PendingEdits>,
  mut tracker: ResMut<ContactTracker>,
  mut ledger: ResMut<TileLedger>,
  mut dirty: ResMut<DirtyRegions>,
  mut metrics: ResMut<TerrainMetrics>,
  actors: Query<(&Transform, &TrackedActor)>,
  mut warned: Local<bool>,
) {
  let Some(mut terrain) = terrain else {
    pending.drain();
    return;
  };
  if blocked.is_some_and(|b| b.blocked) {
    metrics.edits_skipped += pending.len() as u64;
    pending.drain();
    return;
  }

  let actor = single_actor(actors.single(), &mut warned);
  for request in pending.drain() {
    if !tracker.far_enough(&request, config.min_edit_distance) {
      metrics.edits_skipped += 1;
      continue;
    }
    let nearest = actor.map(|(transform, tracked)| {
      nearest_point_on_actor(transform.translation.truncate(), tracked.radius, request.world)
    });
    if fill_blocked(
      request.mode,
      request.world,
      nearest,
      config.fill_exclusion_radius,
    ) {
      trace!("Fill at {:?} suppressed near actor", request.world);
      metrics.edits_skipped += 1;
      continue;
    }

    let region = terrain.paint(request.world, config.stamp_radius, request.mode);
    tracker.record_edit(&request);
    if region.is_empty() {
      continue;
    }
    ledger.mark_dirty_rect(terrain.field().region_world_rect(&region));
    dirty.push(region);
    metrics.edits_applied += 1;
  }
}

/// System: stages queued dirty regions for upload into the density texture.
///
/// Only the dirty rows are copied; the render world writes them into the
/// GPU texture. Failures are logged and counted; the texture stays stale for
/// that region until a later edit covers it again.
pub(crate) fn sync_dirty_regions(
  terrain: Option<Res<Terrain>>,
  mut dirty: ResMut<DirtyRegions>,
  images: Option<Res<Assets<Image>>>,
  mut sync: ResMut<TextureSync>,
  mut metrics: ResMut<TerrainMetrics>,
) {
  if dirty.is_empty() {
    return;
  }
  let (Some(terrain), Some(images)) = (terrain, images) else {
    dirty.drain();
    return;
  };
  let Some(handle) = terrain.texture() else {
    dirty.drain();
    return;
  };

  let start = Instant::now();
  let Some(image) = images.get(handle) else {
    error!("Terrain sync failed: {}", SyncError::MissingTexture);
    metrics.sync_failures += dirty.len() as u64;
    dirty.drain();
    return;
  };

  sync.begin(handle.id());
  let mut staged = 0;
  for region in dirty.drain() {
    match sync.sync_region(terrain.field(), &region, image) {
      Ok(bytes) => staged += bytes,
      Err(e) => {
        warn!("Terrain sync of {:?} failed: {}", region.rect, e);
        metrics.sync_failures += 1;
      }
    }
  }
  trace!("Staged {} density bytes", staged);

  metrics
    .upload_time
    .push(start.elapsed().as_secs_f32() * 1000.0);
}

/// System: recomputes gravity from the latest tilt reading.
pub(crate) fn update_gravity(
  config: Res<TerrainConfig>,
  source: Res<GravitySource>,
  mut gravity: ResMut<TerrainGravity>,
) {
  let value = resolve_gravity(source.tilt, config.fallback_gravity_dir(), config.gravity);
  gravity.set_if_neq(TerrainGravity(value));
}

/// System: runs every fixed tick owed for this frame's `dt`.
pub(crate) fn run_fixed_ticks(world: &mut World) {
  let dt = world.resource::<Time>().delta();
  advance_fixed_ticks(world, dt);
}

/// Adds `dt` to the [`SimulationClock`] and runs [`TerrainTick`] once per due
/// tick. Returns the number of ticks run.
///
/// Exposed so hosts with their own frame loop (and tests) can drive the
/// simulation with exact durations.
pub fn advance_fixed_ticks(world: &mut World, dt: Duration) -> u32 {
  let start = Instant::now();
  world.resource_mut::<SimulationClock>().accumulate(dt);

  let mut ran = 0;
  while world.resource::<SimulationClock>().tick_due() {
    world.run_schedule(TerrainTick);
    world.resource_mut::<SimulationClock>().complete_tick();
    ran += 1;
  }

  if let Some(mut metrics) = world.get_resource_mut::<TerrainMetrics>() {
    metrics.ticks_per_frame.push(ran as f32);
    metrics
      .tick_time
      .push(start.elapsed().as_secs_f32() * 1000.0);
  }
  ran
}

/// System (per tick): ensures geometry around the tracked actor.
pub(crate) fn ensure_geometry_window(
  config: Res<TerrainConfig>,
  actors: Query<&Transform, With<TrackedActor>>,
  mut ledger: ResMut<TileLedger>,
  mut warned: Local<bool>,
) {
  let Some(transform) = single_actor(actors.single(), &mut warned) else {
    return;
  };
  let rect = ensure_rect_around(transform.translation.truncate(), config.ensure_margin());
  ledger.ensure_rect(rect);
}

/// The one tracked actor, if exactly one exists.
///
/// Several actors disable fill suppression and the geometry window; that is
/// reported once per system.
fn single_actor<T>(result: Result<T, QuerySingleError>, warned: &mut bool) -> Option<T> {
  match result {
    Ok(actor) => Some(actor),
    Err(QuerySingleError::MultipleEntities(_)) => {
      if !*warned {
        warn!("Several TrackedActor entities exist; only one is supported, ignoring all");
        *warned = true;
      }
      None
    }
    Err(_) => None,
  }
}

/// System: copies each physics body's transform onto its visual.
pub(crate) fn resync_actor_visuals(
  bodies: Query<&Transform, Without<ActorVisual>>,
  mut visuals: Query<(&ActorVisual, &mut Transform)>,
) {
  for (visual, mut transform) in &mut visuals {
    let Ok(body) = bodies.get(visual.follows) else {
      continue;
    };
    transform.translation = body.translation.truncate().extend(transform.translation.z);
    transform.rotation = body.rotation;
  }
}
