use bevy::input::touch::TouchInput;
use bevy::prelude::*;
use bevy::render::{ExtractSchedule, Render, RenderApp, RenderSystems};
use bevy::sprite_render::Material2dPlugin;

use crate::clock::SimulationClock;
use crate::config::TerrainConfig;
use crate::contact::{ContactTracker, PendingEdits};
use crate::diagnostics::{TerrainMetrics, log_metrics_summary};
use crate::driver::{
  TerrainSet, TerrainTick, TickSet, apply_pending_edits, ensure_geometry_window,
  resync_actor_visuals, run_fixed_ticks, sync_dirty_regions, update_gravity,
};
use crate::geometry::TileLedger;
use crate::gravity::{GravitySource, TerrainGravity, resolve_gravity};
use crate::input::gather_contacts;
use crate::render::{
  QueuedTextureWrites, TerrainMaterial, TextureSync, extract_texture_writes,
  write_texture_regions,
};
use crate::terrain::DirtyRegions;

/// Plugin for the deformable terrain.
///
/// This plugin provides:
/// - Touch and mouse dig/fill input
/// - Density edits with aligned partial texture upload
/// - A fixed-tick [`TerrainTick`] schedule with geometry ensured every tick
/// - Terrain material rendering (when rendering is enabled)
///
/// The terrain itself is created with [`crate::SpawnTerrain`] once the
/// density image is loaded. Physics is added separately, e.g. with
/// `RapierTerrainPlugin`.
#[derive(Default)]
pub struct DirtTerrainPlugin {
  pub config: TerrainConfig,
}

impl DirtTerrainPlugin {
  pub fn new(config: TerrainConfig) -> Self {
    Self { config }
  }
}

impl Plugin for DirtTerrainPlugin {
  fn build(&self, app: &mut App) {
    let config = match self.config.validate() {
      Ok(()) => self.config.clone(),
      Err(e) => {
        error!("{}; falling back to defaults", e);
        TerrainConfig::default()
      }
    };

    // Embed the terrain shader and register material (rendering only)
    if app.is_plugin_added::<bevy::render::RenderPlugin>() {
      bevy::asset::embedded_asset!(app, "render/shaders/terrain.wgsl");
      app.add_plugins(Material2dPlugin::<TerrainMaterial>::default());

      if let Some(render_app) = app.get_sub_app_mut(RenderApp) {
        render_app
          .init_resource::<QueuedTextureWrites>()
          .add_systems(ExtractSchedule, extract_texture_writes)
          .add_systems(
            Render,
            write_texture_regions.in_set(RenderSystems::PrepareResources),
          );
      }
    }

    // Headless apps have no InputPlugin; the input system still needs the queue.
    app.add_message::<TouchInput>();

    let clock =
      SimulationClock::from_hz(config.tick_hz).with_max_catch_up(config.catch_up_limit());
    let gravity = resolve_gravity(None, config.fallback_gravity_dir(), config.gravity);
    info!(
      "Terrain tick {} Hz ({:?}), catch-up {:?}",
      config.tick_hz,
      clock.tick(),
      config.catch_up_limit()
    );

    app
      .insert_resource(clock)
      .insert_resource(TileLedger::new(config.tile_size))
      .insert_resource(TerrainGravity(gravity))
      .insert_resource(config)
      .init_resource::<GravitySource>()
      .init_resource::<ContactTracker>()
      .init_resource::<PendingEdits>()
      .init_resource::<DirtyRegions>()
      .init_resource::<TextureSync>()
      .init_resource::<TerrainMetrics>();

    app.init_schedule(TerrainTick);
    app.configure_sets(
      TerrainTick,
      (TickSet::Ensure, TickSet::Control, TickSet::Physics).chain(),
    );
    app.add_systems(TerrainTick, ensure_geometry_window.in_set(TickSet::Ensure));

    app.configure_sets(
      Update,
      (
        TerrainSet::Input,
        TerrainSet::Edit,
        TerrainSet::Sync,
        TerrainSet::Gravity,
        TerrainSet::Ticks,
        TerrainSet::Resync,
      )
        .chain(),
    );
    app.add_systems(
      Update,
      (
        gather_contacts.in_set(TerrainSet::Input),
        apply_pending_edits.in_set(TerrainSet::Edit),
        sync_dirty_regions.in_set(TerrainSet::Sync),
        update_gravity.in_set(TerrainSet::Gravity),
        run_fixed_ticks.in_set(TerrainSet::Ticks),
        resync_actor_visuals.in_set(TerrainSet::Resync),
        log_metrics_summary.after(TerrainSet::Resync),
      ),
    );
  }
}
