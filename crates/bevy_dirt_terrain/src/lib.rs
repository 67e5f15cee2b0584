//! Dirt Terrain - deformable density-field terrain plugin for Bevy.
//!
//! A 2D terrain whose solidity is a scalar density field. Touches dig or fill
//! the field; each edit is pushed to the GPU as a small 4-texel-aligned
//! region, and the collision geometry around the tracked actor is rebuilt
//! before the next fixed physics tick.

pub mod clock;
pub mod config;
pub mod contact;
pub mod coords;
pub mod diagnostics;
pub mod dirty;
pub mod driver;
pub mod field;
pub mod geometry;
pub mod gravity;
pub mod input;
pub mod physics;
mod plugin;
pub mod primitives;
pub mod render;
pub mod terrain;

pub use clock::SimulationClock;
pub use config::{ConfigError, TerrainConfig};
pub use contact::{ContactId, ContactState, ContactTracker, EditRequest, PendingEdits};
pub use coords::{DeviceTransform, FieldTransform};
pub use diagnostics::{TerrainMetrics, TimeSeries};
pub use dirty::{DirtyRegion, ROW_ALIGNMENT};
pub use driver::{TerrainSet, TerrainTick, TickSet, advance_fixed_ticks};
pub use field::{DensityField, EditMode, FieldLoadError, Stamp};
pub use geometry::{GeometryWindow, TileLedger, TilePos, ensure_rect_around, solid_boxes};
pub use gravity::{GravitySource, TerrainGravity, resolve_gravity};
pub use input::{ContactPhase, mouse_phases};
#[cfg(feature = "rapier2d")]
pub use physics::rapier::RapierTerrainPlugin;
pub use physics::{TileCollider, TileColliderRegistry};
pub use plugin::DirtTerrainPlugin;
pub use primitives::{Surface, TexelRect};
pub use render::{
  SyncError, TerrainMaterial, TerrainUniforms, TextureSync, density_image, read_texture_region,
};
pub use terrain::{
  ActorVisual, DirtyRegions, EditBlocked, SpawnTerrain, Terrain, TerrainCamera, TrackedActor,
};
