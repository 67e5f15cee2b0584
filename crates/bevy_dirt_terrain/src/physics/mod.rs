//! Physics library integration for terrain geometry.
//!
//! Provides optional feature-gated rapier2d support:
//!
//! ```toml
//! bevy_dirt_terrain = { version = "...", features = ["rapier2d"] }
//! ```

#[cfg(feature = "rapier2d")]
pub mod rapier;

use std::collections::HashMap;

use bevy::prelude::*;

use crate::geometry::TilePos;

/// Tracks spawned tile collider entities and the ledger generation each was
/// built from.
#[derive(Resource, Default)]
pub struct TileColliderRegistry {
  pub entities: HashMap<TilePos, (Entity, u64)>,
}

/// Marker component for tile collider entities.
#[derive(Component)]
pub struct TileCollider {
  pub tile: TilePos,
  /// Ledger generation the shapes were built from.
  pub generation: u64,
}
