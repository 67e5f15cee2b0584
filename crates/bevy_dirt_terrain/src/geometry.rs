//! Collision geometry window around the tracked actor.
//!
//! Collision shapes are only kept current inside the *ensure rectangle*, a
//! world-space box centered on the actor. Every tick the window is ensured
//! before the physics step; every edit reports its dirty rectangle before the
//! next ensure, so regenerated geometry never reads stale density.
//!
//! The concrete shape generation lives with the physics adapter; this module
//! owns the bookkeeping of which tiles are current.

use std::collections::{HashMap, HashSet};

use bevy::math::{Rect, Vec2};
use bevy::prelude::*;

use crate::field::DensityField;

/// Interface of the tile geometry collaborator.
///
/// Both calls must be idempotent: catch-up frames repeat `ensure_rect` with
/// the same rectangle.
pub trait GeometryWindow {
  /// Guarantees current geometry for every tile overlapping `rect`.
  fn ensure_rect(&mut self, rect: Rect);
  /// Discards geometry overlapping `rect`; it is rebuilt on its next ensure.
  fn mark_dirty_rect(&mut self, rect: Rect);
}

/// Ensure rectangle for an actor at `position`.
///
/// `margin` is the half-extent on each axis.
pub fn ensure_rect_around(position: Vec2, margin: Vec2) -> Rect {
  Rect::from_center_half_size(position, margin.abs())
}

/// Stored density at or above which a texel is solid for collision.
pub const SOLID_THRESHOLD: u8 = 128;

/// Axis-aligned boxes covering the solid texels of `field` inside `bounds`.
///
/// Rows are scanned for horizontal runs of solid texels; a run identical to
/// one in the row below extends that box upward. Boxes are clipped to
/// `bounds`. Texels outside the field read the border density, so a solid
/// border produces walls.
pub fn solid_boxes(field: &DensityField, bounds: Rect) -> Vec<Rect> {
  let transform = field.transform();
  let min = transform.world_to_field(bounds.min).floor();
  let max = transform.world_to_field(bounds.max).ceil();
  let (min_x, min_y) = (min.x as i64, min.y as i64);
  let (max_x, max_y) = (max.x as i64, max.y as i64);

  // (x0, x1, y0) of boxes still growing.
  let mut open: Vec<(i64, i64, i64)> = Vec::new();
  let mut closed: Vec<(i64, i64, i64, i64)> = Vec::new();

  for y in min_y..max_y {
    let mut runs = Vec::new();
    let mut x = min_x;
    while x < max_x {
      if field.texel(x, y) < SOLID_THRESHOLD {
        x += 1;
        continue;
      }
      let start = x;
      while x < max_x && field.texel(x, y) >= SOLID_THRESHOLD {
        x += 1;
      }
      runs.push((start, x));
    }

    let mut next = Vec::with_capacity(runs.len());
    for (x0, x1) in runs {
      match open.iter().position(|&(ox0, ox1, _)| ox0 == x0 && ox1 == x1) {
        Some(i) => next.push(open.swap_remove(i)),
        None => next.push((x0, x1, y)),
      }
    }
    closed.extend(open.drain(..).map(|(x0, x1, y0)| (x0, x1, y0, y)));
    open = next;
  }
  closed.extend(open.into_iter().map(|(x0, x1, y0)| (x0, x1, y0, max_y)));

  closed
    .into_iter()
    .filter_map(|(x0, x1, y0, y1)| {
      let lo = transform.field_to_world(Vec2::new(x0 as f32, y0 as f32));
      let hi = transform.field_to_world(Vec2::new(x1 as f32, y1 as f32));
      let rect = Rect::from_corners(lo, hi).intersect(bounds);
      (!rect.is_empty()).then_some(rect)
    })
    .collect()
}

/// Integer position of a geometry tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TilePos {
  pub x: i64,
  pub y: i64,
}

impl TilePos {
  pub const fn new(x: i64, y: i64) -> Self {
    Self { x, y }
  }
}

/// Per-tile bookkeeping for the geometry window.
///
/// Tracks which tiles hold current geometry (and since which generation),
/// queues tiles that need (re)building, and reports tiles that drifted out of
/// the window so their shapes can be dropped.
///
/// Both queues stay bounded without a consumer: the rebuild queue only holds
/// current tiles, and the eviction list is replaced by every ensure.
#[derive(Resource, Debug)]
pub struct TileLedger {
  tile_size: f32,
  current: HashMap<TilePos, u64>,
  generation: u64,
  regenerate: Vec<TilePos>,
  evicted: Vec<TilePos>,
  last_window: Option<Rect>,
}

impl TileLedger {
  /// # Panics
  /// Panics if `tile_size` is not positive.
  pub fn new(tile_size: f32) -> Self {
    assert!(tile_size > 0.0, "tile size must be positive");
    Self {
      tile_size,
      current: HashMap::new(),
      generation: 0,
      regenerate: Vec::new(),
      evicted: Vec::new(),
      last_window: None,
    }
  }

  #[inline]
  pub fn tile_size(&self) -> f32 {
    self.tile_size
  }

  /// World bounds of a tile.
  pub fn tile_rect(&self, tile: TilePos) -> Rect {
    let min = Vec2::new(tile.x as f32, tile.y as f32) * self.tile_size;
    Rect::from_corners(min, min + Vec2::splat(self.tile_size))
  }

  /// Tiles overlapping `rect` (edges touching count).
  pub fn tiles_in(&self, rect: Rect) -> impl Iterator<Item = TilePos> + use<> {
    let min_x = (rect.min.x / self.tile_size).floor() as i64;
    let min_y = (rect.min.y / self.tile_size).floor() as i64;
    let max_x = (rect.max.x / self.tile_size).floor() as i64;
    let max_y = (rect.max.y / self.tile_size).floor() as i64;
    (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| TilePos::new(x, y)))
  }

  /// True if the tile holds current geometry.
  pub fn is_current(&self, tile: TilePos) -> bool {
    self.current.contains_key(&tile)
  }

  /// Generation at which a current tile was last built.
  pub fn generation_of(&self, tile: TilePos) -> Option<u64> {
    self.current.get(&tile).copied()
  }

  /// Number of tiles with current geometry.
  pub fn len(&self) -> usize {
    self.current.len()
  }

  pub fn is_empty(&self) -> bool {
    self.current.is_empty()
  }

  /// The rectangle passed to the most recent `ensure_rect`.
  pub fn last_window(&self) -> Option<Rect> {
    self.last_window
  }

  /// Takes tiles whose geometry must be (re)built, oldest first.
  pub fn take_regenerated(&mut self) -> Vec<TilePos> {
    std::mem::take(&mut self.regenerate)
  }

  /// Takes the tiles dropped by the most recent `ensure_rect`.
  ///
  /// Consumers drain this after each ensure; evictions from earlier ensures
  /// that were never taken are discarded.
  pub fn take_evicted(&mut self) -> Vec<TilePos> {
    std::mem::take(&mut self.evicted)
  }

  /// Drops tiles farther than one tile outside `window`.
  fn evict_outside(&mut self, window: Rect) {
    let keep = window.inflate(self.tile_size);
    let far: Vec<TilePos> = self
      .current
      .keys()
      .copied()
      .filter(|&tile| {
        let r = self.tile_rect(tile);
        r.min.x > keep.max.x || r.max.x < keep.min.x || r.min.y > keep.max.y || r.max.y < keep.min.y
      })
      .collect();
    for tile in far {
      self.current.remove(&tile);
      self.regenerate.retain(|t| *t != tile);
      self.evicted.push(tile);
    }
  }
}

impl GeometryWindow for TileLedger {
  fn ensure_rect(&mut self, rect: Rect) {
    self.evicted.clear();
    let queued: HashSet<TilePos> = self.regenerate.iter().copied().collect();
    for tile in self.tiles_in(rect) {
      if self.current.contains_key(&tile) {
        continue;
      }
      self.generation += 1;
      self.current.insert(tile, self.generation);
      if !queued.contains(&tile) {
        self.regenerate.push(tile);
      }
    }
    self.evict_outside(rect);
    self.last_window = Some(rect);
  }

  fn mark_dirty_rect(&mut self, rect: Rect) {
    if rect.is_empty() {
      return;
    }
    let tiles: Vec<TilePos> = self.tiles_in(rect).collect();
    for tile in tiles {
      if self.current.remove(&tile).is_some() {
        trace!("Geometry tile {:?} invalidated", tile);
      }
    }
    // A dirty tile is rebuilt only when an ensure covers it again.
    let current = &self.current;
    self.regenerate.retain(|tile| current.contains_key(tile));
  }
}
