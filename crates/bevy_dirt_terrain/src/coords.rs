//! Coordinate spaces and the affine transforms between them.
//!
//! Three spaces are in play:
//! - **World**: physics/render units, Y+ up.
//! - **Field**: continuous texel space of the density field. Texel `(x, y)`
//!   covers `[x, x + 1) x [y, y + 1)`, row 0 at the bottom.
//! - **Device**: viewport pixels as reported by touch/cursor input, Y+ down.
//!
//! [`FieldTransform`] maps world <-> field, [`DeviceTransform`] maps
//! device -> world. Composition is explicit at call sites via
//! [`DeviceTransform::device_to_field`].

use bevy::math::{IVec2, Rect, Vec2};

use crate::primitives::TexelRect;

/// Affine world <-> field mapping.
///
/// `world = origin + field * texel_size`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldTransform {
  /// World units covered by one texel edge.
  pub texel_size: f32,
  /// World position of the bottom-left corner of texel (0, 0).
  pub origin: Vec2,
}

impl Default for FieldTransform {
  fn default() -> Self {
    Self::IDENTITY
  }
}

impl FieldTransform {
  pub const IDENTITY: Self = Self {
    texel_size: 1.0,
    origin: Vec2::ZERO,
  };

  pub const fn new(texel_size: f32, origin: Vec2) -> Self {
    Self { texel_size, origin }
  }

  /// World -> continuous field coordinates.
  #[inline]
  pub fn world_to_field(&self, world: Vec2) -> Vec2 {
    (world - self.origin) / self.texel_size
  }

  /// Continuous field coordinates -> world.
  #[inline]
  pub fn field_to_world(&self, field: Vec2) -> Vec2 {
    self.origin + field * self.texel_size
  }

  /// World -> integer texel containing the point.
  ///
  /// Far-away points saturate instead of wrapping.
  #[inline]
  pub fn world_to_texel(&self, world: Vec2) -> IVec2 {
    self.world_to_field(world).floor().as_ivec2()
  }

  /// World-space length -> texel-space length.
  #[inline]
  pub fn world_length_to_texels(&self, length: f32) -> f32 {
    length / self.texel_size
  }

  /// World-space bounds of a texel rectangle.
  pub fn texel_rect_to_world(&self, rect: TexelRect) -> Rect {
    let min = self.field_to_world(Vec2::new(rect.x as f32, rect.y as f32));
    let max = self.field_to_world(Vec2::new(rect.right() as f32, rect.top() as f32));
    Rect::from_corners(min, max)
  }
}

/// Affine device -> world mapping.
///
/// `world = offset + device * scale`. `scale.y` is normally negative because
/// device Y grows downward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceTransform {
  pub scale: Vec2,
  pub offset: Vec2,
}

impl DeviceTransform {
  /// Builds the mapping from a viewport of `viewport_size` device pixels whose
  /// top-left corner shows `world_top_left` and bottom-right corner shows
  /// `world_bottom_right`.
  ///
  /// Returns `None` for a degenerate viewport.
  pub fn from_corners(
    viewport_size: Vec2,
    world_top_left: Vec2,
    world_bottom_right: Vec2,
  ) -> Option<Self> {
    if viewport_size.x <= 0.0 || viewport_size.y <= 0.0 {
      return None;
    }
    Some(Self {
      scale: (world_bottom_right - world_top_left) / viewport_size,
      offset: world_top_left,
    })
  }

  /// Device -> world.
  #[inline]
  pub fn device_to_world(&self, device: Vec2) -> Vec2 {
    self.offset + device * self.scale
  }

  /// Device -> continuous field coordinates.
  #[inline]
  pub fn device_to_field(&self, device: Vec2, field: &FieldTransform) -> Vec2 {
    field.world_to_field(self.device_to_world(device))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn world_field_round_trip_with_offset_and_scale() {
    let t = FieldTransform::new(0.5, Vec2::new(-100.0, 20.0));
    let world = Vec2::new(12.25, 47.5);
    let field = t.world_to_field(world);
    assert_eq!(field, Vec2::new(224.5, 55.0));
    assert_eq!(t.field_to_world(field), world);
  }

  #[test]
  fn world_to_texel_floors_negative_coordinates() {
    let t = FieldTransform::IDENTITY;
    assert_eq!(t.world_to_texel(Vec2::new(-0.5, 3.9)), IVec2::new(-1, 3));
  }

  #[test]
  fn world_to_texel_saturates_far_points() {
    let t = FieldTransform::new(1e-6, Vec2::ZERO);
    let texel = t.world_to_texel(Vec2::new(1e9, -1e9));
    assert_eq!(texel, IVec2::new(i32::MAX, i32::MIN));
  }

  #[test]
  fn texel_rect_maps_to_world_bounds() {
    let t = FieldTransform::new(2.0, Vec2::new(10.0, 0.0));
    let rect = t.texel_rect_to_world(TexelRect::new(4, 8, 8, 2));
    assert_eq!(rect.min, Vec2::new(18.0, 16.0));
    assert_eq!(rect.max, Vec2::new(34.0, 20.0));
  }

  #[test]
  fn device_mapping_flips_y() {
    let t = DeviceTransform::from_corners(
      Vec2::new(800.0, 600.0),
      Vec2::new(-400.0, 300.0),
      Vec2::new(400.0, -300.0),
    )
    .unwrap();
    assert_eq!(t.device_to_world(Vec2::ZERO), Vec2::new(-400.0, 300.0));
    assert_eq!(t.device_to_world(Vec2::new(400.0, 300.0)), Vec2::ZERO);
    assert_eq!(
      t.device_to_world(Vec2::new(800.0, 600.0)),
      Vec2::new(400.0, -300.0)
    );
  }

  #[test]
  fn device_to_field_composes_both_transforms() {
    let device = DeviceTransform {
      scale: Vec2::new(2.0, -2.0),
      offset: Vec2::new(0.0, 100.0),
    };
    let field = FieldTransform::new(4.0, Vec2::new(-8.0, 0.0));
    // device (10, 5) -> world (20, 90) -> field (7, 22.5)
    assert_eq!(
      device.device_to_field(Vec2::new(10.0, 5.0), &field),
      Vec2::new(7.0, 22.5)
    );
  }

  #[test]
  fn degenerate_viewport_is_rejected() {
    assert!(DeviceTransform::from_corners(Vec2::ZERO, Vec2::ZERO, Vec2::ONE).is_none());
  }
}
