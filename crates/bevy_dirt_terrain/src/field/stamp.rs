//! Stamp masks composited into the density field by edits.

use bevy::prelude::*;
use bevy::render::render_resource::TextureFormat;

use super::FieldLoadError;
use crate::primitives::Surface;

/// Whether an edit removes or adds material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditMode {
  /// Multiplicative erosion toward empty.
  Remove,
  /// Screen blend toward solid.
  Add,
}

/// Coverage mask applied by one edit.
///
/// Each byte is the edit strength at that point (255 = full). The mask
/// encodes its own falloff; painting only scales it to the destination
/// rectangle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stamp {
  mask: Surface<u8>,
}

impl Stamp {
  /// Wraps an existing mask. Fails on an empty mask.
  pub fn from_surface(mask: Surface<u8>) -> Result<Self, FieldLoadError> {
    if mask.width() == 0 || mask.height() == 0 {
      return Err(FieldLoadError::Empty);
    }
    Ok(Self { mask })
  }

  /// Builds a stamp from an image, reading coverage the same way the density
  /// field reads density (see [`super::read_coverage`]).
  pub fn from_image(image: &Image) -> Result<Self, FieldLoadError> {
    Self::from_surface(super::read_coverage(image)?)
  }

  /// A round stamp of `size` x `size` texels: full strength inside 70% of the
  /// radius, fading linearly to zero at the rim.
  pub fn disc(size: u32) -> Self {
    let size = size.max(1);
    let mut mask = Surface::filled(size, size, 0u8);
    let half = size as f32 / 2.0;
    for y in 0..size {
      for x in 0..size {
        let dx = (x as f32 + 0.5 - half) / half;
        let dy = (y as f32 + 0.5 - half) / half;
        let d = (dx * dx + dy * dy).sqrt();
        let strength = ((1.0 - d) / 0.3).clamp(0.0, 1.0);
        mask[(x, y)] = (strength * 255.0).round() as u8;
      }
    }
    Self { mask }
  }

  /// A stamp that is full strength everywhere.
  pub fn solid(size: u32) -> Self {
    let size = size.max(1);
    Self {
      mask: Surface::filled(size, size, 255),
    }
  }

  #[inline]
  pub fn width(&self) -> u32 {
    self.mask.width()
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.mask.height()
  }

  #[inline]
  pub(crate) fn mask(&self) -> &Surface<u8> {
    &self.mask
  }
}

impl Default for Stamp {
  fn default() -> Self {
    Self::disc(64)
  }
}

/// `(a * b) / 255`, rounded to nearest.
#[inline]
fn mul_255(a: u8, b: u8) -> u8 {
  ((a as u32 * b as u32 + 127) / 255) as u8
}

impl EditMode {
  /// Blends one density byte with stamp strength `s`.
  ///
  /// `Remove` never raises density and `Add` never lowers it; both stay in
  /// `0..=255` by construction.
  #[inline]
  pub fn blend(self, density: u8, s: u8) -> u8 {
    match self {
      EditMode::Remove => mul_255(density, 255 - s),
      EditMode::Add => 255 - mul_255(255 - density, 255 - s),
    }
  }
}

/// Formats accepted for density and stamp images.
pub(super) fn bytes_per_texel(format: TextureFormat) -> Option<usize> {
  match format {
    TextureFormat::R8Unorm => Some(1),
    TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => Some(4),
    TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb => Some(4),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn remove_blend_is_monotone_and_floors_at_zero() {
    for d in [0u8, 1, 77, 128, 254, 255] {
      for s in [0u8, 1, 128, 200, 255] {
        let out = EditMode::Remove.blend(d, s);
        assert!(out <= d, "remove raised {d} with {s} to {out}");
      }
      assert_eq!(EditMode::Remove.blend(d, 0), d);
      assert_eq!(EditMode::Remove.blend(d, 255), 0);
    }
  }

  #[test]
  fn add_blend_is_monotone_and_caps_at_full() {
    for d in [0u8, 1, 77, 128, 254, 255] {
      for s in [0u8, 1, 128, 200, 255] {
        let out = EditMode::Add.blend(d, s);
        assert!(out >= d, "add lowered {d} with {s} to {out}");
      }
      assert_eq!(EditMode::Add.blend(d, 0), d);
      assert_eq!(EditMode::Add.blend(d, 255), 255);
    }
  }

  #[test]
  fn disc_is_full_at_center_and_empty_at_corners() {
    let stamp = Stamp::disc(32);
    assert_eq!(stamp.mask()[(16, 16)], 255);
    assert_eq!(stamp.mask()[(0, 0)], 0);
    assert_eq!(stamp.mask()[(31, 31)], 0);
  }

  #[test]
  fn empty_mask_is_rejected() {
    let mask = Surface::<u8>::new(0, 8);
    assert_eq!(Stamp::from_surface(mask), Err(FieldLoadError::Empty));
  }
}
