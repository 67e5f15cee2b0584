//! The scalar density field.
//!
//! [`DensityField`] owns one byte per texel (0 = empty, 255 = solid), the
//! world <-> field transform, and the border density reported outside the
//! field. It is mutated only through [`DensityField::paint`], which returns
//! the aligned [`DirtyRegion`] that texture sync and geometry invalidation
//! consume.

mod stamp;

use std::fmt;

use bevy::math::{Rect, Vec2};
use bevy::prelude::*;
pub use stamp::{EditMode, Stamp};

use crate::coords::FieldTransform;
use crate::dirty::{DirtyRegion, ROW_ALIGNMENT};
use crate::primitives::{Surface, TexelRect};

/// Errors raised while building a density field or stamp from image data.
///
/// All of these are fatal at load time: the terrain cannot exist without a
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLoadError {
  /// Zero width or height.
  Empty,
  /// The image has no CPU-side pixel data.
  NoData,
  /// Pixel format is not R8 or RGBA/BGRA 8-bit.
  UnsupportedFormat(String),
  /// Field width must be a multiple of the dirty-region alignment.
  UnalignedWidth(u32),
  /// Data length does not match the declared dimensions.
  SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for FieldLoadError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FieldLoadError::Empty => write!(f, "density image is empty"),
      FieldLoadError::NoData => write!(f, "density image has no pixel data"),
      FieldLoadError::UnsupportedFormat(format) => {
        write!(f, "unsupported density image format: {format}")
      }
      FieldLoadError::UnalignedWidth(width) => write!(
        f,
        "field width {width} is not a multiple of {ROW_ALIGNMENT} texels"
      ),
      FieldLoadError::SizeMismatch { expected, actual } => {
        write!(f, "expected {expected} bytes of pixel data, got {actual}")
      }
    }
  }
}

impl std::error::Error for FieldLoadError {}

/// Reads per-texel coverage from an image into a bottom-up surface.
///
/// R8 images are read directly; 4-byte formats use the alpha channel.
/// Image rows are stored top-down, so rows are flipped.
pub(crate) fn read_coverage(image: &Image) -> Result<Surface<u8>, FieldLoadError> {
  let width = image.width();
  let height = image.height();
  if width == 0 || height == 0 {
    return Err(FieldLoadError::Empty);
  }
  let format = image.texture_descriptor.format;
  let Some(bpp) = stamp::bytes_per_texel(format) else {
    return Err(FieldLoadError::UnsupportedFormat(format!("{format:?}")));
  };
  let Some(data) = image.data.as_ref() else {
    return Err(FieldLoadError::NoData);
  };
  let expected = width as usize * height as usize * bpp;
  if data.len() != expected {
    return Err(FieldLoadError::SizeMismatch {
      expected,
      actual: data.len(),
    });
  }

  let channel = bpp - 1;
  let row_bytes = width as usize * bpp;
  let mut out = Vec::with_capacity(width as usize * height as usize);
  for y in 0..height as usize {
    let src_row = height as usize - 1 - y;
    let row = &data[src_row * row_bytes..(src_row + 1) * row_bytes];
    out.extend(row.chunks_exact(bpp).map(|texel| texel[channel]));
  }

  Surface::from_vec(width, height, out).ok_or(FieldLoadError::SizeMismatch {
    expected: width as usize * height as usize,
    actual: 0,
  })
}

/// Converts a normalized density to its stored byte.
#[inline]
pub fn density_to_byte(density: f32) -> u8 {
  (density.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// The deformable density field.
#[derive(Clone, Debug)]
pub struct DensityField {
  density: Surface<u8>,
  transform: FieldTransform,
  border: u8,
}

impl DensityField {
  /// Wraps a density surface.
  ///
  /// Fails if the surface is empty or its width is not a multiple of
  /// [`ROW_ALIGNMENT`].
  pub fn from_surface(
    density: Surface<u8>,
    transform: FieldTransform,
    border_density: f32,
  ) -> Result<Self, FieldLoadError> {
    if density.width() == 0 || density.height() == 0 {
      return Err(FieldLoadError::Empty);
    }
    if density.width() % ROW_ALIGNMENT != 0 {
      return Err(FieldLoadError::UnalignedWidth(density.width()));
    }
    Ok(Self {
      density,
      transform,
      border: density_to_byte(border_density),
    })
  }

  /// A field of uniform density.
  pub fn filled(
    width: u32,
    height: u32,
    density: f32,
    transform: FieldTransform,
    border_density: f32,
  ) -> Result<Self, FieldLoadError> {
    Self::from_surface(
      Surface::filled(width, height, density_to_byte(density)),
      transform,
      border_density,
    )
  }

  /// Builds the field from a precomputed density image.
  pub fn from_image(
    image: &Image,
    transform: FieldTransform,
    border_density: f32,
  ) -> Result<Self, FieldLoadError> {
    Self::from_surface(read_coverage(image)?, transform, border_density)
  }

  #[inline]
  pub fn width(&self) -> u32 {
    self.density.width()
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.density.height()
  }

  #[inline]
  pub fn transform(&self) -> &FieldTransform {
    &self.transform
  }

  /// Border density as a normalized value.
  #[inline]
  pub fn border_density(&self) -> f32 {
    self.border as f32 / 255.0
  }

  /// Raw texel bytes, row 0 at the bottom.
  #[inline]
  pub fn surface(&self) -> &Surface<u8> {
    &self.density
  }

  /// Stored byte at a signed texel coordinate, or the border byte outside.
  #[inline]
  pub fn texel(&self, x: i64, y: i64) -> u8 {
    if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
      return self.border;
    }
    self.density[(x as u32, y as u32)]
  }

  /// Density in `[0, 1]` at a world point.
  ///
  /// Points outside the field read the border density so the field exterior
  /// behaves as configured (solid by default).
  pub fn sample(&self, world: Vec2) -> f32 {
    let texel = self.transform.world_to_texel(world);
    self.texel(texel.x as i64, texel.y as i64) as f32 / 255.0
  }

  /// Texel bounds covered by a stamp of world `radius` centered at
  /// `world_center`, before clipping.
  ///
  /// Returned as `(min_x, min_y, max_x, max_y)` with exclusive maxima.
  fn stamp_span(&self, world_center: Vec2, radius: f32) -> (i64, i64, i64, i64) {
    let center = self.transform.world_to_field(world_center);
    let r = self.transform.world_length_to_texels(radius).max(0.0);
    (
      (center.x - r).floor() as i64,
      (center.y - r).floor() as i64,
      (center.x + r).ceil() as i64,
      (center.y + r).ceil() as i64,
    )
  }

  /// Composites `stamp` scaled to a square of world `radius` around
  /// `world_center`.
  ///
  /// The destination is clipped to the field; texels outside are ignored.
  /// Returns the aligned region covering the clipped destination, which is
  /// empty when nothing of the stamp lands on the field.
  pub fn paint(
    &mut self,
    stamp: &Stamp,
    world_center: Vec2,
    radius: f32,
    mode: EditMode,
  ) -> DirtyRegion {
    let (min_x, min_y, max_x, max_y) = self.stamp_span(world_center, radius);
    let side_x = max_x - min_x;
    let side_y = max_y - min_y;
    let dest =
      TexelRect::clipped_from_span(min_x, min_y, max_x, max_y, self.width(), self.height());
    if dest.is_empty() || side_x <= 0 || side_y <= 0 {
      return DirtyRegion::EMPTY;
    }

    let mask = stamp.mask();
    let stamp_w = mask.width() as i64;
    let stamp_h = mask.height() as i64;

    for ty in dest.y..dest.top() {
      let sy = ((ty as i64 - min_y) * stamp_h / side_y) as u32;
      for tx in dest.x..dest.right() {
        let sx = ((tx as i64 - min_x) * stamp_w / side_x) as u32;
        let s = mask[(sx, sy)];
        if s == 0 {
          continue;
        }
        let texel = &mut self.density[(tx, ty)];
        *texel = mode.blend(*texel, s);
      }
    }

    let region = DirtyRegion::covering(dest, self.width());
    assert!(
      region.is_aligned() && region.rect.contains_rect(&dest),
      "paint produced a malformed dirty region {region:?} for {dest:?}"
    );
    region
  }

  /// World-space bounds of a dirty region.
  pub fn region_world_rect(&self, region: &DirtyRegion) -> Rect {
    self.transform.texel_rect_to_world(region.rect)
  }
}
