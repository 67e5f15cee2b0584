//! Density texture creation and partial upload.
//!
//! The density texture mirrors the field byte for byte: R8Unorm, row 0 at
//! the bottom (the terrain quad maps UV (0, 0) to its bottom-left corner).
//! Edits are staged with [`TextureSync::sync_region`], which copies only the
//! dirty rectangle; the render world writes it into the GPU texture.

use std::fmt;
use std::ops::Range;

use bevy::asset::RenderAssetUsages;
use bevy::image::{ImageAddressMode, ImageSampler, ImageSamplerDescriptor};
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use crate::dirty::DirtyRegion;
use crate::field::DensityField;
use crate::primitives::TexelRect;

/// Reasons a dirty-region upload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
  /// Region left edge or width is not 4-texel aligned.
  Misaligned(TexelRect),
  /// Region extends past the field.
  OutOfBounds(TexelRect),
  /// Texture dimensions differ from the field.
  SizeMismatch {
    texture: (u32, u32),
    field: (u32, u32),
  },
  /// Texture is not R8Unorm.
  FormatMismatch(String),
  /// A CPU-side copy has no data (or it is the wrong length).
  MissingData,
  /// The texture asset is gone.
  MissingTexture,
}

impl fmt::Display for SyncError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SyncError::Misaligned(rect) => write!(f, "dirty region {rect:?} is not 4-texel aligned"),
      SyncError::OutOfBounds(rect) => write!(f, "dirty region {rect:?} exceeds field bounds"),
      SyncError::SizeMismatch { texture, field } => write!(
        f,
        "density texture is {}x{} but field is {}x{}",
        texture.0, texture.1, field.0, field.1
      ),
      SyncError::FormatMismatch(format) => {
        write!(f, "density texture format {format} is not R8Unorm")
      }
      SyncError::MissingData => write!(f, "density image has no CPU-side data"),
      SyncError::MissingTexture => write!(f, "density texture asset is missing"),
    }
  }
}

impl std::error::Error for SyncError {}

/// Builds an R8Unorm image holding the field's current density.
///
/// The image keeps this snapshot for its whole life; later edits reach the
/// GPU through [`TextureSync`]. Mutating it through `Assets::get_mut`
/// re-uploads the snapshot.
pub fn density_image(field: &DensityField) -> Image {
  let size = Extent3d {
    width: field.width(),
    height: field.height(),
    depth_or_array_layers: 1,
  };

  let mut image = Image::new(
    size,
    TextureDimension::D2,
    field.surface().as_slice().to_vec(),
    TextureFormat::R8Unorm,
    RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
  );

  // Linear sampling smooths the density edge between texels
  image.sampler = ImageSampler::linear();
  image
}

/// Creates the density texture asset for a field.
pub fn create_density_texture(images: &mut Assets<Image>, field: &DensityField) -> Handle<Image> {
  images.add(density_image(field))
}

/// Sampler for tiled detail/overlay textures.
pub fn repeat_sampler() -> ImageSampler {
  ImageSampler::Descriptor(ImageSamplerDescriptor {
    address_mode_u: ImageAddressMode::Repeat,
    address_mode_v: ImageAddressMode::Repeat,
    ..ImageSamplerDescriptor::linear()
  })
}

/// Reads back a rectangle of an R8 texture, row 0 first.
pub fn read_texture_region(image: &Image, rect: TexelRect) -> Option<Vec<u8>> {
  let data = image.data.as_ref()?;
  let stride = image.width() as usize;
  if rect.right() > image.width() || rect.top() > image.height() {
    return None;
  }
  let mut out = Vec::with_capacity(rect.area());
  for y in rect.y..rect.top() {
    let start = y as usize * stride + rect.x as usize;
    out.extend_from_slice(data.get(start..start + rect.width as usize)?);
  }
  Some(out)
}

/// Partial density uploader.
///
/// Dirty rows are gathered into a tightly packed scratch buffer that is
/// reused across frames. The staged writes are copied into the render world
/// and written into the GPU texture sub-rectangles there; the main-world
/// [`Image`] is never mutated, so the full texture is not re-uploaded.
#[derive(Resource, Default)]
pub struct TextureSync {
  texture: Option<AssetId<Image>>,
  scratch: Vec<u8>,
  staged: Vec<(TexelRect, Range<usize>)>,
}

impl TextureSync {
  /// Starts a new frame of writes targeting `texture`, dropping the previous
  /// frame's staged writes.
  pub fn begin(&mut self, texture: AssetId<Image>) {
    self.texture = Some(texture);
    self.scratch.clear();
    self.staged.clear();
  }

  /// Stages `region` of the field for upload into `image`.
  ///
  /// Rows are copied bottom row first; the texture stores field row 0 as its
  /// row 0, so the sub-rectangle origin is `(region.x, region.y)` with no
  /// flip. Returns the number of bytes staged; empty regions stage nothing.
  ///
  /// Misaligned regions are rejected, never re-aligned.
  pub fn sync_region(
    &mut self,
    field: &DensityField,
    region: &DirtyRegion,
    image: &Image,
  ) -> Result<usize, SyncError> {
    if region.is_empty() {
      return Ok(0);
    }
    let rect = region.rect;
    if !region.is_aligned() {
      return Err(SyncError::Misaligned(rect));
    }
    if rect.right() > field.width() || rect.top() > field.height() {
      return Err(SyncError::OutOfBounds(rect));
    }
    let format = image.texture_descriptor.format;
    if format != TextureFormat::R8Unorm {
      return Err(SyncError::FormatMismatch(format!("{format:?}")));
    }
    if image.width() != field.width() || image.height() != field.height() {
      return Err(SyncError::SizeMismatch {
        texture: (image.width(), image.height()),
        field: (field.width(), field.height()),
      });
    }

    let start = self.scratch.len();
    for y in rect.y..rect.top() {
      self
        .scratch
        .extend_from_slice(field.surface().row_span(rect.x, y, rect.width));
    }
    self.staged.push((rect, start..self.scratch.len()));
    Ok(self.scratch.len() - start)
  }

  /// Texture the staged writes target.
  pub fn texture(&self) -> Option<AssetId<Image>> {
    self.texture
  }

  /// Staged writes of the latest frame with edits: the sub-rectangle and its
  /// packed rows.
  pub fn staged(&self) -> impl Iterator<Item = (TexelRect, &[u8])> {
    self
      .staged
      .iter()
      .map(|(rect, range)| (*rect, &self.scratch[range.clone()]))
  }

  pub fn is_empty(&self) -> bool {
    self.staged.is_empty()
  }

  /// Applies the staged writes to a CPU-side image.
  ///
  /// For hosts without a render world that keep their own copy of the
  /// texture.
  pub fn apply_to(&self, image: &mut Image) -> Result<(), SyncError> {
    let stride = image.width() as usize;
    let rows = image.height() as usize;
    let data = image
      .data
      .as_mut()
      .filter(|d| d.len() == stride * rows)
      .ok_or(SyncError::MissingData)?;
    for (rect, bytes) in self.staged() {
      if rect.right() as usize > stride || rect.top() as usize > rows {
        return Err(SyncError::OutOfBounds(rect));
      }
      let width = rect.width as usize;
      for (row, src) in bytes.chunks_exact(width).enumerate() {
        let start = (rect.y as usize + row) * stride + rect.x as usize;
        data[start..start + width].copy_from_slice(src);
      }
    }
    Ok(())
  }
}

/// Creates a quad mesh with Y+ up UV coordinates and origin at bottom-left.
///
/// UV (0,0) is at bottom-left so texture row 0 (the field's bottom row)
/// lands at the bottom of the quad.
pub fn create_terrain_quad(width: f32, height: f32) -> Mesh {
  Mesh::new(
    PrimitiveTopology::TriangleList,
    RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
  )
  .with_inserted_attribute(
    Mesh::ATTRIBUTE_POSITION,
    vec![
      [0.0, 0.0, 0.0],      // bottom-left (origin)
      [width, 0.0, 0.0],    // bottom-right
      [width, height, 0.0], // top-right
      [0.0, height, 0.0],   // top-left
    ],
  )
  .with_inserted_attribute(
    Mesh::ATTRIBUTE_UV_0,
    vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
  )
  .with_inserted_indices(Indices::U32(vec![0, 1, 2, 0, 2, 3]))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::coords::FieldTransform;
  use crate::field::{EditMode, Stamp};

  fn field_with_texture() -> (DensityField, Image) {
    let field = DensityField::filled(64, 32, 1.0, FieldTransform::IDENTITY, 1.0).unwrap();
    let image = density_image(&field);
    (field, image)
  }

  #[test]
  fn staged_region_reads_back_equal_to_field() {
    let (mut field, mut image) = field_with_texture();
    let region = field.paint(&Stamp::disc(16), Vec2::new(21.0, 12.0), 7.0, EditMode::Remove);
    assert!(!region.is_empty());

    let mut sync = TextureSync::default();
    sync.begin(AssetId::default());
    let staged = sync.sync_region(&field, &region, &image).unwrap();
    assert_eq!(staged, region.rect.area());
    let writes: Vec<_> = sync.staged().map(|(rect, bytes)| (rect, bytes.len())).collect();
    assert_eq!(writes, vec![(region.rect, region.rect.area())]);

    sync.apply_to(&mut image).unwrap();
    let texture = read_texture_region(&image, region.rect).unwrap();
    let mut expected = Vec::new();
    for y in region.rect.y..region.rect.top() {
      expected.extend_from_slice(field.surface().row_span(region.rect.x, y, region.rect.width));
    }
    assert_eq!(texture, expected);
  }

  #[test]
  fn staging_leaves_image_untouched() {
    let (mut field, image) = field_with_texture();
    let before = image.data.clone();
    let region = field.paint(&Stamp::solid(4), Vec2::new(10.0, 10.0), 2.0, EditMode::Remove);

    let mut sync = TextureSync::default();
    sync.begin(AssetId::default());
    sync.sync_region(&field, &region, &image).unwrap();
    assert_eq!(image.data, before);
  }

  #[test]
  fn texels_outside_region_are_untouched() {
    let (mut field, mut image) = field_with_texture();
    let region = field.paint(&Stamp::solid(4), Vec2::new(10.0, 10.0), 2.0, EditMode::Remove);
    // Change a texel outside the region without syncing it.
    field.paint(&Stamp::solid(4), Vec2::new(50.0, 25.0), 2.0, EditMode::Remove);

    let mut sync = TextureSync::default();
    sync.sync_region(&field, &region, &image).unwrap();
    sync.apply_to(&mut image).unwrap();
    let far = read_texture_region(&image, TexelRect::new(48, 24, 4, 1)).unwrap();
    assert_eq!(far, vec![255; 4]);
    let near = read_texture_region(&image, TexelRect::new(10, 10, 1, 1)).unwrap();
    assert_eq!(near, vec![0]);
  }

  #[test]
  fn begin_drops_previous_frame() {
    let (mut field, image) = field_with_texture();
    let region = field.paint(&Stamp::solid(4), Vec2::new(10.0, 10.0), 2.0, EditMode::Remove);

    let mut sync = TextureSync::default();
    sync.begin(AssetId::default());
    sync.sync_region(&field, &region, &image).unwrap();
    assert!(!sync.is_empty());
    sync.begin(AssetId::default());
    assert!(sync.is_empty());
  }

  #[test]
  fn misaligned_region_is_rejected() {
    let (field, image) = field_with_texture();
    let region = DirtyRegion::from_rect(TexelRect::new(3, 0, 4, 4));
    let mut sync = TextureSync::default();
    let err = sync.sync_region(&field, &region, &image).unwrap_err();
    assert_eq!(err, SyncError::Misaligned(region.rect));
    assert!(sync.is_empty());
  }

  #[test]
  fn empty_region_uploads_nothing() {
    let (field, image) = field_with_texture();
    let mut sync = TextureSync::default();
    let staged = sync.sync_region(&field, &DirtyRegion::EMPTY, &image).unwrap();
    assert_eq!(staged, 0);
    assert!(sync.is_empty());
  }

  #[test]
  fn applying_to_image_without_data_reports_error() {
    let (field, mut image) = field_with_texture();
    let region = DirtyRegion::from_rect(TexelRect::new(0, 0, 4, 4));
    let mut sync = TextureSync::default();
    sync.sync_region(&field, &region, &image).unwrap();
    image.data = None;
    assert_eq!(sync.apply_to(&mut image), Err(SyncError::MissingData));
  }

  #[test]
  fn wrong_size_texture_reports_error() {
    let (field, _) = field_with_texture();
    let other = DensityField::filled(32, 32, 1.0, FieldTransform::IDENTITY, 1.0).unwrap();
    let image = density_image(&other);
    let region = DirtyRegion::from_rect(TexelRect::new(0, 0, 4, 4));
    let err = TextureSync::default()
      .sync_region(&field, &region, &image)
      .unwrap_err();
    assert!(matches!(err, SyncError::SizeMismatch { .. }));
  }
}
