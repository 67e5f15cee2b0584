//! Render-world half of the partial density upload.
//!
//! Each frame the writes staged in [`TextureSync`] are extracted and written
//! into the density texture's sub-rectangles with `RenderQueue::write_texture`.
//! Writes for a texture whose GPU image is not prepared yet wait a few frames.

use bevy::prelude::*;
use bevy::render::Extract;
use bevy::render::render_asset::RenderAssets;
use bevy::render::render_resource::{
  Extent3d, Origin3d, TexelCopyBufferLayout, TexelCopyTextureInfo, TextureAspect,
};
use bevy::render::renderer::RenderQueue;
use bevy::render::texture::GpuImage;

use super::texture::TextureSync;
use crate::primitives::TexelRect;

/// Frames a write may wait for its GPU image before it is dropped.
const MAX_WAIT_FRAMES: u32 = 8;

struct QueuedWrite {
  texture: AssetId<Image>,
  rect: TexelRect,
  data: Vec<u8>,
  waited: u32,
}

/// Density writes extracted from the main world, not yet on the GPU.
#[derive(Resource, Default)]
pub(crate) struct QueuedTextureWrites {
  writes: Vec<QueuedWrite>,
}

/// Extract: copies this frame's staged writes into the render world.
pub(crate) fn extract_texture_writes(
  sync: Extract<Res<TextureSync>>,
  mut queued: ResMut<QueuedTextureWrites>,
) {
  if !sync.is_changed() {
    return;
  }
  let Some(texture) = sync.texture() else {
    return;
  };
  queued
    .writes
    .extend(sync.staged().map(|(rect, data)| QueuedWrite {
      texture,
      rect,
      data: data.to_vec(),
      waited: 0,
    }));
}

/// Render: writes queued regions into their GPU textures.
pub(crate) fn write_texture_regions(
  mut queued: ResMut<QueuedTextureWrites>,
  gpu_images: Res<RenderAssets<GpuImage>>,
  render_queue: Res<RenderQueue>,
) {
  queued.writes.retain_mut(|write| {
    let Some(gpu_image) = gpu_images.get(write.texture) else {
      write.waited += 1;
      if write.waited > MAX_WAIT_FRAMES {
        warn!(
          "Dropping density write {:?}: texture never reached the GPU",
          write.rect
        );
        return false;
      }
      return true;
    };

    // Texture row 0 is field row 0, so the origin needs no flip.
    render_queue.write_texture(
      TexelCopyTextureInfo {
        texture: &gpu_image.texture,
        mip_level: 0,
        origin: Origin3d {
          x: write.rect.x,
          y: write.rect.y,
          z: 0,
        },
        aspect: TextureAspect::All,
      },
      &write.data,
      TexelCopyBufferLayout {
        offset: 0,
        bytes_per_row: Some(write.rect.width),
        rows_per_image: Some(write.rect.height),
      },
      Extent3d {
        width: write.rect.width,
        height: write.rect.height,
        depth_or_array_layers: 1,
      },
    );
    false
  });
}
