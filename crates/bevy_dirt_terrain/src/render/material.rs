//! Custom Material2d for terrain rendering.

use bevy::prelude::*;
use bevy::render::render_resource::{AsBindGroup, ShaderType};
use bevy::shader::ShaderRef;
use bevy::sprite_render::{AlphaMode2d, Material2d};

/// Tiling factors for the detail and overlay textures.
#[derive(Clone, Copy, Debug, ShaderType)]
pub struct TerrainUniforms {
  /// Detail texture repeats across the terrain quad.
  pub detail_scale: Vec2,
  /// Overlay texture repeats across the terrain quad.
  pub overlay_scale: Vec2,
}

impl Default for TerrainUniforms {
  fn default() -> Self {
    Self {
      detail_scale: Vec2::splat(8.0),
      overlay_scale: Vec2::splat(2.0),
    }
  }
}

/// Material for the terrain quad.
///
/// The density texture is the alpha mask; detail and overlay are tiled color
/// layers. The camera transform comes from the Mesh2d view binding.
#[derive(Asset, TypePath, AsBindGroup, Clone)]
pub struct TerrainMaterial {
  /// Density alpha mask (R8Unorm, bilinear sampled)
  #[texture(0)]
  #[sampler(1)]
  pub density_texture: Option<Handle<Image>>,

  /// Tiled detail texture (repeat sampler)
  #[texture(2)]
  #[sampler(3)]
  pub detail_texture: Option<Handle<Image>>,

  /// Tiled overlay texture, blended over detail by its alpha
  #[texture(4)]
  #[sampler(5)]
  pub overlay_texture: Option<Handle<Image>>,

  #[uniform(6)]
  pub uniforms: TerrainUniforms,
}

impl Material2d for TerrainMaterial {
  fn fragment_shader() -> ShaderRef {
    "embedded://bevy_dirt_terrain/render/shaders/terrain.wgsl".into()
  }

  fn alpha_mode(&self) -> AlphaMode2d {
    AlphaMode2d::Blend
  }
}
