mod material;
mod texture;
mod upload;

pub use material::{TerrainMaterial, TerrainUniforms};
pub use texture::{
  SyncError, TextureSync, create_density_texture, create_terrain_quad, density_image,
  read_texture_region, repeat_sampler,
};
pub(crate) use upload::{QueuedTextureWrites, extract_texture_writes, write_texture_regions};
