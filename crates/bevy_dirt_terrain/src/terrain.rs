//! The terrain resource and the command that spawns it.

use bevy::math::Vec2;
use bevy::prelude::*;
use bevy::sprite_render::MeshMaterial2d;

use crate::dirty::DirtyRegion;
use crate::field::{DensityField, EditMode, Stamp};
use crate::render::{
  TerrainMaterial, TerrainUniforms, create_density_texture, create_terrain_quad,
};

/// The density field and the GPU handles that mirror it.
///
/// One writer: edits go through [`Terrain::paint`], which keeps the stamp and
/// the field together. The texture handle is absent in headless apps.
#[derive(Resource)]
pub struct Terrain {
  field: DensityField,
  stamp: Stamp,
  texture: Option<Handle<Image>>,
  material: Option<Handle<TerrainMaterial>>,
}

impl Terrain {
  pub fn new(field: DensityField, stamp: Stamp) -> Self {
    Self {
      field,
      stamp,
      texture: None,
      material: None,
    }
  }

  #[inline]
  pub fn field(&self) -> &DensityField {
    &self.field
  }

  #[inline]
  pub fn stamp(&self) -> &Stamp {
    &self.stamp
  }

  pub fn texture(&self) -> Option<&Handle<Image>> {
    self.texture.as_ref()
  }

  pub fn material(&self) -> Option<&Handle<TerrainMaterial>> {
    self.material.as_ref()
  }

  /// Density at a world point (border value outside).
  #[inline]
  pub fn sample(&self, world: Vec2) -> f32 {
    self.field.sample(world)
  }

  /// Applies the terrain stamp at `world` and returns the aligned region it
  /// touched.
  pub fn paint(&mut self, world: Vec2, radius: f32, mode: EditMode) -> DirtyRegion {
    self.field.paint(&self.stamp, world, radius, mode)
  }

  /// World-space bounds of the whole field.
  pub fn world_bounds(&self) -> Rect {
    let transform = self.field.transform();
    Rect::from_corners(
      transform.field_to_world(Vec2::ZERO),
      transform.field_to_world(Vec2::new(
        self.field.width() as f32,
        self.field.height() as f32,
      )),
    )
  }
}

/// Aligned regions edited this frame, waiting for texture sync.
#[derive(Resource, Default, Debug)]
pub struct DirtyRegions {
  regions: Vec<DirtyRegion>,
}

impl DirtyRegions {
  pub fn push(&mut self, region: DirtyRegion) {
    if !region.is_empty() {
      self.regions.push(region);
    }
  }

  pub fn drain(&mut self) -> std::vec::Drain<'_, DirtyRegion> {
    self.regions.drain(..)
  }

  pub fn len(&self) -> usize {
    self.regions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.regions.is_empty()
  }
}

/// The body whose surroundings must always have current collision geometry.
///
/// Round actors only; `radius` drives the nearest-point query used for fill
/// suppression.
#[derive(Component, Clone, Copy, Debug)]
pub struct TrackedActor {
  pub radius: f32,
}

/// A visual that mirrors a physics entity's transform once per frame.
#[derive(Component, Clone, Copy, Debug)]
pub struct ActorVisual {
  pub follows: Entity,
}

/// Marker for the camera whose viewport maps touches to world positions.
#[derive(Component, Default)]
pub struct TerrainCamera;

/// Resource that external UI can insert to swallow pointer input. If absent,
/// edits always proceed.
#[derive(Resource, Default, Debug)]
pub struct EditBlocked {
  pub blocked: bool,
}

/// Marker for the entity rendering the terrain quad.
#[derive(Component)]
pub struct TerrainQuad;

/// Command that installs a [`Terrain`] built from a loaded field.
///
/// When render assets are available it also creates the density texture and
/// spawns the textured quad at the field's world origin. Headless apps with
/// only `Assets<Image>` get the texture without the quad.
///
/// # Example
/// ```ignore
/// fn setup(mut commands: Commands, field: Res<LoadedField>) {
///   commands.queue(SpawnTerrain::new(field.0.clone()).with_stamp(Stamp::disc(64)));
/// }
/// ```
pub struct SpawnTerrain {
  field: DensityField,
  stamp: Stamp,
  detail: Option<Handle<Image>>,
  overlay: Option<Handle<Image>>,
  uniforms: TerrainUniforms,
}

impl SpawnTerrain {
  pub fn new(field: DensityField) -> Self {
    Self {
      field,
      stamp: Stamp::default(),
      detail: None,
      overlay: None,
      uniforms: TerrainUniforms::default(),
    }
  }

  pub fn with_stamp(mut self, stamp: Stamp) -> Self {
    self.stamp = stamp;
    self
  }

  /// Sets the tiled detail and overlay layers.
  pub fn with_layers(mut self, detail: Handle<Image>, overlay: Handle<Image>) -> Self {
    self.detail = Some(detail);
    self.overlay = Some(overlay);
    self
  }

  pub fn with_uniforms(mut self, uniforms: TerrainUniforms) -> Self {
    self.uniforms = uniforms;
    self
  }
}

impl bevy::ecs::system::Command for SpawnTerrain {
  fn apply(self, world: &mut World) {
    let mut terrain = Terrain::new(self.field, self.stamp);

    if let Some(mut images) = world.get_resource_mut::<Assets<Image>>() {
      terrain.texture = Some(create_density_texture(&mut images, &terrain.field));
    }

    let has_render_assets = world.contains_resource::<Assets<Mesh>>()
      && world.contains_resource::<Assets<TerrainMaterial>>();
    if let (true, Some(texture)) = (has_render_assets, terrain.texture.clone()) {
      let size = Vec2::new(terrain.field.width() as f32, terrain.field.height() as f32)
        * terrain.field.transform().texel_size;
      let origin = terrain.field.transform().origin;

      let mesh = world
        .resource_mut::<Assets<Mesh>>()
        .add(create_terrain_quad(size.x, size.y));
      let material = world
        .resource_mut::<Assets<TerrainMaterial>>()
        .add(TerrainMaterial {
          density_texture: Some(texture),
          detail_texture: self.detail,
          overlay_texture: self.overlay,
          uniforms: self.uniforms,
        });
      terrain.material = Some(material.clone());

      world.spawn((
        TerrainQuad,
        Mesh2d(mesh),
        MeshMaterial2d(material),
        Transform::from_translation(origin.extend(0.0)),
      ));
    }

    info!(
      "Terrain spawned: {}x{} texels, texel size {}",
      terrain.field.width(),
      terrain.field.height(),
      terrain.field.transform().texel_size
    );
    world.insert_resource(terrain);
  }
}
