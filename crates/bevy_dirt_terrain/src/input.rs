//! Touch and mouse input to edit requests.
//!
//! Device positions are mapped to world space with a [`DeviceTransform`]
//! rebuilt from the [`TerrainCamera`] viewport every frame. Each contact
//! latches dig or fill on press (see [`crate::contact`]) and queues at most
//! one edit per frame into [`PendingEdits`].

use bevy::input::touch::{TouchInput, TouchPhase};
use bevy::math::Vec2;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::config::TerrainConfig;
use crate::contact::{ContactId, ContactTracker, PendingEdits};
use crate::coords::DeviceTransform;
use crate::terrain::{EditBlocked, Terrain, TerrainCamera};

/// Lifecycle step of one contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactPhase {
  Began,
  Moved,
  Ended,
}

impl From<TouchPhase> for ContactPhase {
  fn from(phase: TouchPhase) -> Self {
    match phase {
      TouchPhase::Started => ContactPhase::Began,
      TouchPhase::Moved => ContactPhase::Moved,
      TouchPhase::Ended | TouchPhase::Canceled => ContactPhase::Ended,
    }
  }
}

/// Device-to-world mapping for a camera's current viewport.
pub fn camera_device_transform(
  camera: &Camera,
  camera_transform: &GlobalTransform,
) -> Option<DeviceTransform> {
  let size = camera.logical_viewport_size()?;
  let top_left = camera
    .viewport_to_world_2d(camera_transform, Vec2::ZERO)
    .ok()?;
  let bottom_right = camera.viewport_to_world_2d(camera_transform, size).ok()?;
  DeviceTransform::from_corners(size, top_left, bottom_right)
}

/// Advances one contact and queues the edit it asks for.
///
/// `world` is `None` when the contact could not be mapped (no camera); a
/// begin without a position cannot latch and is ignored. Blocked input still
/// releases contacts so none stay latched behind the UI.
#[allow(clippy::too_many_arguments)]
pub fn handle_contact(
  id: ContactId,
  phase: ContactPhase,
  world: Option<Vec2>,
  blocked: bool,
  terrain: &Terrain,
  config: &TerrainConfig,
  tracker: &mut ContactTracker,
  pending: &mut PendingEdits,
) {
  match (phase, world) {
    (ContactPhase::Ended, _) => {
      if tracker.end(id).is_some() {
        trace!("Contact {:?} released", id);
      }
    }
    (_, None) => {}
    (_, Some(_)) if blocked => {}
    (ContactPhase::Began, Some(world)) => {
      let density = terrain.sample(world);
      let request = tracker.begin(id, world, density, config.dig_threshold);
      debug!(
        "Contact {:?} began at {:?} (density {:.2}): {:?}",
        id, world, density, request.mode
      );
      pending.push(request);
    }
    (ContactPhase::Moved, Some(world)) => {
      if let Some(request) = tracker.moved(id, world) {
        pending.push(request);
      }
    }
  }
}

/// System: reads touches and the left mouse button into [`PendingEdits`].
#[allow(clippy::too_many_arguments)]
pub(crate) fn gather_contacts(
  config: Res<TerrainConfig>,
  terrain: Option<Res<Terrain>>,
  blocked: Option<Res<EditBlocked>>,
  mut touches: MessageReader<TouchInput>,
  mouse_buttons: Option<Res<ButtonInput<MouseButton>>>,
  windows: Query<&Window, With<PrimaryWindow>>,
  cameras: Query<(&Camera, &GlobalTransform), With<TerrainCamera>>,
  mut tracker: ResMut<ContactTracker>,
  mut pending: ResMut<PendingEdits>,
) {
  let Some(terrain) = terrain else {
    touches.clear();
    return;
  };
  let blocked = blocked.is_some_and(|b| b.blocked);
  let device = cameras
    .single()
    .ok()
    .and_then(|(camera, transform)| camera_device_transform(camera, transform));
  let to_world = |position: Vec2| device.map(|d| d.device_to_world(position));

  for touch in touches.read() {
    handle_contact(
      ContactId(touch.id),
      touch.phase.into(),
      to_world(touch.position),
      blocked,
      &terrain,
      &config,
      &mut tracker,
      &mut pending,
    );
  }

  let Some(mouse_buttons) = mouse_buttons else {
    return;
  };
  let phases = mouse_phases(&mouse_buttons, MouseButton::Left);
  if phases.is_empty() {
    return;
  }
  let cursor = windows
    .single()
    .ok()
    .and_then(|window| window.cursor_position());
  for &phase in phases {
    handle_contact(
      ContactId::MOUSE,
      phase,
      cursor.and_then(to_world),
      blocked,
      &terrain,
      &config,
      &mut tracker,
      &mut pending,
    );
  }
}

/// Contact phases a mouse button produced this frame, in order.
///
/// A press and release within one frame yields both, so a quick click never
/// leaves the contact latched. If the button ends the frame held, the
/// release came first.
pub fn mouse_phases(
  buttons: &ButtonInput<MouseButton>,
  button: MouseButton,
) -> &'static [ContactPhase] {
  use ContactPhase::*;
  match (
    buttons.just_pressed(button),
    buttons.just_released(button),
    buttons.pressed(button),
  ) {
    (true, true, false) => &[Began, Ended],
    (true, true, true) => &[Ended, Began],
    (true, false, _) => &[Began],
    (false, true, _) => &[Ended],
    (false, false, true) => &[Moved],
    (false, false, false) => &[],
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::coords::FieldTransform;
  use crate::field::{DensityField, EditMode, Stamp};

  fn half_solid_terrain() -> Terrain {
    // Bottom half solid, top half empty.
    let mut field = DensityField::filled(64, 64, 0.0, FieldTransform::IDENTITY, 1.0).unwrap();
    field.paint(
      &Stamp::solid(4),
      Vec2::new(32.0, 16.0),
      40.0,
      EditMode::Add,
    );
    Terrain::new(field, Stamp::solid(4))
  }

  #[test]
  fn press_on_dirt_digs_and_on_air_fills() {
    let terrain = half_solid_terrain();
    let config = TerrainConfig::default();
    let mut tracker = ContactTracker::default();
    let mut pending = PendingEdits::default();

    let dirt = Some(Vec2::new(10.0, 5.0));
    let air = Some(Vec2::new(10.0, 60.0));
    handle_contact(
      ContactId(1),
      ContactPhase::Began,
      dirt,
      false,
      &terrain,
      &config,
      &mut tracker,
      &mut pending,
    );
    handle_contact(
      ContactId(2),
      ContactPhase::Began,
      air,
      false,
      &terrain,
      &config,
      &mut tracker,
      &mut pending,
    );

    let modes: Vec<_> = pending.drain().map(|r| (r.contact, r.mode)).collect();
    assert_eq!(
      modes,
      vec![
        (ContactId(1), EditMode::Remove),
        (ContactId(2), EditMode::Add)
      ]
    );
  }

  #[test]
  fn ended_contact_stops_queueing() {
    let terrain = half_solid_terrain();
    let config = TerrainConfig::default();
    let mut tracker = ContactTracker::default();
    let mut pending = PendingEdits::default();
    let at = Some(Vec2::new(10.0, 5.0));

    for phase in [ContactPhase::Began, ContactPhase::Ended, ContactPhase::Moved] {
      handle_contact(
        ContactId::MOUSE,
        phase,
        at,
        false,
        &terrain,
        &config,
        &mut tracker,
        &mut pending,
      );
    }
    assert_eq!(pending.len(), 1);
    assert_eq!(tracker.active(), 0);
  }

  #[test]
  fn blocked_input_queues_nothing_but_releases() {
    let terrain = half_solid_terrain();
    let config = TerrainConfig::default();
    let mut tracker = ContactTracker::default();
    let mut pending = PendingEdits::default();
    let at = Some(Vec2::new(10.0, 5.0));

    handle_contact(
      ContactId(4),
      ContactPhase::Began,
      at,
      false,
      &terrain,
      &config,
      &mut tracker,
      &mut pending,
    );
    pending.drain();
    handle_contact(
      ContactId(4),
      ContactPhase::Moved,
      at,
      true,
      &terrain,
      &config,
      &mut tracker,
      &mut pending,
    );
    assert!(pending.is_empty());
    handle_contact(
      ContactId(4),
      ContactPhase::Ended,
      None,
      true,
      &terrain,
      &config,
      &mut tracker,
      &mut pending,
    );
    assert_eq!(tracker.active(), 0);
  }

  #[test]
  fn click_within_one_frame_begins_and_ends() {
    let mut buttons = ButtonInput::<MouseButton>::default();
    buttons.press(MouseButton::Left);
    buttons.release(MouseButton::Left);
    assert_eq!(
      mouse_phases(&buttons, MouseButton::Left),
      [ContactPhase::Began, ContactPhase::Ended]
    );

    buttons.clear();
    buttons.press(MouseButton::Left);
    assert_eq!(mouse_phases(&buttons, MouseButton::Left), [ContactPhase::Began]);
    buttons.clear();
    assert_eq!(mouse_phases(&buttons, MouseButton::Left), [ContactPhase::Moved]);
    buttons.release(MouseButton::Left);
    buttons.press(MouseButton::Left);
    assert_eq!(
      mouse_phases(&buttons, MouseButton::Left),
      [ContactPhase::Ended, ContactPhase::Began]
    );
    buttons.clear();
    buttons.release(MouseButton::Left);
    assert_eq!(mouse_phases(&buttons, MouseButton::Left), [ContactPhase::Ended]);
    buttons.clear();
    assert!(mouse_phases(&buttons, MouseButton::Left).is_empty());
  }

  #[test]
  fn quick_click_on_dirt_does_not_latch_next_click() {
    let terrain = half_solid_terrain();
    let config = TerrainConfig::default();
    let mut tracker = ContactTracker::default();
    let mut pending = PendingEdits::default();
    let mut buttons = ButtonInput::<MouseButton>::default();

    let mut click = |at: Vec2, tracker: &mut ContactTracker, pending: &mut PendingEdits| {
      buttons.clear();
      buttons.press(MouseButton::Left);
      buttons.release(MouseButton::Left);
      for &phase in mouse_phases(&buttons, MouseButton::Left) {
        handle_contact(
          ContactId::MOUSE,
          phase,
          Some(at),
          false,
          &terrain,
          &config,
          tracker,
          pending,
        );
      }
    };

    click(Vec2::new(10.0, 5.0), &mut tracker, &mut pending);
    assert_eq!(tracker.active(), 0);
    click(Vec2::new(10.0, 60.0), &mut tracker, &mut pending);

    let modes: Vec<_> = pending.drain().map(|r| r.mode).collect();
    // Same contact id, so the second click replaced the first request.
    assert_eq!(modes, vec![EditMode::Add]);
  }

  #[test]
  fn canceled_touch_ends_contact() {
    assert_eq!(ContactPhase::from(TouchPhase::Canceled), ContactPhase::Ended);
  }
}
