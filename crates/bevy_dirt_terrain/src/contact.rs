//! Per-contact dig/fill intent.
//!
//! Each touch (or the mouse) is a contact. When a contact begins, the density
//! under it decides whether it digs or fills; the decision is latched until
//! the contact ends. A contact absent from the tracker is idle.

use std::collections::HashMap;

use bevy::math::Vec2;
use bevy::prelude::*;

use crate::field::EditMode;

/// Stable identifier of one touch/pointer contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(pub u64);

impl ContactId {
  /// Reserved id for the mouse pointer.
  pub const MOUSE: Self = Self(u64::MAX);
}

/// Latched intent of an active contact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactState {
  pub mode: EditMode,
  /// Where this contact last changed the terrain.
  pub last_edit: Option<Vec2>,
}

/// An edit a contact wants applied this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EditRequest {
  pub contact: ContactId,
  pub world: Vec2,
  pub mode: EditMode,
}

/// Chooses the edit mode for a contact starting over `density`.
#[inline]
pub fn mode_for_density(density: f32, dig_threshold: f32) -> EditMode {
  if density >= dig_threshold {
    EditMode::Remove
  } else {
    EditMode::Add
  }
}

/// Closest point of a round actor to `point`.
///
/// Points inside the actor are their own nearest point.
pub fn nearest_point_on_actor(center: Vec2, radius: f32, point: Vec2) -> Vec2 {
  let offset = point - center;
  if offset.length() <= radius {
    return point;
  }
  center + offset.normalize_or_zero() * radius
}

/// True if an edit at `point` must be skipped because it would add material
/// within `exclusion_radius` of the actor.
pub fn fill_blocked(
  mode: EditMode,
  point: Vec2,
  actor_nearest: Option<Vec2>,
  exclusion_radius: f32,
) -> bool {
  mode == EditMode::Add
    && actor_nearest.is_some_and(|nearest| nearest.distance(point) < exclusion_radius)
}

/// All active contacts, keyed by id.
#[derive(Resource, Default, Debug)]
pub struct ContactTracker {
  contacts: HashMap<ContactId, ContactState>,
}

impl ContactTracker {
  /// Starts a contact, latching its mode from the density under it.
  ///
  /// A repeated begin for a live contact keeps the original latch.
  pub fn begin(
    &mut self,
    id: ContactId,
    world: Vec2,
    density: f32,
    dig_threshold: f32,
  ) -> EditRequest {
    let state = self.contacts.entry(id).or_insert_with(|| ContactState {
      mode: mode_for_density(density, dig_threshold),
      last_edit: None,
    });
    EditRequest {
      contact: id,
      world,
      mode: state.mode,
    }
  }

  /// Drag update; returns the request with the latched mode, or `None` for
  /// an unknown contact.
  pub fn moved(&self, id: ContactId, world: Vec2) -> Option<EditRequest> {
    self.contacts.get(&id).map(|state| EditRequest {
      contact: id,
      world,
      mode: state.mode,
    })
  }

  /// Ends a contact. Returns its final state if it was active.
  pub fn end(&mut self, id: ContactId) -> Option<ContactState> {
    self.contacts.remove(&id)
  }

  pub fn get(&self, id: ContactId) -> Option<&ContactState> {
    self.contacts.get(&id)
  }

  pub fn active(&self) -> usize {
    self.contacts.len()
  }

  /// True unless the contact's previous edit is closer than `min_distance`.
  pub fn far_enough(&self, request: &EditRequest, min_distance: f32) -> bool {
    match self.contacts.get(&request.contact).and_then(|s| s.last_edit) {
      Some(last) => last.distance(request.world) >= min_distance,
      None => true,
    }
  }

  /// Records that `request` changed the terrain.
  pub fn record_edit(&mut self, request: &EditRequest) {
    if let Some(state) = self.contacts.get_mut(&request.contact) {
      state.last_edit = Some(request.world);
    }
  }
}

/// Edits gathered from input this frame, at most one per contact.
#[derive(Resource, Default, Debug)]
pub struct PendingEdits {
  requests: Vec<EditRequest>,
}

impl PendingEdits {
  /// Queues a request, replacing an earlier one from the same contact.
  pub fn push(&mut self, request: EditRequest) {
    if let Some(existing) = self.requests.iter_mut().find(|r| r.contact == request.contact) {
      *existing = request;
    } else {
      self.requests.push(request);
    }
  }

  pub fn drain(&mut self) -> std::vec::Drain<'_, EditRequest> {
    self.requests.drain(..)
  }

  pub fn len(&self) -> usize {
    self.requests.len()
  }

  pub fn is_empty(&self) -> bool {
    self.requests.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mode_latches_on_begin() {
    let mut tracker = ContactTracker::default();
    let id = ContactId(3);
    let req = tracker.begin(id, Vec2::ZERO, 0.9, 0.5);
    assert_eq!(req.mode, EditMode::Remove);

    // Dragging into empty space keeps digging.
    let drag = tracker.moved(id, Vec2::new(10.0, 0.0)).unwrap();
    assert_eq!(drag.mode, EditMode::Remove);

    // A second begin does not re-evaluate.
    let again = tracker.begin(id, Vec2::ZERO, 0.0, 0.5);
    assert_eq!(again.mode, EditMode::Remove);
  }

  #[test]
  fn threshold_is_inclusive() {
    assert_eq!(mode_for_density(0.5, 0.5), EditMode::Remove);
    assert_eq!(mode_for_density(0.49, 0.5), EditMode::Add);
  }

  #[test]
  fn concurrent_contacts_are_independent() {
    let mut tracker = ContactTracker::default();
    tracker.begin(ContactId(1), Vec2::ZERO, 1.0, 0.5);
    tracker.begin(ContactId(2), Vec2::ZERO, 0.0, 0.5);
    assert_eq!(tracker.active(), 2);
    assert_eq!(tracker.get(ContactId(1)).unwrap().mode, EditMode::Remove);
    assert_eq!(tracker.get(ContactId(2)).unwrap().mode, EditMode::Add);

    tracker.end(ContactId(1));
    assert!(tracker.moved(ContactId(1), Vec2::ONE).is_none());
    assert!(tracker.moved(ContactId(2), Vec2::ONE).is_some());
  }

  #[test]
  fn release_then_press_re_evaluates() {
    let mut tracker = ContactTracker::default();
    tracker.begin(ContactId::MOUSE, Vec2::ZERO, 1.0, 0.5);
    tracker.end(ContactId::MOUSE);
    let req = tracker.begin(ContactId::MOUSE, Vec2::ZERO, 0.1, 0.5);
    assert_eq!(req.mode, EditMode::Add);
  }

  #[test]
  fn min_distance_gates_repeated_edits() {
    let mut tracker = ContactTracker::default();
    let first = tracker.begin(ContactId(0), Vec2::ZERO, 1.0, 0.5);
    assert!(tracker.far_enough(&first, 4.0));
    tracker.record_edit(&first);

    let near = tracker.moved(ContactId(0), Vec2::new(3.0, 0.0)).unwrap();
    assert!(!tracker.far_enough(&near, 4.0));
    let far = tracker.moved(ContactId(0), Vec2::new(4.0, 0.0)).unwrap();
    assert!(tracker.far_enough(&far, 4.0));
  }

  #[test]
  fn fill_near_actor_is_blocked() {
    let nearest = nearest_point_on_actor(Vec2::ZERO, 10.0, Vec2::new(30.0, 0.0));
    assert_eq!(nearest, Vec2::new(10.0, 0.0));
    assert!(fill_blocked(EditMode::Add, Vec2::new(30.0, 0.0), Some(nearest), 25.0));
    assert!(!fill_blocked(EditMode::Add, Vec2::new(30.0, 0.0), Some(nearest), 20.0));
    // Digging near the actor is always allowed.
    assert!(!fill_blocked(EditMode::Remove, Vec2::new(30.0, 0.0), Some(nearest), 25.0));
    // No actor, no suppression.
    assert!(!fill_blocked(EditMode::Add, Vec2::ZERO, None, 25.0));
  }

  #[test]
  fn point_inside_actor_is_its_own_nearest() {
    let p = Vec2::new(2.0, 1.0);
    assert_eq!(nearest_point_on_actor(Vec2::ZERO, 10.0, p), p);
  }

  #[test]
  fn pending_keeps_latest_per_contact() {
    let mut pending = PendingEdits::default();
    let mk = |id, x| EditRequest {
      contact: ContactId(id),
      world: Vec2::new(x, 0.0),
      mode: EditMode::Remove,
    };
    pending.push(mk(1, 0.0));
    pending.push(mk(2, 5.0));
    pending.push(mk(1, 9.0));
    let drained: Vec<EditRequest> = pending.drain().collect();
    assert_eq!(drained, vec![mk(1, 9.0), mk(2, 5.0)]);
    assert!(pending.is_empty());
  }
}
