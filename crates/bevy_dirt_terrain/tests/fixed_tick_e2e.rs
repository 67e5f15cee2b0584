//! E2E tests for the fixed-tick driver.
//!
//! A stand-in "solver" moves the tracked actor one unit per tick in
//! `TickSet::Physics`; a control system records what the geometry window
//! looked like when it ran.
//!
//! Run: cargo test -p bevy_dirt_terrain fixed_tick_e2e

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_dirt_terrain::{
  ActorVisual, DirtTerrainPlugin, GeometryWindow, SimulationClock, TerrainConfig, TerrainSet,
  TerrainTick, TickSet, TileLedger, TrackedActor, advance_fixed_ticks,
};
use rand::prelude::*;

const STEP: f32 = 1.0;

/// Window centers seen by the control stage, one per tick.
#[derive(Resource, Default)]
struct SeenWindows(Vec<Vec2>);

/// Order in which tick stages ran.
#[derive(Resource, Default)]
struct StageLog(Vec<&'static str>);

#[derive(Resource, Default)]
struct ResyncCount(u32);

fn fake_solver(
  mut actors: Query<&mut Transform, With<TrackedActor>>,
  mut log: ResMut<StageLog>,
) {
  for mut transform in &mut actors {
    transform.translation.x += STEP;
  }
  log.0.push("physics");
}

fn record_window(
  ledger: Res<TileLedger>,
  mut seen: ResMut<SeenWindows>,
  mut log: ResMut<StageLog>,
) {
  if let Some(window) = ledger.last_window() {
    seen.0.push(window.center());
  }
  log.0.push("control");
}

fn count_resync(mut count: ResMut<ResyncCount>) {
  count.0 += 1;
}

struct TestHarness {
  app: App,
  actor: Entity,
}

impl TestHarness {
  fn new(config: TerrainConfig) -> Self {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(DirtTerrainPlugin::new(config));

    app
      .init_resource::<SeenWindows>()
      .init_resource::<StageLog>()
      .init_resource::<ResyncCount>()
      .add_systems(TerrainTick, fake_solver.in_set(TickSet::Physics))
      .add_systems(TerrainTick, record_window.in_set(TickSet::Control))
      .add_systems(Update, count_resync.in_set(TerrainSet::Resync));

    let actor = app
      .world_mut()
      .spawn((Transform::default(), TrackedActor { radius: 10.0 }))
      .id();

    Self { app, actor }
  }

  fn advance(&mut self, dt: Duration) -> u32 {
    advance_fixed_ticks(self.app.world_mut(), dt)
  }

  fn clock(&self) -> &SimulationClock {
    self.app.world().resource::<SimulationClock>()
  }

  fn actor_position(&self) -> Vec3 {
    self.app.world().get::<Transform>(self.actor).unwrap().translation
  }
}

#[test]
fn fifty_ms_runs_twelve_ticks() {
  let mut harness = TestHarness::new(TerrainConfig::default());
  let ran = harness.advance(Duration::from_millis(50));
  assert_eq!(ran, 12);
  let clock = harness.clock();
  assert!(clock.accumulator() < clock.tick());
  assert_eq!(harness.actor_position().x, 12.0 * STEP);
}

#[test]
fn ensure_runs_every_tick_before_control_and_physics() {
  let mut harness = TestHarness::new(TerrainConfig::default());
  harness.advance(Duration::from_millis(50));

  let log = &harness.app.world().resource::<StageLog>().0;
  assert_eq!(log.len(), 24);
  for pair in log.chunks(2) {
    assert_eq!(pair, ["control", "physics"]);
  }

  // Each tick's window is centered on the position left by the previous step.
  let seen = &harness.app.world().resource::<SeenWindows>().0;
  let expected: Vec<Vec2> = (0..12).map(|i| Vec2::new(i as f32 * STEP, 0.0)).collect();
  assert_eq!(seen, &expected);
}

#[test]
fn identical_dt_sequences_match() {
  let mut rng = StdRng::seed_from_u64(99);
  let frames: Vec<Duration> = (0..200)
    .map(|_| Duration::from_micros(rng.gen_range(500..60_000)))
    .collect();

  let run = |frames: &[Duration]| {
    let mut harness = TestHarness::new(TerrainConfig::default());
    let ticks: Vec<u32> = frames.iter().map(|&dt| harness.advance(dt)).collect();
    let clock = harness.clock().clone();
    (ticks, clock.elapsed(), clock.ticks(), harness.actor_position())
  };

  assert_eq!(run(&frames), run(&frames));
}

#[test]
fn catch_up_is_bounded() {
  let mut harness = TestHarness::new(TerrainConfig::default());
  let ran = harness.advance(Duration::from_secs(2));
  assert_eq!(ran, 24);
  assert!(harness.clock().dropped() > Duration::ZERO);

  let unbounded = TerrainConfig {
    max_catch_up_ticks: Some(0),
    ..Default::default()
  };
  let mut harness = TestHarness::new(unbounded);
  assert_eq!(harness.advance(Duration::from_secs(2)), 480);
}

#[test]
fn geometry_window_follows_actor() {
  let mut harness = TestHarness::new(TerrainConfig::default());
  harness.advance(Duration::from_millis(50));

  let ledger = harness.app.world().resource::<TileLedger>();
  // The last ensure ran before the twelfth step.
  assert_eq!(ledger.last_window().unwrap().center(), Vec2::new(11.0 * STEP, 0.0));
  let under_actor = ledger
    .tiles_in(Rect::from_center_size(harness.actor_position().truncate(), Vec2::ZERO))
    .next()
    .unwrap();
  assert!(ledger.is_current(under_actor));

  // Catch-up repeats of the same window add nothing.
  let mut settled = TileLedger::new(ledger.tile_size());
  let window = ledger.last_window().unwrap();
  settled.ensure_rect(window);
  let built = settled.take_regenerated().len();
  for _ in 0..5 {
    settled.ensure_rect(window);
  }
  assert!(settled.take_regenerated().is_empty());
  assert_eq!(settled.len(), built);
}

#[test]
fn several_actors_leave_window_unset() {
  let mut harness = TestHarness::new(TerrainConfig::default());
  harness
    .app
    .world_mut()
    .spawn((Transform::from_xyz(500.0, 0.0, 0.0), TrackedActor { radius: 4.0 }));
  harness.advance(Duration::from_millis(50));

  let ledger = harness.app.world().resource::<TileLedger>();
  assert!(ledger.last_window().is_none());
  assert!(ledger.is_empty());
  // Ticks still run; only the window is skipped.
  assert_eq!(harness.clock().ticks(), 12);
}

#[test]
fn visuals_resync_once_per_frame() {
  let mut harness = TestHarness::new(TerrainConfig::default());
  harness
    .app
    .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(50)));
  let visual = harness
    .app
    .world_mut()
    .spawn((
      Transform::from_xyz(0.0, 0.0, 5.0),
      ActorVisual {
        follows: harness.actor,
      },
    ))
    .id();

  // First frame has zero delta; second runs a full 50 ms.
  harness.app.update();
  harness.app.update();

  assert_eq!(harness.clock().ticks(), 12);
  assert_eq!(harness.app.world().resource::<ResyncCount>().0, 2);

  let visual_pos = harness.app.world().get::<Transform>(visual).unwrap().translation;
  assert_eq!(visual_pos, Vec3::new(12.0 * STEP, 0.0, 5.0));
}
