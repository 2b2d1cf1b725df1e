// Not every scenario uses every helper.
#![allow(dead_code)]

use std::time::Duration;

use bevy::prelude::*;

use nailline_rs::{LevelData, LevelObject, MotionSpec, ObjectKind, PlatformerSimPlugins};

/// Build a headless session around `level` and run startup (a zero-length
/// first update boots the level and applies the state transition).
pub fn sim_app(level: LevelData) -> App {
    let mut app = App::new();
    app.insert_resource(level);
    app.add_plugins(PlatformerSimPlugins);
    step(&mut app, 0.0);
    app
}

/// Advance the session by one tick of `dt` seconds.
pub fn step(app: &mut App, dt: f32) {
    app.world_mut()
        .resource_mut::<Time>()
        .advance_by(Duration::from_secs_f32(dt));
    app.update();
}

pub fn run(app: &mut App, ticks: usize, dt: f32) {
    for _ in 0..ticks {
        step(app, dt);
    }
}

/// A flat 40-unit floor with a start at (0, 1) and an end at (10, 1).
pub fn flat_level() -> LevelData {
    LevelData {
        name: "flat".into(),
        start_point: Some([0.0, 1.0]),
        end_point: Some([10.0, 1.0]),
        objects: vec![floor()],
    }
}

pub fn floor() -> LevelObject {
    LevelObject {
        kind: ObjectKind::Platform {
            moving: false,
            motion: MotionSpec::Stationary,
            speed: 0.0,
            wait_time: 0.0,
            one_way: false,
        },
        position: [0.0, 0.0],
        scale: [40.0, 1.0],
        rotation: 0.0,
    }
}

pub fn static_platform(position: [f32; 2], scale: [f32; 2]) -> LevelObject {
    LevelObject {
        kind: ObjectKind::Platform {
            moving: false,
            motion: MotionSpec::Stationary,
            speed: 0.0,
            wait_time: 0.0,
            one_way: false,
        },
        position,
        scale,
        rotation: 0.0,
    }
}

pub fn player_entity(app: &mut App) -> Entity {
    let mut query = app.world_mut().query_filtered::<Entity, With<nailline_rs::player::Player>>();
    query.single(app.world())
}

pub fn drain_events<E: Event>(app: &mut App) -> Vec<E> {
    let mut events = app.world_mut().resource_mut::<Events<E>>();
    events.drain().collect()
}
