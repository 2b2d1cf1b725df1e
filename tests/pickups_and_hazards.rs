mod common;

use bevy::prelude::*;

use common::{drain_events, player_entity, run, sim_app, step};
use nailline_rs::damage::CollectibleKind;
use nailline_rs::events::{HealthChanged, ItemCollected};
use nailline_rs::player::Player;
use nailline_rs::{LevelData, LevelObject, ObjectKind, PlayerCommands};

fn walkway(extra: Vec<LevelObject>) -> LevelData {
    let mut objects = vec![common::floor()];
    objects.extend(extra);
    LevelData {
        name: "walkway".into(),
        start_point: Some([0.0, 1.0]),
        end_point: Some([30.0, 1.0]),
        objects,
    }
}

fn walk_right(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        app.world_mut().resource_mut::<PlayerCommands>().move_axis = 1.0;
        step(app, 0.05);
    }
}

#[test]
fn double_jump_pickup_arms_the_powerup() {
    let mut app = sim_app(walkway(vec![LevelObject {
        kind: ObjectKind::Collectible {
            kind: CollectibleKind::DoubleJump,
            value: 0.0,
        },
        position: [2.0, 1.0],
        scale: [0.5, 0.5],
        rotation: 0.0,
    }]));
    let player = player_entity(&mut app);

    let mut collected = Vec::new();
    for _ in 0..40 {
        app.world_mut().resource_mut::<PlayerCommands>().move_axis = 1.0;
        step(&mut app, 0.05);
        collected.extend(drain_events::<ItemCollected>(&mut app));
    }

    assert_eq!(collected.len(), 1, "the pickup is consumed once");
    assert_eq!(collected[0].kind, CollectibleKind::DoubleJump);
    assert!(
        app.world().get::<Player>(player).unwrap().has_double_jump_powerup,
        "pickup arms the double jump"
    );
}

#[test]
fn health_pickup_heals_and_notifies() {
    let mut app = sim_app(walkway(vec![LevelObject {
        kind: ObjectKind::Collectible {
            kind: CollectibleKind::Health,
            value: 20.0,
        },
        position: [2.0, 1.0],
        scale: [0.5, 0.5],
        rotation: 0.0,
    }]));
    let player = player_entity(&mut app);

    app.world_mut().send_event(nailline_rs::damage::DamageEvent {
        target: player,
        amount: 30.0,
    });
    step(&mut app, 0.05);
    drain_events::<HealthChanged>(&mut app);

    let mut changes = Vec::new();
    for _ in 0..40 {
        app.world_mut().resource_mut::<PlayerCommands>().move_axis = 1.0;
        step(&mut app, 0.05);
        changes.extend(drain_events::<HealthChanged>(&mut app));
    }

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].current, 90.0);
    assert_eq!(app.world().get::<Player>(player).unwrap().health, 90.0);
}

#[test]
fn obstacle_damages_on_contact_enter_only() {
    let mut app = sim_app(walkway(vec![LevelObject {
        kind: ObjectKind::Obstacle {
            damage: 10.0,
            destructible: false,
            hits: 0,
        },
        position: [2.0, 1.0],
        scale: [0.5, 1.0],
        rotation: 0.0,
    }]));
    let player = player_entity(&mut app);

    // Walk into the hazard, then stand still inside it.
    walk_right(&mut app, 8);
    run(&mut app, 20, 0.05);

    let health = app.world().get::<Player>(player).unwrap().health;
    assert_eq!(
        health, 90.0,
        "staying in contact applies the damage exactly once"
    );
}
