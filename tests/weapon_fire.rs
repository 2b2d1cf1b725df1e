mod common;

use bevy::prelude::*;

use common::{drain_events, flat_level, player_entity, sim_app, step};
use nailline_rs::combat::WeaponSlots;
use nailline_rs::events::WeaponEquipped;
use nailline_rs::projectile::Nail;
use nailline_rs::PlayerCommands;

#[test]
fn nail_gun_shots_are_bounded_by_fire_rate() {
    let mut app = sim_app(flat_level());

    // Hold the trigger for 1.5 s. At 2 shots/s that allows at most
    // floor(1.5 * 2) + 1 = 4 nails, and the nails outlive the window
    // (2 s lifetime), so counting live nails counts shots.
    for _ in 0..30 {
        app.world_mut().resource_mut::<PlayerCommands>().fire = true;
        step(&mut app, 0.05);
    }

    let mut nails = app.world_mut().query_filtered::<(), With<Nail>>();
    let count = nails.iter(app.world()).count();
    assert!(count <= 4, "{count} nails fired, rate allows at most 4");
    assert!(count >= 2, "sustained fire should land more than one shot");
}

#[test]
fn switching_weapons_cycles_and_notifies() {
    let mut app = sim_app(flat_level());
    let player = player_entity(&mut app);
    drain_events::<WeaponEquipped>(&mut app);

    app.world_mut()
        .resource_mut::<PlayerCommands>()
        .switch_weapon = true;
    step(&mut app, 0.05);

    let equipped = drain_events::<WeaponEquipped>(&mut app);
    assert_eq!(equipped.len(), 1);
    assert_eq!(equipped[0].name, "Bomb Gun");

    // Cycling again wraps back to the first slot.
    app.world_mut()
        .resource_mut::<PlayerCommands>()
        .switch_weapon = true;
    step(&mut app, 0.05);
    let equipped = drain_events::<WeaponEquipped>(&mut app);
    assert_eq!(equipped[0].name, "Nail Gun");

    let slots = app.world().get::<WeaponSlots>(player).unwrap();
    assert_eq!(slots.index, 0);
}

#[test]
fn dead_player_cannot_fire() {
    let mut app = sim_app(flat_level());
    let player = player_entity(&mut app);

    app.world_mut().send_event(nailline_rs::damage::DamageEvent {
        target: player,
        amount: 1000.0,
    });
    step(&mut app, 0.05);

    app.world_mut().resource_mut::<PlayerCommands>().fire = true;
    step(&mut app, 0.05);

    let mut nails = app.world_mut().query_filtered::<(), With<Nail>>();
    assert_eq!(nails.iter(app.world()).count(), 0);
}
