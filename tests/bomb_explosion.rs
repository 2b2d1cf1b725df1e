mod common;

use bevy::prelude::*;

use common::{drain_events, flat_level, sim_app, step};
use nailline_rs::events::HealthChanged;
use nailline_rs::projectile::{ActiveBombs, Bomb, ExplosionQueue, ProjectileKind, ProjectilePool};
use nailline_rs::PlayerCommands;

fn equip_bomb_gun(app: &mut App) {
    app.world_mut()
        .resource_mut::<PlayerCommands>()
        .switch_weapon = true;
    step(app, 0.05);
}

#[test]
fn detonate_all_empties_the_active_registry() {
    let mut app = sim_app(flat_level());
    equip_bomb_gun(&mut app);

    app.world_mut().resource_mut::<PlayerCommands>().fire = true;
    step(&mut app, 0.05);
    assert_eq!(app.world().resource::<ActiveBombs>().0.len(), 1);
    {
        let mut bombs = app.world_mut().query_filtered::<(), With<Bomb>>();
        assert_eq!(bombs.iter(app.world()).count(), 1);
    }

    app.world_mut().resource_mut::<PlayerCommands>().alt_fire = true;
    step(&mut app, 0.05);

    assert!(app.world().resource::<ActiveBombs>().0.is_empty());
    assert_eq!(
        app.world()
            .resource::<ProjectilePool>()
            .live(ProjectileKind::Bomb),
        0,
        "the exploded bomb goes back to the pool"
    );
    let mut bombs = app.world_mut().query_filtered::<(), With<Bomb>>();
    assert_eq!(bombs.iter(app.world()).count(), 0);
}

#[test]
fn nearby_explosion_damages_the_player_with_falloff() {
    let mut app = sim_app(flat_level());
    equip_bomb_gun(&mut app);

    // Fire point blank; the bomb detonates within a couple of units of
    // the player, well inside the 3-unit radius.
    app.world_mut().resource_mut::<PlayerCommands>().fire = true;
    step(&mut app, 0.05);
    app.world_mut().resource_mut::<PlayerCommands>().alt_fire = true;
    step(&mut app, 0.05);

    let changes = drain_events::<HealthChanged>(&mut app);
    assert_eq!(changes.len(), 1);
    assert!(
        changes[0].current < 100.0,
        "an in-radius explosion must deal damage"
    );
    assert!(
        changes[0].current > 50.0,
        "falloff keeps off-center damage below the base 50"
    );
}

#[test]
fn double_detonation_applies_side_effects_once() {
    let mut app = sim_app(flat_level());
    equip_bomb_gun(&mut app);

    app.world_mut().resource_mut::<PlayerCommands>().fire = true;
    step(&mut app, 0.05);
    let bomb = app.world().resource::<ActiveBombs>().0[0];

    // Two triggers in the same tick (e.g. two contacts) queue the bomb
    // twice; the explosion must still resolve once.
    app.world_mut()
        .resource_mut::<ExplosionQueue>()
        .0
        .extend([bomb, bomb]);
    step(&mut app, 0.05);

    let changes = drain_events::<HealthChanged>(&mut app);
    assert_eq!(changes.len(), 1, "one damage application, not two");
}
