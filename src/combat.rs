use bevy::log::warn;
use bevy::prelude::*;

use crate::commands::PlayerCommands;
use crate::events::WeaponEquipped;
use crate::player::Player;
use crate::projectile::{DetonateAll, SpawnProjectile};
use crate::SimSet;

/// Distance from the character center to the muzzle along the aim vector.
const FIRE_POINT_OFFSET: f32 = 0.6;

pub struct CombatPlugin;
impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (update_aim, switch_weapons, fire_weapons, alt_fire)
                .chain()
                .in_set(SimSet::Combat),
        );
    }
}

/// Weapon-specific behavior as a tagged variant; dispatch happens where
/// the projectile is spawned.
#[derive(Clone, Debug)]
pub enum WeaponKind {
    NailGun { nail_speed: f32, nail_lifetime: f32 },
    BombGun {
        launch_force: f32,
        explosion_radius: f32,
        explosion_force: f32,
    },
}

#[derive(Clone, Debug)]
pub struct Weapon {
    pub name: String,
    pub damage: f32,
    /// Maximum sustained shots per second.
    pub fire_rate: f32,
    pub last_fire_time: f32,
    /// Unit aim vector, unclamped.
    pub aim: Vec2,
    pub kind: WeaponKind,
}

impl Weapon {
    pub fn nail_gun() -> Self {
        Self {
            name: "Nail Gun".into(),
            damage: 15.0,
            fire_rate: 2.0,
            last_fire_time: f32::NEG_INFINITY,
            aim: Vec2::X,
            kind: WeaponKind::NailGun {
                nail_speed: 15.0,
                nail_lifetime: 2.0,
            },
        }
    }

    pub fn bomb_gun() -> Self {
        Self {
            name: "Bomb Gun".into(),
            damage: 50.0,
            fire_rate: 0.5,
            last_fire_time: f32::NEG_INFINITY,
            aim: Vec2::X,
            kind: WeaponKind::BombGun {
                launch_force: 10.0,
                explosion_radius: 3.0,
                explosion_force: 500.0,
            },
        }
    }

    pub fn can_fire(&self, now: f32) -> bool {
        now >= self.last_fire_time + 1.0 / self.fire_rate
    }

    /// Zero-length aim input keeps the previous direction.
    pub fn update_aim(&mut self, direction: Vec2) {
        if let Some(unit) = direction.try_normalize() {
            self.aim = unit;
        }
    }
}

/// The character's weapon rack; the equipped slot is `index`.
#[derive(Component, Default)]
pub struct WeaponSlots {
    pub weapons: Vec<Weapon>,
    pub index: usize,
}

impl WeaponSlots {
    pub fn with_loadout(weapons: Vec<Weapon>) -> Self {
        Self { weapons, index: 0 }
    }

    pub fn current(&self) -> Option<&Weapon> {
        self.weapons.get(self.index)
    }

    pub fn current_mut(&mut self) -> Option<&mut Weapon> {
        self.weapons.get_mut(self.index)
    }

    /// Append and select.
    pub fn equip(&mut self, weapon: Weapon) {
        self.weapons.push(weapon);
        self.index = self.weapons.len() - 1;
    }

    /// Cycle the equipped index; a single weapon (or none) is a no-op.
    /// Returns true when the selection changed.
    pub fn switch(&mut self) -> bool {
        if self.weapons.len() < 2 {
            return false;
        }
        self.index = (self.index + 1) % self.weapons.len();
        true
    }
}

fn update_aim(
    commands: Res<PlayerCommands>,
    mut players: Query<(&Transform, &Player, &mut WeaponSlots)>,
) {
    let Some(target) = commands.aim_target else {
        return;
    };
    for (transform, player, mut slots) in &mut players {
        if player.is_dead() {
            continue;
        }
        let direction = target - transform.translation.truncate();
        if let Some(weapon) = slots.current_mut() {
            weapon.update_aim(direction);
        }
    }
}

fn switch_weapons(
    commands: Res<PlayerCommands>,
    mut players: Query<(&Player, &mut WeaponSlots)>,
    mut equipped: EventWriter<WeaponEquipped>,
) {
    if !commands.switch_weapon {
        return;
    }
    for (player, mut slots) in &mut players {
        if player.is_dead() {
            continue;
        }
        if slots.switch() {
            if let Some(weapon) = slots.current() {
                equipped.send(WeaponEquipped {
                    name: weapon.name.clone(),
                });
            }
        }
    }
}

pub fn fire_weapons(
    time: Res<Time>,
    commands: Res<PlayerCommands>,
    mut players: Query<(&Transform, &Player, &mut WeaponSlots)>,
    mut spawns: EventWriter<SpawnProjectile>,
) {
    if !commands.fire {
        return;
    }
    let now = time.elapsed_seconds();
    for (transform, player, mut slots) in &mut players {
        if player.is_dead() {
            continue;
        }
        let Some(weapon) = slots.current_mut() else {
            warn!("fire requested with an empty weapon rack");
            continue;
        };
        if !weapon.can_fire(now) {
            continue;
        }
        let origin = transform.translation.truncate() + weapon.aim * FIRE_POINT_OFFSET;
        match weapon.kind {
            WeaponKind::NailGun {
                nail_speed,
                nail_lifetime,
            } => {
                spawns.send(SpawnProjectile::Nail {
                    origin,
                    velocity: weapon.aim * nail_speed,
                    damage: weapon.damage,
                    lifetime: nail_lifetime,
                });
            }
            WeaponKind::BombGun {
                launch_force,
                explosion_radius,
                explosion_force,
            } => {
                spawns.send(SpawnProjectile::Bomb {
                    origin,
                    impulse: weapon.aim * launch_force,
                    damage: weapon.damage,
                    radius: explosion_radius,
                    force: explosion_force,
                });
            }
        }
        weapon.last_fire_time = now;
    }
}

/// The bomb gun's alternative fire detonates every bomb it has in flight;
/// other weapons have no alternative mode.
fn alt_fire(
    commands: Res<PlayerCommands>,
    players: Query<(&Player, &WeaponSlots)>,
    mut detonate: EventWriter<DetonateAll>,
) {
    if !commands.alt_fire {
        return;
    }
    for (player, slots) in &players {
        if player.is_dead() {
            continue;
        }
        if let Some(weapon) = slots.current() {
            if matches!(weapon.kind, WeaponKind::BombGun { .. }) {
                detonate.send(DetonateAll);
            }
        }
    }
}
