use bevy::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::events::{HealthChanged, ItemCollected, PlayerDied};
use crate::physics::{layer, Aabb, CollisionLayer, Contacts, GravityScale, Velocity};
use crate::player::{DamageOutcome, Player};
use crate::DamageStage;

const REWARD_SCATTER_RADIUS: f32 = 0.5;

pub struct DamagePlugin;
impl Plugin for DamagePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RewardRng>()
            .add_event::<DamageEvent>()
            .add_event::<DestructibleHit>()
            .add_systems(
                Update,
                (
                    obstacle_contact_damage,
                    fall_out_kill,
                    apply_damage,
                    apply_destructible_hits,
                    collect_pickups,
                )
                    .chain()
                    .in_set(DamageStage::Apply),
            );
    }
}

/// Amount-based damage against a character's health pool.
#[derive(Event, Clone, Copy)]
pub struct DamageEvent {
    pub target: Entity,
    pub amount: f32,
}

/// One destructive event against a hit-counter destructible. Deliberately
/// carries no amount: the hit-counter model is not interchangeable with
/// the character health model.
#[derive(Event, Clone, Copy)]
pub struct DestructibleHit {
    pub target: Entity,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum CollectibleKind {
    DoubleJump,
    Health,
    Coin,
}

#[derive(Component, Clone, Copy)]
pub struct Collectible {
    pub kind: CollectibleKind,
    pub value: f32,
}

/// What a destructible drops when it breaks.
#[derive(Clone, Debug)]
pub enum Reward {
    None,
    /// One pickup exactly at the object's position.
    Single { kind: CollectibleKind, value: f32 },
    /// `count` pickups scattered at small random offsets (coin balloon).
    Scatter {
        kind: CollectibleKind,
        value: f32,
        count: u32,
    },
}

#[derive(Component)]
pub struct Destructible {
    pub hits_left: u32,
    pub reward: Reward,
}

/// Hazard that damages the player on contact-enter. Staying in contact
/// does not re-apply until contact is broken.
#[derive(Component)]
pub struct Obstacle {
    pub damage: f32,
    pub touching: bool,
}

/// Everything below this height is lethal (player fell off the level).
#[derive(Resource)]
pub struct KillPlane(pub f32);

/// Seedable so reward scatter is reproducible in tests.
#[derive(Resource)]
pub struct RewardRng(pub StdRng);

impl Default for RewardRng {
    fn default() -> Self {
        Self(StdRng::from_entropy())
    }
}

fn obstacle_contact_damage(
    contacts: Res<Contacts>,
    players: Query<(), With<Player>>,
    mut obstacles: Query<(Entity, &mut Obstacle)>,
    mut damage: EventWriter<DamageEvent>,
) {
    for (entity, mut obstacle) in &mut obstacles {
        let touched_by = contacts
            .0
            .iter()
            .find(|c| c.other == entity && players.contains(c.entity))
            .map(|c| c.entity);
        match touched_by {
            Some(player) if !obstacle.touching => {
                obstacle.touching = true;
                damage.send(DamageEvent {
                    target: player,
                    amount: obstacle.damage,
                });
            }
            Some(_) => {}
            None => obstacle.touching = false,
        }
    }
}

fn fall_out_kill(
    kill_plane: Option<Res<KillPlane>>,
    players: Query<(Entity, &Transform, &Player)>,
    mut damage: EventWriter<DamageEvent>,
) {
    let Some(kill_plane) = kill_plane else {
        return;
    };
    for (entity, transform, player) in &players {
        if !player.is_dead() && transform.translation.y < kill_plane.0 {
            damage.send(DamageEvent {
                target: entity,
                amount: player.max_health,
            });
        }
    }
}

/// Health clamps into [0, max]; the tick where it first reaches zero runs
/// the death transition exactly once: velocity zeroed, collision volume
/// and gravity removed, one `PlayerDied` emitted.
fn apply_damage(
    mut commands: Commands,
    mut events: EventReader<DamageEvent>,
    mut players: Query<(Entity, &mut Player, &mut Velocity)>,
    mut health_changed: EventWriter<HealthChanged>,
    mut died: EventWriter<PlayerDied>,
) {
    for event in events.read() {
        let Ok((entity, mut player, mut vel)) = players.get_mut(event.target) else {
            continue;
        };
        match player.apply_damage(event.amount) {
            DamageOutcome::Ignored => {}
            DamageOutcome::Damaged(current) => {
                health_changed.send(HealthChanged {
                    current,
                    max: player.max_health,
                });
            }
            DamageOutcome::Fatal => {
                health_changed.send(HealthChanged {
                    current: 0.0,
                    max: player.max_health,
                });
                if player.kill(&mut vel) {
                    commands.entity(entity).remove::<(Aabb, GravityScale)>();
                    died.send(PlayerDied);
                }
            }
        }
    }
}

fn apply_destructible_hits(
    mut commands: Commands,
    mut events: EventReader<DestructibleHit>,
    mut destructibles: Query<(&Transform, &mut Destructible)>,
    mut rng: ResMut<RewardRng>,
) {
    let mut destroyed: HashSet<Entity> = HashSet::new();
    for event in events.read() {
        if destroyed.contains(&event.target) {
            continue;
        }
        let Ok((transform, mut destructible)) = destructibles.get_mut(event.target) else {
            continue;
        };
        if destructible.hits_left == 0 {
            continue;
        }
        destructible.hits_left -= 1;
        if destructible.hits_left > 0 {
            continue;
        }
        destroyed.insert(event.target);

        let pos = transform.translation.truncate();
        match destructible.reward {
            Reward::None => {}
            Reward::Single { kind, value } => spawn_reward(&mut commands, pos, kind, value),
            Reward::Scatter { kind, value, count } => {
                for _ in 0..count {
                    let angle = rng.0.gen::<f32>() * std::f32::consts::TAU;
                    let distance = rng.0.gen::<f32>() * REWARD_SCATTER_RADIUS;
                    spawn_reward(
                        &mut commands,
                        pos + Vec2::from_angle(angle) * distance,
                        kind,
                        value,
                    );
                }
            }
        }
        commands.entity(event.target).despawn();
    }
}

pub fn spawn_reward(commands: &mut Commands, pos: Vec2, kind: CollectibleKind, value: f32) {
    commands.spawn((
        Transform::from_translation(pos.extend(0.0)),
        Aabb {
            half: Vec2::splat(0.15),
        },
        CollisionLayer(layer::COLLECTIBLE),
        Collectible { kind, value },
    ));
}

fn collect_pickups(
    mut commands: Commands,
    contacts: Res<Contacts>,
    mut players: Query<&mut Player>,
    collectibles: Query<&Collectible>,
    mut collected: EventWriter<ItemCollected>,
    mut health_changed: EventWriter<HealthChanged>,
) {
    let mut taken: HashSet<Entity> = HashSet::new();
    for contact in &contacts.0 {
        let Ok(mut player) = players.get_mut(contact.entity) else {
            continue;
        };
        let Ok(collectible) = collectibles.get(contact.other) else {
            continue;
        };
        if !taken.insert(contact.other) {
            continue;
        }

        match collectible.kind {
            CollectibleKind::DoubleJump => player.has_double_jump_powerup = true,
            CollectibleKind::Health => {
                if let Some(current) = player.heal(collectible.value) {
                    health_changed.send(HealthChanged {
                        current,
                        max: player.max_health,
                    });
                }
            }
            // Score keeping is the embedder's concern; the notification
            // carries the value.
            CollectibleKind::Coin => {}
        }
        collected.send(ItemCollected {
            kind: collectible.kind,
            value: collectible.value,
        });
        commands.entity(contact.other).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_app() -> App {
        let mut app = App::new();
        app.add_event::<DestructibleHit>()
            .insert_resource(RewardRng(StdRng::seed_from_u64(7)))
            .add_systems(Update, apply_destructible_hits);
        app
    }

    #[test]
    fn destructible_breaks_after_counted_hits() {
        let mut app = hit_app();
        let crate_box = app
            .world_mut()
            .spawn((
                Transform::from_xyz(2.0, 1.0, 0.0),
                Destructible {
                    hits_left: 2,
                    reward: Reward::Single {
                        kind: CollectibleKind::Health,
                        value: 25.0,
                    },
                },
            ))
            .id();

        app.world_mut().send_event(DestructibleHit { target: crate_box });
        app.update();
        assert_eq!(
            app.world().get::<Destructible>(crate_box).map(|d| d.hits_left),
            Some(1)
        );

        app.world_mut().send_event(DestructibleHit { target: crate_box });
        app.update();
        assert!(app.world().get_entity(crate_box).is_none());

        let mut drops = app.world_mut().query::<&Collectible>();
        let drops: Vec<_> = drops.iter(app.world()).collect();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].kind, CollectibleKind::Health);
        assert_eq!(drops[0].value, 25.0);
    }

    #[test]
    fn scatter_reward_drops_count_pickups() {
        let mut app = hit_app();
        let balloon = app
            .world_mut()
            .spawn((
                Transform::from_xyz(0.0, 4.0, 0.0),
                Destructible {
                    hits_left: 1,
                    reward: Reward::Scatter {
                        kind: CollectibleKind::Coin,
                        value: 1.0,
                        count: 5,
                    },
                },
            ))
            .id();

        app.world_mut().send_event(DestructibleHit { target: balloon });
        app.update();

        let mut drops = app.world_mut().query::<(&Transform, &Collectible)>();
        let mut count = 0;
        for (transform, coin) in drops.iter(app.world()) {
            assert_eq!(coin.kind, CollectibleKind::Coin);
            let offset = transform.translation.truncate() - Vec2::new(0.0, 4.0);
            assert!(offset.length() <= REWARD_SCATTER_RADIUS + f32::EPSILON);
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn hits_after_destruction_are_ignored() {
        let mut app = hit_app();
        let crate_box = app
            .world_mut()
            .spawn((
                Transform::default(),
                Destructible {
                    hits_left: 1,
                    reward: Reward::None,
                },
            ))
            .id();

        // Two hits land on the same tick; only the first counts.
        app.world_mut().send_event(DestructibleHit { target: crate_box });
        app.world_mut().send_event(DestructibleHit { target: crate_box });
        app.update();

        let mut drops = app.world_mut().query::<&Collectible>();
        assert_eq!(drops.iter(app.world()).count(), 0);
        assert!(app.world().get_entity(crate_box).is_none());
    }
}
