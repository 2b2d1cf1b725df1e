use bevy::log::warn;
use bevy::prelude::*;
use std::collections::HashSet;

use crate::damage::{DamageEvent, Destructible, DestructibleHit};
use crate::physics::{layer, Aabb, CollisionLayer, Contacts, GravityScale, OneWay, Solid, Velocity};
use crate::player::Player;
use crate::{DamageStage, SimSet};

const NAIL_HALF: Vec2 = Vec2::new(0.12, 0.04);
/// Collider a stuck nail exposes as a one-way platform, wider than the
/// nail itself so it is standable.
const NAIL_PLATFORM_HALF: Vec2 = Vec2::new(0.25, 0.05);
const BOMB_HALF: Vec2 = Vec2::new(0.15, 0.15);
/// Bombs that never touch anything still detonate eventually.
const BOMB_FUSE_SECONDS: f32 = 5.0;

pub struct ProjectilePlugin;
impl Plugin for ProjectilePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ProjectilePool>()
            .init_resource::<ActiveBombs>()
            .init_resource::<ExplosionQueue>()
            .add_event::<SpawnProjectile>()
            .add_event::<DetonateAll>()
            .add_systems(
                Update,
                spawn_projectiles
                    .in_set(SimSet::Combat)
                    .after(crate::combat::fire_weapons),
            )
            .add_systems(
                Update,
                (
                    tick_projectiles,
                    resolve_nails,
                    collect_detonations,
                    apply_explosions,
                )
                    .chain()
                    .in_set(DamageStage::Projectiles),
            );
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProjectileKind {
    Nail,
    Bomb,
}

#[derive(Component)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub damage: f32,
    pub lifetime: Timer,
}

#[derive(Component)]
pub struct Nail;

#[derive(Component)]
pub struct Bomb {
    pub radius: f32,
    pub force: f32,
    /// Terminal; explosion side effects apply at most once.
    pub exploded: bool,
}

/// Attachment to the struck surface; the carrier keeps
/// `translation = anchor + offset` so the nail rides a moving anchor.
#[derive(Component)]
pub struct Stuck {
    pub anchor: Entity,
    pub offset: Vec2,
}

#[derive(Event, Clone)]
pub enum SpawnProjectile {
    Nail {
        origin: Vec2,
        velocity: Vec2,
        damage: f32,
        lifetime: f32,
    },
    Bomb {
        origin: Vec2,
        impulse: Vec2,
        damage: f32,
        radius: f32,
        force: f32,
    },
}

/// Force-detonate every bomb in the active registry.
#[derive(Event, Default)]
pub struct DetonateAll;

/// Bombs in flight, in spawn order; cleared by detonate-all.
#[derive(Resource, Default)]
pub struct ActiveBombs(pub Vec<Entity>);

/// Bombs queued to explode this tick (contact, fuse, or detonate-all).
/// Duplicates are fine; the exploded flag guards re-entry.
#[derive(Resource, Default)]
pub struct ExplosionQueue(pub Vec<Entity>);

/// Bounded reuse of projectile entities. A released instance is stripped
/// of every projectile component, so reuse can never observe stale
/// stuck/exploded state.
#[derive(Resource)]
pub struct ProjectilePool {
    free_nails: Vec<Entity>,
    free_bombs: Vec<Entity>,
    live_nails: usize,
    live_bombs: usize,
    pub max_per_kind: usize,
}

impl Default for ProjectilePool {
    fn default() -> Self {
        Self {
            free_nails: Vec::new(),
            free_bombs: Vec::new(),
            live_nails: 0,
            live_bombs: 0,
            max_per_kind: 20,
        }
    }
}

impl ProjectilePool {
    pub fn live(&self, kind: ProjectileKind) -> usize {
        match kind {
            ProjectileKind::Nail => self.live_nails,
            ProjectileKind::Bomb => self.live_bombs,
        }
    }

    /// Reuse a free entity or allocate while under the cap; `None` when
    /// the pool is saturated.
    pub fn acquire(&mut self, kind: ProjectileKind, commands: &mut Commands) -> Option<Entity> {
        let (free, live) = match kind {
            ProjectileKind::Nail => (&mut self.free_nails, &mut self.live_nails),
            ProjectileKind::Bomb => (&mut self.free_bombs, &mut self.live_bombs),
        };
        let entity = if let Some(entity) = free.pop() {
            entity
        } else if *live + free.len() < self.max_per_kind {
            commands.spawn_empty().id()
        } else {
            return None;
        };
        *live += 1;
        Some(entity)
    }

    pub fn release(&mut self, kind: ProjectileKind, entity: Entity, commands: &mut Commands) {
        commands.entity(entity).remove::<(
            Transform,
            Velocity,
            GravityScale,
            Aabb,
            CollisionLayer,
            Projectile,
            Nail,
            Bomb,
            Stuck,
            OneWay,
            Solid,
        )>();
        let (free, live) = match kind {
            ProjectileKind::Nail => (&mut self.free_nails, &mut self.live_nails),
            ProjectileKind::Bomb => (&mut self.free_bombs, &mut self.live_bombs),
        };
        *live = live.saturating_sub(1);
        free.push(entity);
    }
}

/// Linear falloff: full damage at the center, zero at the radius boundary
/// and beyond.
pub fn explosion_falloff(base_damage: f32, distance: f32, radius: f32) -> f32 {
    base_damage * (1.0 - distance / radius).max(0.0)
}

fn spawn_projectiles(
    mut commands: Commands,
    mut pool: ResMut<ProjectilePool>,
    mut active: ResMut<ActiveBombs>,
    mut spawns: EventReader<SpawnProjectile>,
) {
    for spawn in spawns.read() {
        match *spawn {
            SpawnProjectile::Nail {
                origin,
                velocity,
                damage,
                lifetime,
            } => {
                let Some(entity) = pool.acquire(ProjectileKind::Nail, &mut commands) else {
                    warn!("nail pool saturated; dropping shot");
                    continue;
                };
                commands.entity(entity).insert((
                    Transform::from_translation(origin.extend(0.0)),
                    Velocity(velocity),
                    Aabb { half: NAIL_HALF },
                    CollisionLayer(layer::PROJECTILE),
                    Projectile {
                        kind: ProjectileKind::Nail,
                        damage,
                        lifetime: Timer::from_seconds(lifetime, TimerMode::Once),
                    },
                    Nail,
                ));
            }
            SpawnProjectile::Bomb {
                origin,
                impulse,
                damage,
                radius,
                force,
            } => {
                let Some(entity) = pool.acquire(ProjectileKind::Bomb, &mut commands) else {
                    warn!("bomb pool saturated; dropping shot");
                    continue;
                };
                commands.entity(entity).insert((
                    Transform::from_translation(origin.extend(0.0)),
                    Velocity(impulse),
                    GravityScale(1.0),
                    Aabb { half: BOMB_HALF },
                    CollisionLayer(layer::PROJECTILE),
                    Projectile {
                        kind: ProjectileKind::Bomb,
                        damage,
                        lifetime: Timer::from_seconds(BOMB_FUSE_SECONDS, TimerMode::Once),
                    },
                    Bomb {
                        radius,
                        force,
                        exploded: false,
                    },
                ));
                active.0.push(entity);
            }
        }
    }
}

/// Lifetime timers. Expired nails go back to the pool even when stuck
/// (shedding the platform behavior they gained); expired bombs detonate.
fn tick_projectiles(
    time: Res<Time>,
    mut commands: Commands,
    mut pool: ResMut<ProjectilePool>,
    mut queue: ResMut<ExplosionQueue>,
    mut projectiles: Query<(Entity, &mut Projectile)>,
) {
    for (entity, mut projectile) in &mut projectiles {
        if !projectile.lifetime.tick(time.delta()).just_finished() {
            continue;
        }
        match projectile.kind {
            ProjectileKind::Nail => pool.release(ProjectileKind::Nail, entity, &mut commands),
            ProjectileKind::Bomb => queue.0.push(entity),
        }
    }
}

/// First contact decides a nail's fate: a wooden wall turns it into a
/// one-way platform attached at the impact point, anything else sends it
/// back to the pool (reporting a destructible hit on the way out).
fn resolve_nails(
    mut commands: Commands,
    contacts: Res<Contacts>,
    mut pool: ResMut<ProjectilePool>,
    mut nails: Query<(&Transform, &mut Velocity), (With<Nail>, Without<Stuck>)>,
    anchors: Query<&Transform, Without<Nail>>,
    layers: Query<&CollisionLayer>,
    destructibles: Query<(), With<Destructible>>,
    mut hits: EventWriter<DestructibleHit>,
) {
    let mut handled: HashSet<Entity> = HashSet::new();
    for contact in &contacts.0 {
        if handled.contains(&contact.entity) {
            continue;
        }
        let Ok((transform, mut vel)) = nails.get_mut(contact.entity) else {
            continue;
        };
        handled.insert(contact.entity);

        let wooden = layers
            .get(contact.other)
            .map(|l| l.0 & layer::WOODEN_WALL != 0)
            .unwrap_or(false);
        if wooden {
            vel.0 = Vec2::ZERO;
            let offset = match anchors.get(contact.other) {
                Ok(anchor) => {
                    transform.translation.truncate() - anchor.translation.truncate()
                }
                Err(_) => Vec2::ZERO,
            };
            commands.entity(contact.entity).insert((
                Stuck {
                    anchor: contact.other,
                    offset,
                },
                OneWay,
                Solid,
                Aabb {
                    half: NAIL_PLATFORM_HALF,
                },
                CollisionLayer(layer::GROUND),
            ));
        } else {
            if destructibles.get(contact.other).is_ok() {
                hits.send(DestructibleHit {
                    target: contact.other,
                });
            }
            pool.release(ProjectileKind::Nail, contact.entity, &mut commands);
        }
    }
}

fn collect_detonations(
    contacts: Res<Contacts>,
    mut detonate: EventReader<DetonateAll>,
    mut active: ResMut<ActiveBombs>,
    mut queue: ResMut<ExplosionQueue>,
    bombs: Query<(), With<Bomb>>,
) {
    for contact in &contacts.0 {
        if bombs.contains(contact.entity) {
            queue.0.push(contact.entity);
        }
    }
    if detonate.read().next().is_some() {
        let all: Vec<Entity> = active.0.drain(..).collect();
        queue.0.extend(all);
    }
}

/// Drain the explosion queue: exactly-once damage with linear falloff to
/// every damageable entity in radius, a radial impulse to every physical
/// body, then the bomb returns to the pool.
fn apply_explosions(
    mut commands: Commands,
    mut queue: ResMut<ExplosionQueue>,
    mut pool: ResMut<ProjectilePool>,
    mut active: ResMut<ActiveBombs>,
    mut bombs: Query<(&Transform, &mut Bomb, &Projectile)>,
    targets: Query<
        (Entity, &Transform, Option<&Player>, Option<&Destructible>),
        (Without<Projectile>, Or<(With<Player>, With<Destructible>)>),
    >,
    mut bodies: Query<(&Transform, &mut Velocity), Without<Solid>>,
    mut damage: EventWriter<DamageEvent>,
    mut hits: EventWriter<DestructibleHit>,
) {
    for entity in queue.0.drain(..).collect::<Vec<_>>() {
        let (center, radius, force, base_damage) = {
            let Ok((transform, mut bomb, projectile)) = bombs.get_mut(entity) else {
                continue;
            };
            if bomb.exploded {
                continue;
            }
            bomb.exploded = true;
            (
                transform.translation.truncate(),
                bomb.radius,
                bomb.force,
                projectile.damage,
            )
        };

        for (target, transform, player, destructible) in &targets {
            let distance = transform.translation.truncate().distance(center);
            if distance >= radius {
                continue;
            }
            if player.is_some() {
                damage.send(DamageEvent {
                    target,
                    amount: explosion_falloff(base_damage, distance, radius),
                });
            } else if destructible.is_some() {
                hits.send(DestructibleHit { target });
            }
        }

        for (transform, mut vel) in &mut bodies {
            let delta = transform.translation.truncate() - center;
            let distance = delta.length();
            if distance > radius {
                continue;
            }
            vel.0 += delta.normalize_or_zero() * force;
        }

        active.0.retain(|&bomb| bomb != entity);
        pool.release(ProjectileKind::Bomb, entity, &mut commands);
    }
}
