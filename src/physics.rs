use bevy::prelude::*;

use crate::damage::{Collectible, Obstacle};
use crate::player::Player;
use crate::projectile::{Projectile, Stuck};
use crate::SimSet;

/// Minimal built-in physics collaborator: gravity + velocity integration,
/// AABB solids with push-out, and a per-tick contact list with normals
/// consumed synchronously by locomotion, platform attachment, and damage
/// resolution.
pub struct PhysicsPlugin;
impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Gravity(-30.0))
            .init_resource::<Contacts>()
            .add_systems(
                Update,
                (integrate, resolve_solids).chain().in_set(SimSet::Physics),
            )
            .add_systems(Update, collect_overlaps.in_set(SimSet::Collision));
    }
}

/// Collision layer bits. An entity's `CollisionLayer` may carry several.
pub mod layer {
    pub const GROUND: u32 = 1 << 0;
    pub const WOODEN_WALL: u32 = 1 << 1;
    pub const PLAYER: u32 = 1 << 2;
    pub const PROJECTILE: u32 = 1 << 3;
    pub const OBSTACLE: u32 = 1 << 4;
    pub const COLLECTIBLE: u32 = 1 << 5;
    pub const DESTRUCTIBLE: u32 = 1 << 6;

    /// Layers a projectile in flight reports contacts against.
    pub const PROJECTILE_TARGETS: u32 = GROUND | WOODEN_WALL | OBSTACLE | DESTRUCTIBLE;
}

#[derive(Resource)]
pub struct Gravity(pub f32);

#[derive(Component, Default, Clone, Copy, Debug)]
pub struct Velocity(pub Vec2);

/// Gravity multiplier; entities without it (nails, platforms) ignore
/// gravity entirely.
#[derive(Component, Clone, Copy)]
pub struct GravityScale(pub f32);

#[derive(Component, Clone, Copy, Debug)]
pub struct Aabb {
    pub half: Vec2,
}

#[derive(Component, Clone, Copy)]
pub struct CollisionLayer(pub u32);

/// Static collision geometry. Movers are pushed out of these.
#[derive(Component)]
pub struct Solid;

/// Solid only when approached from above with downward velocity.
#[derive(Component)]
pub struct OneWay;

/// A single contact discovered this tick. `normal` points from `other`
/// toward `entity`, so a player landing on a platform sees `normal.y > 0`.
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    pub entity: Entity,
    pub other: Entity,
    pub normal: Vec2,
}

/// Rebuilt every tick; ordering within the tick is the discovery order
/// (solid resolution first, then sensor overlaps).
#[derive(Resource, Default)]
pub struct Contacts(pub Vec<Contact>);

/// Penetration vector that moves box `a` out of box `b` along the axis of
/// least penetration, or `None` when they do not overlap.
pub fn overlap(pa: Vec2, ha: Vec2, pb: Vec2, hb: Vec2) -> Option<Vec2> {
    let d = pa - pb;
    let ox = ha.x + hb.x - d.x.abs();
    if ox <= 0.0 {
        return None;
    }
    let oy = ha.y + hb.y - d.y.abs();
    if oy <= 0.0 {
        return None;
    }
    if ox < oy {
        Some(Vec2::new(ox * d.x.signum(), 0.0))
    } else {
        Some(Vec2::new(0.0, oy * d.y.signum()))
    }
}

/// Short downward probe under the feet box. Always computed fresh from
/// the solids passed in; never cached across frames.
pub fn probe_ground<I>(pos: Vec2, half: Vec2, probe: f32, solids: I) -> bool
where
    I: IntoIterator<Item = (Vec2, Vec2)>,
{
    let center = Vec2::new(pos.x, pos.y - half.y - probe * 0.5);
    let probe_half = Vec2::new(half.x * 0.9, probe * 0.5);
    solids
        .into_iter()
        .any(|(sp, sh)| overlap(center, probe_half, sp, sh).is_some())
}

fn integrate(
    time: Res<Time>,
    gravity: Res<Gravity>,
    mut movers: Query<(&mut Transform, &mut Velocity, Option<&GravityScale>), Without<Stuck>>,
) {
    let dt = time.delta_seconds();
    for (mut transform, mut vel, scale) in &mut movers {
        if let Some(scale) = scale {
            vel.0.y += gravity.0 * scale.0 * dt;
        }
        transform.translation += (vel.0 * dt).extend(0.0);
    }
}

// Deep one-way penetration means the mover came from the side or below;
// let it pass.
const ONE_WAY_TOLERANCE: f32 = 0.3;

fn resolve_solids(
    mut contacts: ResMut<Contacts>,
    mut movers: Query<
        (Entity, &mut Transform, &mut Velocity, &Aabb),
        (Without<Solid>, Without<Projectile>, Without<Stuck>),
    >,
    solids: Query<(Entity, &Transform, &Aabb, Option<&OneWay>), With<Solid>>,
) {
    contacts.0.clear();

    for (entity, mut transform, mut vel, aabb) in &mut movers {
        for (solid, solid_transform, solid_aabb, one_way) in &solids {
            let pos = transform.translation.truncate();
            let solid_pos = solid_transform.translation.truncate();
            let Some(push) = overlap(pos, aabb.half, solid_pos, solid_aabb.half) else {
                continue;
            };
            if one_way.is_some()
                && (push.y <= 0.0 || push.x != 0.0 || vel.0.y > 0.0 || push.y > ONE_WAY_TOLERANCE)
            {
                continue;
            }

            transform.translation += push.extend(0.0);
            let normal = push.normalize_or_zero();
            // Kill the velocity component into the surface.
            let into = vel.0.dot(normal);
            if into < 0.0 {
                vel.0 -= normal * into;
            }
            contacts.0.push(Contact {
                entity,
                other: solid,
                normal,
            });
        }
    }
}

/// Sensor-style overlaps: player vs collectibles/obstacles and projectiles
/// vs their target layers. Appended after solid contacts so consumers see
/// a stable per-tick ordering.
fn collect_overlaps(
    mut contacts: ResMut<Contacts>,
    players: Query<(Entity, &Transform, &Aabb), With<Player>>,
    sensors: Query<
        (Entity, &Transform, &Aabb, &CollisionLayer),
        (Without<Player>, Or<(With<Collectible>, With<Obstacle>)>),
    >,
    projectiles: Query<(Entity, &Transform, &Aabb), (With<Projectile>, Without<Stuck>)>,
    targets: Query<
        (Entity, &Transform, &Aabb, &CollisionLayer),
        (Without<Projectile>, Without<Player>),
    >,
) {
    for (player, transform, aabb) in &players {
        let pos = transform.translation.truncate();
        for (sensor, sensor_transform, sensor_aabb, sensor_layer) in &sensors {
            if sensor_layer.0 & (layer::COLLECTIBLE | layer::OBSTACLE) == 0 {
                continue;
            }
            let sensor_pos = sensor_transform.translation.truncate();
            if let Some(push) = overlap(pos, aabb.half, sensor_pos, sensor_aabb.half) {
                contacts.0.push(Contact {
                    entity: player,
                    other: sensor,
                    normal: push.normalize_or_zero(),
                });
            }
        }
    }

    for (projectile, transform, aabb) in &projectiles {
        let pos = transform.translation.truncate();
        for (target, target_transform, target_aabb, target_layer) in &targets {
            if target_layer.0 & layer::PROJECTILE_TARGETS == 0 {
                continue;
            }
            let target_pos = target_transform.translation.truncate();
            if let Some(push) = overlap(pos, aabb.half, target_pos, target_aabb.half) {
                contacts.0.push(Contact {
                    entity: projectile,
                    other: target,
                    normal: push.normalize_or_zero(),
                });
            }
        }
    }
}
