use bevy::prelude::*;

use crate::physics::Contacts;
use crate::player::Player;
use crate::projectile::Stuck;
use crate::SimSet;

pub struct PlatformPlugin;
impl Plugin for PlatformPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (attach_riders, update_platforms, carry_stuck)
                .chain()
                .in_set(SimSet::Platforms),
        );
    }
}

/// Platform movement policy. The two modes are not equivalent (cycling
/// wraps, ping-pong bounces) and stay distinct, selectable modes.
#[derive(Clone, Debug)]
pub enum MotionMode {
    /// Wrapping waypoint cycle with a pause on arrival. Never reverses.
    Waypoints {
        points: Vec<Vec2>,
        index: usize,
        /// Remaining pause seconds; moving while zero.
        waiting: f32,
    },
    /// Two fixed endpoints and a progress scalar bouncing in [0, 1].
    PingPong {
        origin: Vec2,
        target: Vec2,
        progress: f32,
        forward: bool,
    },
}

#[derive(Component)]
pub struct MovingPlatform {
    pub mode: MotionMode,
    /// Units/second for waypoint travel; progress/second for ping-pong.
    pub speed: f32,
    pub wait_time: f32,
    /// Player currently standing on top, re-derived from contacts every
    /// tick; platform motion is applied to it.
    pub rider: Option<Entity>,
}

impl MovingPlatform {
    pub fn waypoints(points: Vec<Vec2>, speed: f32, wait_time: f32) -> Self {
        Self {
            mode: MotionMode::Waypoints {
                points,
                index: 0,
                waiting: 0.0,
            },
            speed,
            wait_time,
            rider: None,
        }
    }

    pub fn ping_pong(origin: Vec2, target: Vec2, speed: f32) -> Self {
        Self {
            mode: MotionMode::PingPong {
                origin,
                target,
                progress: 0.0,
                forward: true,
            },
            speed,
            wait_time: 0.0,
            rider: None,
        }
    }
}

/// One tick of waypoint travel. Arrival snaps exactly onto the waypoint
/// (no interpolated approach), starts the pause, and advances the index
/// with wrap-around.
pub fn step_waypoints(
    pos: Vec2,
    points: &[Vec2],
    index: &mut usize,
    waiting: &mut f32,
    speed: f32,
    wait_time: f32,
    dt: f32,
) -> Vec2 {
    if points.is_empty() {
        return pos;
    }
    if *waiting > 0.0 {
        *waiting = (*waiting - dt).max(0.0);
        return pos;
    }
    let target = points[*index % points.len()];
    let to_target = target - pos;
    let step = speed * dt;
    if to_target.length() <= step {
        *index = (*index + 1) % points.len();
        *waiting = wait_time;
        target
    } else {
        pos + to_target.normalize() * step
    }
}

/// One tick of ping-pong travel; direction reverses exactly at 0 and 1.
pub fn step_ping_pong(
    origin: Vec2,
    target: Vec2,
    progress: &mut f32,
    forward: &mut bool,
    speed: f32,
    dt: f32,
) -> Vec2 {
    let delta = speed * dt;
    *progress += if *forward { delta } else { -delta };
    if *progress >= 1.0 {
        *progress = 1.0;
        *forward = false;
    } else if *progress <= 0.0 {
        *progress = 0.0;
        *forward = true;
    }
    origin.lerp(target, *progress)
}

/// Re-derive platform riders from this tick's contacts. Only top-surface
/// contact (normal pointing up at the player) attaches; contact loss
/// detaches.
fn attach_riders(
    contacts: Res<Contacts>,
    players: Query<(), With<Player>>,
    mut platforms: Query<(Entity, &mut MovingPlatform)>,
) {
    for (entity, mut platform) in &mut platforms {
        platform.rider = contacts
            .0
            .iter()
            .find(|c| c.other == entity && c.normal.y > 0.5 && players.contains(c.entity))
            .map(|c| c.entity);
    }
}

fn update_platforms(
    time: Res<Time>,
    mut platforms: Query<(&mut Transform, &mut MovingPlatform)>,
    mut riders: Query<&mut Transform, Without<MovingPlatform>>,
) {
    let dt = time.delta_seconds();
    for (mut transform, mut platform) in &mut platforms {
        let pos = transform.translation.truncate();
        let speed = platform.speed;
        let wait_time = platform.wait_time;
        let new_pos = match &mut platform.mode {
            MotionMode::Waypoints {
                points,
                index,
                waiting,
            } => step_waypoints(pos, points, index, waiting, speed, wait_time, dt),
            MotionMode::PingPong {
                origin,
                target,
                progress,
                forward,
            } => step_ping_pong(*origin, *target, progress, forward, speed, dt),
        };
        let delta = new_pos - pos;
        transform.translation = new_pos.extend(transform.translation.z);

        if delta != Vec2::ZERO {
            if let Some(rider) = platform.rider {
                if let Ok(mut rider_transform) = riders.get_mut(rider) {
                    rider_transform.translation += delta.extend(0.0);
                }
            }
        }
    }
}

/// Keep attached projectiles glued to their anchor so nails ride moving
/// platforms.
fn carry_stuck(
    anchors: Query<&Transform, Without<Stuck>>,
    mut stuck: Query<(&Stuck, &mut Transform)>,
) {
    for (attachment, mut transform) in &mut stuck {
        if let Ok(anchor) = anchors.get(attachment.anchor) {
            let pos = anchor.translation.truncate() + attachment.offset;
            transform.translation = pos.extend(transform.translation.z);
        }
    }
}
