use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::{Weapon, WeaponSlots};
use crate::damage::{Collectible, CollectibleKind, Destructible, KillPlane, Obstacle, Reward};
use crate::events::{LevelCompleted, LevelStarted, PlayerDied, WeaponEquipped};
use crate::physics::{layer, Aabb, CollisionLayer, GravityScale, OneWay, Solid, Velocity};
use crate::platform::MovingPlatform;
use crate::player::Player;
use crate::{AppState, SimSet};

const PLAYER_HALF: Vec2 = Vec2::new(0.35, 0.45);
const COMPLETION_RADIUS: f32 = 1.0;
const KILL_PLANE_MARGIN: f32 = 10.0;

pub struct LevelPlugin;
impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, start_level).add_systems(
            Update,
            (check_completion, watch_player_death).in_set(SimSet::Flush),
        );
    }
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level '{0}' has no start point")]
    MissingStartPoint(String),
}

/// Level interchange format. Plain data so levels can be authored or
/// generated outside the engine and loaded from serialized files.
#[derive(Resource, Clone, Serialize, Deserialize)]
pub struct LevelData {
    pub name: String,
    pub start_point: Option<[f32; 2]>,
    pub end_point: Option<[f32; 2]>,
    #[serde(default)]
    pub objects: Vec<LevelObject>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LevelObject {
    pub kind: ObjectKind,
    pub position: [f32; 2],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 2],
    #[serde(default)]
    pub rotation: f32,
}

fn unit_scale() -> [f32; 2] {
    [1.0, 1.0]
}

#[derive(Clone, Serialize, Deserialize)]
pub enum ObjectKind {
    Platform {
        #[serde(default)]
        moving: bool,
        #[serde(default)]
        motion: MotionSpec,
        #[serde(default = "default_platform_speed")]
        speed: f32,
        #[serde(default)]
        wait_time: f32,
        #[serde(default)]
        one_way: bool,
    },
    Obstacle {
        damage: f32,
        #[serde(default)]
        destructible: bool,
        #[serde(default = "default_hits")]
        hits: u32,
    },
    Collectible {
        kind: CollectibleKind,
        value: f32,
    },
    WoodenWall {
        #[serde(default = "default_hits")]
        hits: u32,
    },
    CoinBalloon {
        coins: u32,
    },
}

fn default_platform_speed() -> f32 {
    2.0
}

fn default_hits() -> u32 {
    3
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub enum MotionSpec {
    #[default]
    Stationary,
    Waypoints(Vec<[f32; 2]>),
    PingPong {
        distance: f32,
        direction: [f32; 2],
    },
}

impl LevelData {
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.start_point.is_none() {
            return Err(LevelError::MissingStartPoint(self.name.clone()));
        }
        Ok(())
    }
}

/// Location that completes the level when the player comes within
/// [`COMPLETION_RADIUS`] of it.
#[derive(Component)]
pub struct EndPoint;

/// A level without a start point aborts the session rather than spawning
/// the player at an arbitrary position.
fn start_level(
    mut commands: Commands,
    level: Res<LevelData>,
    mut next_state: ResMut<NextState<AppState>>,
    mut started: EventWriter<LevelStarted>,
    mut equipped: EventWriter<WeaponEquipped>,
) {
    let start = match level.validate() {
        Ok(()) => Vec2::from(level.start_point.unwrap_or_default()),
        Err(err) => {
            error!("cannot start level: {err}");
            next_state.set(AppState::GameOver);
            return;
        }
    };

    let loadout = WeaponSlots::with_loadout(vec![Weapon::nail_gun(), Weapon::bomb_gun()]);
    if let Some(weapon) = loadout.current() {
        equipped.send(WeaponEquipped {
            name: weapon.name.clone(),
        });
    }
    commands.spawn((
        Player::new(100.0),
        loadout,
        Transform::from_translation(start.extend(0.0)),
        Velocity(Vec2::ZERO),
        GravityScale(1.0),
        Aabb { half: PLAYER_HALF },
        CollisionLayer(layer::PLAYER),
    ));

    let mut lowest = start.y;
    for object in &level.objects {
        let pos = Vec2::from(object.position);
        lowest = lowest.min(pos.y);
        spawn_object(&mut commands, object, pos);
    }

    match level.end_point {
        Some(end) => {
            commands.spawn((
                EndPoint,
                Transform::from_translation(Vec2::from(end).extend(0.0)),
            ));
        }
        None => warn!("level '{}' has no end point, it cannot be completed", level.name),
    }
    commands.insert_resource(KillPlane(lowest - KILL_PLANE_MARGIN));

    info!("level '{}' started", level.name);
    started.send(LevelStarted {
        name: level.name.clone(),
    });
    next_state.set(AppState::Playing);
}

fn spawn_object(commands: &mut Commands, object: &LevelObject, pos: Vec2) {
    let half = Vec2::from(object.scale) * 0.5;
    let transform = Transform::from_translation(pos.extend(0.0))
        .with_rotation(Quat::from_rotation_z(object.rotation));

    match &object.kind {
        ObjectKind::Platform {
            moving,
            motion,
            speed,
            wait_time,
            one_way,
        } => {
            let mut entity = commands.spawn((
                transform,
                Aabb { half },
                CollisionLayer(layer::GROUND),
                Solid,
            ));
            if *one_way {
                entity.insert(OneWay);
            }
            if *moving {
                match platform_motion(pos, motion, *speed, *wait_time) {
                    Some(platform) => {
                        entity.insert(platform);
                    }
                    None => warn!("moving platform at {pos} has no path, leaving it static"),
                }
            }
        }
        ObjectKind::Obstacle {
            damage,
            destructible,
            hits,
        } => {
            let mut entity = commands.spawn((
                transform,
                Aabb { half },
                CollisionLayer(layer::OBSTACLE),
                Obstacle {
                    damage: *damage,
                    touching: false,
                },
            ));
            if *destructible {
                entity.insert(Destructible {
                    hits_left: *hits,
                    reward: Reward::None,
                });
            }
        }
        ObjectKind::Collectible { kind, value } => {
            commands.spawn((
                transform,
                Aabb { half },
                CollisionLayer(layer::COLLECTIBLE),
                Collectible {
                    kind: *kind,
                    value: *value,
                },
            ));
        }
        ObjectKind::WoodenWall { hits } => {
            commands.spawn((
                transform,
                Aabb { half },
                CollisionLayer(layer::GROUND | layer::WOODEN_WALL),
                Solid,
                Destructible {
                    hits_left: *hits,
                    reward: Reward::None,
                },
            ));
        }
        ObjectKind::CoinBalloon { coins } => {
            commands.spawn((
                transform,
                Aabb { half },
                CollisionLayer(layer::DESTRUCTIBLE),
                Destructible {
                    hits_left: 1,
                    reward: Reward::Scatter {
                        kind: CollectibleKind::Coin,
                        value: 1.0,
                        count: *coins,
                    },
                },
            ));
        }
    }
}

fn platform_motion(
    pos: Vec2,
    motion: &MotionSpec,
    speed: f32,
    wait_time: f32,
) -> Option<MovingPlatform> {
    match motion {
        MotionSpec::Stationary => None,
        MotionSpec::Waypoints(points) if points.is_empty() => None,
        MotionSpec::Waypoints(points) => Some(MovingPlatform::waypoints(
            points.iter().copied().map(Vec2::from).collect(),
            speed,
            wait_time,
        )),
        MotionSpec::PingPong {
            distance,
            direction,
        } => {
            let dir = Vec2::from(*direction).try_normalize()?;
            Some(MovingPlatform::ping_pong(pos, pos + dir * *distance, speed))
        }
    }
}

fn check_completion(
    level: Res<LevelData>,
    players: Query<(&Transform, &Player)>,
    end_points: Query<&Transform, With<EndPoint>>,
    mut completed: EventWriter<LevelCompleted>,
    mut done: Local<bool>,
) {
    if *done {
        return;
    }
    for (player_tf, player) in &players {
        if player.is_dead() {
            continue;
        }
        for end_tf in &end_points {
            let distance = player_tf
                .translation
                .truncate()
                .distance(end_tf.translation.truncate());
            if distance <= COMPLETION_RADIUS {
                *done = true;
                info!("level '{}' completed", level.name);
                completed.send(LevelCompleted {
                    name: level.name.clone(),
                });
            }
        }
    }
}

fn watch_player_death(
    mut died: EventReader<PlayerDied>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if died.read().next().is_some() {
        next_state.set(AppState::GameOver);
    }
}
