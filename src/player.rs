use bevy::prelude::*;

use crate::commands::PlayerCommands;
use crate::physics::{layer, probe_ground, Aabb, CollisionLayer, Solid, Velocity};
use crate::SimSet;

pub struct LocomotionPlugin;
impl Plugin for LocomotionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LocomotionConfig>().add_systems(
            Update,
            (update_grounded, apply_move, jump)
                .chain()
                .in_set(SimSet::Locomotion),
        );
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LocomotionState {
    Grounded,
    Airborne,
    AirborneDoubleJumpAvailable,
    /// Terminal; entered once via `kill` and never left.
    Dead,
}

/// The two policies are not equivalent, so the choice is explicit
/// configuration rather than a silent merge.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DoubleJumpPolicy {
    /// Every jump from the ground grants one double-jump credit.
    GrantOnJump,
    /// A jump grants the credit only after the double-jump pickup.
    #[default]
    RequiresPickup,
}

#[derive(Resource, Clone)]
pub struct LocomotionConfig {
    pub move_speed: f32,
    pub jump_force: f32,
    pub double_jump_force: f32,
    /// Length of the downward ground probe.
    pub probe_distance: f32,
    pub policy: DoubleJumpPolicy,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            jump_force: 12.0,
            double_jump_force: 8.0,
            probe_distance: 0.1,
            policy: DoubleJumpPolicy::default(),
        }
    }
}

#[derive(Component)]
pub struct Player {
    pub health: f32,
    pub max_health: f32,
    /// -1.0 or 1.0; flips with non-zero move input.
    pub facing: f32,
    pub state: LocomotionState,
    pub has_double_jump_powerup: bool,
    pub invulnerable: bool,
}

pub enum DamageOutcome {
    /// Dead, invulnerable, or the amount changed nothing.
    Ignored,
    Damaged(f32),
    /// Health reached zero with this hit; the caller runs `kill`.
    Fatal,
}

impl Player {
    pub fn new(max_health: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            facing: 1.0,
            state: LocomotionState::Grounded,
            has_double_jump_powerup: false,
            invulnerable: false,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.state == LocomotionState::Dead
    }

    /// Clamp health into [0, max]; never double-applies after death.
    pub fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.is_dead() || self.invulnerable {
            return DamageOutcome::Ignored;
        }
        let new = (self.health - amount).max(0.0);
        if new == self.health {
            return DamageOutcome::Ignored;
        }
        self.health = new;
        if new == 0.0 {
            DamageOutcome::Fatal
        } else {
            DamageOutcome::Damaged(new)
        }
    }

    /// Restore health clamped to max; returns the new value when it changed.
    pub fn heal(&mut self, amount: f32) -> Option<f32> {
        if self.is_dead() {
            return None;
        }
        let new = (self.health + amount).min(self.max_health);
        if new == self.health {
            return None;
        }
        self.health = new;
        Some(new)
    }

    pub fn jump(&mut self, config: &LocomotionConfig, vel: &mut Velocity) {
        vel.0.y = config.jump_force;
        let credit = match config.policy {
            DoubleJumpPolicy::GrantOnJump => true,
            DoubleJumpPolicy::RequiresPickup => self.has_double_jump_powerup,
        };
        self.state = if credit {
            LocomotionState::AirborneDoubleJumpAvailable
        } else {
            LocomotionState::Airborne
        };
    }

    /// Fires only while airborne with an unspent credit; consumes it.
    pub fn try_double_jump(&mut self, config: &LocomotionConfig, vel: &mut Velocity) -> bool {
        if self.state != LocomotionState::AirborneDoubleJumpAvailable {
            return false;
        }
        vel.0.y = config.double_jump_force;
        self.state = LocomotionState::Airborne;
        true
    }

    /// Idempotent terminal transition. Returns true only the first time.
    pub fn kill(&mut self, vel: &mut Velocity) -> bool {
        if self.is_dead() {
            return false;
        }
        self.state = LocomotionState::Dead;
        vel.0 = Vec2::ZERO;
        true
    }
}

type GroundQuery<'w, 's> =
    Query<'w, 's, (&'static Transform, &'static Aabb, &'static CollisionLayer), With<Solid>>;

fn ground_boxes<'a>(solids: &'a GroundQuery) -> impl Iterator<Item = (Vec2, Vec2)> + 'a {
    solids
        .iter()
        .filter(|(_, _, l)| l.0 & layer::GROUND != 0)
        .map(|(t, a, _)| (t.translation.truncate(), a.half))
}

/// Sync the state machine with a fresh ground probe. Landing returns to
/// `Grounded`; walking off a ledge drops to plain `Airborne` (no credit).
fn update_grounded(
    config: Res<LocomotionConfig>,
    mut players: Query<(&Transform, &Aabb, &mut Player), Without<Solid>>,
    solids: GroundQuery,
) {
    for (transform, aabb, mut player) in &mut players {
        if player.is_dead() {
            continue;
        }
        let grounded = probe_ground(
            transform.translation.truncate(),
            aabb.half,
            config.probe_distance,
            ground_boxes(&solids),
        );
        player.state = match (grounded, player.state) {
            (true, _) => LocomotionState::Grounded,
            (false, LocomotionState::Grounded) => LocomotionState::Airborne,
            (false, state) => state,
        };
    }
}

fn apply_move(
    config: Res<LocomotionConfig>,
    commands: Res<PlayerCommands>,
    mut players: Query<(&mut Velocity, &mut Player)>,
) {
    for (mut vel, mut player) in &mut players {
        if player.is_dead() {
            continue;
        }
        vel.0.x = commands.move_axis * config.move_speed;
        if commands.move_axis != 0.0 {
            player.facing = commands.move_axis.signum();
        }
    }
}

/// Jump-edge dispatch: grounded jumps take priority, otherwise the edge is
/// offered to the double jump. The probe is evaluated fresh here rather
/// than reusing the state from `update_grounded`.
fn jump(
    config: Res<LocomotionConfig>,
    commands: Res<PlayerCommands>,
    mut players: Query<(&Transform, &Aabb, &mut Velocity, &mut Player), Without<Solid>>,
    solids: GroundQuery,
) {
    if !commands.jump {
        return;
    }
    for (transform, aabb, mut vel, mut player) in &mut players {
        if player.is_dead() {
            continue;
        }
        let grounded = probe_ground(
            transform.translation.truncate(),
            aabb.half,
            config.probe_distance,
            ground_boxes(&solids),
        );
        if grounded {
            player.jump(&config, &mut vel);
        } else {
            player.try_double_jump(&config, &mut vel);
        }
    }
}
