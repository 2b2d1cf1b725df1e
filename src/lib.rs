//! Headless gameplay core for a 2D run-and-gun platformer.
//!
//! Everything runs in a fixed, explicit order each tick so a whole session
//! is reproducible from a [`level::LevelData`] and a command stream. No
//! rendering, no input devices: embedders write [`commands::PlayerCommands`]
//! before each update and observe the notification events afterwards.

use bevy::prelude::*;

pub mod combat;
pub mod commands;
pub mod damage;
pub mod events;
pub mod level;
pub mod physics;
pub mod platform;
pub mod player;
pub mod projectile;

pub use commands::PlayerCommands;
pub use level::{LevelData, LevelError, LevelObject, MotionSpec, ObjectKind};

#[derive(States, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AppState {
    #[default]
    Setup,
    Playing,
    GameOver,
}

/// Per-tick stages. Each one observes the completed output of the one
/// before it; nothing runs concurrently across stage boundaries.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimSet {
    Input,
    Locomotion,
    Combat,
    Physics,
    Collision,
    Damage,
    Platforms,
    Flush,
}

/// Ordering inside [`SimSet::Damage`]: projectile resolution produces the
/// hit and damage events that the application stage consumes.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum DamageStage {
    Projectiles,
    Apply,
}

/// Installs the full gameplay core on a headless `App`. Expects a
/// [`LevelData`] resource to be present before startup.
pub struct PlatformerSimPlugins;
impl Plugin for PlatformerSimPlugins {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<bevy::state::app::StatesPlugin>() {
            app.add_plugins(bevy::state::app::StatesPlugin);
        }
        app.init_state::<AppState>();
        app.init_resource::<Time>();

        app.configure_sets(
            Update,
            (
                SimSet::Input,
                SimSet::Locomotion,
                SimSet::Combat,
                SimSet::Physics,
                SimSet::Collision,
                SimSet::Damage,
                SimSet::Platforms,
                SimSet::Flush,
            )
                .chain()
                .run_if(in_state(AppState::Playing)),
        );
        app.configure_sets(
            Update,
            (DamageStage::Projectiles, DamageStage::Apply)
                .chain()
                .in_set(SimSet::Damage),
        );

        app.add_plugins((
            events::NotificationPlugin,
            commands::CommandsPlugin,
            physics::PhysicsPlugin,
            player::LocomotionPlugin,
            combat::CombatPlugin,
            projectile::ProjectilePlugin,
            platform::PlatformPlugin,
            damage::DamagePlugin,
            level::LevelPlugin,
        ));
    }
}
