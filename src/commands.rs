use bevy::prelude::*;

use crate::SimSet;

/// Abstract input commands written by the embedder's input layer each
/// tick. The core never polls a device; it only reads this resource.
///
/// `move_axis` and `aim_target` are continuous and persist until
/// overwritten; the boolean flags are edges and are cleared at the end of
/// every tick.
#[derive(Resource, Default)]
pub struct PlayerCommands {
    /// Signed horizontal axis in [-1, 1].
    pub move_axis: f32,
    /// World-space point the player is aiming at.
    pub aim_target: Option<Vec2>,
    pub jump: bool,
    pub fire: bool,
    pub alt_fire: bool,
    pub switch_weapon: bool,
}

impl PlayerCommands {
    pub fn clear_edges(&mut self) {
        self.jump = false;
        self.fire = false;
        self.alt_fire = false;
        self.switch_weapon = false;
    }
}

pub struct CommandsPlugin;
impl Plugin for CommandsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlayerCommands>()
            .add_systems(Update, flush_edges.in_set(SimSet::Flush));
    }
}

fn flush_edges(mut commands: ResMut<PlayerCommands>) {
    commands.clear_edges();
}
