use bevy::prelude::*;

use crate::damage::CollectibleKind;

/// Fire-and-forget notifications for external observers (HUD, level
/// progression). Registered here so a level session tears them down with
/// the `App` instead of leaking process-wide state.
pub struct NotificationPlugin;
impl Plugin for NotificationPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PlayerDied>()
            .add_event::<HealthChanged>()
            .add_event::<ItemCollected>()
            .add_event::<WeaponEquipped>()
            .add_event::<LevelStarted>()
            .add_event::<LevelCompleted>();
    }
}

#[derive(Event, Default)]
pub struct PlayerDied;

#[derive(Event, Clone, Copy)]
pub struct HealthChanged {
    pub current: f32,
    pub max: f32,
}

#[derive(Event, Clone)]
pub struct ItemCollected {
    pub kind: CollectibleKind,
    pub value: f32,
}

#[derive(Event, Clone)]
pub struct WeaponEquipped {
    pub name: String,
}

#[derive(Event, Clone)]
pub struct LevelStarted {
    pub name: String,
}

#[derive(Event, Clone)]
pub struct LevelCompleted {
    pub name: String,
}
