//! Gravity direction switching.
//!
//! Keys 1, 2 and 3 rotate gravity by -90°, -180° and -270° about the world Z
//! axis (the hallway axis). Every accepted turn is pushed as a quaternion to
//! the gravity observers (camera and player), which re-orient themselves.

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::GameConfig,
    game_state::{GameCoordinator, GameState},
    notify::{Inbox, NotificationHub, NotifyObserver},
    GameSet,
};

pub struct GravityPlugin;

impl Plugin for GravityPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_gravity).add_systems(
            Update,
            (register_gravity_listeners, sync_gravity_state, gravity_input_system)
                .chain()
                .in_set(GameSet::Input)
                .run_if(resource_exists::<GravityController>),
        );
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GravitySettings {
    pub initial: [f32; 3],
    /// Minimum seconds between two accepted turns.
    pub debounce_secs: f32,
}

impl Default for GravitySettings {
    fn default() -> Self {
        Self {
            initial: [0.0, -35.0, 0.0],
            debounce_secs: 0.5,
        }
    }
}

/// The three turns bound to the number keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GravityTurn {
    Quarter,
    Half,
    ThreeQuarter,
}

impl GravityTurn {
    /// Signed rotation about +Z in radians.
    pub fn radians(self) -> f32 {
        match self {
            GravityTurn::Quarter => -FRAC_PI_2,
            GravityTurn::Half => -2.0 * FRAC_PI_2,
            GravityTurn::ThreeQuarter => -3.0 * FRAC_PI_2,
        }
    }

    pub fn rotation(self) -> Quat {
        Quat::from_rotation_z(self.radians())
    }

    /// First pressed key wins, in 1-2-3 order.
    pub fn from_input(keys: &ButtonInput<KeyCode>) -> Option<Self> {
        if keys.just_pressed(KeyCode::Digit1) {
            Some(GravityTurn::Quarter)
        } else if keys.just_pressed(KeyCode::Digit2) {
            Some(GravityTurn::Half)
        } else if keys.just_pressed(KeyCode::Digit3) {
            Some(GravityTurn::ThreeQuarter)
        } else {
            None
        }
    }
}

/// Owns the gravity vector.
///
/// Also an observer of `GameState`: turns are only accepted while the player
/// is in control.
#[derive(Resource)]
pub struct GravityController {
    gravity: Vec3,
    last_change: f32,
    debounce_secs: f32,
    state: GameState,
    state_inbox: Arc<Inbox<GameState>>,
    observers: NotificationHub<Quat>,
}

impl GravityController {
    pub fn new(settings: &GravitySettings) -> Self {
        Self {
            gravity: Vec3::from_array(settings.initial),
            // Far enough in the past that the very first turn is accepted.
            last_change: -100.0,
            debounce_secs: settings.debounce_secs,
            state: GameState::Playing,
            state_inbox: Inbox::new(),
            observers: NotificationHub::new(),
        }
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Unit vector opposite to gravity.
    pub fn up(&self) -> Vec3 {
        (-self.gravity).normalize_or(Vec3::Y)
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn state_inbox(&self) -> &Arc<Inbox<GameState>> {
        &self.state_inbox
    }

    /// Applies whatever game state was pushed since the last call.
    pub fn sync_state(&mut self) {
        if let Some(state) = self.state_inbox.latest() {
            self.state = state;
        }
    }

    pub fn register<O: NotifyObserver<Quat> + 'static>(&mut self, observer: &Arc<O>) -> bool {
        self.observers.register(observer)
    }

    pub fn unregister<O: NotifyObserver<Quat> + 'static>(&mut self, observer: &Arc<O>) -> bool {
        self.observers.unregister(observer)
    }

    /// Rotates gravity if the state allows it and the last turn is more than
    /// `debounce_secs` ago. Requests inside the window are dropped, not queued.
    ///
    /// Returns the published rotation when the turn was applied.
    pub fn request_turn(&mut self, turn: GravityTurn, now: f32) -> Option<Quat> {
        if !self.state.is_interactive() {
            return None;
        }
        if now - self.last_change <= self.debounce_secs {
            return None;
        }

        let rotation = turn.rotation();
        self.gravity = rotation * self.gravity;
        self.observers.publish(&rotation);
        self.last_change = now;
        Some(rotation)
    }
}

/// Puts an entity on the gravity hub.
#[derive(Component, Clone)]
pub struct GravityListener(pub Arc<Inbox<Quat>>);

impl Default for GravityListener {
    fn default() -> Self {
        Self(Inbox::new())
    }
}

fn setup_gravity(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut coordinator: ResMut<GameCoordinator>,
) {
    let controller = GravityController::new(&config.gravity);
    coordinator.register(controller.state_inbox());
    commands.insert_resource(controller);
}

fn register_gravity_listeners(
    mut controller: ResMut<GravityController>,
    listeners: Query<&GravityListener, Added<GravityListener>>,
) {
    for listener in &listeners {
        controller.register(&listener.0);
    }
}

fn sync_gravity_state(mut controller: ResMut<GravityController>) {
    controller.sync_state();
}

fn gravity_input_system(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut controller: ResMut<GravityController>,
) {
    let Some(turn) = GravityTurn::from_input(&keys) else {
        return;
    };
    if controller.request_turn(turn, time.elapsed_secs()).is_some() {
        info!("Gravity turned {:?}, now {:?}", turn, controller.gravity());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> GravityController {
        GravityController::new(&GravitySettings::default())
    }

    #[test]
    fn quarter_turn_rotates_down_to_minus_x() {
        let mut gravity = controller();
        gravity.request_turn(GravityTurn::Quarter, 1.0).unwrap();
        assert!(gravity
            .gravity()
            .abs_diff_eq(Vec3::new(-35.0, 0.0, 0.0), 1e-4));
        assert!(gravity.up().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn turns_inside_the_window_are_dropped() {
        let mut gravity = controller();
        let inbox = Inbox::new();
        gravity.register(&inbox);

        assert!(gravity.request_turn(GravityTurn::Half, 2.0).is_some());
        assert!(gravity.request_turn(GravityTurn::Quarter, 2.2).is_none());
        assert!(gravity.request_turn(GravityTurn::Quarter, 2.5).is_none());

        assert!(gravity
            .gravity()
            .abs_diff_eq(Vec3::new(0.0, 35.0, 0.0), 1e-4));
        assert_eq!(inbox.drain().len(), 1);

        assert!(gravity.request_turn(GravityTurn::Quarter, 2.51).is_some());
        assert_eq!(inbox.drain().len(), 1);
    }

    #[test]
    fn observers_get_the_applied_rotation() {
        let mut gravity = controller();
        let inbox = Inbox::new();
        gravity.register(&inbox);

        let rotation = gravity.request_turn(GravityTurn::ThreeQuarter, 0.0).unwrap();
        let received = inbox.drain();
        assert_eq!(received.len(), 1);
        assert!(received[0].abs_diff_eq(rotation, 1e-6));
        assert!(rotation.abs_diff_eq(Quat::from_rotation_z(-1.5 * std::f32::consts::PI), 1e-6));
    }

    #[test]
    fn wormhole_state_blocks_turns_and_revived_allows_them() {
        let mut coordinator = GameCoordinator::default();
        let mut gravity = controller();
        coordinator.register(gravity.state_inbox());

        coordinator.set_state(GameState::WormholeEffect);
        gravity.sync_state();
        assert!(gravity.request_turn(GravityTurn::Quarter, 5.0).is_none());
        assert!(gravity.gravity().abs_diff_eq(Vec3::new(0.0, -35.0, 0.0), 1e-4));

        coordinator.set_state(GameState::Revived);
        gravity.sync_state();
        assert!(gravity.request_turn(GravityTurn::Quarter, 5.0).is_some());
    }

    #[test]
    fn four_quarter_turns_come_back_around() {
        let mut gravity = controller();
        for i in 0..4 {
            gravity.request_turn(GravityTurn::Quarter, i as f32).unwrap();
        }
        assert!(gravity
            .gravity()
            .abs_diff_eq(Vec3::new(0.0, -35.0, 0.0), 1e-3));
    }
}
