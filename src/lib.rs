use bevy::prelude::*;

pub mod camera;
pub mod config;
pub mod game_state;
pub mod gravity;
pub mod hazard;
pub mod hud;
pub mod level;
pub mod messages;
pub mod notify;
pub mod physics;
pub mod player;

/// Order of the gameplay systems inside `Update`.
///
/// State and gravity changes are received first, so everything after sees
/// this tick's values. The camera runs after physics so it frames where the
/// player actually ended up.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameSet {
    Input,
    Movement,
    Physics,
    Simulation,
    Camera,
    Presentation,
}

/// Everything except rendering and the level itself. Headless apps (tests)
/// add this on top of `MinimalPlugins`.
pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                GameSet::Input,
                GameSet::Movement,
                GameSet::Physics,
                GameSet::Simulation,
                GameSet::Camera,
                GameSet::Presentation,
            )
                .chain(),
        )
        .add_plugins((
            config::ConfigPlugin,
            game_state::GameStatePlugin,
            gravity::GravityPlugin,
            physics::PhysicsPlugin,
            player::PlayerPlugin,
            hazard::HazardPlugin,
            messages::MessagesPlugin,
            camera::CameraPlugin,
        ));
    }
}

/// The whole game, on top of `DefaultPlugins`.
pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((GameplayPlugin, level::LevelPlugin, hud::HudPlugin));
    }
}
