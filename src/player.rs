use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    camera::CameraRig,
    config::GameConfig,
    game_state::{GameCoordinator, ObservedState, StateListener},
    gravity::{GravityController, GravityListener},
    physics::{BoxCollider, KinematicBody},
    GameSet,
};

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_modify_life)
            .add_observer(on_player_died)
            .add_systems(
                Update,
                (player_gravity_system, player_movement_system)
                    .chain()
                    .in_set(GameSet::Movement),
            );
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PlayerSettings {
    pub starting_life: i32,
    pub move_speed: f32,
    pub jump_speed: f32,
    pub spawn: [f32; 3],
    pub half_extents: [f32; 3],
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            starting_life: 3,
            move_speed: 8.0,
            jump_speed: 14.0,
            spawn: [0.0, 1.5, 0.0],
            half_extents: [0.5, 1.0, 0.5],
        }
    }
}

// ── Components ──────────────────────────────────────────────────────────────

/// The player character.
///
/// Listens to both hubs: game state (movement is off during the wormhole
/// flight) and gravity (its "up" turns with gravity).
#[derive(Component, Debug, Clone, Copy)]
#[require(StateListener, GravityListener, KinematicBody)]
pub struct Player {
    /// Unit vector opposite to gravity.
    pub up: Vec3,
    pub spawn: Vec3,
}

impl Player {
    pub fn new(spawn: Vec3) -> Self {
        Self { up: Vec3::Y, spawn }
    }
}

/// The player's remaining life.
///
/// `modify_life` adds the delta as-is: no floor, no cap. What happens at zero
/// is decided by whoever listens for `PlayerDied`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerHealth {
    life: i32,
}

impl PlayerHealth {
    pub fn new(life: i32) -> Self {
        Self { life }
    }

    pub fn life(&self) -> i32 {
        self.life
    }

    /// Returns the new life.
    pub fn modify_life(&mut self, delta: i32) -> i32 {
        self.life += delta;
        self.life
    }
}

/// Bundle for spawning the player with everything it needs.
pub fn player_bundle(settings: &PlayerSettings) -> impl Bundle {
    let spawn = Vec3::from_array(settings.spawn);
    (
        Player::new(spawn),
        PlayerHealth::new(settings.starting_life),
        BoxCollider::new(Vec3::from_array(settings.half_extents)),
        Transform::from_translation(spawn),
    )
}

// ── Events ──────────────────────────────────────────────────────────────────

/// Change the player's life by `delta` (negative for damage).
#[derive(Event, Debug, Clone, Copy)]
pub struct ModifyLife {
    pub delta: i32,
}

/// Life just dropped to zero or below.
#[derive(Event, Debug, Clone, Copy)]
pub struct PlayerDied;

// ── Systems ─────────────────────────────────────────────────────────────────

/// Velocity for walking with WASD-style `input`, relative to where the
/// camera looks, flattened onto the plane the player stands on.
pub fn walk_velocity(input: Vec2, camera_forward: Vec3, up: Vec3, speed: f32) -> Vec3 {
    let forward = camera_forward
        .reject_from_normalized(up)
        .try_normalize()
        .unwrap_or_else(|| up.any_orthonormal_vector());
    let right = forward.cross(up);
    (forward * input.y + right * input.x).normalize_or_zero() * speed
}

/// The player's box with its tall side along whichever world axis `up` is
/// closest to. `base` is the box standing on the floor.
pub fn upright_half_extents(base: Vec3, up: Vec3) -> Vec3 {
    let up = up.abs();
    let mut half = base;
    if up.x >= up.y && up.x >= up.z {
        half.x = base.y;
        half.y = base.x;
    } else if up.z > up.y {
        half.z = base.y;
        half.y = base.z;
    }
    half
}

fn player_gravity_system(
    config: Res<GameConfig>,
    mut players: Query<(&mut Player, &mut KinematicBody, &mut BoxCollider, &GravityListener)>,
) {
    let base = Vec3::from_array(config.player.half_extents);
    for (mut player, mut body, mut collider, listener) in &mut players {
        let mut turned = false;
        for rotation in listener.0.drain() {
            player.up = (rotation * player.up).normalize();
            body.velocity = rotation * body.velocity;
            turned = true;
        }
        if turned {
            collider.half_extents = upright_half_extents(base, player.up);
        }
    }
}

fn player_movement_system(
    keys: Res<ButtonInput<KeyCode>>,
    config: Res<GameConfig>,
    cameras: Query<&Transform, (With<CameraRig>, Without<Player>)>,
    mut players: Query<(&Player, &ObservedState, &mut KinematicBody)>,
) {
    let mut input = Vec2::ZERO;
    if keys.pressed(KeyCode::KeyW) {
        input.y += 1.0;
    }
    if keys.pressed(KeyCode::KeyS) {
        input.y -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) {
        input.x += 1.0;
    }
    if keys.pressed(KeyCode::KeyA) {
        input.x -= 1.0;
    }

    let camera_forward = cameras
        .iter()
        .next()
        .map_or(Vec3::NEG_Z, |transform| *transform.forward());

    for (player, observed, mut body) in &mut players {
        let fall = player.up * body.velocity.dot(player.up);

        if !observed.0.is_interactive() {
            body.velocity = fall;
            continue;
        }

        let walk = walk_velocity(input, camera_forward, player.up, config.player.move_speed);
        body.velocity = if body.grounded && keys.just_pressed(KeyCode::Space) {
            walk + player.up * config.player.jump_speed
        } else {
            walk + fall
        };
    }
}

fn on_modify_life(
    trigger: On<ModifyLife>,
    mut commands: Commands,
    mut players: Query<&mut PlayerHealth, With<Player>>,
) {
    for mut health in &mut players {
        let before = health.life();
        let after = health.modify_life(trigger.delta);
        info!("Player life {} -> {}", before, after);

        if before > 0 && after <= 0 {
            commands.trigger(PlayerDied);
        }
    }
}

fn on_player_died(
    _trigger: On<PlayerDied>,
    config: Res<GameConfig>,
    gravity: Option<Res<GravityController>>,
    mut coordinator: ResMut<GameCoordinator>,
    mut players: Query<(
        &mut Player,
        &mut PlayerHealth,
        &mut Transform,
        &mut KinematicBody,
        &mut BoxCollider,
    )>,
) {
    let up = gravity.map_or(Vec3::Y, |gravity| gravity.up());
    let base = Vec3::from_array(config.player.half_extents);

    for (mut player, mut health, mut transform, mut body, mut collider) in &mut players {
        transform.translation = player.spawn;
        body.velocity = Vec3::ZERO;
        player.up = up;
        collider.half_extents = upright_half_extents(base, up);
        *health = PlayerHealth::new(config.player.starting_life);
        info!("Player died, respawned at {:?}", player.spawn);
    }

    coordinator.revive();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modify_life_has_no_floor() {
        let mut health = PlayerHealth::new(1);
        assert_eq!(health.modify_life(-1), 0);
        assert_eq!(health.modify_life(-3), -3);
        assert_eq!(health.modify_life(10), 7);
        assert_eq!(health.life(), 7);
    }

    #[test]
    fn walking_follows_camera_on_the_floor() {
        let velocity = walk_velocity(Vec2::Y, Vec3::new(0.0, -0.5, -1.0), Vec3::Y, 8.0);
        assert!(velocity.abs_diff_eq(Vec3::new(0.0, 0.0, -8.0), 1e-4));

        let strafe = walk_velocity(Vec2::X, Vec3::NEG_Z, Vec3::Y, 8.0);
        assert!(strafe.abs_diff_eq(Vec3::new(8.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn walking_on_a_wall_stays_on_the_wall() {
        // Gravity points to -X, so the player stands on the left wall.
        let velocity = walk_velocity(Vec2::new(1.0, 1.0), Vec3::new(0.3, 0.2, -1.0), Vec3::X, 5.0);
        assert!(velocity.dot(Vec3::X).abs() < 1e-4);
        assert!((velocity.length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn collider_stands_along_the_up_axis() {
        let base = Vec3::new(0.5, 1.0, 0.5);
        assert_eq!(upright_half_extents(base, Vec3::Y), base);
        assert_eq!(upright_half_extents(base, Vec3::NEG_Y), base);
        assert_eq!(upright_half_extents(base, Vec3::X), Vec3::new(1.0, 0.5, 0.5));
        assert_eq!(upright_half_extents(base, Vec3::NEG_X), Vec3::new(1.0, 0.5, 0.5));
        assert_eq!(
            upright_half_extents(Vec3::new(0.4, 1.0, 0.6), Vec3::Z),
            Vec3::new(0.4, 0.6, 1.0)
        );
    }

    #[test]
    fn no_input_means_no_walk() {
        assert_eq!(walk_velocity(Vec2::ZERO, Vec3::NEG_Z, Vec3::Y, 8.0), Vec3::ZERO);
    }
}
