// camera/mod.rs - The camera rig: orbit while playing, spiral into wormholes.
//
// orbit.rs and wormhole.rs hold the math and know nothing about Bevy.
// This file wires them to input, the player, level geometry and the two hubs.

pub mod orbit;
pub mod wormhole;

use bevy::{
    input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit},
    prelude::*,
    window::{CursorGrabMode, CursorOptions, PrimaryWindow},
};

use crate::{
    config::GameConfig,
    game_state::{GameCoordinator, GameState, ObservedState, StateListener, WormholeCompleted},
    gravity::GravityListener,
    physics::{raycast, Aabb, BoxCollider, StaticBody},
    player::Player,
    GameSet,
};

use orbit::{facing_away_from, pull_in_front_of_hit, GravityFrame, OrbitCamera, OrbitSettings};
use wormhole::{SpiralStep, WormholeSpiral};

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (camera_mode_system, camera_gravity_system, camera_tick_system)
                .chain()
                .in_set(GameSet::Camera),
        )
        .add_systems(Update, cursor_grab_system.in_set(GameSet::Presentation));
    }
}

/// Pixels of trackpad scroll that count as one wheel line.
const PIXELS_PER_LINE: f32 = 100.0;

/// What the camera is doing this tick. Exactly one runs.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraMode {
    Orbit,
    /// The spiral state only exists while flying.
    Spiral(WormholeSpiral),
}

/// The game camera.
///
/// Observes both hubs: game state (through `StateListener`/`ObservedState`)
/// and gravity turns (through `GravityListener`).
#[derive(Component, Debug)]
#[require(StateListener, GravityListener)]
pub struct CameraRig {
    pub orbit: OrbitCamera,
    pub frame: GravityFrame,
    pub mode: CameraMode,
    /// Mouse/scroll/shift only apply while this is set. Cleared for the
    /// wormhole flight, set again when it ends.
    pub input_enabled: bool,
}

impl CameraRig {
    pub fn new(settings: &OrbitSettings) -> Self {
        Self {
            orbit: OrbitCamera::new(settings),
            frame: GravityFrame::default(),
            mode: CameraMode::Orbit,
            input_enabled: true,
        }
    }

    /// Reacts to a pushed game state.
    pub fn enter(&mut self, state: GameState, position: Vec3, portal: Option<Vec3>, config: &GameConfig) {
        match (state, &self.mode) {
            (GameState::WormholeEffect, CameraMode::Orbit) => {
                let Some(portal) = portal else {
                    warn!("Wormhole state without a portal; camera stays in orbit");
                    return;
                };
                self.orbit.end_free_look();
                self.input_enabled = false;
                self.mode = CameraMode::Spiral(WormholeSpiral::begin(position, portal, &config.wormhole));
            }
            (GameState::Playing | GameState::Revived, CameraMode::Spiral(_)) => self.leave_spiral(),
            (GameState::Playing | GameState::Revived, CameraMode::Orbit) => self.input_enabled = true,
            (GameState::WormholeEffect, CameraMode::Spiral(_)) => {}
        }
    }

    fn leave_spiral(&mut self) {
        self.mode = CameraMode::Orbit;
        self.input_enabled = true;
    }
}

// ── Systems ─────────────────────────────────────────────────────────────────

fn camera_mode_system(
    config: Res<GameConfig>,
    coordinator: Res<GameCoordinator>,
    mut rigs: Query<(&mut CameraRig, &Transform, Ref<ObservedState>)>,
) {
    let portal = coordinator.transit().map(|transit| transit.portal);
    for (mut rig, transform, observed) in &mut rigs {
        if observed.is_changed() {
            rig.enter(observed.0, transform.translation, portal, &config);
        }
    }
}

fn camera_gravity_system(mut rigs: Query<(&mut CameraRig, &GravityListener)>) {
    for (mut rig, listener) in &mut rigs {
        for rotation in listener.0.drain() {
            rig.frame.turn(rotation);
        }
    }
}

/// Input the orbit camera reads this tick, already unit-converted.
struct OrbitInput {
    mouse: Vec2,
    scroll_lines: f32,
    free_look_held: bool,
}

fn camera_tick_system(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<GameConfig>,
    keys: Res<ButtonInput<KeyCode>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mut rigs: Query<(&mut CameraRig, &mut Transform), Without<Player>>,
    mut player: Query<&mut Transform, (With<Player>, Without<CameraRig>)>,
    statics: Query<(Entity, &Transform, &BoxCollider), (With<StaticBody>, Without<Player>, Without<CameraRig>)>,
) {
    let dt = time.delta_secs();
    let input = OrbitInput {
        mouse: mouse_motion.delta,
        scroll_lines: match mouse_scroll.unit {
            MouseScrollUnit::Line => mouse_scroll.delta.y,
            MouseScrollUnit::Pixel => mouse_scroll.delta.y / PIXELS_PER_LINE,
        },
        free_look_held: keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]),
    };

    for (mut rig, mut camera_transform) in &mut rigs {
        rig.frame.update(dt, config.camera.frame_turn_speed);
        let up = rig.frame.up();

        let flight = match &mut rig.mode {
            CameraMode::Spiral(spiral) => Some((spiral.step(dt, &config.wormhole), spiral.portal())),
            CameraMode::Orbit => None,
        };

        match flight {
            Some((step, portal)) => {
                *camera_transform = Transform::from_translation(step.position()).looking_at(portal, up);
                if let SpiralStep::Arrived(_) = step {
                    rig.leave_spiral();
                    commands.trigger(WormholeCompleted);
                }
            }
            None => {
                let Ok(mut player_transform) = player.single_mut() else {
                    continue;
                };
                let colliders = statics
                    .iter()
                    .map(|(entity, transform, collider)| (entity, collider.aabb(transform.translation)));
                orbit_tick(
                    &mut rig,
                    &mut camera_transform,
                    &mut player_transform,
                    &input,
                    colliders,
                    dt,
                    &config.camera,
                );
            }
        }
    }
}

fn orbit_tick(
    rig: &mut CameraRig,
    camera_transform: &mut Transform,
    player_transform: &mut Transform,
    input: &OrbitInput,
    colliders: impl Iterator<Item = (Entity, Aabb)>,
    dt: f32,
    settings: &OrbitSettings,
) {
    if rig.input_enabled {
        rig.orbit.zoom(input.scroll_lines, settings);

        match (input.free_look_held, rig.orbit.is_free_look()) {
            (true, false) => rig.orbit.begin_free_look(),
            (false, true) => rig.orbit.end_free_look(),
            _ => {}
        }
        rig.orbit.rotate(input.mouse, settings);
    }
    rig.orbit.update_radius(dt, settings);

    let up = rig.frame.up();
    let anchor = player_transform.translation;
    let candidate = anchor + rig.frame.rotation() * rig.orbit.local_offset();

    let hit = raycast(anchor, candidate - anchor, rig.orbit.radius, colliders);
    let position = pull_in_front_of_hit(anchor, candidate, hit.map(|hit| hit.distance), settings);

    *camera_transform =
        Transform::from_translation(position).looking_at(anchor + up * settings.look_height, up);

    if rig.input_enabled && !rig.orbit.is_free_look() {
        if let Some(forward) = facing_away_from(position, anchor, up) {
            let target = Transform::IDENTITY.looking_to(forward, up).rotation;
            let t = (settings.player_turn_speed * dt).clamp(0.0, 1.0);
            player_transform.rotation = player_transform.rotation.slerp(target, t);
        }
    }
}

/// Captures the mouse while the camera takes input, releases it otherwise.
fn cursor_grab_system(
    rigs: Query<&CameraRig, Changed<CameraRig>>,
    mut cursors: Query<&mut CursorOptions, With<PrimaryWindow>>,
) {
    let Some(rig) = rigs.iter().next() else {
        return;
    };
    for mut cursor in &mut cursors {
        let (grab_mode, visible) = if rig.input_enabled {
            (CursorGrabMode::Locked, false)
        } else {
            (CursorGrabMode::None, true)
        };
        if cursor.grab_mode != grab_mode {
            cursor.grab_mode = grab_mode;
            cursor.visible = visible;
        }
    }
}
