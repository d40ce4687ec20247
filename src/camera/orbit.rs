//! Third-person orbit camera math.
//!
//! The camera sits on a sphere around the player. Angles are measured in the
//! gravity-aligned frame: the polar angle is taken from the current "up",
//! so turning gravity turns the whole sphere with it.

use std::f32::consts::{PI, TAU};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OrbitSettings {
    pub min_radius: f32,
    pub max_radius: f32,
    pub initial_radius: f32,
    /// Radius change per scroll line.
    pub zoom_step: f32,
    /// Time the radius needs to mostly catch up with its target.
    pub radius_smooth_time: f32,
    /// Hard cap on how fast the radius may change, in units per second.
    pub max_zoom_speed: f32,
    /// Radians per pixel of mouse movement.
    pub sensitivity: f32,
    pub polar_min: f32,
    pub polar_max: f32,
    pub initial_polar: f32,
    /// The camera looks at a point this far above the player.
    pub look_height: f32,
    /// How quickly the player turns to face away from the camera.
    pub player_turn_speed: f32,
    /// How quickly the camera's frame follows a gravity turn.
    pub frame_turn_speed: f32,
    /// Fraction of the blocked part of the ray the camera pulls in past the hit.
    pub pullback: f32,
    /// Closest the camera is ever placed to the player after a pullback.
    pub near_clip: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            min_radius: 15.0,
            max_radius: 25.0,
            initial_radius: 20.0,
            zoom_step: 2.0,
            radius_smooth_time: 0.2,
            max_zoom_speed: 60.0,
            sensitivity: 0.003,
            polar_min: 0.5,
            polar_max: PI - 1.5,
            initial_polar: 1.1,
            look_height: 1.5,
            player_turn_speed: 10.0,
            frame_turn_speed: 10.0,
            pullback: 0.5,
            near_clip: 0.5,
        }
    }
}

/// Spherical coordinates of the camera around its anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub azimuth: f32,
    pub polar: f32,
    pub radius: f32,
    target_radius: f32,
    radius_velocity: f32,
    /// Angles to go back to when free look ends.
    saved_angles: Option<(f32, f32)>,
}

impl OrbitCamera {
    pub fn new(settings: &OrbitSettings) -> Self {
        let radius = settings
            .initial_radius
            .clamp(settings.min_radius, settings.max_radius);
        Self {
            azimuth: 0.0,
            polar: settings
                .initial_polar
                .clamp(settings.polar_min, settings.polar_max),
            radius,
            target_radius: radius,
            radius_velocity: 0.0,
            saved_angles: None,
        }
    }

    pub fn target_radius(&self) -> f32 {
        self.target_radius
    }

    /// Scroll up (positive) zooms in.
    pub fn zoom(&mut self, scroll_lines: f32, settings: &OrbitSettings) {
        self.target_radius = (self.target_radius - scroll_lines * settings.zoom_step)
            .clamp(settings.min_radius, settings.max_radius);
    }

    pub fn rotate(&mut self, mouse_delta: Vec2, settings: &OrbitSettings) {
        self.azimuth = (self.azimuth + mouse_delta.x * settings.sensitivity).rem_euclid(TAU);
        self.polar = (self.polar - mouse_delta.y * settings.sensitivity)
            .clamp(settings.polar_min, settings.polar_max);
    }

    pub fn is_free_look(&self) -> bool {
        self.saved_angles.is_some()
    }

    pub fn begin_free_look(&mut self) {
        if self.saved_angles.is_none() {
            self.saved_angles = Some((self.azimuth, self.polar));
        }
    }

    pub fn end_free_look(&mut self) {
        if let Some((azimuth, polar)) = self.saved_angles.take() {
            self.azimuth = azimuth;
            self.polar = polar;
        }
    }

    /// Moves the radius toward its target, critically damped.
    pub fn update_radius(&mut self, dt: f32, settings: &OrbitSettings) {
        let next = smooth_damp(
            self.radius,
            self.target_radius,
            &mut self.radius_velocity,
            settings.radius_smooth_time,
            settings.max_zoom_speed,
            dt,
        );
        self.radius = next.clamp(settings.min_radius, settings.max_radius);
    }

    /// Camera offset from the anchor in the gravity-aligned frame (+Y is up).
    pub fn local_offset(&self) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_azimuth, cos_azimuth) = self.azimuth.sin_cos();
        Vec3::new(
            sin_polar * cos_azimuth,
            cos_polar,
            sin_polar * sin_azimuth,
        ) * self.radius
    }
}

/// Critically damped spring toward `target`.
///
/// Never overshoots the target, and never moves more than `max_speed * dt`
/// in one call.
pub fn smooth_damp(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    max_speed: f32,
    dt: f32,
) -> f32 {
    if dt <= 0.0 {
        return current;
    }

    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let max_change = max_speed * smooth_time;
    let change = (current - target).clamp(-max_change, max_change);
    let clamped_target = current - change;

    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut next = clamped_target + (change + temp) * decay;

    // Went past the real target: stop there.
    if (target - current > 0.0) == (next > target) {
        next = target;
        *velocity = 0.0;
    }

    let max_step = max_speed * dt;
    current + (next - current).clamp(-max_step, max_step)
}

/// Camera position after backing off from geometry between it and the anchor.
///
/// `hit_distance` is the distance from the anchor to the first thing the ray
/// toward `candidate` hit. When that is closer than the candidate, the camera
/// is pulled in past the hit by `pullback` times the blocked length.
pub fn pull_in_front_of_hit(
    anchor: Vec3,
    candidate: Vec3,
    hit_distance: Option<f32>,
    settings: &OrbitSettings,
) -> Vec3 {
    let offset = candidate - anchor;
    let radius = offset.length();
    let Some(direction) = offset.try_normalize() else {
        return candidate;
    };

    match hit_distance {
        Some(hit) if hit < radius => {
            let blocked = radius - hit;
            let distance = (hit - blocked * settings.pullback).max(settings.near_clip.min(hit));
            anchor + direction * distance
        }
        _ => candidate,
    }
}

/// Direction the player should face: away from the camera, flattened onto the
/// plane the player stands on. `None` when the camera is straight above.
pub fn facing_away_from(camera: Vec3, anchor: Vec3, up: Vec3) -> Option<Vec3> {
    (anchor - camera).reject_from_normalized(up).try_normalize()
}

/// The camera's idea of "up", following gravity turns smoothly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityFrame {
    target: Quat,
    current: Quat,
}

impl Default for GravityFrame {
    fn default() -> Self {
        Self {
            target: Quat::IDENTITY,
            current: Quat::IDENTITY,
        }
    }
}

impl GravityFrame {
    /// Stacks a gravity turn on top of the ones already received.
    pub fn turn(&mut self, rotation: Quat) {
        self.target = (rotation * self.target).normalize();
    }

    pub fn update(&mut self, dt: f32, turn_speed: f32) {
        let t = (turn_speed * dt).clamp(0.0, 1.0);
        self.current = self.current.slerp(self.target, t).normalize();
    }

    pub fn rotation(&self) -> Quat {
        self.current
    }

    pub fn target(&self) -> Quat {
        self.target
    }

    pub fn up(&self) -> Vec3 {
        self.current * Vec3::Y
    }
}
