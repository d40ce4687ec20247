//! Spiral flight into a wormhole portal.
//!
//! The camera keeps an explicit distance to the portal that only ever shrinks,
//! and places itself on a cone around the approach axis at exactly that
//! distance. The spiral is the angle around the cone.

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpiralSettings {
    /// The flight ends once the camera is this close to the portal.
    pub threshold: f32,
    /// Radians per second around the approach axis.
    pub angular_speed: f32,
    /// Largest sideways distance from the approach axis.
    pub spiral_radius: f32,
    /// Distance at which the spiral reaches full width.
    pub trigger_distance: f32,
    /// Fraction of the remaining distance covered per second, at the start.
    pub initial_speed: f32,
    /// How much `initial_speed` grows per second.
    pub acceleration: f32,
}

impl Default for SpiralSettings {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            angular_speed: 5.0,
            spiral_radius: 5.0,
            trigger_distance: 50.0,
            initial_speed: 10.0,
            acceleration: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpiralStep {
    Approaching(Vec3),
    /// Within the threshold. The flight is over.
    Arrived(Vec3),
}

impl SpiralStep {
    pub fn position(self) -> Vec3 {
        match self {
            SpiralStep::Approaching(position) | SpiralStep::Arrived(position) => position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WormholeSpiral {
    portal: Vec3,
    /// Unit vector from the portal back toward where the camera started.
    axis: Vec3,
    side: Vec3,
    lift: Vec3,
    distance: f32,
    angle: f32,
    speed: f32,
}

impl WormholeSpiral {
    pub fn begin(camera: Vec3, portal: Vec3, settings: &SpiralSettings) -> Self {
        let offset = camera - portal;
        let axis = offset.normalize_or(Vec3::Z);
        let (side, lift) = axis.any_orthonormal_pair();
        Self {
            portal,
            axis,
            side,
            lift,
            distance: offset.length(),
            angle: 0.0,
            speed: settings.initial_speed,
        }
    }

    pub fn portal(&self) -> Vec3 {
        self.portal
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Sideways radius: proportional to the remaining distance, capped at
    /// `spiral_radius`, and eased in over the first quarter turn so the
    /// camera doesn't snap sideways when the flight starts.
    fn lateral_radius(&self, settings: &SpiralSettings) -> f32 {
        let width = if settings.trigger_distance > 0.0 {
            (settings.spiral_radius * self.distance / settings.trigger_distance)
                .min(settings.spiral_radius)
        } else {
            settings.spiral_radius
        };
        let ease = (self.angle / FRAC_PI_2).clamp(0.0, 1.0);
        (width * ease).clamp(0.0, self.distance)
    }

    pub fn position(&self, settings: &SpiralSettings) -> Vec3 {
        let radius = self.lateral_radius(settings);
        let along = (self.distance * self.distance - radius * radius).max(0.0).sqrt();
        let (sin, cos) = self.angle.sin_cos();
        self.portal + self.axis * along + (self.side * cos + self.lift * sin) * radius
    }

    /// Advances the flight by `dt`.
    ///
    /// The remaining distance shrinks by `speed * dt` of itself every call
    /// (strictly, for any `dt > 0`), and the speed keeps growing.
    pub fn step(&mut self, dt: f32, settings: &SpiralSettings) -> SpiralStep {
        if self.distance <= settings.threshold {
            return SpiralStep::Arrived(self.position(settings));
        }

        let t = (self.speed * dt).clamp(0.0, 1.0);
        self.distance *= 1.0 - t;
        self.angle += settings.angular_speed * dt;
        self.speed += settings.acceleration * dt;

        let position = self.position(settings);
        if self.distance <= settings.threshold {
            SpiralStep::Arrived(position)
        } else {
            SpiralStep::Approaching(position)
        }
    }
}
