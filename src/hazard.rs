use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    physics::{ContactReport, KinematicBody},
    player::{ModifyLife, Player},
};

pub struct HazardPlugin;

impl Plugin for HazardPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(on_spike_contact);
    }
}

/// A contact only counts when its normal points this squarely against the
/// spike's own up direction (about 25° of slack).
pub const STRIKE_COS: f32 = -0.9;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HazardSettings {
    /// Life taken per hit.
    pub damage: i32,
    /// Speed the player bounces off the spike tip with.
    pub knockback: f32,
}

impl Default for HazardSettings {
    fn default() -> Self {
        Self {
            damage: 1,
            knockback: 12.0,
        }
    }
}

/// A spike. Its local +Y is the direction the tip points.
#[derive(Component, Debug, Clone, Copy)]
pub struct Spike {
    pub damage: i32,
    pub knockback: f32,
}

impl Spike {
    pub fn new(settings: &HazardSettings) -> Self {
        Self {
            damage: settings.damage,
            knockback: settings.knockback,
        }
    }
}

/// True when any contact normal lands on the tip: touching the sides or the
/// base of a spike is harmless.
pub fn strikes_point(normals: &[Vec3], spike_up: Vec3) -> bool {
    normals.iter().any(|normal| normal.dot(spike_up) < STRIKE_COS)
}

fn on_spike_contact(
    trigger: On<ContactReport>,
    mut commands: Commands,
    spikes: Query<(&Spike, &Transform)>,
    mut players: Query<&mut KinematicBody, With<Player>>,
) {
    let Ok((spike, spike_transform)) = spikes.get(trigger.other) else {
        return;
    };
    let Ok(mut body) = players.get_mut(trigger.body) else {
        return;
    };

    let spike_up = spike_transform.up().as_vec3();
    if !strikes_point(&trigger.normals, spike_up) {
        return;
    }

    debug!("Spike {:?} hit the player", trigger.other);
    body.velocity = spike_up * spike.knockback;
    commands.trigger(ModifyLife {
        delta: -spike.damage,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_on_the_tip_strikes() {
        assert!(strikes_point(&[Vec3::NEG_Y], Vec3::Y));
    }

    #[test]
    fn brushing_the_side_does_not() {
        assert!(!strikes_point(&[Vec3::X], Vec3::Y));
        assert!(!strikes_point(&[Vec3::new(0.6, -0.8, 0.0)], Vec3::Y));
    }

    #[test]
    fn spike_on_the_ceiling_strikes_from_below() {
        assert!(strikes_point(&[Vec3::Y], Vec3::NEG_Y));
        assert!(!strikes_point(&[Vec3::NEG_Y], Vec3::NEG_Y));
    }

    #[test]
    fn any_qualifying_normal_is_enough() {
        assert!(strikes_point(&[Vec3::Z, Vec3::NEG_Y], Vec3::Y));
        assert!(!strikes_point(&[], Vec3::Y));
    }
}
