//! Just enough physics for a hallway made of boxes.
//!
//! Everything is an axis-aligned box. Level geometry never rotates (gravity
//! turns in 90° steps, so the hallway's walls stay axis-aligned no matter
//! which one is the floor), which keeps collision down to box-vs-box pushes
//! and slab-method ray tests.

use bevy::prelude::*;

use crate::{gravity::GravityController, GameSet};

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, integrate_bodies_system.in_set(GameSet::Physics));
    }
}

/// Longest step the integrator will take. A long frame is split into
/// several steps instead of letting the player tunnel through a floor.
const MAX_STEP: f32 = 1.0 / 60.0;

/// A push within 45° of "up" means the body is standing on something.
const GROUND_COS: f32 = std::f32::consts::FRAC_1_SQRT_2;

// ── Geometry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Smallest translation that moves `self` out of `other`.
    /// `None` when the boxes don't overlap (touching faces don't count).
    pub fn push_out_of(&self, other: &Aabb) -> Option<Vec3> {
        let overlap = self.max.min(other.max) - self.min.max(other.min);
        if overlap.cmple(Vec3::ZERO).any() {
            return None;
        }

        let away = self.center() - other.center();
        let sign = |delta: f32| if delta < 0.0 { -1.0 } else { 1.0 };

        let push = if overlap.x <= overlap.y && overlap.x <= overlap.z {
            Vec3::new(overlap.x * sign(away.x), 0.0, 0.0)
        } else if overlap.y <= overlap.z {
            Vec3::new(0.0, overlap.y * sign(away.y), 0.0)
        } else {
            Vec3::new(0.0, 0.0, overlap.z * sign(away.z))
        };
        Some(push)
    }

    /// Distance along a ray to the first face it enters (slab method).
    ///
    /// `direction` must be normalized. Returns `None` if the box is missed,
    /// lies entirely behind the origin, starts beyond `max_distance`, or
    /// already contains the origin.
    pub fn ray_distance(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32> {
        if self.contains(origin) {
            return None;
        }

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < 1e-8 {
                // Parallel to this slab: either inside it for the whole ray or never.
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let t1 = (lo - o) / d;
            let t2 = (hi - o) / d;
            t_enter = t_enter.max(t1.min(t2));
            t_exit = t_exit.min(t1.max(t2));
        }

        if t_exit < t_enter || t_exit < 0.0 || t_enter < 0.0 || t_enter > max_distance {
            return None;
        }
        Some(t_enter)
    }
}

// ── Components ──────────────────────────────────────────────────────────────

/// Box-shaped collider centered on the entity's translation.
#[derive(Component, Debug, Clone, Copy)]
pub struct BoxCollider {
    pub half_extents: Vec3,
}

impl BoxCollider {
    pub fn new(half_extents: Vec3) -> Self {
        Self { half_extents }
    }

    pub fn aabb(&self, translation: Vec3) -> Aabb {
        Aabb::from_center(translation, self.half_extents)
    }
}

/// Level geometry: never moves, only gets collided with.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct StaticBody;

/// Moves under gravity and gets pushed out of static bodies.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct KinematicBody {
    pub velocity: Vec3,
    pub grounded: bool,
}

// ── Events ──────────────────────────────────────────────────────────────────

/// A kinematic body is touching a static body this tick.
///
/// Fired every tick the contact lasts, not just the first. Each normal points
/// from the body into the thing it hit.
#[derive(Event, Debug, Clone)]
pub struct ContactReport {
    pub body: Entity,
    pub other: Entity,
    pub normals: Vec<Vec3>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    pub point: Vec3,
    pub distance: f32,
}

/// Nearest hit along a ray among the given boxes.
pub fn raycast(
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    colliders: impl IntoIterator<Item = (Entity, Aabb)>,
) -> Option<RayHit> {
    let direction = direction.try_normalize()?;

    colliders
        .into_iter()
        .filter_map(|(entity, aabb)| {
            aabb.ray_distance(origin, direction, max_distance)
                .map(|distance| RayHit {
                    entity,
                    point: origin + direction * distance,
                    distance,
                })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

// ── Integration ─────────────────────────────────────────────────────────────

/// Result of one integration step for one body.
#[derive(Debug, Default)]
pub struct StepOutcome {
    pub contacts: Vec<(Entity, Vec3)>,
}

/// Advances one body by `dt`: gravity, movement, then push-out against every
/// static box. Contacts are returned as (static entity, normal into it).
pub fn step_body(
    translation: &mut Vec3,
    body: &mut KinematicBody,
    collider: &BoxCollider,
    gravity: Vec3,
    dt: f32,
    statics: &[(Entity, Aabb)],
) -> StepOutcome {
    let up = (-gravity).normalize_or(Vec3::Y);
    let mut outcome = StepOutcome::default();

    body.velocity += gravity * dt;
    *translation += body.velocity * dt;
    body.grounded = false;

    for &(entity, aabb) in statics {
        let Some(push) = collider.aabb(*translation).push_out_of(&aabb) else {
            continue;
        };
        *translation += push;

        let normal = push.normalize_or_zero();
        let into_surface = body.velocity.dot(normal);
        if into_surface < 0.0 {
            body.velocity -= normal * into_surface;
        }
        if normal.dot(up) > GROUND_COS {
            body.grounded = true;
        }
        outcome.contacts.push((entity, -normal));
    }

    outcome
}

fn integrate_bodies_system(
    mut commands: Commands,
    time: Res<Time>,
    gravity: Option<Res<GravityController>>,
    mut bodies: Query<(Entity, &mut Transform, &mut KinematicBody, &BoxCollider), Without<StaticBody>>,
    statics: Query<(Entity, &Transform, &BoxCollider), With<StaticBody>>,
) {
    let gravity = gravity.map_or(Vec3::ZERO, |controller| controller.gravity());
    let statics: Vec<(Entity, Aabb)> = statics
        .iter()
        .map(|(entity, transform, collider)| (entity, collider.aabb(transform.translation)))
        .collect();

    let frame = time.delta_secs();
    let steps = (frame / MAX_STEP).ceil().max(1.0) as u32;
    let dt = frame / steps as f32;

    for (entity, mut transform, mut body, collider) in &mut bodies {
        let mut translation = transform.translation;
        let mut touching: Vec<(Entity, Vec3)> = Vec::new();

        for _ in 0..steps {
            let outcome = step_body(&mut translation, &mut body, collider, gravity, dt, &statics);
            for (other, normal) in outcome.contacts {
                if !touching.iter().any(|(seen, _)| *seen == other) {
                    touching.push((other, normal));
                }
            }
        }
        transform.translation = translation;

        for (other, normal) in touching {
            commands.trigger(ContactReport {
                body: entity,
                other,
                normals: vec![normal],
            });
        }
    }
}
