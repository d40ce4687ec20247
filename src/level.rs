//! The hallway level: a long box running down -Z, a field of spikes that can
//! only be passed by walking on a wall, and a wormhole that carries the player
//! past the barrier at the far end.

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use crate::{
    camera::CameraRig,
    config::GameConfig,
    game_state::Wormhole,
    hazard::Spike,
    physics::{BoxCollider, StaticBody},
    player::player_bundle,
};

pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_level);
    }
}

/// Inner half-width (and half-height) of the hallway's square cross section.
const HALF_WIDTH: f32 = 5.0;
const WALL: f32 = 0.5;
const NEAR_Z: f32 = 10.0;
const FAR_Z: f32 = -230.0;
const BARRIER_Z: f32 = -160.0;

/// Z of the first spike row on the floor; the field runs `FLOOR_ROWS` deep.
const FLOOR_FIELD_Z: f32 = -50.0;
const FLOOR_ROWS: usize = 8;

const PORTAL: Vec3 = Vec3::new(0.0, HALF_WIDTH, -150.0);
const PORTAL_EXIT: Vec3 = Vec3::new(0.0, 1.5, -175.0);

/// Axis-aligned slab given by its two opposite corners.
fn slab(min: Vec3, max: Vec3) -> (Vec3, Vec3) {
    ((min + max) * 0.5, (max - min) * 0.5)
}

fn hallway_slabs() -> Vec<(Vec3, Vec3)> {
    let (w, t) = (HALF_WIDTH, WALL);
    let top = 2.0 * w;
    vec![
        // floor, ceiling
        slab(Vec3::new(-w - t, -t, FAR_Z), Vec3::new(w + t, 0.0, NEAR_Z)),
        slab(Vec3::new(-w - t, top, FAR_Z), Vec3::new(w + t, top + t, NEAR_Z)),
        // left, right
        slab(Vec3::new(-w - t, 0.0, FAR_Z), Vec3::new(-w, top, NEAR_Z)),
        slab(Vec3::new(w, 0.0, FAR_Z), Vec3::new(w + t, top, NEAR_Z)),
        // ends
        slab(Vec3::new(-w, 0.0, NEAR_Z), Vec3::new(w, top, NEAR_Z + t)),
        slab(Vec3::new(-w, 0.0, FAR_Z - t), Vec3::new(w, top, FAR_Z)),
        // the barrier only the wormhole gets you past
        slab(Vec3::new(-w, 0.0, BARRIER_Z - t), Vec3::new(w, top, BARRIER_Z)),
    ]
}

/// Spike positions and which way their tips point.
fn spike_layout() -> Vec<(Vec3, Quat)> {
    let mut spikes = Vec::new();

    // A solid field across the whole floor, deeper than a running jump.
    // Someone standing on a wall walks over it.
    for row in 0..FLOOR_ROWS {
        let z = FLOOR_FIELD_Z - row as f32;
        for column in 0..(2.0 * HALF_WIDTH) as usize {
            let x = -HALF_WIDTH + 0.5 + column as f32;
            spikes.push((Vec3::new(x, 0.5, z), Quat::IDENTITY));
        }
    }

    // A row on the left wall further on, tips pointing into the hallway.
    for y in [2.0, 4.0, 6.0, 8.0] {
        spikes.push((
            Vec3::new(-HALF_WIDTH + 0.5, y, -95.0),
            Quat::from_rotation_z(-FRAC_PI_2),
        ));
    }

    spikes
}

fn spawn_level(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let wall_material = materials.add(Color::srgb(0.35, 0.37, 0.42));
    for (center, half_extents) in hallway_slabs() {
        commands.spawn((
            StaticBody,
            BoxCollider::new(half_extents),
            Mesh3d(meshes.add(Cuboid::from_size(half_extents * 2.0))),
            MeshMaterial3d(wall_material.clone()),
            Transform::from_translation(center),
        ));
    }

    let spike_mesh = meshes.add(Cone {
        radius: 0.5,
        height: 1.0,
    });
    let spike_material = materials.add(Color::srgb(0.8, 0.15, 0.1));
    for (position, rotation) in spike_layout() {
        commands.spawn((
            Spike::new(&config.hazard),
            StaticBody,
            BoxCollider::new(Vec3::splat(0.5)),
            Mesh3d(spike_mesh.clone()),
            MeshMaterial3d(spike_material.clone()),
            Transform::from_translation(position).with_rotation(rotation),
        ));
    }

    commands.spawn((
        Wormhole {
            exit: PORTAL_EXIT,
            trigger_radius: 3.0,
        },
        Mesh3d(meshes.add(Torus::new(2.0, 2.6))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.4, 0.1, 0.9),
            emissive: LinearRgba::rgb(2.0, 0.5, 6.0),
            ..default()
        })),
        Transform::from_translation(PORTAL).with_rotation(Quat::from_rotation_x(FRAC_PI_2)),
    ));

    let player = player_bundle(&config.player);
    let spawn = Vec3::from_array(config.player.spawn);
    commands.spawn((
        player,
        Mesh3d(meshes.add(Capsule3d::new(0.5, 1.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.9, 0.8, 0.3))),
    ));

    commands.spawn((
        Camera3d::default(),
        CameraRig::new(&config.camera),
        Transform::from_translation(spawn + Vec3::new(0.0, 6.0, config.camera.initial_radius))
            .looking_at(spawn, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -1.0, 0.4, 0.0)),
    ));

    commands.spawn((
        PointLight {
            intensity: 2_000_000.0,
            range: 40.0,
            ..default()
        },
        Transform::from_translation(PORTAL),
    ));

    info!("Level spawned");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        physics::Aabb,
        player::{upright_half_extents, PlayerSettings},
    };

    fn colliders() -> Vec<Aabb> {
        hallway_slabs()
            .into_iter()
            .map(|(center, half)| Aabb::from_center(center, half))
            .collect()
    }

    #[test]
    fn spawn_and_portal_are_inside_the_hallway() {
        let inside = Aabb::new(
            Vec3::new(-HALF_WIDTH, 0.0, FAR_Z),
            Vec3::new(HALF_WIDTH, 2.0 * HALF_WIDTH, NEAR_Z),
        );
        let spawn = Vec3::from_array(PlayerSettings::default().spawn);
        for point in [spawn, PORTAL, PORTAL_EXIT] {
            assert!(inside.contains(point), "{point:?}");
            assert!(colliders().iter().all(|wall| !wall.contains(point)), "{point:?}");
        }
    }

    #[test]
    fn barrier_separates_portal_from_exit() {
        assert!(PORTAL.z > BARRIER_Z);
        assert!(PORTAL_EXIT.z < BARRIER_Z);
    }

    #[test]
    fn spikes_sit_on_a_surface_tip_inward() {
        for (position, rotation) in spike_layout() {
            let tip = position + rotation * Vec3::Y;
            let base = position - rotation * Vec3::Y;
            let walls = colliders();
            assert!(walls.iter().all(|wall| !wall.contains(tip)));
            assert!(walls.iter().any(|wall| wall.contains(base)), "{position:?}");
        }
    }

    fn floor_spikes() -> Vec<Aabb> {
        spike_layout()
            .into_iter()
            .filter(|(_, rotation)| *rotation == Quat::IDENTITY)
            .map(|(position, _)| Aabb::from_center(position, Vec3::splat(0.5)))
            .collect()
    }

    #[test]
    fn floor_spikes_leave_no_gap_for_the_player() {
        let player_width = 2.0 * PlayerSettings::default().half_extents[0];
        let spikes = floor_spikes();

        for row in 0..FLOOR_ROWS {
            let z = FLOOR_FIELD_Z - row as f32;
            let mut spans: Vec<(f32, f32)> = spikes
                .iter()
                .filter(|spike| (spike.center().z - z).abs() < 1e-4)
                .map(|spike| (spike.min.x, spike.max.x))
                .collect();
            spans.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut edge = -HALF_WIDTH;
            for (min, max) in spans {
                assert!(min - edge < player_width, "gap at x {edge}..{min}, z {z}");
                edge = edge.max(max);
            }
            assert!(HALF_WIDTH - edge < player_width, "gap at x {edge}..{HALF_WIDTH}, z {z}");
        }
    }

    #[test]
    fn running_jump_cannot_clear_the_floor_spikes() {
        let config = GameConfig::default();
        let spikes = floor_spikes();
        let near = spikes.iter().map(|spike| spike.max.z).fold(f32::MIN, f32::max);
        let far = spikes.iter().map(|spike| spike.min.z).fold(f32::MAX, f32::min);
        let top = spikes.iter().map(|spike| spike.max.y).fold(f32::MIN, f32::max);

        let g = Vec3::from_array(config.gravity.initial).length();
        let v = config.player.jump_speed;
        let airborne_above_spikes = 2.0 * (v * v - 2.0 * g * top).sqrt() / g;
        let reach = config.player.move_speed * airborne_above_spikes;
        let player_depth = 2.0 * config.player.half_extents[2];

        assert!(reach < near - far + player_depth, "reach {reach}, field {}", near - far);
    }

    #[test]
    fn wall_walker_passes_over_the_floor_spikes() {
        let base = Vec3::from_array(PlayerSettings::default().half_extents);
        let half = upright_half_extents(base, Vec3::X);
        let walls = colliders();

        for z in [FLOOR_FIELD_Z, FLOOR_FIELD_Z - FLOOR_ROWS as f32 + 1.0] {
            let walker = Aabb::from_center(Vec3::new(-HALF_WIDTH + half.x, 1.5, z), half);
            assert!(walls.iter().all(|wall| walker.push_out_of(wall).is_none()));
            assert!(floor_spikes().iter().all(|spike| walker.push_out_of(spike).is_none()));
        }
    }
}
