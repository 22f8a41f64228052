//! Shared setup helpers for skid benchmarks.
//!
//! ## Running
//!
//! Physics and simulation (criterion):
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- broadphase
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- simulation

use glam::Vec3;
use skid::physics::components::{Collider, ColliderShape, RigidBody, Transform};
use skid::{ControlState, SimCollaborators, SimConfig, Simulation};

// ---------------------------------------------------------------------------
// Broadphase scenes
// ---------------------------------------------------------------------------

/// Spawn `n` dynamic sphere bodies in a grid layout so roughly half overlap.
pub fn setup_sphere_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let cols = (n as f32).sqrt().ceil() as usize;

    for i in 0..n {
        let x = (i % cols) as f32 * 1.5;
        let z = (i / cols) as f32 * 1.5;
        world.spawn((
            Transform::from_position(Vec3::new(x, 0.0, z)),
            RigidBody::new_dynamic(1.0),
            Collider::new(ColliderShape::Sphere { radius: 1.0 }),
        ));
    }
    world
}

/// Agents scattered sparsely around a ground plane, the layout a city tick sees.
pub fn setup_street_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    world.spawn((
        Transform::identity(),
        RigidBody::new_static(),
        Collider::new(ColliderShape::Plane),
    ));

    let cols = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let x = (i % cols) as f32 * 6.0;
        let z = (i / cols) as f32 * 6.0;
        world.spawn((
            Transform::from_position(Vec3::new(x, 0.9, z)),
            RigidBody::new_dynamic(70.0).with_gravity_scale(0.0),
            Collider::new(ColliderShape::Capsule {
                radius: 0.3,
                half_height: 0.6,
            }),
        ));
    }
    world
}

// ---------------------------------------------------------------------------
// Simulation scenes
// ---------------------------------------------------------------------------

/// Seeded simulation with a block of buildings, warmed up until the
/// population has filled in.
pub fn setup_city(warmup_ticks: usize) -> anyhow::Result<Simulation> {
    let config = SimConfig {
        rng_seed: Some(7),
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(config, SimCollaborators::default())?;

    for gx in -3..=3 {
        for gz in -3..=3 {
            if gx == 0 && gz == 0 {
                continue;
            }
            let center = Vec3::new(gx as f32 * 40.0, 6.0, gz as f32 * 40.0);
            sim.add_building(center, Vec3::new(8.0, 6.0, 8.0));
        }
    }

    let controls = cruise();
    for _ in 0..warmup_ticks {
        sim.tick(1.0 / 60.0, &controls);
    }
    Ok(sim)
}

/// Hold the throttle with a gentle left turn, so the car circles the block.
pub fn cruise() -> ControlState {
    ControlState {
        forward: true,
        left: true,
        ..ControlState::default()
    }
}
