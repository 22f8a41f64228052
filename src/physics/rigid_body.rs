//! Semi-implicit Euler integration over the body arena.

use glam::Vec3;

use super::components::{RigidBody, RigidBodyType, Transform};

/// `v += (g * gravity_scale + F / m) * dt`, then per-step damping.
///
/// Accumulated forces are consumed on every body, including the ones
/// this skips (static, kinematic).
pub fn integrate_velocities(world: &mut hecs::World, gravity: Vec3, dt: f32) {
    for (_, rb) in world.query_mut::<&mut RigidBody>() {
        let force = std::mem::take(&mut rb.force_accumulator);
        let inv_mass = rb.inv_mass();
        if inv_mass == 0.0 {
            continue;
        }

        let acceleration = gravity * rb.gravity_scale + force * inv_mass;
        let damping = (1.0 - rb.linear_damping).max(0.0);
        rb.linear_velocity = (rb.linear_velocity + acceleration * dt) * damping;
    }
}

/// `p += v * dt` for everything that is not static.
///
/// Kinematic bodies move by whatever velocity gameplay code gave them.
pub fn integrate_positions(world: &mut hecs::World, dt: f32) {
    for (_, (rb, transform)) in world.query_mut::<(&RigidBody, &mut Transform)>() {
        if rb.body_type == RigidBodyType::Static {
            continue;
        }
        transform.position += rb.linear_velocity * dt;
    }
}
