//! Sequential impulse contact solver (linear only).

use glam::Vec3;

use super::components::RigidBody;
use super::contact::ContactManifold;
use super::BodyId;

/// Baumgarte stabilization parameter.
const BAUMGARTE_BETA: f32 = 0.2;
/// Penetration slop (allowed penetration before position correction).
const PENETRATION_SLOP: f32 = 0.005;
/// Closing speed below which restitution is ignored, so resting contact stays put.
const RESTITUTION_THRESHOLD: f32 = 1.0;

/// Solve contact constraints using sequential impulse iteration.
pub fn solve_contacts(
    manifolds: &mut [ContactManifold],
    world: &mut hecs::World,
    solver_iterations: u32,
    dt: f32,
) {
    for _ in 0..solver_iterations {
        for manifold in manifolds.iter_mut() {
            solve_manifold(manifold, world, dt);
        }
    }
}

/// Snapshot of the solver-relevant rigid body data.
#[derive(Clone, Copy)]
struct RbData {
    inv_mass: f32,
    velocity: Vec3,
    restitution: f32,
    friction: f32,
}

fn read(world: &hecs::World, body: BodyId) -> Option<RbData> {
    let rb = world.get::<&RigidBody>(body.0).ok()?;
    Some(RbData {
        inv_mass: rb.inv_mass(),
        velocity: rb.linear_velocity,
        restitution: rb.restitution,
        friction: rb.friction,
    })
}

fn solve_manifold(manifold: &mut ContactManifold, world: &mut hecs::World, dt: f32) {
    let (Some(a), Some(b)) = (read(world, manifold.body_a), read(world, manifold.body_b)) else {
        return;
    };

    let inv_mass_sum = a.inv_mass + b.inv_mass;
    if inv_mass_sum <= 0.0 {
        return;
    }

    let normal = manifold.normal;
    let restitution = if manifold.approach_speed > RESTITUTION_THRESHOLD {
        (a.restitution + b.restitution) * 0.5
    } else {
        0.0
    };
    let friction = (a.friction + b.friction) * 0.5;

    let mut vel_a = a.velocity;
    let mut vel_b = b.velocity;

    for contact in &mut manifold.contacts {
        let relative_velocity = vel_b - vel_a;
        let contact_velocity = relative_velocity.dot(normal);

        // Baumgarte position correction
        let bias = BAUMGARTE_BETA / dt * (contact.penetration - PENETRATION_SLOP).max(0.0);
        let target = restitution * manifold.approach_speed + bias;

        let j_normal = (target - contact_velocity) / inv_mass_sum;

        // Clamp accumulated normal impulse
        let old_impulse = contact.normal_impulse;
        contact.normal_impulse = (old_impulse + j_normal).max(0.0);
        let j_normal = contact.normal_impulse - old_impulse;

        let impulse = normal * j_normal;
        vel_a -= impulse * a.inv_mass;
        vel_b += impulse * b.inv_mass;

        // Friction impulse
        let rel_vel = vel_b - vel_a;
        let tangent_vel = rel_vel - normal * rel_vel.dot(normal);
        let tangent_len = tangent_vel.length();
        if tangent_len > 1e-6 {
            let tangent = tangent_vel / tangent_len;
            let j_tangent = -tangent_len / inv_mass_sum;

            // Coulomb friction: |Jt| <= mu * |Jn|
            let max_friction = friction * contact.normal_impulse;
            let old_tangent = contact.tangent_impulse;
            contact.tangent_impulse = (old_tangent + j_tangent).clamp(-max_friction, max_friction);
            let j_tangent = contact.tangent_impulse - old_tangent;

            let friction_impulse = tangent * j_tangent;
            vel_a -= friction_impulse * a.inv_mass;
            vel_b += friction_impulse * b.inv_mass;
        }
    }

    write(world, manifold.body_a, a.inv_mass, vel_a);
    write(world, manifold.body_b, b.inv_mass, vel_b);
}

fn write(world: &mut hecs::World, body: BodyId, inv_mass: f32, velocity: Vec3) {
    if inv_mass == 0.0 {
        return;
    }
    if let Ok(mut rb) = world.get::<&mut RigidBody>(body.0) {
        rb.linear_velocity = velocity;
    }
}
