//! Planar helpers shared by agents, vehicle and population code.
//!
//! Headings are yaw angles around +Y; heading 0 faces +Z.

use glam::{Quat, Vec3};

/// Unit direction on the ground plane for `heading`.
#[inline]
pub fn heading_direction(heading: f32) -> Vec3 {
    Vec3::new(heading.sin(), 0.0, heading.cos())
}

/// Heading pointing along `direction` (its vertical part is ignored).
#[inline]
pub fn heading_of(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z).rem_euclid(std::f32::consts::TAU)
}

/// Body orientation for `heading`.
#[inline]
pub fn yaw(heading: f32) -> Quat {
    Quat::from_rotation_y(heading)
}

/// Distance between two points projected onto the ground plane.
#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}
