//! Collider shape support functions for collision detection.

use glam::{Mat3, Vec3};

use super::components::{ColliderShape, Transform};

/// Axis-aligned bounding box for broadphase collision detection.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl PhysicsAabb {
    /// Test whether two AABBs overlap.
    #[inline]
    pub fn overlaps(&self, other: &PhysicsAabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

impl ColliderShape {
    /// Returns the farthest point of the shape in the given world direction.
    ///
    /// Planes have no finite support; their own position is returned.
    #[inline]
    pub fn support(&self, direction: Vec3, transform: &Transform) -> Vec3 {
        let dir = direction.normalize_or_zero();
        match self {
            ColliderShape::Sphere { radius } => transform.position + dir * *radius,
            ColliderShape::Box { half_extents } => {
                let local = transform.rotation.inverse() * dir;
                let corner = Vec3::new(
                    if local.x >= 0.0 { half_extents.x } else { -half_extents.x },
                    if local.y >= 0.0 { half_extents.y } else { -half_extents.y },
                    if local.z >= 0.0 { half_extents.z } else { -half_extents.z },
                );
                transform.transform_point(corner)
            }
            ColliderShape::Capsule {
                radius,
                half_height,
            } => {
                let axis = transform.rotation * Vec3::Y;
                let tip = if axis.dot(dir) >= 0.0 {
                    axis * *half_height
                } else {
                    -axis * *half_height
                };
                transform.position + tip + dir * *radius
            }
            ColliderShape::Plane => transform.position,
        }
    }

    /// Compute the world-space AABB for this shape. `None` for unbounded shapes.
    #[inline]
    pub fn compute_aabb(&self, transform: &Transform) -> Option<PhysicsAabb> {
        let center = transform.position;
        match self {
            ColliderShape::Sphere { radius } => Some(PhysicsAabb {
                min: center - Vec3::splat(*radius),
                max: center + Vec3::splat(*radius),
            }),
            ColliderShape::Box { half_extents } => {
                Some(aabb_from_extents(*half_extents, transform))
            }
            ColliderShape::Capsule {
                radius,
                half_height,
            } => {
                let extents = Vec3::new(*radius, *half_height + *radius, *radius);
                Some(aabb_from_extents(extents, transform))
            }
            ColliderShape::Plane => None,
        }
    }

    /// Rough radius of the shape around its origin, used for spawn spacing
    /// and debug output.
    pub fn bounding_radius(&self) -> f32 {
        match self {
            ColliderShape::Sphere { radius } => *radius,
            ColliderShape::Box { half_extents } => half_extents.length(),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => *radius + *half_height,
            ColliderShape::Plane => f32::INFINITY,
        }
    }
}

/// Compute world-space AABB from local half-extents and a pose.
#[inline]
fn aabb_from_extents(half_extents: Vec3, transform: &Transform) -> PhysicsAabb {
    let rot = Mat3::from_quat(transform.rotation);

    // Project each rotated local axis onto the world axes
    let extent = rot.x_axis.abs() * half_extents.x
        + rot.y_axis.abs() * half_extents.y
        + rot.z_axis.abs() * half_extents.z;

    PhysicsAabb {
        min: transform.position - extent,
        max: transform.position + extent,
    }
}
