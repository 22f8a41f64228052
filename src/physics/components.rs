//! Components attached to every physics body entity.

use glam::{Quat, Vec3};

/// Rigid body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Affected by forces and collisions.
    Dynamic,
    /// Immovable.
    Static,
    /// Position controlled by gameplay code, but pushes dynamic bodies.
    Kinematic,
}

/// Rigid body component.
///
/// Rotation is never integrated: gameplay code owns orientation (vehicle
/// heading, upright agents), so the body only carries linear state.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub body_type: RigidBodyType,
    /// Mass in simulation units. `0.0` means immovable.
    pub mass: f32,
    pub linear_velocity: Vec3,
    pub force_accumulator: Vec3,
    /// Linear damping factor applied per sub-step (default: 0.01).
    pub linear_damping: f32,
    /// Coefficient of restitution (0.0 - 1.0).
    pub restitution: f32,
    /// Friction coefficient (0.0 - 1.0).
    pub friction: f32,
    /// Gravity scale (default: 1.0).
    pub gravity_scale: f32,
}

impl RigidBody {
    /// Create a new dynamic rigid body with the given mass.
    ///
    /// A non-positive mass yields a static body.
    pub fn new_dynamic(mass: f32) -> Self {
        if !(mass > 0.0) {
            return Self::new_static();
        }
        Self {
            body_type: RigidBodyType::Dynamic,
            mass,
            linear_velocity: Vec3::ZERO,
            force_accumulator: Vec3::ZERO,
            linear_damping: 0.01,
            restitution: 0.2,
            friction: 0.5,
            gravity_scale: 1.0,
        }
    }

    /// Create a new static rigid body.
    pub fn new_static() -> Self {
        Self {
            body_type: RigidBodyType::Static,
            mass: 0.0,
            linear_velocity: Vec3::ZERO,
            force_accumulator: Vec3::ZERO,
            linear_damping: 0.0,
            restitution: 0.2,
            friction: 0.5,
            gravity_scale: 0.0,
        }
    }

    /// Create a new kinematic rigid body.
    pub fn new_kinematic() -> Self {
        Self {
            body_type: RigidBodyType::Kinematic,
            ..Self::new_static()
        }
    }

    /// Inverse mass seen by the solver. Zero for anything but dynamic bodies.
    #[inline]
    pub fn inv_mass(&self) -> f32 {
        if self.body_type == RigidBodyType::Dynamic && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }
}

/// Collider shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    /// Oriented box.
    Box { half_extents: Vec3 },
    /// Capsule along the local Y axis.
    Capsule { radius: f32, half_height: f32 },
    /// Infinite half-space whose surface passes through the body position,
    /// with normal `rotation * +Y`.
    Plane,
}

/// Collision filter group bits used by the simulation.
pub mod groups {
    pub const GROUND: u32 = 1 << 0;
    pub const VEHICLE: u32 = 1 << 1;
    pub const BUILDING: u32 = 1 << 2;
    pub const AGENT: u32 = 1 << 3;
    pub const PROP: u32 = 1 << 4;
    pub const ALL: u32 = u32::MAX;
}

/// Group/mask pair. Two bodies are tested only if each one's group is
/// accepted by the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    pub group: u32,
    pub mask: u32,
}

impl CollisionFilter {
    pub const fn new(group: u32, mask: u32) -> Self {
        Self { group, mask }
    }

    #[inline]
    pub fn allows(&self, other: &CollisionFilter) -> bool {
        (self.group & other.mask) != 0 && (other.group & self.mask) != 0
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::new(groups::ALL, groups::ALL)
    }
}

/// Collision detection component.
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: ColliderShape,
    pub filter: CollisionFilter,
    /// If true, generates contacts but no physics response.
    pub is_sensor: bool,
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            filter: CollisionFilter::default(),
            is_sensor: false,
        }
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::new(ColliderShape::Sphere { radius: 0.5 })
    }
}

/// World-space pose of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Transform a local-space point into world space.
    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Transform a world-space point into local space.
    #[inline]
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Opaque handle to whatever the renderer draws for a body.
///
/// The core never interprets it; it only hands it back on collision
/// outcomes so effect collaborators can find the visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_mass_is_static() {
        let rb = RigidBody::new_dynamic(0.0);
        assert_eq!(rb.body_type, RigidBodyType::Static);
        assert_eq!(rb.inv_mass(), 0.0);
    }

    #[test]
    fn test_filter_allows() {
        let agent = CollisionFilter::new(groups::AGENT, groups::VEHICLE);
        let vehicle = CollisionFilter::new(groups::VEHICLE, groups::ALL);
        let other_agent = agent;
        assert!(agent.allows(&vehicle));
        assert!(vehicle.allows(&agent));
        assert!(!agent.allows(&other_agent));
    }

    #[test]
    fn test_transform_round_trip_point() {
        let t = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.7),
        };
        let p = Vec3::new(-4.0, 0.5, 2.0);
        let back = t.inverse_transform_point(t.transform_point(p));
        assert!((back - p).length() < 1e-5);
    }
}
