//! Contact data structures for collision response and gameplay events.

use glam::Vec3;

use super::BodyId;

/// Information about a single contact between two shapes.
#[derive(Debug, Clone, Copy)]
pub struct ContactInfo {
    /// Contact normal (from shape A to shape B). Zero when degenerate.
    pub normal: Vec3,
    /// Penetration depth.
    pub penetration: f32,
    /// Contact point in world space.
    pub point: Vec3,
}

impl ContactInfo {
    /// True when the shapes overlap without a usable separating direction.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.normal.length_squared() < 1e-12
    }
}

/// A single contact point with accumulated impulse data.
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    /// Contact position in world space.
    pub position: Vec3,
    /// Penetration depth.
    pub penetration: f32,
    /// Accumulated normal impulse.
    pub normal_impulse: f32,
    /// Accumulated tangent impulse.
    pub tangent_impulse: f32,
}

/// Solver input for one touching pair.
#[derive(Debug, Clone)]
pub struct ContactManifold {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Contact normal (from A to B).
    pub normal: Vec3,
    /// Closing speed along the normal before the solver ran (>= 0).
    pub approach_speed: f32,
    pub contacts: Vec<ContactPoint>,
}

/// Full manifold data for a reported contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactGeometry {
    /// Contact point in world space.
    pub point: Vec3,
    /// Contact normal (from A to B).
    pub normal: Vec3,
    /// Impact speed along the normal, always non-negative.
    pub impact_speed: f32,
}

/// A contact reported by one [`PhysicsWorld::step`](super::PhysicsWorld::step) call.
///
/// `geometry` is absent for sensor overlaps and degenerate contacts; the
/// pose and velocity snapshots let consumers approximate it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub geometry: Option<ContactGeometry>,
    pub position_a: Vec3,
    pub position_b: Vec3,
    pub velocity_a: Vec3,
    pub velocity_b: Vec3,
}

impl ContactEvent {
    /// Returns the other body of the pair, if `body` is part of it.
    #[inline]
    pub fn other(&self, body: BodyId) -> Option<BodyId> {
        if self.body_a == body {
            Some(self.body_b)
        } else if self.body_b == body {
            Some(self.body_a)
        } else {
            None
        }
    }

    /// Contact point, falling back to the midpoint of the two bodies.
    #[inline]
    pub fn point_or_midpoint(&self) -> Vec3 {
        match self.geometry {
            Some(g) => g.point,
            None => (self.position_a + self.position_b) * 0.5,
        }
    }

    /// Impact speed, falling back to the relative velocity magnitude.
    #[inline]
    pub fn impact_speed_or_relative(&self) -> f32 {
        match self.geometry {
            Some(g) => g.impact_speed,
            None => (self.velocity_b - self.velocity_a).length(),
        }
    }

    /// Speed used to rank repeated reports of the same pair within a step.
    #[inline]
    pub(crate) fn strength(&self) -> f32 {
        self.impact_speed_or_relative()
    }
}

/// Canonical pair key (smaller body first).
#[inline]
pub(crate) fn pair_key(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
