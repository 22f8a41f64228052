//! Arcade vehicle control.
//!
//! The controller keeps a scalar speed and a heading and writes them
//! straight into the player's body as a velocity every tick. Collisions
//! still come from the physics world, which keeps the vertical velocity.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::{heading_direction, yaw};
use crate::physics::components::{groups, ColliderShape, CollisionFilter};
use crate::physics::{BodyDesc, BodyId, PhysicsWorld};

/// Input snapshot for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub brake: bool,
    pub handbrake: bool,
}

impl ControlState {
    fn throttle(&self) -> bool {
        self.forward || self.backward
    }

    fn any_longitudinal(&self) -> bool {
        self.forward || self.backward || self.brake || self.handbrake
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Units per second squared. Default: 20.
    pub acceleration: f32,
    /// Top forward speed. Reverse is capped at half of it. Default: 40.
    pub max_speed: f32,
    /// Default: 30.
    pub brake_deceleration: f32,
    /// Heading change per tick while steering, in radians. Default: 0.03.
    pub turn_rate: f32,
    /// Speed factor per tick while the handbrake is held. Default: 0.9.
    pub handbrake_decay: f32,
    /// Speed factor per tick with no input. Default: 0.98.
    pub coast_decay: f32,
    /// Coasting speeds below this snap to zero. Default: 0.1.
    pub stop_epsilon: f32,
    /// Handbrake above this speed skids. Default: 8.
    pub skid_speed: f32,
    pub half_extents: Vec3,
    pub mass: f32,
    pub spawn_position: Vec3,
    pub spawn_heading: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            acceleration: 20.0,
            max_speed: 40.0,
            brake_deceleration: 30.0,
            turn_rate: 0.03,
            handbrake_decay: 0.9,
            coast_decay: 0.98,
            stop_epsilon: 0.1,
            skid_speed: 8.0,
            half_extents: Vec3::new(1.0, 0.6, 2.0),
            mass: 1200.0,
            spawn_position: Vec3::new(0.0, 0.6, 0.0),
            spawn_heading: 0.0,
        }
    }
}

/// Moves `speed` toward zero by `amount` without crossing it.
#[inline]
fn toward_zero(speed: f32, amount: f32) -> f32 {
    if speed > 0.0 {
        (speed - amount).max(0.0)
    } else {
        (speed + amount).min(0.0)
    }
}

pub struct VehicleController {
    config: VehicleConfig,
    body: BodyId,
    speed: f32,
    heading: f32,
    skidding: bool,
}

impl VehicleController {
    /// Create the player body at the spawn pose and a controller driving it.
    pub fn spawn(config: VehicleConfig, physics: &mut PhysicsWorld) -> Self {
        let mut desc = BodyDesc::dynamic(
            ColliderShape::Box {
                half_extents: config.half_extents,
            },
            config.spawn_position,
            config.mass,
        )
        .with_rotation(yaw(config.spawn_heading))
        .with_filter(CollisionFilter::new(groups::VEHICLE, groups::ALL));
        desc.friction = 0.0;
        let body = physics.create_body(desc);
        Self::new(config, body)
    }

    /// Drive an existing body.
    pub fn new(config: VehicleConfig, body: BodyId) -> Self {
        let heading = config.spawn_heading;
        Self {
            config,
            body,
            speed: 0.0,
            heading,
            skidding: false,
        }
    }

    /// Apply one tick of input. Returns whether the vehicle is skidding.
    ///
    /// A non-positive or non-finite `dt` changes nothing.
    pub fn update(&mut self, controls: &ControlState, dt: f64) -> bool {
        if !(dt > 0.0) || !dt.is_finite() {
            return self.skidding;
        }
        let cfg = &self.config;
        let dt = dt as f32;
        let mut v = self.speed;

        if controls.forward {
            v += cfg.acceleration * dt;
        }
        if controls.backward {
            if v > 0.0 {
                v = toward_zero(v, cfg.brake_deceleration * dt);
            } else {
                v -= cfg.acceleration * dt;
            }
        }
        if controls.brake {
            v = toward_zero(v, cfg.brake_deceleration * dt);
        }

        self.skidding = controls.handbrake && v.abs() > cfg.skid_speed;
        if controls.handbrake {
            v *= cfg.handbrake_decay;
        }

        if controls.left {
            self.heading += cfg.turn_rate;
        }
        if controls.right {
            self.heading -= cfg.turn_rate;
        }
        self.heading = self.heading.rem_euclid(std::f32::consts::TAU);

        v = v.clamp(-cfg.max_speed * 0.5, cfg.max_speed);

        if !controls.any_longitudinal() {
            v *= cfg.coast_decay;
        }
        if !controls.throttle() && v.abs() < cfg.stop_epsilon {
            v = 0.0;
        }

        self.speed = v;
        self.skidding
    }

    /// Write the planar velocity and yaw into the body, keeping its vertical velocity.
    pub fn apply(&self, physics: &mut PhysicsWorld) {
        let vertical = physics.velocity(self.body).map_or(0.0, |v| v.y);
        let mut velocity = heading_direction(self.heading) * self.speed;
        velocity.y = vertical;
        physics.set_velocity(self.body, velocity);
        physics.set_rotation(self.body, yaw(self.heading));
    }

    /// Return to the spawn pose at rest.
    pub fn reset(&mut self, physics: &mut PhysicsWorld) {
        self.speed = 0.0;
        self.heading = self.config.spawn_heading;
        self.skidding = false;
        physics.set_position(self.body, self.config.spawn_position);
        physics.set_velocity(self.body, Vec3::ZERO);
        physics.set_rotation(self.body, yaw(self.heading));
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn is_skidding(&self) -> bool {
        self.skidding
    }

    pub fn direction(&self) -> Vec3 {
        heading_direction(self.heading)
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }
}
