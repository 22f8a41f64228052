//! CPU rigid-body world with collision detection and contact reporting.
//!
//! # Architecture
//!
//! The physics pipeline runs in a fixed timestep loop. Each sub-step:
//!
//! 1. Apply forces (gravity)
//! 2. Integrate velocities
//! 3. Broadphase collision detection (spatial hash)
//! 4. Narrowphase collision detection (SAT and specialized tests)
//! 5. Solve contact constraints (sequential impulse, linear only)
//! 6. Integrate positions
//! 7. Clear force accumulators
//!
//! Contacts found during every sub-step of one [`PhysicsWorld::step`] call
//! are merged per pair and reported through [`PhysicsWorld::contacts`].

pub mod broadphase;
pub mod collider;
pub mod components;
pub mod contact;
pub mod narrowphase;
pub mod rigid_body;
pub mod solver;

use std::collections::HashMap;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use self::broadphase::SpatialHashGrid;
use self::components::{
    groups, Collider, ColliderShape, CollisionFilter, RenderHandle, RigidBody, RigidBodyType,
    Transform,
};
use self::contact::{ContactEvent, ContactGeometry, ContactManifold, ContactPoint};
use self::narrowphase::detect_collision;

/// Handle to a body in a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) hecs::Entity);

impl BodyId {
    /// Stable bit representation, suitable for logs and external maps.
    pub fn to_bits(self) -> u64 {
        self.0.to_bits().get()
    }
}

/// Configuration for the physics simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    /// Fixed timestep for physics updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per `step` call. Default: 4.
    pub max_substeps: u32,
    /// Number of constraint solver iterations. Default: 8.
    pub solver_iterations: u32,
    /// Contacts slower than this are not reported. Default: 0.01.
    pub contact_speed_epsilon: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            solver_iterations: 8,
            contact_speed_epsilon: 0.01,
        }
    }
}

/// Everything needed to create a body.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub shape: ColliderShape,
    pub position: Vec3,
    pub rotation: Quat,
    pub body_type: RigidBodyType,
    /// Only meaningful for dynamic bodies. A non-positive mass yields a static body.
    pub mass: f32,
    pub velocity: Vec3,
    pub filter: CollisionFilter,
    pub is_sensor: bool,
    pub restitution: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub gravity_scale: f32,
}

impl BodyDesc {
    /// Dynamic body description. `mass <= 0` describes a static body.
    pub fn dynamic(shape: ColliderShape, position: Vec3, mass: f32) -> Self {
        let rb = RigidBody::new_dynamic(mass);
        Self {
            shape,
            position,
            rotation: Quat::IDENTITY,
            body_type: rb.body_type,
            mass: rb.mass,
            velocity: Vec3::ZERO,
            filter: CollisionFilter::default(),
            is_sensor: false,
            restitution: rb.restitution,
            friction: rb.friction,
            linear_damping: rb.linear_damping,
            gravity_scale: rb.gravity_scale,
        }
    }

    /// Immovable body description.
    pub fn fixed(shape: ColliderShape, position: Vec3) -> Self {
        Self::dynamic(shape, position, 0.0)
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    fn into_components(self) -> (Transform, RigidBody, Collider) {
        let mut rb = match self.body_type {
            RigidBodyType::Dynamic => RigidBody::new_dynamic(self.mass),
            RigidBodyType::Static => RigidBody::new_static(),
            RigidBodyType::Kinematic => RigidBody::new_kinematic(),
        };
        if rb.body_type == RigidBodyType::Dynamic {
            rb.linear_damping = self.linear_damping;
            rb.gravity_scale = self.gravity_scale;
        }
        if rb.body_type != RigidBodyType::Static {
            rb.linear_velocity = self.velocity;
        }
        rb.restitution = self.restitution;
        rb.friction = self.friction;

        let transform = Transform {
            position: self.position,
            rotation: self.rotation,
        };
        let collider = Collider {
            shape: self.shape,
            filter: self.filter,
            is_sensor: self.is_sensor,
        };
        (transform, rb, collider)
    }
}

/// The physics world: body arena plus simulation state.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    world: hecs::World,
    accumulator: f64,
    broadphase: SpatialHashGrid,
    manifolds: Vec<ContactManifold>,
    contacts: Vec<ContactEvent>,
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            world: hecs::World::new(),
            accumulator: 0.0,
            broadphase: SpatialHashGrid::new(),
            manifolds: Vec::new(),
            contacts: Vec::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Step the physics simulation forward by `delta_time` seconds.
    ///
    /// Returns the number of fixed sub-steps that ran. A non-positive or
    /// non-finite `delta_time` changes nothing and returns 0.
    pub fn step(&mut self, delta_time: f64) -> u32 {
        if !(delta_time > 0.0) || !delta_time.is_finite() {
            tracing::warn!(delta_time, "ignoring physics step with invalid dt");
            return 0;
        }

        let fixed = self.config.fixed_timestep;
        let mut merged: HashMap<(BodyId, BodyId), ContactEvent> = HashMap::new();

        self.accumulator += delta_time;
        let mut substeps = 0u32;
        while self.accumulator >= fixed && substeps < self.config.max_substeps {
            self.fixed_step(fixed as f32, &mut merged);
            self.accumulator -= fixed;
            substeps += 1;
        }

        // Drop whatever the sub-step cap could not consume (spiral of death)
        if self.accumulator >= fixed {
            tracing::debug!(
                discarded = self.accumulator,
                substeps,
                "physics sub-step cap reached"
            );
            self.accumulator = 0.0;
        }

        let mut contacts: Vec<ContactEvent> = merged.into_values().collect();
        contacts.sort_by_key(|c| (c.body_a, c.body_b));
        self.contacts = contacts;

        substeps
    }

    fn fixed_step(&mut self, dt: f32, merged: &mut HashMap<(BodyId, BodyId), ContactEvent>) {
        // 1. Gravity and applied forces
        rigid_body::integrate_velocities(&mut self.world, self.config.gravity, dt);

        // 2. Broadphase
        let pairs = self.broadphase.find_pairs(&self.world);

        // 3. Narrowphase, reporting and manifolds
        self.manifolds.clear();
        for (body_a, body_b) in pairs {
            let Some((event, manifold)) = self.narrowphase(body_a, body_b) else {
                continue;
            };
            if let Some(manifold) = manifold {
                self.manifolds.push(manifold);
            }
            if event.strength() < self.config.contact_speed_epsilon {
                continue;
            }
            merged
                .entry((event.body_a, event.body_b))
                .and_modify(|existing| {
                    if event.strength() > existing.strength() {
                        *existing = event;
                    }
                })
                .or_insert(event);
        }

        // 4. Contact impulses
        solver::solve_contacts(
            &mut self.manifolds,
            &mut self.world,
            self.config.solver_iterations,
            dt,
        );

        // 5. Positions
        rigid_body::integrate_positions(&mut self.world, dt);
    }

    /// Test one broadphase pair, producing the reported event and, for solid
    /// non-degenerate contacts, the solver manifold.
    fn narrowphase(
        &self,
        body_a: BodyId,
        body_b: BodyId,
    ) -> Option<(ContactEvent, Option<ContactManifold>)> {
        let mut query_a = self
            .world
            .query_one::<(&Collider, &Transform, &RigidBody)>(body_a.0)
            .ok()?;
        let mut query_b = self
            .world
            .query_one::<(&Collider, &Transform, &RigidBody)>(body_b.0)
            .ok()?;
        let (collider_a, transform_a, rb_a) = query_a.get()?;
        let (collider_b, transform_b, rb_b) = query_b.get()?;

        let info = detect_collision(
            &collider_a.shape,
            transform_a,
            &collider_b.shape,
            transform_b,
        )?;

        let mut event = ContactEvent {
            body_a,
            body_b,
            geometry: None,
            position_a: transform_a.position,
            position_b: transform_b.position,
            velocity_a: rb_a.linear_velocity,
            velocity_b: rb_b.linear_velocity,
        };

        if collider_a.is_sensor || collider_b.is_sensor || info.is_degenerate() {
            return Some((event, None));
        }

        // Closing speed along the normal, measured before the solver runs.
        // Separating pairs report zero and fall under the reporting threshold.
        let approach = (rb_a.linear_velocity - rb_b.linear_velocity).dot(info.normal);
        event.geometry = Some(ContactGeometry {
            point: info.point,
            normal: info.normal,
            impact_speed: approach.max(0.0),
        });

        let manifold = ContactManifold {
            body_a,
            body_b,
            normal: info.normal,
            approach_speed: approach.max(0.0),
            contacts: vec![ContactPoint {
                position: info.point,
                penetration: info.penetration,
                normal_impulse: 0.0,
                tangent_impulse: 0.0,
            }],
        };
        Some((event, Some(manifold)))
    }

    /// Contacts reported by the last `step` call that ran, one per pair.
    pub fn contacts(&self) -> &[ContactEvent] {
        &self.contacts
    }

    // Body lifecycle

    pub fn create_body(&mut self, desc: BodyDesc) -> BodyId {
        let (transform, rb, collider) = desc.into_components();
        BodyId(self.world.spawn((transform, rb, collider)))
    }

    /// Box body. `mass <= 0` creates a static box.
    pub fn create_box(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        mass: f32,
        filter: CollisionFilter,
    ) -> BodyId {
        self.create_body(
            BodyDesc::dynamic(ColliderShape::Box { half_extents }, position, mass)
                .with_filter(filter),
        )
    }

    /// Sphere body. `mass <= 0` creates a static sphere.
    pub fn create_sphere(
        &mut self,
        position: Vec3,
        radius: f32,
        mass: f32,
        filter: CollisionFilter,
    ) -> BodyId {
        self.create_body(
            BodyDesc::dynamic(ColliderShape::Sphere { radius }, position, mass).with_filter(filter),
        )
    }

    /// Upright capsule body. `mass <= 0` creates a static capsule.
    pub fn create_capsule(
        &mut self,
        position: Vec3,
        radius: f32,
        half_height: f32,
        mass: f32,
        filter: CollisionFilter,
    ) -> BodyId {
        self.create_body(
            BodyDesc::dynamic(
                ColliderShape::Capsule {
                    radius,
                    half_height,
                },
                position,
                mass,
            )
            .with_filter(filter),
        )
    }

    /// Static ground half-space whose surface lies at `height`.
    pub fn create_ground_plane(&mut self, height: f32) -> BodyId {
        self.create_body(
            BodyDesc::fixed(ColliderShape::Plane, Vec3::new(0.0, height, 0.0))
                .with_filter(CollisionFilter::new(groups::GROUND, groups::ALL)),
        )
    }

    /// Remove a body. Returns false (and does nothing) for unknown ids.
    pub fn remove_body(&mut self, id: BodyId) -> bool {
        if self.world.despawn(id.0).is_err() {
            return false;
        }
        self.contacts.retain(|c| c.body_a != id && c.body_b != id);
        true
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.world.contains(id.0)
    }

    pub fn body_count(&self) -> usize {
        self.world.len() as usize
    }

    /// Remove every body and reset the accumulator.
    pub fn clear(&mut self) {
        self.world.clear();
        self.manifolds.clear();
        self.contacts.clear();
        self.accumulator = 0.0;
    }

    // Accessors

    pub fn position(&self, id: BodyId) -> Option<Vec3> {
        self.world.get::<&Transform>(id.0).ok().map(|t| t.position)
    }

    pub fn rotation(&self, id: BodyId) -> Option<Quat> {
        self.world.get::<&Transform>(id.0).ok().map(|t| t.rotation)
    }

    pub fn velocity(&self, id: BodyId) -> Option<Vec3> {
        self.world
            .get::<&RigidBody>(id.0)
            .ok()
            .map(|rb| rb.linear_velocity)
    }

    pub fn set_position(&mut self, id: BodyId, position: Vec3) -> bool {
        match self.world.get::<&mut Transform>(id.0) {
            Ok(mut t) => {
                t.position = position;
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_rotation(&mut self, id: BodyId, rotation: Quat) -> bool {
        match self.world.get::<&mut Transform>(id.0) {
            Ok(mut t) => {
                t.rotation = rotation;
                true
            }
            Err(_) => false,
        }
    }

    /// Set the linear velocity. Static bodies ignore it.
    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec3) -> bool {
        match self.world.get::<&mut RigidBody>(id.0) {
            Ok(mut rb) => {
                if rb.body_type != RigidBodyType::Static {
                    rb.linear_velocity = velocity;
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Add a force for the next sub-step only. Ignored by non-dynamic bodies.
    pub fn apply_force(&mut self, id: BodyId, force: Vec3) -> bool {
        match self.world.get::<&mut RigidBody>(id.0) {
            Ok(mut rb) => {
                rb.force_accumulator += force;
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_render_handle(&mut self, id: BodyId, handle: RenderHandle) -> bool {
        self.world.insert_one(id.0, handle).is_ok()
    }

    pub fn render_handle(&self, id: BodyId) -> Option<RenderHandle> {
        self.world.get::<&RenderHandle>(id.0).ok().map(|h| *h)
    }

    pub fn shape(&self, id: BodyId) -> Option<ColliderShape> {
        self.world
            .get::<&Collider>(id.0)
            .ok()
            .map(|c| c.shape.clone())
    }
}
