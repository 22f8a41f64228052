//! Tick orchestration.
//!
//! One [`Simulation::tick`] runs, in order: vehicle controls, the physics
//! step, collision routing, scoring (each outcome, then combo decay), and
//! the population (agent behavior, spawning, culling).

use std::sync::Arc;

use glam::Vec3;

use crate::collision::{CollisionConsumer, CollisionRouter, SemanticType};
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::feedback::{
    AudioSink, EffectSink, FeedbackDispatcher, NullAudio, NullEffects, UniformZone, Zone, ZoneMap,
};
use crate::physics::components::{groups, ColliderShape, CollisionFilter};
use crate::physics::{BodyDesc, BodyId, PhysicsWorld};
use crate::population::{AgentMarker, PopulationManager};
use crate::score::{ComboState, ScoreEngine, ScoreEvent};
use crate::vehicle::{ControlState, VehicleController};

/// External collaborators handed to a simulation.
#[derive(Clone)]
pub struct SimCollaborators {
    pub effects: Arc<dyn EffectSink + Send + Sync>,
    pub audio: Arc<dyn AudioSink + Send + Sync>,
    pub zones: Arc<dyn ZoneMap + Send + Sync>,
}

impl Default for SimCollaborators {
    fn default() -> Self {
        Self {
            effects: Arc::new(NullEffects),
            audio: Arc::new(NullAudio),
            zones: Arc::new(UniformZone(Zone::Urban)),
        }
    }
}

pub struct Simulation {
    config: SimConfig,
    physics: PhysicsWorld,
    router: CollisionRouter,
    score: ScoreEngine,
    population: PopulationManager,
    vehicle: VehicleController,
    feedback: FeedbackDispatcher,
    ground: BodyId,
    now: f64,
    ticks: u64,
    stopped: bool,
}

impl Simulation {
    /// Validate `config` and build the ground plane and the player vehicle.
    pub fn new(config: SimConfig, collaborators: SimCollaborators) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut physics = PhysicsWorld::new(config.physics.clone());
        let mut router = CollisionRouter::new(config.collision.clone());

        let ground = physics.create_ground_plane(config.agents.ground_level);
        router.register(ground, SemanticType::Ground);
        let vehicle = VehicleController::spawn(config.vehicle.clone(), &mut physics);
        router.set_player(vehicle.body());

        let population = PopulationManager::new(
            config.population.clone(),
            config.agents.clone(),
            collaborators.zones,
            config.seeded_rng(),
        );

        tracing::info!(
            seeded = config.rng_seed.is_some(),
            fixed_timestep = config.physics.fixed_timestep,
            "simulation created"
        );

        Ok(Self {
            score: ScoreEngine::new(config.score.clone()),
            feedback: FeedbackDispatcher::new(collaborators.effects, collaborators.audio),
            physics,
            router,
            population,
            vehicle,
            ground,
            now: 0.0,
            ticks: 0,
            stopped: false,
            config,
        })
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// Non-positive or non-finite `dt`, or a stopped simulation, changes nothing.
    pub fn tick(&mut self, dt: f64, controls: &ControlState) {
        if !(dt > 0.0) || !dt.is_finite() {
            tracing::warn!(dt, "ignoring tick with invalid delta time");
            return;
        }
        if self.stopped {
            return;
        }
        self.now += dt;
        self.ticks += 1;

        let skidding = self.vehicle.update(controls, dt);
        self.vehicle.apply(&mut self.physics);
        if skidding {
            self.emit_skid();
        }

        self.physics.step(dt);

        let outcomes = self
            .router
            .route(self.physics.contacts(), &self.physics, self.now);
        for outcome in &outcomes {
            self.score.record(outcome, self.now);
            self.feedback
                .dispatch(outcome, self.population.species_of(outcome.target));
        }
        self.score.update(self.now);

        let player = self.player_position();
        self.population
            .update(self.now, dt, player, &mut self.physics, &mut self.router);
    }

    fn emit_skid(&self) {
        let Some(position) = self.physics.position(self.vehicle.body()) else {
            return;
        };
        let max_speed = self.vehicle.config().max_speed;
        let intensity = (self.vehicle.speed().abs() / max_speed).clamp(0.1, 1.0);
        let point = Vec3::new(position.x, self.config.agents.ground_level, position.z);
        self.feedback.skid(point, -self.vehicle.direction(), intensity);
    }

    /// Static box tagged as a building. Its footprint blocks agent spawns.
    pub fn add_building(&mut self, center: Vec3, half_extents: Vec3) -> BodyId {
        let body = self.physics.create_body(
            BodyDesc::fixed(ColliderShape::Box { half_extents }, center)
                .with_filter(CollisionFilter::new(groups::BUILDING, groups::ALL)),
        );
        self.router.register(body, SemanticType::Building);
        self.population.add_footprint(center, half_extents);
        body
    }

    /// Loose dynamic box tagged as a prop.
    pub fn add_prop(&mut self, center: Vec3, half_extents: Vec3, mass: f32) -> BodyId {
        let body = self.physics.create_body(
            BodyDesc::dynamic(ColliderShape::Box { half_extents }, center, mass)
                .with_filter(CollisionFilter::new(groups::PROP, groups::ALL)),
        );
        self.router.register(body, SemanticType::Prop);
        body
    }

    /// Remove a building or prop. Returns false for unknown bodies.
    pub fn remove_body(&mut self, body: BodyId) -> bool {
        if body == self.vehicle.body() || body == self.ground {
            tracing::warn!(body = body.to_bits(), "refusing to remove a core body");
            return false;
        }
        if let Some(handle) = self.population.agent_for_body(body) {
            return self
                .population
                .despawn(handle, &mut self.physics, &mut self.router);
        }
        let removed = self.physics.remove_body(body);
        self.router.forget(body);
        removed
    }

    /// Attach an extra collision consumer after the built-in score and feedback.
    pub fn add_consumer(&mut self, consumer: Box<dyn CollisionConsumer>) {
        self.router.add_consumer(consumer);
    }

    /// Back to a fresh game: score, cooldowns and agents cleared, vehicle at spawn.
    ///
    /// City geometry (buildings, props) stays. A stopped simulation is rebuilt
    /// with only the ground and the vehicle.
    pub fn reset(&mut self) {
        self.score.reset();
        self.router.reset();
        self.population.clear(&mut self.physics, &mut self.router);

        if self.stopped {
            self.ground = self
                .physics
                .create_ground_plane(self.config.agents.ground_level);
            self.router.register(self.ground, SemanticType::Ground);
            self.vehicle = VehicleController::spawn(self.config.vehicle.clone(), &mut self.physics);
            self.router.set_player(self.vehicle.body());
            self.stopped = false;
        } else {
            self.vehicle.reset(&mut self.physics);
        }

        self.now = 0.0;
        self.ticks = 0;
        tracing::info!(bodies = self.physics.body_count(), "simulation reset");
    }

    /// Dispose every body and agent. Later ticks do nothing until [`reset`](Self::reset).
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.population.clear(&mut self.physics, &mut self.router);
        self.population.clear_footprints();
        self.physics.clear();
        self.router.clear();
        self.stopped = true;
        tracing::info!(ticks = self.ticks, "simulation stopped");
    }

    // Queries

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn player_body(&self) -> BodyId {
        self.vehicle.body()
    }

    pub fn player_position(&self) -> Vec3 {
        self.physics
            .position(self.vehicle.body())
            .unwrap_or(self.config.vehicle.spawn_position)
    }

    pub fn player_heading(&self) -> f32 {
        self.vehicle.heading()
    }

    pub fn player_speed(&self) -> f32 {
        self.vehicle.speed()
    }

    pub fn is_skidding(&self) -> bool {
        self.vehicle.is_skidding()
    }

    pub fn agent_markers(&self) -> Vec<AgentMarker> {
        self.population.markers()
    }

    pub fn score(&self) -> i64 {
        self.score.score()
    }

    pub fn combo_count(&self) -> u32 {
        self.score.combo_count()
    }

    pub fn combo_state(&self) -> ComboState {
        self.score.state()
    }

    /// Score notifications since the last call. Call once per tick; undrained
    /// events past `score.max_pending_events` are dropped oldest first.
    pub fn drain_score_events(&mut self) -> Vec<ScoreEvent> {
        self.score.drain_events()
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn router(&self) -> &CollisionRouter {
        &self.router
    }

    pub fn population(&self) -> &PopulationManager {
        &self.population
    }

    /// Population together with the physics world and router it spawns into.
    pub fn population_parts(
        &mut self,
    ) -> (&mut PopulationManager, &mut PhysicsWorld, &mut CollisionRouter) {
        (&mut self.population, &mut self.physics, &mut self.router)
    }
}
