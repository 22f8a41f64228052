//! Agent pools: timed batch spawning around the player, distance culling
//! and the per-tick behavior update.

use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::Arc;

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::agent::{Agent, AgentConfig, AgentKind, Species};
use crate::collision::{CollisionRouter, SemanticType};
use crate::feedback::{Zone, ZoneMap};
use crate::math::planar_distance;
use crate::physics::components::{groups, ColliderShape, CollisionFilter};
use crate::physics::{BodyDesc, BodyId, PhysicsWorld};

new_key_type! {
    /// Key into the pedestrian pool.
    pub struct HumanKey;
    /// Key into the animal pool.
    pub struct AnimalKey;
}

/// Stable handle to a live agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentHandle {
    Human(HumanKey),
    Animal(AnimalKey),
}

/// Inclusive `[min, max]` spawn distance from the player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnBand {
    pub min: f32,
    pub max: f32,
}

impl SpawnBand {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub max_humans: usize,
    pub max_animals: usize,
    /// Spawning pauses while the combined population exceeds this. Default: 350.
    pub global_cap: usize,
    /// Seconds between human batches. Default: 1.5.
    pub human_spawn_interval: f64,
    /// Seconds between animal batches. Default: 2.
    pub animal_spawn_interval: f64,
    pub human_batch: usize,
    pub animal_batch: usize,
    pub human_urban_band: SpawnBand,
    pub human_rural_band: SpawnBand,
    pub animal_band: SpawnBand,
    /// Candidate positions tried per slot. Default: 10.
    pub spawn_attempts: u32,
    /// Minimum planar distance between a new agent and any other. Default: 5.
    pub min_spacing: f32,
    /// Agents farther than this from the player are removed. Default: 150.
    pub removal_distance: f32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            max_humans: 200,
            max_animals: 100,
            global_cap: 350,
            human_spawn_interval: 1.5,
            animal_spawn_interval: 2.0,
            human_batch: 3,
            animal_batch: 2,
            human_urban_band: SpawnBand::new(50.0, 100.0),
            human_rural_band: SpawnBand::new(80.0, 150.0),
            animal_band: SpawnBand::new(80.0, 150.0),
            spawn_attempts: 10,
            min_spacing: 5.0,
            removal_distance: 150.0,
        }
    }
}

/// Ground-plane rectangle agents never spawn in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Footprint {
    pub fn contains(&self, point: Vec3) -> bool {
        (point.x - self.center.x).abs() <= self.half_extents.x
            && (point.z - self.center.z).abs() <= self.half_extents.z
    }
}

/// Minimap entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentMarker {
    pub position: Vec3,
    pub kind: AgentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Human,
    Animal,
}

pub struct PopulationManager {
    config: PopulationConfig,
    agent_config: AgentConfig,
    humans: SlotMap<HumanKey, Agent>,
    animals: SlotMap<AnimalKey, Agent>,
    by_body: HashMap<BodyId, AgentHandle>,
    footprints: Vec<Footprint>,
    zones: Arc<dyn ZoneMap + Send + Sync>,
    rng: SmallRng,
    human_timer: f64,
    animal_timer: f64,
}

impl PopulationManager {
    pub fn new(
        config: PopulationConfig,
        agent_config: AgentConfig,
        zones: Arc<dyn ZoneMap + Send + Sync>,
        rng: SmallRng,
    ) -> Self {
        Self {
            config,
            agent_config,
            humans: SlotMap::with_key(),
            animals: SlotMap::with_key(),
            by_body: HashMap::new(),
            footprints: Vec::new(),
            zones,
            rng,
            human_timer: 0.0,
            animal_timer: 0.0,
        }
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    pub fn agent_config(&self) -> &AgentConfig {
        &self.agent_config
    }

    /// Run agent behavior, then spawning, then culling, for one tick.
    pub fn update(
        &mut self,
        now: f64,
        dt: f64,
        player: Vec3,
        physics: &mut PhysicsWorld,
        router: &mut CollisionRouter,
    ) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        self.update_agents(now, dt, player, physics);
        self.spawn(now, dt, player, physics, router);
        self.cull(player, physics, router);
    }

    /// Advance every agent's state machine and write the results to the bodies.
    pub fn update_agents(&mut self, now: f64, dt: f64, player: Vec3, physics: &mut PhysicsWorld) {
        let config = &self.agent_config;

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            let mut agents: Vec<&mut Agent> = self
                .humans
                .values_mut()
                .chain(self.animals.values_mut())
                .collect();
            agents
                .par_iter_mut()
                .for_each(|agent| agent.update(now, dt, player, config));
        }

        #[cfg(not(feature = "parallel"))]
        for agent in self.humans.values_mut().chain(self.animals.values_mut()) {
            agent.update(now, dt, player, config);
        }

        for agent in self.humans.values().chain(self.animals.values()) {
            agent.sync_body(physics);
        }
    }

    /// Advance the spawn timers and spawn due batches. Returns how many agents were added.
    pub fn spawn(
        &mut self,
        now: f64,
        dt: f64,
        player: Vec3,
        physics: &mut PhysicsWorld,
        router: &mut CollisionRouter,
    ) -> usize {
        let mut spawned = 0;

        // At most one batch per class per call; a long `dt` drops the backlog
        self.human_timer += dt;
        if self.human_timer >= self.config.human_spawn_interval {
            self.human_timer %= self.config.human_spawn_interval;
            spawned += self.spawn_batch(Class::Human, now, player, physics, router);
        }

        self.animal_timer += dt;
        if self.animal_timer >= self.config.animal_spawn_interval {
            self.animal_timer %= self.config.animal_spawn_interval;
            spawned += self.spawn_batch(Class::Animal, now, player, physics, router);
        }

        spawned
    }

    fn pool_len(&self, class: Class) -> usize {
        match class {
            Class::Human => self.humans.len(),
            Class::Animal => self.animals.len(),
        }
    }

    fn cap(&self, class: Class) -> usize {
        match class {
            Class::Human => self.config.max_humans,
            Class::Animal => self.config.max_animals,
        }
    }

    fn spawn_batch(
        &mut self,
        class: Class,
        now: f64,
        player: Vec3,
        physics: &mut PhysicsWorld,
        router: &mut CollisionRouter,
    ) -> usize {
        let cap = self.cap(class);
        if self.pool_len(class) >= cap || self.total() > self.config.global_cap {
            return 0;
        }

        let band = match (class, self.zones.zone_at(player)) {
            (Class::Human, Zone::Urban) => self.config.human_urban_band,
            (Class::Human, Zone::Rural) => self.config.human_rural_band,
            (Class::Animal, _) => self.config.animal_band,
        };
        let batch = match class {
            Class::Human => self.config.human_batch,
            Class::Animal => self.config.animal_batch,
        };

        let mut spawned = 0;
        for _ in 0..batch {
            if self.pool_len(class) >= cap {
                break;
            }
            let Some(point) = self.find_spawn_point(player, band) else {
                continue;
            };
            let kind = match class {
                Class::Human => AgentKind::Human,
                Class::Animal => AgentKind::Animal(Species::from_roll(self.rng.random())),
            };
            self.spawn_agent(kind, point, now, physics, router);
            spawned += 1;
        }

        if spawned > 0 {
            tracing::debug!(
                ?class,
                spawned,
                humans = self.humans.len(),
                animals = self.animals.len(),
                "spawned agent batch"
            );
        }
        spawned
    }

    fn find_spawn_point(&mut self, player: Vec3, band: SpawnBand) -> Option<Vec3> {
        for _ in 0..self.config.spawn_attempts {
            let angle = self.rng.random_range(0.0..TAU);
            let radius = self.rng.random_range(band.min..=band.max);
            let candidate = Vec3::new(
                player.x + angle.cos() * radius,
                self.agent_config.ground_level,
                player.z + angle.sin() * radius,
            );
            if self.is_clear(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    fn is_clear(&self, candidate: Vec3) -> bool {
        let spacing = self.config.min_spacing;
        let crowded = self
            .humans
            .values()
            .chain(self.animals.values())
            .any(|agent| planar_distance(agent.position(), candidate) < spacing);
        !crowded && !self.footprints.iter().any(|f| f.contains(candidate))
    }

    /// Create an agent and its body at `point`, bypassing timers and caps.
    pub fn spawn_agent(
        &mut self,
        kind: AgentKind,
        point: Vec3,
        now: f64,
        physics: &mut PhysicsWorld,
        router: &mut CollisionRouter,
    ) -> AgentHandle {
        let cfg = &self.agent_config;
        let filter = CollisionFilter::new(groups::AGENT, groups::VEHICLE);

        let (desc, semantic_type, position) = match kind {
            AgentKind::Human => (
                BodyDesc::dynamic(
                    ColliderShape::Capsule {
                        radius: cfg.human_radius,
                        half_height: cfg.human_half_height,
                    },
                    point,
                    cfg.human_mass,
                ),
                SemanticType::HumanAgent,
                point,
            ),
            AgentKind::Animal(species) => {
                let profile = species.profile();
                let mut position = point;
                if profile.can_fly {
                    position.y = cfg.ground_level
                        + self
                            .rng
                            .random_range(cfg.flight_altitude_min..=cfg.flight_altitude_max);
                }
                (
                    BodyDesc::dynamic(
                        ColliderShape::Sphere {
                            radius: profile.radius,
                        },
                        position,
                        profile.mass,
                    ),
                    SemanticType::AnimalAgent,
                    position,
                )
            }
        };

        let body = physics.create_body(desc.with_filter(filter).with_gravity_scale(0.0));
        router.register(body, semantic_type);

        let rng = SmallRng::seed_from_u64(self.rng.random());
        let agent = Agent::new(kind, body, position, now, cfg, rng);
        agent.sync_body(physics);

        let handle = match kind {
            AgentKind::Human => AgentHandle::Human(self.humans.insert(agent)),
            AgentKind::Animal(_) => AgentHandle::Animal(self.animals.insert(agent)),
        };
        self.by_body.insert(body, handle);
        handle
    }

    /// Remove every agent farther than the removal distance. Returns how many were removed.
    pub fn cull(
        &mut self,
        player: Vec3,
        physics: &mut PhysicsWorld,
        router: &mut CollisionRouter,
    ) -> usize {
        let limit = self.config.removal_distance;
        let far: Vec<AgentHandle> = self
            .humans
            .iter()
            .filter(|(_, a)| planar_distance(a.position(), player) > limit)
            .map(|(key, _)| AgentHandle::Human(key))
            .chain(
                self.animals
                    .iter()
                    .filter(|(_, a)| planar_distance(a.position(), player) > limit)
                    .map(|(key, _)| AgentHandle::Animal(key)),
            )
            .collect();

        for handle in &far {
            self.despawn(*handle, physics, router);
        }
        if !far.is_empty() {
            tracing::debug!(removed = far.len(), "culled distant agents");
        }
        far.len()
    }

    /// Destroy an agent and its body. Returns false for handles already gone.
    pub fn despawn(
        &mut self,
        handle: AgentHandle,
        physics: &mut PhysicsWorld,
        router: &mut CollisionRouter,
    ) -> bool {
        let agent = match handle {
            AgentHandle::Human(key) => self.humans.remove(key),
            AgentHandle::Animal(key) => self.animals.remove(key),
        };
        let Some(agent) = agent else {
            return false;
        };
        let body = agent.body();
        self.by_body.remove(&body);
        physics.remove_body(body);
        router.forget(body);
        true
    }

    /// Destroy every agent and body, and restart the spawn timers.
    pub fn clear(&mut self, physics: &mut PhysicsWorld, router: &mut CollisionRouter) {
        for agent in self.humans.values().chain(self.animals.values()) {
            physics.remove_body(agent.body());
            router.forget(agent.body());
        }
        self.humans.clear();
        self.animals.clear();
        self.by_body.clear();
        self.human_timer = 0.0;
        self.animal_timer = 0.0;
    }

    /// Register a building footprint for spawn rejection.
    pub fn add_footprint(&mut self, center: Vec3, half_extents: Vec3) {
        self.footprints.push(Footprint {
            center,
            half_extents,
        });
    }

    pub fn clear_footprints(&mut self) {
        self.footprints.clear();
    }

    pub fn footprints(&self) -> &[Footprint] {
        &self.footprints
    }

    pub fn human_count(&self) -> usize {
        self.humans.len()
    }

    pub fn animal_count(&self) -> usize {
        self.animals.len()
    }

    pub fn total(&self) -> usize {
        self.humans.len() + self.animals.len()
    }

    pub fn agent(&self, handle: AgentHandle) -> Option<&Agent> {
        match handle {
            AgentHandle::Human(key) => self.humans.get(key),
            AgentHandle::Animal(key) => self.animals.get(key),
        }
    }

    pub fn agent_for_body(&self, body: BodyId) -> Option<AgentHandle> {
        self.by_body.get(&body).copied()
    }

    /// Species of the animal owning `body`, if any.
    pub fn species_of(&self, body: BodyId) -> Option<Species> {
        match self.agent(self.agent_for_body(body)?)?.kind() {
            AgentKind::Animal(species) => Some(species),
            AgentKind::Human => None,
        }
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.humans.values().chain(self.animals.values())
    }

    pub fn markers(&self) -> Vec<AgentMarker> {
        self.agents()
            .map(|agent| AgentMarker {
                position: agent.position(),
                kind: agent.kind(),
            })
            .collect()
    }
}
