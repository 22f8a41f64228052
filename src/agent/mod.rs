//! Pedestrian and animal behavior.
//!
//! Every agent runs a two-state machine, evaluated once per tick:
//!
//! - **Wandering**: when the decision timer fires, pick a fresh heading and a
//!   target leg; erratic species (high unpredictability) re-plan sooner,
//!   over shorter legs, and sometimes swerve.
//! - **Fleeing**: entered when the player comes within the panic radius.
//!   The agent runs straight away from where the player was and ignores
//!   further decisions for a quiet period. When the quiet period ends it
//!   resumes wandering at normal speed, or flees again if the player is
//!   still close.
//!
//! Agents never touch each other, so a pool can be updated in parallel.

pub mod species;

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use self::species::{Species, SpeciesProfile};
use crate::math::{heading_direction, heading_of, planar_distance, yaw};
use crate::physics::{BodyId, PhysicsWorld};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Human,
    Animal(Species),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BehaviorState {
    #[default]
    Wandering,
    Fleeing,
}

/// Behavior tuning shared by every agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Planar distance to the player that triggers fleeing. Default: 15.
    pub panic_radius: f32,
    /// Seconds during which a fleeing agent ignores new decisions. Default: 5.
    pub flee_quiet_period: f64,
    pub flee_distance_min: f32,
    pub flee_distance_max: f32,
    /// Fixed flee speed for humans. Default: 5.
    pub human_flee_speed: f32,
    /// Wander speed multiplier for fleeing animals. Default: 1.5.
    pub animal_flee_factor: f32,
    pub human_speed_min: f32,
    pub human_speed_max: f32,
    pub human_mass: f32,
    pub human_unpredictability: f32,
    pub human_radius: f32,
    pub human_half_height: f32,
    /// Shortest decision interval in seconds. Default: 2.
    pub decision_interval_base: f64,
    /// Extra interval for fully predictable agents. Default: 4.
    pub decision_interval_span: f64,
    pub target_distance_min: f32,
    /// Extra leg length for fully predictable agents. Default: 10.
    pub target_distance_span: f32,
    pub ground_level: f32,
    /// Cosmetic walking bob, never more than this above rest height. Default: 0.05.
    pub bob_amplitude: f32,
    /// Fraction of the remaining altitude gap closed per tick. Default: 0.02.
    pub altitude_lerp: f32,
    pub flight_altitude_min: f32,
    pub flight_altitude_max: f32,
    pub escape_altitude_min: f32,
    pub escape_altitude_max: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            panic_radius: 15.0,
            flee_quiet_period: 5.0,
            flee_distance_min: 20.0,
            flee_distance_max: 30.0,
            human_flee_speed: 5.0,
            animal_flee_factor: 1.5,
            human_speed_min: 1.0,
            human_speed_max: 2.0,
            human_mass: 70.0,
            human_unpredictability: 0.2,
            human_radius: 0.3,
            human_half_height: 0.6,
            decision_interval_base: 2.0,
            decision_interval_span: 4.0,
            target_distance_min: 5.0,
            target_distance_span: 10.0,
            ground_level: 0.0,
            bob_amplitude: 0.05,
            altitude_lerp: 0.02,
            flight_altitude_min: 3.0,
            flight_altitude_max: 10.0,
            escape_altitude_min: 15.0,
            escape_altitude_max: 25.0,
        }
    }
}

/// Bob cycles per unit travelled.
const BOB_FREQUENCY: f32 = 3.0;

/// One pedestrian or animal.
#[derive(Debug, Clone)]
pub struct Agent {
    kind: AgentKind,
    body: BodyId,
    position: Vec3,
    heading: f32,
    speed: f32,
    wander_speed: f32,
    unpredictability: f32,
    can_fly: bool,
    state: BehaviorState,
    next_decision: f64,
    target: Vec3,
    target_altitude: f32,
    flying: bool,
    escaped: bool,
    rest_height: f32,
    bob_phase: f32,
    rng: SmallRng,
}

impl Agent {
    /// Create an agent at `position` owning `body`.
    ///
    /// Ground-bound agents are snapped to their rest height; flying agents
    /// keep the given altitude. The first update takes a wander decision.
    pub fn new(
        kind: AgentKind,
        body: BodyId,
        position: Vec3,
        now: f64,
        config: &AgentConfig,
        mut rng: SmallRng,
    ) -> Self {
        let (wander_speed, unpredictability, can_fly, rest_height) = match kind {
            AgentKind::Human => (
                rng.random_range(config.human_speed_min..=config.human_speed_max),
                config.human_unpredictability,
                false,
                config.human_radius + config.human_half_height,
            ),
            AgentKind::Animal(species) => {
                let profile = species.profile();
                (
                    profile.speed,
                    profile.unpredictability,
                    profile.can_fly,
                    profile.radius,
                )
            }
        };

        let mut position = position;
        if !can_fly {
            position.y = config.ground_level + rest_height;
        }
        let heading = rng.random_range(0.0..TAU);

        Self {
            kind,
            body,
            position,
            heading,
            speed: wander_speed,
            wander_speed,
            unpredictability,
            can_fly,
            state: BehaviorState::Wandering,
            next_decision: now,
            target: position,
            target_altitude: position.y,
            flying: can_fly,
            escaped: false,
            rest_height,
            bob_phase: 0.0,
            rng,
        }
    }

    /// Evaluate the state machine and move for one tick.
    ///
    /// Skipped entirely for a non-positive or non-finite `dt`.
    pub fn update(&mut self, now: f64, dt: f64, player: Vec3, config: &AgentConfig) {
        if !(dt > 0.0) || !dt.is_finite() {
            return;
        }

        let near_player = planar_distance(self.position, player) <= config.panic_radius;
        match self.state {
            BehaviorState::Wandering => {
                if near_player {
                    self.start_fleeing(player, now, config);
                } else if now >= self.next_decision {
                    self.decide_wander(now, config);
                }
            }
            BehaviorState::Fleeing => {
                if now >= self.next_decision {
                    self.state = BehaviorState::Wandering;
                    self.speed = self.wander_speed;
                    if near_player {
                        self.start_fleeing(player, now, config);
                    } else {
                        self.decide_wander(now, config);
                    }
                }
            }
        }

        self.advance(dt as f32, config);
    }

    fn decide_wander(&mut self, now: f64, config: &AgentConfig) {
        let calm = 1.0 - self.unpredictability;

        let mut heading = self.rng.random_range(0.0..TAU);
        if self.rng.random::<f32>() < self.unpredictability {
            heading += self.rng.random_range(-FRAC_PI_2..=FRAC_PI_2);
        }
        self.heading = heading.rem_euclid(TAU);

        let leg = self.rng.random_range(
            config.target_distance_min..=config.target_distance_min + config.target_distance_span * calm,
        );
        self.target = self.position + heading_direction(self.heading) * leg;

        if self.can_fly {
            self.target_altitude = self
                .rng
                .random_range(config.flight_altitude_min..=config.flight_altitude_max);
        }

        self.next_decision = now
            + config.decision_interval_base
            + self.rng.random::<f64>() * config.decision_interval_span * f64::from(calm);
    }

    fn start_fleeing(&mut self, player: Vec3, now: f64, config: &AgentConfig) {
        self.state = BehaviorState::Fleeing;
        self.heading = heading_of(self.position - player);

        let distance = self
            .rng
            .random_range(config.flee_distance_min..=config.flee_distance_max);
        self.target = self.position + heading_direction(self.heading) * distance;

        self.speed = match self.kind {
            AgentKind::Human => config.human_flee_speed,
            AgentKind::Animal(_) => self.wander_speed * config.animal_flee_factor,
        };
        self.next_decision = now + config.flee_quiet_period;

        if self.can_fly && !self.escaped {
            self.flying = true;
            self.escaped = true;
            self.target_altitude = self
                .rng
                .random_range(config.escape_altitude_min..=config.escape_altitude_max);
        }
    }

    fn advance(&mut self, dt: f32, config: &AgentConfig) {
        let step = heading_direction(self.heading) * self.speed * dt;
        self.position.x += step.x;
        self.position.z += step.z;

        if self.flying {
            self.position.y += (self.target_altitude - self.position.y) * config.altitude_lerp;
        } else {
            self.bob_phase = (self.bob_phase + self.speed * dt * BOB_FREQUENCY).rem_euclid(TAU);
            self.position.y = config.ground_level
                + self.rest_height
                + config.bob_amplitude * self.bob_phase.sin().abs();
        }
    }

    /// Write position, velocity and orientation into the agent's body.
    pub fn sync_body(&self, physics: &mut PhysicsWorld) {
        physics.set_position(self.body, self.position);
        physics.set_velocity(self.body, self.velocity());
        physics.set_rotation(self.body, yaw(self.heading));
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn wander_speed(&self) -> f32 {
        self.wander_speed
    }

    pub fn state(&self) -> BehaviorState {
        self.state
    }

    pub fn next_decision(&self) -> f64 {
        self.next_decision
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn is_flying(&self) -> bool {
        self.flying
    }

    /// Planar velocity along the current heading.
    pub fn velocity(&self) -> Vec3 {
        heading_direction(self.heading) * self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::components::CollisionFilter;
    use crate::physics::PhysicsConfig;
    use rand::SeedableRng;

    const DT: f64 = 1.0 / 60.0;

    fn spawn(kind: AgentKind, position: Vec3) -> (PhysicsWorld, Agent) {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let body = physics.create_sphere(position, 0.4, 20.0, CollisionFilter::default());
        let agent = Agent::new(
            kind,
            body,
            position,
            0.0,
            &AgentConfig::default(),
            SmallRng::seed_from_u64(7),
        );
        (physics, agent)
    }

    #[test]
    fn test_stays_wandering_outside_panic_radius() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Human, Vec3::ZERO);
        let player = Vec3::new(0.0, 0.0, config.panic_radius + 1.0);

        agent.update(0.0, DT, player, &config);
        assert_eq!(agent.state(), BehaviorState::Wandering);
    }

    #[test]
    fn test_flees_directly_away_from_player() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Animal(Species::Dog), Vec3::ZERO);
        let player = Vec3::new(10.0, 1.0, 10.0);

        agent.update(0.0, DT, player, &config);
        assert_eq!(agent.state(), BehaviorState::Fleeing);

        let away = (Vec3::ZERO - player).with_y(0.0).normalize();
        let dir = heading_direction(agent.heading());
        assert!(dir.dot(away) > 0.9999, "heading not away: {:?}", dir);
        assert!((agent.speed() - 4.0 * 1.5).abs() < 1e-5);
        assert!((agent.next_decision() - 5.0).abs() < 1e-9);

        let leg = planar_distance(agent.target(), Vec3::ZERO);
        assert!((20.0..=30.0).contains(&leg), "flee target {} away", leg);
    }

    #[test]
    fn test_human_flees_at_fixed_speed() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Human, Vec3::ZERO);
        agent.update(0.0, DT, Vec3::new(0.0, 0.0, 3.0), &config);
        assert_eq!(agent.state(), BehaviorState::Fleeing);
        assert_eq!(agent.speed(), 5.0);
    }

    #[test]
    fn test_quiet_period_holds_heading() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Human, Vec3::ZERO);
        agent.update(0.0, DT, Vec3::new(0.0, 0.0, 5.0), &config);
        let heading = agent.heading();

        // Player circles around; the agent keeps running the original way
        let mut now = 0.0;
        for i in 0..120 {
            now += DT;
            let angle = i as f32 * 0.1;
            let player = agent.position() + Vec3::new(angle.sin(), 0.0, angle.cos()) * 3.0;
            agent.update(now, DT, player, &config);
            assert_eq!(agent.state(), BehaviorState::Fleeing);
            assert_eq!(agent.heading(), heading);
        }
    }

    #[test]
    fn test_returns_to_wandering_after_quiet_period() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Animal(Species::Cat), Vec3::ZERO);
        agent.update(0.0, DT, Vec3::new(0.0, 0.0, 5.0), &config);
        assert_eq!(agent.state(), BehaviorState::Fleeing);

        let far = Vec3::new(500.0, 0.0, 500.0);
        agent.update(4.9, DT, far, &config);
        assert_eq!(agent.state(), BehaviorState::Fleeing);

        agent.update(5.0, DT, far, &config);
        assert_eq!(agent.state(), BehaviorState::Wandering);
        assert_eq!(agent.speed(), agent.wander_speed());
        assert!(agent.next_decision() >= 7.0);
    }

    #[test]
    fn test_flees_again_if_player_still_near() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Human, Vec3::ZERO);
        agent.update(0.0, DT, Vec3::new(0.0, 0.0, 5.0), &config);

        let player = agent.position() + Vec3::new(2.0, 0.0, 0.0);
        agent.update(5.0, DT, player, &config);
        assert_eq!(agent.state(), BehaviorState::Fleeing);
        assert!((agent.next_decision() - 10.0).abs() < 1e-9);
        // Now running away along -X from the new player position
        assert!(heading_direction(agent.heading()).x < -0.99);
    }

    #[test]
    fn test_wander_decision_interval_bounds() {
        let config = AgentConfig::default();
        for seed in 0..50 {
            let mut physics = PhysicsWorld::new(PhysicsConfig::default());
            let body = physics.create_sphere(Vec3::ZERO, 0.25, 5.0, CollisionFilter::default());
            let species = Species::Cat;
            let mut agent = Agent::new(
                AgentKind::Animal(species),
                body,
                Vec3::ZERO,
                0.0,
                &config,
                SmallRng::seed_from_u64(seed),
            );
            agent.update(1.0, DT, Vec3::splat(1000.0), &config);

            let u = f64::from(species.profile().unpredictability);
            let interval = agent.next_decision() - 1.0;
            assert!(
                interval >= 2.0 && interval <= 2.0 + 4.0 * (1.0 - u) + 1e-9,
                "interval {} out of range",
                interval
            );
            let leg = planar_distance(agent.target(), Vec3::ZERO);
            let max_leg = 5.0 + 10.0 * (1.0 - species.profile().unpredictability);
            assert!(leg >= 5.0 - 1e-4 && leg <= max_leg + 1e-4, "leg {}", leg);
        }
    }

    #[test]
    fn test_moves_along_heading() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Animal(Species::Deer), Vec3::ZERO);
        agent.update(0.0, 0.5, Vec3::splat(1000.0), &config);

        let moved = agent.position().with_y(0.0);
        let expected = heading_direction(agent.heading()) * 5.0 * 0.5;
        assert!((moved - expected).length() < 1e-4);
    }

    #[test]
    fn test_ground_agent_bob_is_small() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Animal(Species::Dog), Vec3::ZERO);
        let rest = Species::Dog.profile().radius;
        let mut now = 0.0;
        for _ in 0..300 {
            now += DT;
            agent.update(now, DT, Vec3::splat(1000.0), &config);
            let lift = agent.position().y - rest;
            assert!((0.0..=0.05 + 1e-6).contains(&lift), "lift {}", lift);
        }
    }

    #[test]
    fn test_bird_altitude_approaches_exponentially() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Animal(Species::Bird), Vec3::new(0.0, 5.0, 0.0));
        assert!(agent.is_flying());
        agent.update(0.0, DT, Vec3::splat(1000.0), &config);
        let target = agent.target_altitude;
        let y1 = agent.position().y;
        assert!((y1 - (5.0 + (target - 5.0) * 0.02)).abs() < 1e-5);

        agent.update(DT, DT, Vec3::splat(1000.0), &config);
        let y2 = agent.position().y;
        assert!((y2 - (y1 + (target - y1) * 0.02)).abs() < 1e-5);
    }

    #[test]
    fn test_bird_escapes_high_on_first_flee() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Animal(Species::Bird), Vec3::new(0.0, 5.0, 0.0));
        agent.update(0.0, DT, Vec3::new(0.0, 0.0, 4.0), &config);
        assert_eq!(agent.state(), BehaviorState::Fleeing);
        assert!((15.0..=25.0).contains(&agent.target_altitude));
        assert!(agent.position().y > 5.0);
    }

    #[test]
    fn test_invalid_dt_skips_evaluation() {
        let config = AgentConfig::default();
        let (_physics, mut agent) = spawn(AgentKind::Human, Vec3::ZERO);
        let before = agent.position();
        for dt in [0.0, -DT, f64::NAN] {
            agent.update(0.0, dt, Vec3::new(0.0, 0.0, 1.0), &config);
        }
        assert_eq!(agent.state(), BehaviorState::Wandering);
        assert_eq!(agent.position(), before);
    }

    #[test]
    fn test_sync_body_writes_pose() {
        let config = AgentConfig::default();
        let (mut physics, mut agent) = spawn(AgentKind::Animal(Species::Cow), Vec3::ZERO);
        agent.update(0.0, DT, Vec3::splat(1000.0), &config);
        agent.sync_body(&mut physics);

        assert_eq!(physics.position(agent.body()), Some(agent.position()));
        assert_eq!(physics.velocity(agent.body()), Some(agent.velocity()));
    }
}
