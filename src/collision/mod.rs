//! Collision routing: turns raw physics contacts into classified,
//! deduplicated gameplay outcomes.
//!
//! For every contact of a step the router
//!
//! 1. drops contacts slower than [`CollisionConfig::min_impact_speed`],
//! 2. keeps only contacts involving the player vehicle,
//! 3. classifies the other body by its registered [`SemanticType`],
//! 4. drops targets still cooling down from an earlier hit,
//! 5. dispatches a [`CollisionOutcome`] to every consumer in registration order.
//!
//! Contacts without manifold data fall back to the midpoint of the two
//! bodies and the magnitude of their relative velocity.

pub mod dedup;

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use self::dedup::HitDeduplicationSet;
use crate::physics::components::RenderHandle;
use crate::physics::contact::ContactEvent;
use crate::physics::{BodyId, PhysicsWorld};

/// What a body represents to gameplay logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SemanticType {
    Vehicle,
    Building,
    HumanAgent,
    AnimalAgent,
    Prop,
    Ground,
    #[default]
    Unclassified,
}

/// A classified hit of the player vehicle on a target body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionOutcome {
    pub target: BodyId,
    pub semantic_type: SemanticType,
    pub render_handle: Option<RenderHandle>,
    pub point: Vec3,
    /// Non-negative impact speed.
    pub impact_speed: f32,
    /// Player velocity at the time of contact.
    pub vehicle_velocity: Vec3,
}

/// Receives collision outcomes synchronously during routing.
pub trait CollisionConsumer {
    /// Name used when logging consumer failures.
    fn name(&self) -> &str {
        "collision consumer"
    }

    fn on_collision(&mut self, outcome: &CollisionOutcome, now: f64) -> anyhow::Result<()>;
}

/// Router tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Contacts slower than this are ignored. Default: 1.0.
    pub min_impact_speed: f32,
    /// Seconds before the same target can be hit again. Default: 1.0.
    pub cooldown: f64,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            min_impact_speed: 1.0,
            cooldown: 1.0,
        }
    }
}

/// Classifies contacts against the registered semantic types.
pub struct CollisionRouter {
    config: CollisionConfig,
    types: HashMap<BodyId, SemanticType>,
    player: Option<BodyId>,
    dedup: HitDeduplicationSet,
    consumers: Vec<Box<dyn CollisionConsumer>>,
}

impl CollisionRouter {
    pub fn new(config: CollisionConfig) -> Self {
        Self {
            config,
            types: HashMap::new(),
            player: None,
            dedup: HitDeduplicationSet::new(),
            consumers: Vec::new(),
        }
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Tag `body`. Re-registering overwrites the previous tag.
    pub fn register(&mut self, body: BodyId, semantic_type: SemanticType) {
        if let Some(previous) = self.types.insert(body, semantic_type) {
            if previous != semantic_type {
                tracing::debug!(
                    body = body.to_bits(),
                    ?previous,
                    ?semantic_type,
                    "semantic type overwritten"
                );
            }
        }
    }

    pub fn unregister(&mut self, body: BodyId) -> Option<SemanticType> {
        self.types.remove(&body)
    }

    /// Registered tag of `body`, `Unclassified` if never registered.
    pub fn semantic_type(&self, body: BodyId) -> SemanticType {
        self.types.get(&body).copied().unwrap_or_default()
    }

    /// Mark `body` as the player vehicle.
    pub fn set_player(&mut self, body: BodyId) {
        self.register(body, SemanticType::Vehicle);
        self.player = Some(body);
    }

    pub fn player(&self) -> Option<BodyId> {
        self.player
    }

    pub fn add_consumer(&mut self, consumer: Box<dyn CollisionConsumer>) {
        self.consumers.push(consumer);
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    pub fn dedup(&self) -> &HitDeduplicationSet {
        &self.dedup
    }

    /// Route one step's contacts. Render handles are looked up in `physics`.
    ///
    /// Returns the dispatched outcomes in contact order.
    pub fn route(
        &mut self,
        contacts: &[ContactEvent],
        physics: &PhysicsWorld,
        now: f64,
    ) -> Vec<CollisionOutcome> {
        self.expire(now);

        let mut outcomes = Vec::new();
        let Some(player) = self.player else {
            return outcomes;
        };

        for contact in contacts {
            let impact_speed = contact.impact_speed_or_relative();
            if impact_speed < self.config.min_impact_speed {
                continue;
            }

            let Some(target) = contact.other(player) else {
                continue;
            };
            if target == player {
                continue;
            }

            let semantic_type = self.semantic_type(target);
            if self.dedup.contains(target) {
                tracing::trace!(
                    target = target.to_bits(),
                    ?semantic_type,
                    "hit suppressed by cooldown"
                );
                continue;
            }
            self.dedup.insert(target, now + self.config.cooldown);

            let vehicle_velocity = if contact.body_a == player {
                contact.velocity_a
            } else {
                contact.velocity_b
            };
            let outcome = CollisionOutcome {
                target,
                semantic_type,
                render_handle: physics.render_handle(target),
                point: contact.point_or_midpoint(),
                impact_speed,
                vehicle_velocity,
            };
            tracing::trace!(
                target = target.to_bits(),
                ?semantic_type,
                impact_speed,
                "collision routed"
            );

            self.dispatch(&outcome, now);
            outcomes.push(outcome);
        }

        outcomes
    }

    fn dispatch(&mut self, outcome: &CollisionOutcome, now: f64) {
        for consumer in &mut self.consumers {
            if let Err(err) = consumer.on_collision(outcome, now) {
                tracing::warn!(
                    consumer = consumer.name(),
                    error = %err,
                    "collision consumer failed"
                );
            }
        }
    }

    /// Purge `body` from the classification map and the cooldown set.
    pub fn forget(&mut self, body: BodyId) {
        self.types.remove(&body);
        self.dedup.remove(body);
        if self.player == Some(body) {
            self.player = None;
        }
    }

    /// Drop cooldowns that ended at or before `now`.
    pub fn expire(&mut self, now: f64) {
        self.dedup.expire(now);
    }

    /// Clear cooldowns. Registrations and consumers stay.
    pub fn reset(&mut self) {
        self.dedup.clear();
    }

    /// Clear cooldowns, registrations and the player.
    pub fn clear(&mut self) {
        self.dedup.clear();
        self.types.clear();
        self.player = None;
    }
}
