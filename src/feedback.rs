//! Contracts for the collaborators around the core (effects, audio, zoning)
//! and the dispatcher that turns collision outcomes into feedback calls.
//!
//! Sinks are fire-and-forget: they take `&self`, return nothing and are
//! shared through `Arc`, so a misbehaving renderer or mixer cannot push an
//! error back into the tick.

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::agent::Species;
use crate::collision::{CollisionConsumer, CollisionOutcome, SemanticType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Blood,
    Debris,
    TireSmoke,
    SkidMark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCategory {
    Impact,
    Voice,
    Animal,
    Vehicle,
}

/// Visual effects collaborator.
pub trait EffectSink {
    fn spawn_effect(&self, kind: EffectKind, point: Vec3, direction: Vec3, intensity: f32);
}

/// Audio collaborator.
pub trait AudioSink {
    fn play(&self, category: SoundCategory, name: &str, volume: Option<f32>);
}

/// Spawn context for a point of the city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Zone {
    #[default]
    Urban,
    Rural,
}

/// City layout collaborator.
pub trait ZoneMap {
    fn zone_at(&self, point: Vec3) -> Zone;
}

/// Discards every effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEffects;

impl EffectSink for NullEffects {
    fn spawn_effect(&self, _kind: EffectKind, _point: Vec3, _direction: Vec3, _intensity: f32) {}
}

/// Discards every sound.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&self, _category: SoundCategory, _name: &str, _volume: Option<f32>) {}
}

/// The same zone everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformZone(pub Zone);

impl ZoneMap for UniformZone {
    fn zone_at(&self, _point: Vec3) -> Zone {
        self.0
    }
}

/// Impact speed mapped to full effect intensity.
const FULL_INTENSITY_SPEED: f32 = 20.0;

#[inline]
fn intensity(impact_speed: f32) -> f32 {
    (impact_speed / FULL_INTENSITY_SPEED).clamp(0.1, 1.0)
}

/// Collision consumer driving the effect and audio collaborators.
pub struct FeedbackDispatcher {
    effects: Arc<dyn EffectSink + Send + Sync>,
    audio: Arc<dyn AudioSink + Send + Sync>,
}

impl FeedbackDispatcher {
    pub fn new(
        effects: Arc<dyn EffectSink + Send + Sync>,
        audio: Arc<dyn AudioSink + Send + Sync>,
    ) -> Self {
        Self { effects, audio }
    }

    /// Translate one outcome into effect and sound calls.
    ///
    /// `species` names the animal sound; without it a generic one plays.
    pub fn dispatch(&self, outcome: &CollisionOutcome, species: Option<Species>) {
        let strength = intensity(outcome.impact_speed);
        let direction = outcome.vehicle_velocity.normalize_or_zero();

        match outcome.semantic_type {
            SemanticType::HumanAgent => {
                self.effects
                    .spawn_effect(EffectKind::Blood, outcome.point, direction, strength);
                self.audio.play(SoundCategory::Voice, "scream", Some(strength));
            }
            SemanticType::AnimalAgent => {
                self.effects
                    .spawn_effect(EffectKind::Blood, outcome.point, direction, strength);
                let name = species.map(Species::sound_name).unwrap_or("animal");
                self.audio.play(SoundCategory::Animal, name, Some(strength));
            }
            SemanticType::Building | SemanticType::Prop => {
                self.effects
                    .spawn_effect(EffectKind::Debris, outcome.point, direction, strength);
                self.audio.play(SoundCategory::Impact, "crash", Some(strength));
            }
            SemanticType::Vehicle | SemanticType::Ground | SemanticType::Unclassified => {
                self.audio.play(SoundCategory::Impact, "thud", Some(strength));
            }
        }
    }

    /// Tire smoke and skid marks under a sliding vehicle.
    pub fn skid(&self, point: Vec3, direction: Vec3, intensity: f32) {
        self.effects
            .spawn_effect(EffectKind::TireSmoke, point, direction, intensity);
        self.effects
            .spawn_effect(EffectKind::SkidMark, point, direction, intensity);
        self.audio.play(SoundCategory::Vehicle, "skid", Some(intensity));
    }
}

impl CollisionConsumer for FeedbackDispatcher {
    fn name(&self) -> &str {
        "feedback dispatcher"
    }

    fn on_collision(&mut self, outcome: &CollisionOutcome, _now: f64) -> anyhow::Result<()> {
        self.dispatch(outcome, None);
        Ok(())
    }
}
