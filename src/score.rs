//! Scoring and combo state machine.

use std::collections::VecDeque;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::{CollisionConsumer, CollisionOutcome, SemanticType};

/// Scoring rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Points for a human hit before speed and combo scaling. Default: 100.
    pub human_base_points: f64,
    /// Impact speed giving a 1x speed multiplier. Default: 5.
    pub speed_divisor: f64,
    /// Default: 3.
    pub max_speed_multiplier: f64,
    /// Consecutive human hits needed for a combo. Default: 3.
    pub combo_threshold: u32,
    /// Multiplier added per hit beyond the threshold. Default: 0.5.
    pub combo_step: f64,
    /// Default: 3.
    pub max_combo_multiplier: f64,
    /// Fixed penalty for hitting an animal. Default: 200.
    pub animal_penalty: i64,
    /// Seconds after the last human hit before the counter resets. Default: 5.
    pub combo_window: f64,
    /// Undrained events kept before the oldest are dropped. Default: 1024.
    pub max_pending_events: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            human_base_points: 100.0,
            speed_divisor: 5.0,
            max_speed_multiplier: 3.0,
            combo_threshold: 3,
            combo_step: 0.5,
            max_combo_multiplier: 3.0,
            animal_penalty: 200,
            combo_window: 5.0,
            max_pending_events: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComboState {
    #[default]
    Idle,
    ComboActive,
}

/// Cumulative scoring state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreState {
    pub score: i64,
    /// Consecutive human hits.
    pub counter: u32,
    pub last_hit: Option<f64>,
    pub combo: ComboState,
}

/// Notifications for HUD and popup collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreEvent {
    ScoreChanged { delta: i64, total: i64, point: Vec3 },
    ComboChanged { count: u32, multiplier: f64 },
    ComboEnded,
    /// Hit on anything other than an agent. Never changes the score.
    Impact {
        semantic_type: SemanticType,
        point: Vec3,
        speed: f32,
    },
}

pub struct ScoreEngine {
    config: ScoreConfig,
    state: ScoreState,
    events: VecDeque<ScoreEvent>,
}

impl ScoreEngine {
    pub fn new(config: ScoreConfig) -> Self {
        Self {
            config,
            state: ScoreState::default(),
            events: VecDeque::new(),
        }
    }

    /// Apply one collision outcome at time `now`.
    pub fn record(&mut self, outcome: &CollisionOutcome, now: f64) {
        match outcome.semantic_type {
            SemanticType::HumanAgent => self.human_hit(outcome, now),
            SemanticType::AnimalAgent => self.animal_hit(outcome),
            semantic_type => self.emit(ScoreEvent::Impact {
                semantic_type,
                point: outcome.point,
                speed: outcome.impact_speed,
            }),
        }
    }

    fn human_hit(&mut self, outcome: &CollisionOutcome, now: f64) {
        // A hit past the window starts a new run even if `update` has not run yet
        self.expire_combo(now);

        let cfg = &self.config;
        let speed_multiplier =
            (f64::from(outcome.impact_speed) / cfg.speed_divisor).min(cfg.max_speed_multiplier);
        let mut gain = (cfg.human_base_points * speed_multiplier).round();

        self.state.counter += 1;
        self.state.last_hit = Some(now);

        if self.state.counter >= cfg.combo_threshold {
            let beyond = f64::from(self.state.counter - cfg.combo_threshold + 1);
            let multiplier = (1.0 + beyond * cfg.combo_step).min(cfg.max_combo_multiplier);
            gain = (gain * multiplier).round();
            self.state.combo = ComboState::ComboActive;
            self.emit(ScoreEvent::ComboChanged {
                count: self.state.counter,
                multiplier,
            });
        }

        let delta = gain as i64;
        self.state.score += delta;
        self.emit(ScoreEvent::ScoreChanged {
            delta,
            total: self.state.score,
            point: outcome.point,
        });
    }

    fn animal_hit(&mut self, outcome: &CollisionOutcome) {
        let was_active = self.state.combo == ComboState::ComboActive;
        let delta = -self.config.animal_penalty;

        self.state.score += delta;
        self.state.counter = 0;
        self.state.combo = ComboState::Idle;

        self.emit(ScoreEvent::ScoreChanged {
            delta,
            total: self.state.score,
            point: outcome.point,
        });
        if was_active {
            self.emit(ScoreEvent::ComboEnded);
        }
    }

    /// Time-based combo decay, run once per tick.
    pub fn update(&mut self, now: f64) {
        self.expire_combo(now);
    }

    fn expire_combo(&mut self, now: f64) {
        let Some(last_hit) = self.state.last_hit else {
            return;
        };
        if now - last_hit <= self.config.combo_window {
            return;
        }
        match self.state.combo {
            ComboState::ComboActive => {
                self.state.counter = 0;
                self.state.combo = ComboState::Idle;
                self.emit(ScoreEvent::ComboEnded);
            }
            ComboState::Idle => self.state.counter = 0,
        }
    }

    /// Take every notification emitted since the last drain.
    ///
    /// Hosts drain once per tick; the queue holds at most `max_pending_events`
    /// and drops the oldest beyond that.
    pub fn drain_events(&mut self) -> Vec<ScoreEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    fn emit(&mut self, event: ScoreEvent) {
        if self.events.len() >= self.config.max_pending_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn state(&self) -> ComboState {
        self.state.combo
    }

    pub fn score_state(&self) -> &ScoreState {
        &self.state
    }

    pub fn score(&self) -> i64 {
        self.state.score
    }

    pub fn combo_count(&self) -> u32 {
        self.state.counter
    }

    pub fn reset(&mut self) {
        self.state = ScoreState::default();
        self.events.clear();
    }
}

impl CollisionConsumer for ScoreEngine {
    fn name(&self) -> &str {
        "score engine"
    }

    fn on_collision(&mut self, outcome: &CollisionOutcome, now: f64) -> anyhow::Result<()> {
        self.record(outcome, now);
        Ok(())
    }
}
