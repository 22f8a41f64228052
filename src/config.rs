//! Top-level simulation configuration.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::agent::AgentConfig;
use crate::collision::CollisionConfig;
use crate::error::ConfigError;
use crate::physics::PhysicsConfig;
use crate::population::{PopulationConfig, SpawnBand};
use crate::score::ScoreConfig;
use crate::vehicle::VehicleConfig;

/// Every tunable of a simulation. Missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsConfig,
    pub collision: CollisionConfig,
    pub score: ScoreConfig,
    pub agents: AgentConfig,
    pub population: PopulationConfig,
    pub vehicle: VehicleConfig,
    /// Optional RNG seed for reproducible populations.
    pub rng_seed: Option<u64>,
}

fn check(ok: bool, message: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfig(message))
    }
}

fn finite_range(min: f32, max: f32) -> bool {
    min.is_finite() && max.is_finite() && min <= max
}

fn valid_band(band: SpawnBand) -> bool {
    band.min >= 0.0 && finite_range(band.min, band.max)
}

impl SimConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        check(
            p.fixed_timestep.is_finite() && p.fixed_timestep > 0.0,
            "physics.fixed_timestep must be positive",
        )?;
        check(p.max_substeps > 0, "physics.max_substeps must be positive")?;
        check(p.gravity.is_finite(), "physics.gravity must be finite")?;
        check(
            p.contact_speed_epsilon >= 0.0,
            "physics.contact_speed_epsilon must be non-negative",
        )?;

        let c = &self.collision;
        check(
            c.min_impact_speed >= 0.0,
            "collision.min_impact_speed must be non-negative",
        )?;
        check(
            c.cooldown.is_finite() && c.cooldown >= 0.0,
            "collision.cooldown must be non-negative",
        )?;

        let s = &self.score;
        check(s.speed_divisor > 0.0, "score.speed_divisor must be positive")?;
        check(s.combo_threshold > 0, "score.combo_threshold must be positive")?;
        check(
            s.combo_window.is_finite() && s.combo_window >= 0.0,
            "score.combo_window must be non-negative",
        )?;
        check(
            s.max_pending_events > 0,
            "score.max_pending_events must be positive",
        )?;

        let a = &self.agents;
        check(a.panic_radius >= 0.0, "agents.panic_radius must be non-negative")?;
        check(
            a.flee_quiet_period > 0.0,
            "agents.flee_quiet_period must be positive",
        )?;
        check(
            finite_range(a.flee_distance_min, a.flee_distance_max),
            "agents.flee_distance_min must not exceed flee_distance_max",
        )?;
        check(
            a.human_speed_min >= 0.0 && finite_range(a.human_speed_min, a.human_speed_max),
            "agents.human_speed_min must not exceed human_speed_max",
        )?;
        check(a.human_mass > 0.0, "agents.human_mass must be positive")?;
        check(
            (0.0..=1.0).contains(&a.human_unpredictability),
            "agents.human_unpredictability must be within [0, 1]",
        )?;
        check(
            a.human_radius > 0.0 && a.human_half_height >= 0.0,
            "agents.human_radius must be positive",
        )?;
        check(
            a.decision_interval_base > 0.0 && a.decision_interval_span >= 0.0,
            "agents.decision_interval_base must be positive",
        )?;
        check(
            a.target_distance_min >= 0.0 && a.target_distance_span >= 0.0,
            "agents.target_distance_min must be non-negative",
        )?;
        check(
            (0.0..=1.0).contains(&a.altitude_lerp),
            "agents.altitude_lerp must be within [0, 1]",
        )?;
        check(
            finite_range(a.flight_altitude_min, a.flight_altitude_max),
            "agents.flight_altitude_min must not exceed flight_altitude_max",
        )?;
        check(
            finite_range(a.escape_altitude_min, a.escape_altitude_max),
            "agents.escape_altitude_min must not exceed escape_altitude_max",
        )?;

        let pop = &self.population;
        check(
            pop.human_spawn_interval > 0.0 && pop.animal_spawn_interval > 0.0,
            "population spawn intervals must be positive",
        )?;
        check(
            valid_band(pop.human_urban_band),
            "population.human_urban_band is invalid",
        )?;
        check(
            valid_band(pop.human_rural_band),
            "population.human_rural_band is invalid",
        )?;
        check(valid_band(pop.animal_band), "population.animal_band is invalid")?;
        check(
            pop.removal_distance > 0.0,
            "population.removal_distance must be positive",
        )?;

        let v = &self.vehicle;
        check(
            v.max_speed > 0.0 && v.acceleration > 0.0,
            "vehicle.max_speed and acceleration must be positive",
        )?;
        check(
            v.brake_deceleration >= 0.0,
            "vehicle.brake_deceleration must be non-negative",
        )?;
        check(
            (0.0..=1.0).contains(&v.handbrake_decay) && (0.0..=1.0).contains(&v.coast_decay),
            "vehicle decay factors must be within [0, 1]",
        )?;
        check(v.mass > 0.0, "vehicle.mass must be positive")?;
        check(
            v.half_extents.min_element() > 0.0,
            "vehicle.half_extents must be positive",
        )?;

        Ok(())
    }

    /// RNG for the configured seed, or seeded from entropy without one.
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimConfig::from_json_str(
            r#"{ "score": { "combo_window": 3.0 }, "rng_seed": 9 }"#,
        )
        .unwrap();
        assert_eq!(config.score.combo_window, 3.0);
        assert_eq!(config.score.human_base_points, 100.0);
        assert_eq!(config.population.max_humans, 200);
        assert_eq!(config.rng_seed, Some(9));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut config = SimConfig::default();
        config.physics.fixed_timestep = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(msg)) if msg.contains("fixed_timestep")
        ));

        let mut config = SimConfig::default();
        config.population.animal_band = SpawnBand::new(150.0, 80.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            SimConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        use rand::Rng;

        let config = SimConfig {
            rng_seed: Some(5),
            ..SimConfig::default()
        };
        let a: u64 = config.seeded_rng().random();
        let b: u64 = config.seeded_rng().random();
        assert_eq!(a, b);
    }
}
