//! Animal species and their movement profiles.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Dog,
    Cat,
    Cow,
    Deer,
    Bird,
}

/// Per-species constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesProfile {
    /// Wander speed in units per second.
    pub speed: f32,
    pub mass: f32,
    /// 0 = steady, 1 = erratic.
    pub unpredictability: f32,
    pub can_fly: bool,
    /// Radius of the body sphere.
    pub radius: f32,
}

/// Spawn weights, in the order they are accumulated.
const SPAWN_WEIGHTS: [(Species, f64); 5] = [
    (Species::Dog, 0.3),
    (Species::Cat, 0.3),
    (Species::Cow, 0.1),
    (Species::Deer, 0.2),
    (Species::Bird, 0.1),
];

impl Species {
    pub const ALL: [Species; 5] = [
        Species::Dog,
        Species::Cat,
        Species::Cow,
        Species::Deer,
        Species::Bird,
    ];

    pub fn profile(self) -> SpeciesProfile {
        match self {
            Species::Dog => SpeciesProfile {
                speed: 4.0,
                mass: 20.0,
                unpredictability: 0.3,
                can_fly: false,
                radius: 0.4,
            },
            Species::Cat => SpeciesProfile {
                speed: 3.5,
                mass: 5.0,
                unpredictability: 0.6,
                can_fly: false,
                radius: 0.25,
            },
            Species::Cow => SpeciesProfile {
                speed: 1.0,
                mass: 500.0,
                unpredictability: 0.1,
                can_fly: false,
                radius: 0.9,
            },
            Species::Deer => SpeciesProfile {
                speed: 5.0,
                mass: 80.0,
                unpredictability: 0.4,
                can_fly: false,
                radius: 0.6,
            },
            Species::Bird => SpeciesProfile {
                speed: 6.0,
                mass: 1.0,
                unpredictability: 0.8,
                can_fly: true,
                radius: 0.15,
            },
        }
    }

    /// Pick a species from one uniform draw in `[0, 1)` by cumulative weight.
    pub fn from_roll(roll: f64) -> Species {
        let mut cumulative = 0.0;
        for (species, weight) in SPAWN_WEIGHTS {
            cumulative += weight;
            if roll < cumulative {
                return species;
            }
        }
        // Rounding can leave the last bucket a hair short
        Species::Bird
    }

    /// Sound name used for hit feedback.
    pub fn sound_name(self) -> &'static str {
        match self {
            Species::Dog => "dog",
            Species::Cat => "cat",
            Species::Cow => "cow",
            Species::Deer => "deer",
            Species::Bird => "bird",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_buckets() {
        assert_eq!(Species::from_roll(0.0), Species::Dog);
        assert_eq!(Species::from_roll(0.29), Species::Dog);
        assert_eq!(Species::from_roll(0.31), Species::Cat);
        assert_eq!(Species::from_roll(0.65), Species::Cow);
        assert_eq!(Species::from_roll(0.75), Species::Deer);
        assert_eq!(Species::from_roll(0.89), Species::Deer);
        assert_eq!(Species::from_roll(0.95), Species::Bird);
        assert_eq!(Species::from_roll(0.999_999), Species::Bird);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = SPAWN_WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_only_birds_fly() {
        for species in Species::ALL {
            assert_eq!(species.profile().can_fly, species == Species::Bird);
        }
    }
}
