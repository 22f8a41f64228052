//! Skid: arcade driving simulation core
//!
//! A headless core for an arcade driving game: a rigid-body world, collision
//! routing with per-target cooldowns, scoring with combos, wandering and
//! fleeing city agents, and the vehicle controller tying them together.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **physics** - Rigid bodies, broadphase/narrowphase, impulse solver, fixed-step world
//! 2. **collision** - Semantic tagging of bodies, hit deduplication, consumer fan-out
//! 3. **score** - Points, combo state machine, score notifications
//! 4. **agent** - Human and animal behavior (wandering, fleeing, flight)
//! 5. **population** - Spawning, capping and culling agents around the player
//! 6. **vehicle** - Arcade speed/heading controller driving the player body
//! 7. **feedback** - Effect, audio and zoning collaborator contracts
//! 8. **simulation** - Tick orchestration over all of the above
//!
//! Rendering, audio playback and input devices live outside the crate and
//! plug in through the traits in [`feedback`].

pub mod agent;
pub mod collision;
pub mod config;
pub mod error;
pub mod feedback;
pub mod math;
pub mod physics;
pub mod population;
pub mod score;
pub mod simulation;
pub mod vehicle;

// Re-export commonly used types
pub use agent::{Agent, AgentConfig, AgentKind, BehaviorState, Species, SpeciesProfile};
pub use collision::{
    CollisionConfig, CollisionConsumer, CollisionOutcome, CollisionRouter, HitDeduplicationSet,
    SemanticType,
};
pub use config::SimConfig;
pub use error::ConfigError;
pub use feedback::{
    AudioSink, EffectKind, EffectSink, FeedbackDispatcher, NullAudio, NullEffects, SoundCategory,
    UniformZone, Zone, ZoneMap,
};
pub use physics::{
    components::{groups, ColliderShape, CollisionFilter, RenderHandle},
    contact::{ContactEvent, ContactGeometry},
    BodyDesc, BodyId, PhysicsConfig, PhysicsWorld,
};
pub use population::{AgentHandle, AgentMarker, PopulationConfig, PopulationManager, SpawnBand};
pub use score::{ComboState, ScoreConfig, ScoreEngine, ScoreEvent, ScoreState};
pub use simulation::{SimCollaborators, Simulation};
pub use vehicle::{ControlState, VehicleConfig, VehicleController};

// Re-export math library
pub use glam;
