//! Collision routing and scoring driven by real physics contacts.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use skid::{
    groups, BodyDesc, BodyId, ColliderShape, CollisionConfig, CollisionConsumer,
    CollisionFilter, CollisionOutcome, CollisionRouter, ComboState, PhysicsConfig, PhysicsWorld,
    ScoreConfig, ScoreEngine, ScoreEvent, SemanticType,
};

const DT: f64 = 1.0 / 60.0;

fn weightless() -> PhysicsWorld {
    PhysicsWorld::new(PhysicsConfig {
        gravity: Vec3::ZERO,
        ..PhysicsConfig::default()
    })
}

/// Player box at the origin and a static sphere `gap` units ahead of its front face.
fn player_and_target(physics: &mut PhysicsWorld, gap: f32) -> (BodyId, BodyId) {
    let player = physics.create_box(
        Vec3::ZERO,
        Vec3::splat(0.5),
        1200.0,
        CollisionFilter::new(groups::VEHICLE, groups::ALL),
    );
    let target = physics.create_sphere(
        Vec3::new(1.0 + gap, 0.0, 0.0),
        0.5,
        0.0,
        CollisionFilter::new(groups::BUILDING, groups::ALL),
    );
    (player, target)
}

/// Keeps the player driving into +X, the way the vehicle controller does.
fn drive(physics: &mut PhysicsWorld, player: BodyId, speed: f32) {
    physics.set_velocity(player, Vec3::new(speed, 0.0, 0.0));
    physics.step(DT);
}

#[derive(Clone, Default)]
struct Recorder {
    hits: Rc<RefCell<Vec<(BodyId, f64)>>>,
}

impl CollisionConsumer for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_collision(&mut self, outcome: &CollisionOutcome, now: f64) -> anyhow::Result<()> {
        self.hits.borrow_mut().push((outcome.target, now));
        Ok(())
    }
}

struct Broken;

impl CollisionConsumer for Broken {
    fn on_collision(&mut self, _outcome: &CollisionOutcome, _now: f64) -> anyhow::Result<()> {
        anyhow::bail!("renderer went away")
    }
}

#[test]
fn sustained_contact_is_reported_once_per_cooldown() {
    let mut physics = weightless();
    let (player, target) = player_and_target(&mut physics, 0.3);

    let mut router = CollisionRouter::new(CollisionConfig::default());
    router.set_player(player);
    router.register(target, SemanticType::Building);
    let recorder = Recorder::default();
    router.add_consumer(Box::new(recorder.clone()));

    let mut now = 0.0;
    for _ in 0..90 {
        now += DT;
        drive(&mut physics, player, 10.0);
        router.route(physics.contacts(), &physics, now);
    }

    let hits = recorder.hits.borrow();
    assert_eq!(hits.len(), 2, "hits: {hits:?}");
    assert!(hits.iter().all(|(body, _)| *body == target));
    let gap = hits[1].1 - hits[0].1;
    assert!(gap >= 1.0 - 1e-9, "second hit only {gap}s after the first");
}

#[test]
fn slow_contacts_are_ignored() {
    let mut physics = weightless();
    let (player, target) = player_and_target(&mut physics, 0.0);
    let mut router = CollisionRouter::new(CollisionConfig::default());
    router.set_player(player);
    router.register(target, SemanticType::Building);

    let mut now = 0.0;
    for _ in 0..10 {
        now += DT;
        drive(&mut physics, player, 0.5);
        assert!(router.route(physics.contacts(), &physics, now).is_empty());
    }
}

#[test]
fn failing_consumer_does_not_block_others() {
    let mut physics = weightless();
    let (player, target) = player_and_target(&mut physics, 0.1);
    let mut router = CollisionRouter::new(CollisionConfig::default());
    router.set_player(player);
    router.register(target, SemanticType::Prop);

    let recorder = Recorder::default();
    router.add_consumer(Box::new(Broken));
    router.add_consumer(Box::new(recorder.clone()));

    let mut now = 0.0;
    let mut routed = 0;
    for _ in 0..20 {
        now += DT;
        drive(&mut physics, player, 8.0);
        routed += router.route(physics.contacts(), &physics, now).len();
    }

    assert_eq!(routed, 1);
    assert_eq!(recorder.hits.borrow().len(), 1);
}

#[test]
fn backing_away_from_a_touching_pedestrian_is_not_a_hit() {
    let mut physics = weightless();
    // Overlapping by 0.2 units
    let (player, target) = player_and_target(&mut physics, -0.2);
    let mut router = CollisionRouter::new(CollisionConfig::default());
    router.set_player(player);
    router.register(target, SemanticType::HumanAgent);
    let mut score = ScoreEngine::new(ScoreConfig::default());

    let mut now = 0.0;
    for _ in 0..10 {
        now += DT;
        drive(&mut physics, player, -3.0);
        for outcome in router.route(physics.contacts(), &physics, now) {
            score.record(&outcome, now);
        }
    }

    assert_eq!(score.score(), 0);
    assert!(score.drain_events().is_empty());
}

#[test]
fn sensor_contact_falls_back_to_midpoint() {
    let mut physics = weightless();
    let player = physics.create_box(
        Vec3::ZERO,
        Vec3::splat(0.5),
        1200.0,
        CollisionFilter::new(groups::VEHICLE, groups::ALL),
    );
    let pickup = physics.create_body(
        BodyDesc::fixed(ColliderShape::Sphere { radius: 0.5 }, Vec3::new(0.8, 0.0, 0.0))
            .with_filter(CollisionFilter::new(groups::PROP, groups::ALL))
            .sensor(),
    );

    let mut router = CollisionRouter::new(CollisionConfig::default());
    router.set_player(player);
    router.register(pickup, SemanticType::Prop);

    physics.set_velocity(player, Vec3::new(6.0, 0.0, 0.0));
    physics.step(DT);
    let contact = physics
        .contacts()
        .iter()
        .find(|c| c.other(player) == Some(pickup))
        .copied()
        .expect("sensor overlap reported");
    assert!(contact.geometry.is_none());

    let outcomes = router.route(physics.contacts(), &physics, DT);
    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.target, pickup);
    let expected = (contact.position_a + contact.position_b) * 0.5;
    assert!((outcome.point - expected).length() < 1e-5);
    assert_eq!(outcome.impact_speed, contact.impact_speed_or_relative());
    assert!(outcome.impact_speed > 5.0);
}

#[test]
fn unclassified_and_unknown_player_produce_nothing_scored() {
    let mut physics = weightless();
    let (player, _target) = player_and_target(&mut physics, 0.1);

    // No player registered yet: nothing routes.
    let mut router = CollisionRouter::new(CollisionConfig::default());
    drive(&mut physics, player, 8.0);
    drive(&mut physics, player, 8.0);
    assert!(router.route(physics.contacts(), &physics, 2.0 * DT).is_empty());

    // Registered player, untagged target: routed as Unclassified, never scored.
    router.set_player(player);
    let mut score = ScoreEngine::new(ScoreConfig::default());
    let mut now = 2.0 * DT;
    for _ in 0..10 {
        now += DT;
        drive(&mut physics, player, 8.0);
        for outcome in router.route(physics.contacts(), &physics, now) {
            assert_eq!(outcome.semantic_type, SemanticType::Unclassified);
            score.record(&outcome, now);
        }
    }
    assert_eq!(score.score(), 0);
}

// ---------------------------------------------------------------------------
// Scoring rules
// ---------------------------------------------------------------------------

fn outcome(target: BodyId, semantic_type: SemanticType, impact_speed: f32) -> CollisionOutcome {
    CollisionOutcome {
        target,
        semantic_type,
        render_handle: None,
        point: Vec3::new(1.0, 0.0, 2.0),
        impact_speed,
        vehicle_velocity: Vec3::new(0.0, 0.0, impact_speed),
    }
}

fn bodies(n: usize) -> Vec<BodyId> {
    let mut physics = weightless();
    (0..n)
        .map(|i| {
            physics.create_sphere(
                Vec3::new(i as f32 * 10.0, 0.0, 0.0),
                0.3,
                70.0,
                CollisionFilter::default(),
            )
        })
        .collect()
}

#[test]
fn human_hit_score_is_deterministic() {
    let targets = bodies(1);
    let mut a = ScoreEngine::new(ScoreConfig::default());
    let mut b = ScoreEngine::new(ScoreConfig::default());
    a.record(&outcome(targets[0], SemanticType::HumanAgent, 10.0), 1.0);
    b.record(&outcome(targets[0], SemanticType::HumanAgent, 10.0), 1.0);
    assert_eq!(a.score(), 200);
    assert_eq!(a.score(), b.score());
}

#[test]
fn third_consecutive_hit_starts_combo() {
    let targets = bodies(3);
    let mut score = ScoreEngine::new(ScoreConfig::default());

    let mut deltas = Vec::new();
    for (i, target) in targets.iter().enumerate() {
        score.record(&outcome(*target, SemanticType::HumanAgent, 5.0), 1.0 + i as f64);
        for event in score.drain_events() {
            if let ScoreEvent::ScoreChanged { delta, .. } = event {
                deltas.push(delta);
            }
        }
    }

    assert_eq!(deltas, vec![100, 100, 150]);
    assert_eq!(score.state(), ComboState::ComboActive);
    assert_eq!(score.combo_count(), 3);
}

#[test]
fn animal_hit_costs_points_and_ends_combo() {
    let targets = bodies(6);
    let mut score = ScoreEngine::new(ScoreConfig::default());
    for (i, target) in targets[..4].iter().enumerate() {
        score.record(&outcome(*target, SemanticType::HumanAgent, 5.0), i as f64);
    }
    assert_eq!(score.combo_count(), 4);
    assert_eq!(score.score(), 100 + 100 + 150 + 200);
    score.drain_events();

    score.record(&outcome(targets[4], SemanticType::AnimalAgent, 12.0), 4.0);
    let events = score.drain_events();
    assert_eq!(score.score(), 550 - 200);
    assert_eq!(score.combo_count(), 0);
    assert_eq!(score.state(), ComboState::Idle);
    assert!(events.contains(&ScoreEvent::ComboEnded));

    // Next pedestrian starts over at counter 1, no multiplier.
    score.record(&outcome(targets[5], SemanticType::HumanAgent, 5.0), 4.5);
    assert_eq!(score.combo_count(), 1);
    assert_eq!(score.score(), 350 + 100);
}

#[test]
fn combo_decays_after_quiet_window() {
    let targets = bodies(3);
    let mut score = ScoreEngine::new(ScoreConfig::default());
    for (i, target) in targets.iter().enumerate() {
        score.record(&outcome(*target, SemanticType::HumanAgent, 5.0), 10.0 + i as f64 * 0.5);
    }
    score.drain_events();

    // Last hit at 11.0; the window is inclusive.
    score.update(16.0);
    assert_eq!(score.state(), ComboState::ComboActive, "window not yet elapsed");

    score.update(16.01);
    assert_eq!(score.state(), ComboState::Idle);
    assert_eq!(score.combo_count(), 0);
    assert_eq!(score.drain_events(), vec![ScoreEvent::ComboEnded]);
    assert_eq!(score.score(), 350);
}

#[test]
fn routed_human_hit_scores_through_the_engine() {
    let mut physics = weightless();
    let (player, target) = player_and_target(&mut physics, 0.1);
    let mut router = CollisionRouter::new(CollisionConfig::default());
    router.set_player(player);
    router.register(target, SemanticType::HumanAgent);
    let mut score = ScoreEngine::new(ScoreConfig::default());

    let mut now = 0.0;
    for _ in 0..30 {
        now += DT;
        drive(&mut physics, player, 20.0);
        for outcome in router.route(physics.contacts(), &physics, now) {
            score.record(&outcome, now);
        }
    }

    // 20 units/s saturates the 3x speed multiplier.
    assert_eq!(score.score(), 300);
}
