use std::sync::Arc;

use anyhow::Context;
use glam::Vec3;
use skid::{
    AudioSink, ControlState, EffectKind, EffectSink, ScoreEvent, SimCollaborators, SimConfig,
    Simulation, SoundCategory, UniformZone, Zone,
};

const TICK: f64 = 1.0 / 60.0;
const TICKS: u32 = 60 * 90;

/// Effect sink that only logs what a renderer would draw.
struct LogEffects;

impl EffectSink for LogEffects {
    fn spawn_effect(&self, kind: EffectKind, point: Vec3, _direction: Vec3, intensity: f32) {
        log::debug!("effect {kind:?} at {point} ({intensity:.2})");
    }
}

/// Audio sink that only logs what a mixer would play.
struct LogAudio;

impl AudioSink for LogAudio {
    fn play(&self, category: SoundCategory, name: &str, volume: Option<f32>) {
        log::debug!("sound {category:?}/{name} volume {volume:?}");
    }
}

/// Scripted driver: straight run, a long left arc, a handbrake slide, then reverse.
fn controls_at(tick: u32) -> ControlState {
    let seconds = tick as f64 * TICK;
    let mut controls = ControlState::default();
    match seconds {
        s if s < 20.0 => controls.forward = true,
        s if s < 50.0 => {
            controls.forward = true;
            controls.left = true;
        }
        s if s < 52.0 => {
            controls.handbrake = true;
            controls.right = true;
        }
        s if s < 60.0 => controls.brake = true,
        s if s < 70.0 => controls.backward = true,
        _ => {}
    }
    controls
}

fn load_config() -> anyhow::Result<SimConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(SimConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    SimConfig::from_json_str(&text).with_context(|| format!("loading {path}"))
}

fn build_city(sim: &mut Simulation) {
    for gx in -4..=4 {
        for gz in -4..=4 {
            if gx == 0 {
                continue;
            }
            let center = Vec3::new(gx as f32 * 30.0, 5.0, gz as f32 * 30.0);
            sim.add_building(center, Vec3::new(6.0, 5.0, 6.0));
        }
    }
    for i in 0..12 {
        let z = 20.0 + i as f32 * 15.0;
        sim.add_prop(Vec3::new(1.5, 0.5, z), Vec3::splat(0.5), 25.0);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = load_config()?;
    let collaborators = SimCollaborators {
        effects: Arc::new(LogEffects),
        audio: Arc::new(LogAudio),
        zones: Arc::new(UniformZone(Zone::Urban)),
    };
    let mut sim = Simulation::new(config, collaborators)?;
    build_city(&mut sim);

    for tick in 0..TICKS {
        sim.tick(TICK, &controls_at(tick));

        for event in sim.drain_score_events() {
            match event {
                ScoreEvent::ScoreChanged { delta, total, .. } => {
                    log::info!("[{:6.2}s] score {delta:+} -> {total}", sim.now());
                }
                ScoreEvent::ComboChanged { count, multiplier } => {
                    log::info!("[{:6.2}s] combo x{count} ({multiplier:.1})", sim.now());
                }
                ScoreEvent::ComboEnded => log::info!("[{:6.2}s] combo ended", sim.now()),
                ScoreEvent::Impact { .. } => {}
            }
        }

        if tick % 600 == 0 {
            let markers = sim.agent_markers();
            log::info!(
                "[{:6.2}s] player at {} speed {:.1}, {} agents",
                sim.now(),
                sim.player_position(),
                sim.player_speed(),
                markers.len()
            );
        }
    }

    log::info!("final score {}", sim.score());
    sim.stop();
    Ok(())
}
