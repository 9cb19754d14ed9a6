//! Per-tick particle update: scale-in, ballistic flight, squash landing, settle.

use std::rc::Rc;

use glam::Vec2;

use crate::api::config::EngineConfig;
use crate::assets::glyph_cache::Glyph;
use crate::components::particle::{Lifecycle, Particle};
use crate::systems::depth::DepthKey;
use crate::systems::effects::Rng;

/// Scale error and spring velocity below which motion is considered finished.
pub const SETTLE_EPSILON: f32 = 1e-3;

/// Horizontal squash never drops below this fraction of the target scale,
/// which keeps the derived vertical scale finite.
const MIN_SQUASH_FRACTION: f32 = 0.05;

/// Tunables for the per-particle update, taken from the engine config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub spawn_rate: f32,
    pub spring_stiffness: f32,
    pub spring_damping: f32,
    /// Impact scale (x, y) as multiples of the target scale.
    pub squash: Vec2,
    pub settle_tilt: f32,
}

impl SimParams {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            spawn_rate: config.spawn_rate,
            spring_stiffness: config.spring_stiffness,
            spring_damping: config.spring_damping,
            squash: Vec2::from_array(config.squash),
            settle_tilt: config.settle_tilt,
        }
    }
}

impl Default for SimParams {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// What happened to a particle during one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Still moving, no transition.
    Moving,
    /// Entered `LandingSquash`; its depth key is now committed.
    TouchedDown(DepthKey),
    /// Entered `Landed`.
    Settled,
    /// Already `Landed`; nothing to do.
    Idle,
}

/// Advance one particle by one tick.
pub fn step_particle(
    p: &mut Particle,
    params: &SimParams,
    settled_glyph: &Rc<Glyph>,
    rng: &mut Rng,
) -> StepOutcome {
    match p.lifecycle {
        Lifecycle::Spawning | Lifecycle::Flying => {
            if p.lifecycle == Lifecycle::Spawning {
                grow(p, params.spawn_rate);
            }
            p.velocity.y += p.gravity;
            p.pos += p.velocity;
            p.rotation += p.spin;
            p.age += 1;

            // Require downward motion so the rising part of the arc never lands.
            let reached = p.pos.y >= p.final_pos().y && p.velocity.y > 0.0;
            if reached || p.age >= p.flight_ticks() {
                StepOutcome::TouchedDown(touch_down(p, params, settled_glyph, rng))
            } else {
                StepOutcome::Moving
            }
        }
        Lifecycle::LandingSquash { spring_velocity } => {
            let target = p.target_scale;
            let mut v = spring_velocity + (target - p.scale.x) * params.spring_stiffness;
            v *= params.spring_damping;
            let sx = (p.scale.x + v).max(target * MIN_SQUASH_FRACTION);

            if (target - sx).abs() < SETTLE_EPSILON && v.abs() < SETTLE_EPSILON {
                p.scale = Vec2::splat(target);
                p.lifecycle = Lifecycle::Landed;
                StepOutcome::Settled
            } else {
                // Area-preserving: sx * sy stays at target².
                p.scale = Vec2::new(sx, target * target / sx);
                p.lifecycle = Lifecycle::LandingSquash { spring_velocity: v };
                StepOutcome::Moving
            }
        }
        Lifecycle::Landed => StepOutcome::Idle,
    }
}

fn grow(p: &mut Particle, rate: f32) {
    let target = p.target_scale;
    let s = p.scale.x + (target - p.scale.x) * rate;
    if (target - s).abs() < SETTLE_EPSILON {
        p.scale = Vec2::splat(target);
        p.lifecycle = Lifecycle::Flying;
    } else {
        p.scale = Vec2::splat(s);
    }
}

fn touch_down(
    p: &mut Particle,
    params: &SimParams,
    settled_glyph: &Rc<Glyph>,
    rng: &mut Rng,
) -> DepthKey {
    let key = p.touch_down();
    p.rotation = rng.symmetric(params.settle_tilt);
    p.scale = params.squash * p.target_scale;
    p.glyph = Rc::clone(settled_glyph);
    p.lifecycle = Lifecycle::LandingSquash { spring_velocity: 0.0 };
    key
}
