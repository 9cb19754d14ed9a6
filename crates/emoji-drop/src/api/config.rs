use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::error::ConfigError;
use crate::components::particle::Trajectory;

/// Engine configuration, provided by the host once per session.
///
/// All motion quantities are expressed per simulation tick (positions in
/// world units, velocities in units/tick, gravity in units/tick²).
/// World coordinates are Y-down: larger `y` is lower on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds per simulation tick (default: 1/60).
    pub fixed_dt: f32,
    /// Maximum ticks run for a single long frame (default: 10).
    pub max_catch_up_ticks: u32,
    /// World width in world units.
    pub world_width: f32,
    /// World height in world units.
    pub world_height: f32,
    /// The receptacle particles fly toward.
    pub anchor: [f32; 2],
    /// Offset of the launch region's center from the anchor.
    pub launch_offset: [f32; 2],
    /// Half-extents of the launch region.
    pub launch_spread: [f32; 2],
    /// Half-extents of the resting (scatter) region around the anchor.
    pub scatter: [f32; 2],
    /// Maximum particles admitted from the queue per tick.
    pub admission_cap: usize,
    /// Maximum simultaneously live particles.
    pub population_ceiling: usize,
    /// Ingestion queue length beyond which the oldest events are discarded.
    pub queue_bound: usize,
    /// Ticks from launch to landing.
    pub flight_ticks: u32,
    /// Downward acceleration in units/tick².
    pub gravity: f32,
    /// Fraction of the remaining scale gap closed per tick while spawning.
    pub spawn_rate: f32,
    /// Resting scale of every particle.
    pub target_scale: f32,
    /// Maximum in-flight spin in radians/tick (sampled in ±max_spin).
    pub max_spin: f32,
    /// Maximum settle tilt in radians (sampled in ±settle_tilt on landing).
    pub settle_tilt: f32,
    /// Scale multipliers (x, y) applied at impact, relative to target scale.
    pub squash: [f32; 2],
    /// Spring stiffness of the landing squash.
    pub spring_stiffness: f32,
    /// Spring velocity retained per tick during the landing squash.
    pub spring_damping: f32,
    /// Rasterization size of a glyph in pixels.
    pub glyph_size: f32,
    /// Glyph atlas grid columns.
    pub atlas_cols: u32,
    /// Glyph atlas grid rows.
    pub atlas_rows: u32,
    /// Glyph shown once a particle lands.
    pub settled_glyph: String,
    /// Glyph shown when a character cannot be rasterized.
    pub placeholder_glyph: String,
    /// Longest accepted token, in characters.
    pub max_token_chars: usize,
    /// Sparks emitted per landing (0 disables landing bursts).
    pub burst_sparks: u32,
    /// Spark lifetime in ticks.
    pub spark_lifetime_ticks: u32,
    /// Maximum simultaneously live sparks.
    pub max_sparks: usize,
    /// Maximum host events reported per tick.
    pub max_events: usize,
    /// RNG seed for launch/rest sampling and spin.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_catch_up_ticks: 10,
            world_width: 800.0,
            world_height: 600.0,
            anchor: [400.0, 470.0],
            launch_offset: [0.0, 60.0],
            launch_spread: [140.0, 20.0],
            scatter: [80.0, 24.0],
            admission_cap: 4,
            population_ceiling: 300,
            queue_bound: 300,
            flight_ticks: 60,
            gravity: 0.5,
            spawn_rate: 0.15,
            target_scale: 1.0,
            max_spin: 0.12,
            settle_tilt: 0.25,
            squash: [1.4, 0.6],
            spring_stiffness: 0.25,
            spring_damping: 0.75,
            glyph_size: 48.0,
            atlas_cols: 16,
            atlas_rows: 16,
            settled_glyph: "\u{2764}\u{fe0f}".to_string(),
            placeholder_glyph: "\u{2753}".to_string(),
            max_token_chars: 5,
            burst_sparks: 6,
            spark_lifetime_ticks: 24,
            max_sparks: 256,
            max_events: 32,
            seed: 42,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    // -- Builder pattern --

    pub fn with_admission_cap(mut self, cap: usize) -> Self {
        self.admission_cap = cap;
        self
    }

    pub fn with_population_ceiling(mut self, ceiling: usize) -> Self {
        self.population_ceiling = ceiling;
        self
    }

    pub fn with_queue_bound(mut self, bound: usize) -> Self {
        self.queue_bound = bound;
        self
    }

    pub fn with_flight(mut self, ticks: u32, gravity: f32) -> Self {
        self.flight_ticks = ticks;
        self.gravity = gravity;
        self
    }

    pub fn with_anchor(mut self, anchor: Vec2) -> Self {
        self.anchor = anchor.to_array();
        self
    }

    pub fn with_scatter(mut self, half_extents: Vec2) -> Self {
        self.scatter = half_extents.to_array();
        self
    }

    pub fn with_spring(mut self, stiffness: f32, damping: f32) -> Self {
        self.spring_stiffness = stiffness;
        self.spring_damping = damping;
        self
    }

    pub fn with_bursts(mut self, sparks: u32, lifetime_ticks: u32) -> Self {
        self.burst_sparks = sparks;
        self.spark_lifetime_ticks = lifetime_ticks;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn anchor_vec(&self) -> Vec2 {
        Vec2::from_array(self.anchor)
    }

    /// Total glyph cells available in the atlas.
    pub fn atlas_capacity(&self) -> u32 {
        self.atlas_cols.saturating_mul(self.atlas_rows)
    }

    /// Reject degenerate configurations before any particle exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flight_ticks == 0 {
            return Err(ConfigError::ZeroFlightDuration);
        }

        let floats = [
            ("fixed_dt", self.fixed_dt),
            ("world_width", self.world_width),
            ("world_height", self.world_height),
            ("anchor.x", self.anchor[0]),
            ("anchor.y", self.anchor[1]),
            ("launch_offset.x", self.launch_offset[0]),
            ("launch_offset.y", self.launch_offset[1]),
            ("launch_spread.x", self.launch_spread[0]),
            ("launch_spread.y", self.launch_spread[1]),
            ("scatter.x", self.scatter[0]),
            ("scatter.y", self.scatter[1]),
            ("gravity", self.gravity),
            ("spawn_rate", self.spawn_rate),
            ("target_scale", self.target_scale),
            ("max_spin", self.max_spin),
            ("settle_tilt", self.settle_tilt),
            ("squash.x", self.squash[0]),
            ("squash.y", self.squash[1]),
            ("spring_stiffness", self.spring_stiffness),
            ("spring_damping", self.spring_damping),
            ("glyph_size", self.glyph_size),
        ];
        for (field, value) in floats {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }

        let counts = [
            ("max_catch_up_ticks", self.max_catch_up_ticks as usize),
            ("admission_cap", self.admission_cap),
            ("population_ceiling", self.population_ceiling),
            ("queue_bound", self.queue_bound),
            ("atlas_cols", self.atlas_cols as usize),
            ("atlas_rows", self.atlas_rows as usize),
            ("max_token_chars", self.max_token_chars),
            ("max_events", self.max_events),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::ZeroCapacity { field });
            }
        }

        positive("fixed_dt", self.fixed_dt)?;
        positive("target_scale", self.target_scale)?;
        positive("glyph_size", self.glyph_size)?;
        positive("squash.x", self.squash[0])?;
        positive("squash.y", self.squash[1])?;
        non_negative("gravity", self.gravity)?;
        non_negative("max_spin", self.max_spin)?;
        non_negative("settle_tilt", self.settle_tilt)?;
        for (field, value) in [
            ("launch_spread.x", self.launch_spread[0]),
            ("launch_spread.y", self.launch_spread[1]),
            ("scatter.x", self.scatter[0]),
            ("scatter.y", self.scatter[1]),
        ] {
            non_negative(field, value)?;
        }

        if !(self.spawn_rate > 0.0 && self.spawn_rate <= 1.0) {
            return Err(out_of_range("spawn_rate", self.spawn_rate, "(0, 1]"));
        }
        if !(self.spring_stiffness > 0.0 && self.spring_stiffness <= 1.0) {
            return Err(out_of_range("spring_stiffness", self.spring_stiffness, "(0, 1]"));
        }
        // At zero damping the spring never moves off the impact squash.
        if !(self.spring_damping > 0.0 && self.spring_damping < 1.0) {
            return Err(out_of_range("spring_damping", self.spring_damping, "(0, 1)"));
        }

        // Placeholder and settled glyph each reserve one cell.
        if self.atlas_capacity() < 2 {
            return Err(out_of_range(
                "atlas_cols * atlas_rows",
                self.atlas_capacity() as f32,
                "[2, u32::MAX]",
            ));
        }
        if self.settled_glyph.trim().is_empty() {
            return Err(ConfigError::EmptyGlyph { field: "settled_glyph" });
        }
        if self.placeholder_glyph.trim().is_empty() {
            return Err(ConfigError::EmptyGlyph { field: "placeholder_glyph" });
        }

        self.check_worst_case_trajectory()
    }

    /// The farthest launch/rest pair must still yield a finite launch velocity.
    fn check_worst_case_trajectory(&self) -> Result<(), ConfigError> {
        let offset = Vec2::from_array(self.launch_offset).abs();
        let reach = offset + Vec2::from_array(self.launch_spread) + Vec2::from_array(self.scatter);
        for corner in [reach, -reach, Vec2::new(reach.x, -reach.y), Vec2::new(-reach.x, reach.y)] {
            let t = Trajectory::solve(Vec2::ZERO, corner, self.flight_ticks, self.gravity)
                .ok_or(ConfigError::DegenerateTrajectory)?;
            if !t.launch_velocity.is_finite() || !t.peak_speed().is_finite() {
                return Err(ConfigError::DegenerateTrajectory);
            }
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str, value: f32, range: &'static str) -> ConfigError {
    ConfigError::OutOfRange { field, value, range }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, "(0, inf)"))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, "[0, inf)"))
    }
}
