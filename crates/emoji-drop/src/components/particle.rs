//! Particle record and its ballistic trajectory.

use std::rc::Rc;

use glam::Vec2;

use crate::api::types::ParticleId;
use crate::assets::glyph_cache::Glyph;
use crate::systems::depth::DepthKey;

/// Lifecycle of a particle. Each variant carries only the state it needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lifecycle {
    /// Flying while the scale is still ramping up from zero.
    Spawning,
    /// Flying at full scale.
    Flying,
    /// At rest, scale springing back from the impact squash.
    LandingSquash { spring_velocity: f32 },
    /// Terminal. No further physics.
    Landed,
}

impl Lifecycle {
    /// Still integrating ballistic motion.
    pub fn is_airborne(&self) -> bool {
        matches!(self, Lifecycle::Spawning | Lifecycle::Flying)
    }

    /// Part of the depth-sorted pile.
    pub fn is_grounded(&self) -> bool {
        !self.is_airborne()
    }
}

/// Launch solution for a flight of a fixed number of ticks under constant gravity.
///
/// The integrator is semi-implicit Euler (`v += g; p += v`), so after `n` ticks
/// `p(n) = p0 + n·v0 + g·n(n+1)/2`. Solving that for `v0` lands the particle on
/// its resting point exactly at tick `ticks`, without tuning per variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trajectory {
    pub launch: Vec2,
    pub rest: Vec2,
    pub launch_velocity: Vec2,
    pub gravity: f32,
    pub ticks: u32,
}

impl Trajectory {
    /// Returns `None` for a zero-tick flight or a non-finite solution.
    pub fn solve(launch: Vec2, rest: Vec2, ticks: u32, gravity: f32) -> Option<Self> {
        if ticks == 0 {
            return None;
        }
        let n = ticks as f32;
        let d = rest - launch;
        let launch_velocity = Vec2::new(d.x / n, (d.y - gravity * n * (n + 1.0) * 0.5) / n);
        if !launch_velocity.is_finite() {
            return None;
        }
        Some(Self {
            launch,
            rest,
            launch_velocity,
            gravity,
            ticks,
        })
    }

    /// Closed-form position after `tick` integration steps.
    pub fn position_at(&self, tick: u32) -> Vec2 {
        let n = tick as f32;
        self.launch
            + self.launch_velocity * n
            + Vec2::new(0.0, self.gravity * n * (n + 1.0) * 0.5)
    }

    /// Velocity after `tick` integration steps.
    pub fn velocity_at(&self, tick: u32) -> Vec2 {
        self.launch_velocity + Vec2::new(0.0, self.gravity * tick as f32)
    }

    /// Fastest speed reached during the flight (at launch or at touchdown).
    pub fn peak_speed(&self) -> f32 {
        self.launch_velocity
            .length()
            .max(self.velocity_at(self.ticks).length())
    }
}

/// One emoji on stage, from launch to its place in the pile.
#[derive(Debug, Clone)]
pub struct Particle {
    pub id: ParticleId,
    /// Glyph drawn for this particle; swapped to the settled glyph on landing.
    pub glyph: Rc<Glyph>,
    pub pos: Vec2,
    pub velocity: Vec2,
    /// Horizontal and vertical scale (they differ only while squashing).
    pub scale: Vec2,
    /// Rotation in radians.
    pub rotation: f32,
    /// Rotation speed in radians/tick while airborne.
    pub spin: f32,
    pub gravity: f32,
    pub target_scale: f32,
    pub lifecycle: Lifecycle,
    /// Ticks spent airborne.
    pub age: u32,
    flight_ticks: u32,
    final_pos: Vec2,
    depth: Option<DepthKey>,
}

impl Particle {
    /// Create a particle at the start of `trajectory`, scale zero, `Spawning`.
    pub fn launch(
        id: ParticleId,
        glyph: Rc<Glyph>,
        trajectory: &Trajectory,
        target_scale: f32,
        spin: f32,
    ) -> Self {
        Self {
            id,
            glyph,
            pos: trajectory.launch,
            velocity: trajectory.launch_velocity,
            scale: Vec2::ZERO,
            rotation: 0.0,
            spin,
            gravity: trajectory.gravity,
            target_scale,
            lifecycle: Lifecycle::Spawning,
            age: 0,
            flight_ticks: trajectory.ticks,
            final_pos: trajectory.rest,
            depth: None,
        }
    }

    /// Resting position, fixed at creation.
    pub fn final_pos(&self) -> Vec2 {
        self.final_pos
    }

    pub fn flight_ticks(&self) -> u32 {
        self.flight_ticks
    }

    /// Draw-order key; `None` until the particle lands.
    pub fn depth(&self) -> Option<DepthKey> {
        self.depth
    }

    /// Snap onto the resting point and commit the depth key.
    pub(crate) fn touch_down(&mut self) -> DepthKey {
        self.pos = self.final_pos;
        self.velocity = Vec2::ZERO;
        let key = DepthKey::from_rest(self.final_pos);
        self.depth = Some(key);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trajectory_hits_rest_at_flight_duration() {
        let t = Trajectory::solve(Vec2::ZERO, Vec2::new(100.0, 50.0), 60, 0.5).unwrap();
        let end = t.position_at(60);
        assert!((end - Vec2::new(100.0, 50.0)).length() < 1e-3, "end = {end:?}");
    }

    #[test]
    fn trajectory_rest_above_launch_is_finite() {
        let t = Trajectory::solve(Vec2::new(0.0, 200.0), Vec2::new(-30.0, 0.0), 45, 0.5).unwrap();
        assert!(t.launch_velocity.is_finite());
        assert!(t.launch_velocity.y < 0.0, "must launch upward");
        assert!((t.position_at(45) - t.rest).length() < 1e-3);
    }

    #[test]
    fn zero_duration_has_no_solution() {
        assert!(Trajectory::solve(Vec2::ZERO, Vec2::ONE, 0, 0.5).is_none());
    }

    #[test]
    fn zero_gravity_is_straight_line() {
        let t = Trajectory::solve(Vec2::ZERO, Vec2::new(60.0, 30.0), 30, 0.0).unwrap();
        assert_eq!(t.launch_velocity, Vec2::new(2.0, 1.0));
        assert_eq!(t.velocity_at(30), t.launch_velocity);
    }

    #[test]
    fn lifecycle_grouping() {
        assert!(Lifecycle::Spawning.is_airborne());
        assert!(Lifecycle::Flying.is_airborne());
        assert!(Lifecycle::LandingSquash { spring_velocity: 0.0 }.is_grounded());
        assert!(Lifecycle::Landed.is_grounded());
    }
}
