use glam::Vec2;

use crate::api::config::EngineConfig;
use crate::systems::effects::Rng;

/// The receptacle every particle flies toward, with the regions particles
/// launch from and come to rest in.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAnchor {
    pub position: Vec2,
    /// Center of the launch region, relative to `position`.
    pub launch_offset: Vec2,
    /// Half-extents of the launch region.
    pub launch_spread: Vec2,
    /// Half-extents of the resting region, centered on `position`.
    pub scatter: Vec2,
}

impl TargetAnchor {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            launch_offset: Vec2::ZERO,
            launch_spread: Vec2::ZERO,
            scatter: Vec2::ZERO,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            position: config.anchor_vec(),
            launch_offset: Vec2::from_array(config.launch_offset),
            launch_spread: Vec2::from_array(config.launch_spread),
            scatter: Vec2::from_array(config.scatter),
        }
    }

    pub fn with_launch(mut self, offset: Vec2, spread: Vec2) -> Self {
        self.launch_offset = offset;
        self.launch_spread = spread;
        self
    }

    pub fn with_scatter(mut self, scatter: Vec2) -> Self {
        self.scatter = scatter;
        self
    }

    pub fn sample_launch(&self, rng: &mut Rng) -> Vec2 {
        self.position
            + self.launch_offset
            + Vec2::new(
                rng.symmetric(self.launch_spread.x),
                rng.symmetric(self.launch_spread.y),
            )
    }

    pub fn sample_rest(&self, rng: &mut Rng) -> Vec2 {
        self.position + Vec2::new(rng.symmetric(self.scatter.x), rng.symmetric(self.scatter.y))
    }

    /// Whether `point` lies inside the resting region (inclusive).
    pub fn in_pile(&self, point: Vec2) -> bool {
        let d = (point - self.position).abs();
        d.x <= self.scatter.x && d.y <= self.scatter.y
    }
}
