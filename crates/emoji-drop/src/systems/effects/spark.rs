//! Short-lived sparks thrown off by a landing.

use glam::Vec2;

/// A single spark with simple drag-and-gravity physics.
#[derive(Debug, Clone)]
pub struct Spark {
    pub pos: Vec2,
    pub velocity: Vec2,
    /// Ticks left to live.
    pub remaining: u32,
    /// Ticks the spark was born with.
    pub lifetime: u32,
    pub drag: f32,
    pub gravity: f32,
}

impl Spark {
    pub const DEFAULT_DRAG: f32 = 0.08;
    pub const DEFAULT_GRAVITY: f32 = 0.15;

    pub fn new(pos: Vec2, velocity: Vec2, lifetime: u32) -> Self {
        Spark {
            pos,
            velocity,
            remaining: lifetime,
            lifetime,
            drag: Self::DEFAULT_DRAG,
            gravity: Self::DEFAULT_GRAVITY,
        }
    }

    /// Advance one tick. Returns false once expired.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.velocity.y += self.gravity;
        self.velocity *= 1.0 - self.drag;
        self.pos += self.velocity;
        self.remaining > 0
    }

    /// Fades linearly from 1 to 0 over the lifetime.
    pub fn alpha(&self) -> f32 {
        if self.lifetime == 0 {
            0.0
        } else {
            self.remaining as f32 / self.lifetime as f32
        }
    }
}
