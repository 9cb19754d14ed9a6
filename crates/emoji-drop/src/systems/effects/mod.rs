//! Transient landing effects.
//!
//! Sparks are cosmetic and independent of the particle pool: they have their
//! own ceiling and never affect eviction or depth order.

mod rng;
mod spark;

pub use rng::Rng;
pub use spark::Spark;

use std::collections::VecDeque;

use glam::Vec2;

/// All live sparks, oldest first.
pub struct SparkField {
    sparks: VecDeque<Spark>,
    max_sparks: usize,
    per_burst: u32,
    lifetime: u32,
}

impl SparkField {
    pub fn new(max_sparks: usize, per_burst: u32, lifetime: u32) -> Self {
        SparkField {
            sparks: VecDeque::with_capacity(max_sparks.min(1024)),
            max_sparks,
            per_burst,
            lifetime,
        }
    }

    /// Throw a ring of sparks from `center`, evicting the oldest sparks past the ceiling.
    pub fn burst(&mut self, center: Vec2, rng: &mut Rng) {
        if self.lifetime == 0 || self.max_sparks == 0 {
            return;
        }
        for _ in 0..self.per_burst {
            let angle = rng.range(std::f32::consts::PI, std::f32::consts::TAU);
            let speed = rng.range(1.5, 4.0);
            self.sparks.push_back(Spark::new(
                center,
                Vec2::from_angle(angle) * speed,
                self.lifetime,
            ));
        }
        while self.sparks.len() > self.max_sparks {
            self.sparks.pop_front();
        }
    }

    pub fn tick(&mut self) {
        self.sparks.retain_mut(Spark::tick);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Spark> {
        self.sparks.iter()
    }

    pub fn len(&self) -> usize {
        self.sparks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sparks.is_empty()
    }

    pub fn clear(&mut self) {
        self.sparks.clear();
    }
}
