use std::collections::VecDeque;

use crate::api::types::ParticleId;
use crate::components::particle::{Lifecycle, Particle};

/// Live particles in creation order, capped at a fixed ceiling.
///
/// Ids are handed out monotonically and particles are only ever appended,
/// so the front of the deque is always the oldest particle and lookups by id
/// are a binary search.
pub struct ParticlePool {
    particles: VecDeque<Particle>,
    ceiling: usize,
    next_id: u64,
}

impl ParticlePool {
    pub fn new(ceiling: usize) -> Self {
        Self {
            // Admission can briefly overshoot the ceiling within a tick.
            particles: VecDeque::with_capacity(ceiling.saturating_add(16).min(4096)),
            ceiling,
            next_id: 1,
        }
    }

    /// Generate the next unique particle id.
    pub fn next_id(&mut self) -> ParticleId {
        let id = ParticleId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a particle. Its id must come from `next_id`.
    pub fn insert(&mut self, particle: Particle) {
        debug_assert!(
            self.particles.back().map_or(true, |last| last.id < particle.id),
            "particles must be inserted in creation order"
        );
        self.particles.push_back(particle);
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.particles
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|idx| &self.particles[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.particles.iter_mut()
    }

    /// Evict the oldest particles, whatever their state, until at or under the
    /// ceiling. Returns the id of the newest evicted particle, if any, and how
    /// many were evicted. Evicted particles drop their glyph handles here.
    pub fn evict_overflow(&mut self) -> Option<(ParticleId, usize)> {
        let mut newest = None;
        let mut count = 0;
        while self.particles.len() > self.ceiling {
            match self.particles.pop_front() {
                Some(p) => {
                    newest = Some(p.id);
                    count += 1;
                }
                None => break,
            }
        }
        newest.map(|id| (id, count))
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Count particles whose lifecycle matches `pred`.
    pub fn count_where(&self, pred: impl Fn(&Lifecycle) -> bool) -> usize {
        self.particles.iter().filter(|p| pred(&p.lifecycle)).count()
    }

    /// Remove every particle. Returns how many were released.
    pub fn clear(&mut self) -> usize {
        let released = self.particles.len();
        self.particles.clear();
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::GlyphId;
    use crate::assets::glyph_cache::{AtlasCell, Glyph};
    use crate::components::particle::Trajectory;
    use glam::Vec2;
    use std::rc::Rc;

    fn spawn(pool: &mut ParticlePool, glyph: &Rc<Glyph>) -> ParticleId {
        let id = pool.next_id();
        let t = Trajectory::solve(Vec2::ZERO, Vec2::new(1.0, 1.0), 10, 0.5).unwrap();
        pool.insert(Particle::launch(id, Rc::clone(glyph), &t, 1.0, 0.0));
        id
    }

    fn glyph() -> Rc<Glyph> {
        Rc::new(Glyph {
            id: GlyphId(2),
            text: "🐱".into(),
            cell: AtlasCell::default(),
            fallback: false,
        })
    }

    #[test]
    fn ids_are_monotonic() {
        let mut pool = ParticlePool::new(10);
        let a = pool.next_id();
        let b = pool.next_id();
        assert!(a < b);
    }

    #[test]
    fn evicts_oldest_first() {
        let g = glyph();
        let mut pool = ParticlePool::new(3);
        let ids: Vec<_> = (0..5).map(|_| spawn(&mut pool, &g)).collect();
        assert_eq!(pool.evict_overflow(), Some((ids[1], 2)));
        assert_eq!(pool.len(), 3);
        assert!(pool.get(ids[0]).is_none());
        assert!(pool.get(ids[2]).is_some());
        assert_eq!(pool.evict_overflow(), None);
    }

    #[test]
    fn eviction_releases_glyph_handles() {
        let g = glyph();
        let mut pool = ParticlePool::new(1);
        spawn(&mut pool, &g);
        spawn(&mut pool, &g);
        assert_eq!(Rc::strong_count(&g), 3);
        pool.evict_overflow();
        assert_eq!(Rc::strong_count(&g), 2);
        pool.clear();
        assert_eq!(Rc::strong_count(&g), 1);
    }

    #[test]
    fn get_finds_by_id() {
        let g = glyph();
        let mut pool = ParticlePool::new(8);
        let ids: Vec<_> = (0..6).map(|_| spawn(&mut pool, &g)).collect();
        for id in ids {
            assert_eq!(pool.get(id).map(|p| p.id), Some(id));
        }
        assert!(pool.get(ParticleId(999)).is_none());
    }

    #[test]
    fn count_by_lifecycle() {
        let g = glyph();
        let mut pool = ParticlePool::new(8);
        spawn(&mut pool, &g);
        spawn(&mut pool, &g);
        assert_eq!(pool.count_where(Lifecycle::is_airborne), 2);
        assert_eq!(pool.count_where(|l| *l == Lifecycle::Landed), 0);
    }
}
