//! Draw order for the pile.
//!
//! Landed particles are drawn back to front by resting Y: a particle resting
//! lower on screen (larger Y) is closer to the viewer and drawn later. Ties
//! go to the newer particle. New landings are buffered during the tick and
//! merged into the existing order once, at the end of the update pass.

use std::cmp::Ordering;

use glam::Vec2;

use crate::api::types::ParticleId;

/// Sort key derived from a particle's resting position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthKey(pub f32);

impl DepthKey {
    /// Key on the resting Y in the Y-down world. "Lower" means lower on
    /// screen: a larger `rest.y` is closer to the viewer and sorts later.
    pub fn from_rest(rest: Vec2) -> Self {
        DepthKey(rest.y)
    }
}

impl Eq for DepthKey {}

impl PartialOrd for DepthKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DepthKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

type Entry = (DepthKey, ParticleId);

/// Maintains the back-to-front order of grounded particles.
#[derive(Debug, Default)]
pub struct DepthSorter {
    order: Vec<Entry>,
    pending: Vec<Entry>,
    scratch: Vec<Entry>,
    passes: u64,
}

impl DepthSorter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a landing. Takes effect at the next `commit`.
    pub fn mark_landed(&mut self, key: DepthKey, id: ParticleId) {
        self.pending.push((key, id));
    }

    /// Fold this tick's landings into the order. Sorts only the new batch,
    /// then merges it with the already-sorted pile.
    /// Returns false (and does nothing) when nothing landed.
    pub fn commit(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        self.pending.sort_unstable();

        self.scratch.clear();
        self.scratch.reserve(self.order.len() + self.pending.len());
        let (mut i, mut j) = (0, 0);
        while i < self.order.len() && j < self.pending.len() {
            if self.pending[j] < self.order[i] {
                self.scratch.push(self.pending[j]);
                j += 1;
            } else {
                self.scratch.push(self.order[i]);
                i += 1;
            }
        }
        self.scratch.extend_from_slice(&self.order[i..]);
        self.scratch.extend_from_slice(&self.pending[j..]);

        std::mem::swap(&mut self.order, &mut self.scratch);
        self.pending.clear();
        self.passes += 1;
        true
    }

    /// Forget every particle created at or before `cutoff`.
    /// Eviction always removes the oldest particles, so one cutoff covers a batch.
    pub fn forget_through(&mut self, cutoff: ParticleId) {
        self.order.retain(|(_, id)| *id > cutoff);
        self.pending.retain(|(_, id)| *id > cutoff);
    }

    /// Back-to-front draw order.
    pub fn order(&self) -> &[(DepthKey, ParticleId)] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of commits that actually re-ordered the pile.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.pending.clear();
    }
}
