use bytemuck::{Pod, Zeroable};

/// Unique, monotonically increasing particle identifier.
/// Ordering by id is ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleId(pub u64);

/// Identifies a rasterized glyph (one atlas cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GlyphId(pub u32);

/// What an `EngineEvent` reports to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EngineEventKind {
    /// `a` = particles that entered the squash landing this tick.
    Landed = 1,
    /// `a` = particles evicted by the population ceiling this tick.
    Evicted = 2,
    /// `a` = queued events discarded by the safety bound since the last tick.
    QueueTrimmed = 3,
    /// The feed reported an error or disconnect. `a` = errors seen this tick.
    FeedError = 4,
    /// `a` = glyphs that fell back to the placeholder this tick.
    RasterFallback = 5,
}

impl EngineEventKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Landed),
            2 => Some(Self::Evicted),
            3 => Some(Self::QueueTrimmed),
            4 => Some(Self::FeedError),
            5 => Some(Self::RasterFallback),
            _ => None,
        }
    }
}

/// A per-tick notification for the host, shared over the wire as 4 floats.
/// Generic container: `kind` identifies the event, `a/b/c` carry payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct EngineEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl EngineEvent {
    pub const FLOATS: usize = 4;

    pub fn new(kind: EngineEventKind, a: f32) -> Self {
        Self {
            kind: kind as u32 as f32,
            a,
            b: 0.0,
            c: 0.0,
        }
    }

    pub fn kind(&self) -> Option<EngineEventKind> {
        EngineEventKind::from_u32(self.kind as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_is_four_floats() {
        assert_eq!(std::mem::size_of::<EngineEvent>(), EngineEvent::FLOATS * 4);
    }

    #[test]
    fn event_kind_survives_float_encoding() {
        let ev = EngineEvent::new(EngineEventKind::QueueTrimmed, 700.0);
        assert_eq!(ev.kind(), Some(EngineEventKind::QueueTrimmed));
        assert_eq!(ev.a, 700.0);
        assert!(EngineEventKind::from_u32(0).is_none());
    }

    #[test]
    fn particle_ids_order_by_creation() {
        assert!(ParticleId(3) < ParticleId(10));
    }
}
