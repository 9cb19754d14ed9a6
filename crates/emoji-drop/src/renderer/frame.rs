use glam::Vec2;

use crate::renderer::instance::{DrawBuffer, DrawInstance};

/// Read-only view of one tick's draw state, handed to the external renderer.
///
/// Instances are already in painter's order; the layer lengths let a renderer
/// treat the pile, the airborne particles and the sparks differently
/// (e.g. a separate blend mode for sparks) without re-sorting.
#[derive(Debug, Clone, Copy)]
pub struct DrawFrame<'a> {
    pub instances: &'a [DrawInstance],
    pub pile_len: usize,
    pub flight_len: usize,
    pub spark_len: usize,
    pub anchor: Vec2,
    pub glyph_size: f32,
    /// Simulation tick this frame was produced on.
    pub tick: u64,
}

impl<'a> DrawFrame<'a> {
    pub fn new(buffer: &'a DrawBuffer, anchor: Vec2, glyph_size: f32, tick: u64) -> Self {
        let pile_len = buffer.pile_end as usize;
        let flight_end = buffer.flight_end as usize;
        Self {
            instances: &buffer.instances,
            pile_len,
            flight_len: flight_end - pile_len,
            spark_len: buffer.instances.len() - flight_end,
            anchor,
            glyph_size,
            tick,
        }
    }

    pub fn pile(&self) -> &'a [DrawInstance] {
        &self.instances[..self.pile_len]
    }

    pub fn airborne(&self) -> &'a [DrawInstance] {
        &self.instances[self.pile_len..self.pile_len + self.flight_len]
    }

    pub fn sparks(&self) -> &'a [DrawInstance] {
        &self.instances[self.pile_len + self.flight_len..]
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_partition_the_instances() {
        let mut buf = DrawBuffer::default();
        for _ in 0..2 {
            buf.push(DrawInstance::default());
        }
        buf.mark_pile_end();
        buf.push(DrawInstance::default());
        buf.mark_flight_end();
        for _ in 0..3 {
            buf.push(DrawInstance::default());
        }
        let frame = DrawFrame::new(&buf, Vec2::ZERO, 48.0, 7);
        assert_eq!(frame.pile().len(), 2);
        assert_eq!(frame.airborne().len(), 1);
        assert_eq!(frame.sparks().len(), 3);
        assert_eq!(frame.len(), 6);
    }
}
