/// SharedArrayBuffer layout.
/// Must stay in sync with TypeScript `protocol.ts`.
///
/// Layout (all values in f32 / 4 bytes):
/// ```text
/// [Header: 16 floats]
/// [Instances: max_instances × 12 floats]
/// [Events: max_events × 4 floats]
/// ```
///
/// Capacities are written once into the header at init.
/// TypeScript reads them from the header to compute offsets dynamically.

use crate::api::config::EngineConfig;
use crate::api::types::EngineEvent;
use crate::renderer::frame::DrawFrame;
use crate::renderer::instance::DrawInstance;

/// Number of floats in the header section.
pub const HEADER_FLOATS: usize = 16;

/// Header field indices.
pub const HEADER_LOCK: usize = 0;
pub const HEADER_FRAME_COUNTER: usize = 1;
pub const HEADER_MAX_INSTANCES: usize = 2;
pub const HEADER_INSTANCE_COUNT: usize = 3;
pub const HEADER_PILE_LEN: usize = 4;
pub const HEADER_FLIGHT_END: usize = 5;
pub const HEADER_WORLD_WIDTH: usize = 6;
pub const HEADER_WORLD_HEIGHT: usize = 7;
pub const HEADER_ANCHOR_X: usize = 8;
pub const HEADER_ANCHOR_Y: usize = 9;
pub const HEADER_GLYPH_SIZE: usize = 10;
pub const HEADER_ATLAS_COLS: usize = 11;
pub const HEADER_ATLAS_ROWS: usize = 12;
pub const HEADER_MAX_EVENTS: usize = 13;
pub const HEADER_EVENT_COUNT: usize = 14;
pub const HEADER_PROTOCOL_VERSION: usize = 15;

/// Protocol version written into the header.
pub const PROTOCOL_VERSION: f32 = 1.0;

/// Floats per draw instance (wire format, never changes).
pub const INSTANCE_FLOATS: usize = DrawInstance::FLOATS;

/// Floats per engine event: kind, a, b, c (wire format, never changes).
pub const EVENT_FLOATS: usize = EngineEvent::FLOATS;

/// Runtime-computed buffer layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolLayout {
    /// Maximum draw instances: every live particle plus every spark.
    pub max_instances: usize,
    /// Maximum engine events per tick.
    pub max_events: usize,

    /// Size of instance data section in floats.
    pub instance_data_floats: usize,
    /// Size of event data section in floats.
    pub event_data_floats: usize,

    /// Offset (in floats) where instance data begins.
    pub instance_data_offset: usize,
    /// Offset (in floats) where event data begins.
    pub event_data_offset: usize,

    /// Total buffer size in floats.
    pub buffer_total_floats: usize,
    /// Total buffer size in bytes.
    pub buffer_total_bytes: usize,
}

impl ProtocolLayout {
    /// Compute layout from raw capacity values.
    pub fn new(max_instances: usize, max_events: usize) -> Self {
        let instance_data_floats = max_instances * INSTANCE_FLOATS;
        let event_data_floats = max_events * EVENT_FLOATS;

        let instance_data_offset = HEADER_FLOATS;
        let event_data_offset = instance_data_offset + instance_data_floats;

        let buffer_total_floats = event_data_offset + event_data_floats;
        let buffer_total_bytes = buffer_total_floats * 4;

        Self {
            max_instances,
            max_events,
            instance_data_floats,
            event_data_floats,
            instance_data_offset,
            event_data_offset,
            buffer_total_floats,
            buffer_total_bytes,
        }
    }

    /// Compute layout from an EngineConfig.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.population_ceiling + config.max_sparks, config.max_events)
    }

    /// Allocate a zeroed buffer with the static header fields filled in.
    pub fn allocate(&self, config: &EngineConfig) -> Vec<f32> {
        let mut buf = vec![0.0; self.buffer_total_floats];
        buf[HEADER_MAX_INSTANCES] = self.max_instances as f32;
        buf[HEADER_WORLD_WIDTH] = config.world_width;
        buf[HEADER_WORLD_HEIGHT] = config.world_height;
        buf[HEADER_GLYPH_SIZE] = config.glyph_size;
        buf[HEADER_ATLAS_COLS] = config.atlas_cols as f32;
        buf[HEADER_ATLAS_ROWS] = config.atlas_rows as f32;
        buf[HEADER_MAX_EVENTS] = self.max_events as f32;
        buf[HEADER_PROTOCOL_VERSION] = PROTOCOL_VERSION;
        buf
    }

    /// Write one frame into `out` (a buffer from [`ProtocolLayout::allocate`]).
    ///
    /// Instances and events beyond capacity are dropped from the tail: sparks
    /// go first, the pile is never cut before the airborne layer. The frame
    /// counter is bumped last so a reader that sees a new counter sees the
    /// whole frame.
    pub fn pack(&self, frame: &DrawFrame<'_>, events: &[EngineEvent], out: &mut [f32]) {
        if out.len() < self.buffer_total_floats {
            log::error!(
                "wire buffer too small: {} < {} floats",
                out.len(),
                self.buffer_total_floats
            );
            return;
        }

        out[HEADER_LOCK] = 1.0;

        let count = frame.instances.len().min(self.max_instances);
        let instance_floats: &[f32] = bytemuck::cast_slice(&frame.instances[..count]);
        out[self.instance_data_offset..self.instance_data_offset + instance_floats.len()]
            .copy_from_slice(instance_floats);

        let event_count = events.len().min(self.max_events);
        let event_floats: &[f32] = bytemuck::cast_slice(&events[..event_count]);
        out[self.event_data_offset..self.event_data_offset + event_floats.len()]
            .copy_from_slice(event_floats);

        out[HEADER_INSTANCE_COUNT] = count as f32;
        out[HEADER_PILE_LEN] = frame.pile_len.min(count) as f32;
        out[HEADER_FLIGHT_END] = (frame.pile_len + frame.flight_len).min(count) as f32;
        out[HEADER_ANCHOR_X] = frame.anchor.x;
        out[HEADER_ANCHOR_Y] = frame.anchor.y;
        out[HEADER_EVENT_COUNT] = event_count as f32;
        out[HEADER_FRAME_COUNTER] += 1.0;
        out[HEADER_LOCK] = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::EngineEventKind;
    use crate::renderer::instance::DrawBuffer;
    use glam::Vec2;

    #[test]
    fn from_default_config_matches_expected_sizes() {
        let layout = ProtocolLayout::from_config(&EngineConfig::default());
        assert_eq!(layout.max_instances, 300 + 256);
        assert_eq!(layout.max_events, 32);
        assert_eq!(layout.instance_data_floats, 556 * 12);
        assert_eq!(layout.event_data_floats, 32 * 4);
        assert_eq!(layout.buffer_total_floats, 16 + 556 * 12 + 32 * 4);
        assert_eq!(layout.buffer_total_bytes, layout.buffer_total_floats * 4);
    }

    #[test]
    fn offsets_are_contiguous() {
        let layout = ProtocolLayout::new(100, 20);
        assert_eq!(layout.instance_data_offset, HEADER_FLOATS);
        assert_eq!(layout.event_data_offset, layout.instance_data_offset + layout.instance_data_floats);
        assert_eq!(layout.buffer_total_floats, layout.event_data_offset + layout.event_data_floats);
    }

    #[test]
    fn allocate_writes_static_header() {
        let config = EngineConfig::default();
        let layout = ProtocolLayout::from_config(&config);
        let buf = layout.allocate(&config);
        assert_eq!(buf.len(), layout.buffer_total_floats);
        assert_eq!(buf[HEADER_MAX_INSTANCES], 556.0);
        assert_eq!(buf[HEADER_WORLD_WIDTH], 800.0);
        assert_eq!(buf[HEADER_ATLAS_COLS], 16.0);
        assert_eq!(buf[HEADER_PROTOCOL_VERSION], PROTOCOL_VERSION);
    }

    #[test]
    fn pack_writes_instances_events_and_counter() {
        let config = EngineConfig::default();
        let layout = ProtocolLayout::new(2, 1);
        let mut buf = layout.allocate(&config);

        let mut draw = DrawBuffer::default();
        for x in [1.0, 2.0, 3.0] {
            draw.push(DrawInstance { x, ..Default::default() });
        }
        draw.mark_pile_end();
        draw.mark_flight_end();
        let frame = DrawFrame::new(&draw, Vec2::new(400.0, 470.0), 48.0, 1);
        let events = [
            EngineEvent::new(EngineEventKind::Landed, 3.0),
            EngineEvent::new(EngineEventKind::Evicted, 1.0),
        ];

        layout.pack(&frame, &events, &mut buf);

        assert_eq!(buf[HEADER_INSTANCE_COUNT], 2.0);
        assert_eq!(buf[HEADER_PILE_LEN], 2.0);
        assert_eq!(buf[HEADER_EVENT_COUNT], 1.0);
        assert_eq!(buf[HEADER_ANCHOR_Y], 470.0);
        assert_eq!(buf[HEADER_FRAME_COUNTER], 1.0);
        assert_eq!(buf[HEADER_LOCK], 0.0);
        assert_eq!(buf[layout.instance_data_offset], 1.0);
        assert_eq!(buf[layout.instance_data_offset + INSTANCE_FLOATS], 2.0);
        assert_eq!(buf[layout.event_data_offset], EngineEventKind::Landed as u32 as f32);

        layout.pack(&frame, &[], &mut buf);
        assert_eq!(buf[HEADER_FRAME_COUNTER], 2.0);
        assert_eq!(buf[HEADER_EVENT_COUNT], 0.0);
    }
}
