use emoji_drop::bridge::protocol::ProtocolLayout;
use emoji_drop::{
    Delivery, EmojiEngine, EngineConfig, EngineError, EngineEvent, FeedError,
    FeedRecord, FixedTimestep, ManualFeed, ShutdownReport,
};

use crate::raster::CanvasRasterizer;

/// Wires the engine to the browser: frame clock in, wire buffer out.
///
/// The page's realtime listener calls in through [`EngineRunner::push_emoji`];
/// `requestAnimationFrame` calls [`EngineRunner::tick`] with the frame delta,
/// and the renderer reads the packed wire buffer through its pointer.
pub struct EngineRunner {
    engine: Option<EmojiEngine<CanvasRasterizer>>,
    feed: ManualFeed,
    timestep: FixedTimestep,
    layout: ProtocolLayout,
    /// Header + instances + events, read by TypeScript in place.
    wire: Vec<f32>,
    /// Events from every tick run during the current frame.
    frame_events: Vec<EngineEvent>,
}

impl EngineRunner {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let timestep = FixedTimestep::new(config.fixed_dt, config.max_catch_up_ticks);
        let layout = ProtocolLayout::from_config(&config);
        let wire = layout.allocate(&config);
        let frame_events = Vec::with_capacity(layout.max_events);
        let engine = EmojiEngine::new(config, CanvasRasterizer::new())?;

        Ok(Self {
            engine: Some(engine),
            feed: ManualFeed::new(),
            timestep,
            layout,
            wire,
            frame_events,
        })
    }

    /// Start listening. Records stamped before `now_ms` are not replayed.
    pub fn start(&mut self, now_ms: u64) -> Result<(), EngineError> {
        match self.engine.as_mut() {
            Some(engine) => engine.attach_feed(&mut self.feed, now_ms),
            None => Err(FeedError::Detached.into()),
        }
    }

    pub fn push_emoji(&mut self, emoji: &str, timestamp: u64) -> Result<Delivery, FeedError> {
        self.feed.deliver(FeedRecord::new(emoji, timestamp))
    }

    pub fn report_feed_error(&mut self, message: &str) -> Result<(), FeedError> {
        self.feed.fail(message)
    }

    pub fn report_disconnect(&mut self, reason: &str) -> Result<(), FeedError> {
        self.feed.disconnect(reason)
    }

    /// Run as many fixed ticks as `frame_dt` seconds cover, then pack the
    /// latest frame into the wire buffer. Returns the number of ticks run.
    pub fn tick(&mut self, frame_dt: f32) -> u32 {
        let Some(engine) = self.engine.as_mut() else {
            return 0;
        };

        let steps = self.timestep.accumulate(frame_dt);
        if steps == 0 {
            return 0;
        }

        self.frame_events.clear();
        for _ in 0..steps {
            engine.tick();
            let room = self.layout.max_events.saturating_sub(self.frame_events.len());
            let events = engine.events();
            self.frame_events.extend_from_slice(&events[..events.len().min(room)]);
        }

        self.layout.pack(&engine.frame(), &self.frame_events, &mut self.wire);
        steps
    }

    /// Glyphs the page must paint before the next draw, as JSON.
    pub fn take_glyph_jobs(&mut self) -> String {
        let Some(engine) = self.engine.as_mut() else {
            return String::from("{\"reset\":false,\"jobs\":[]}");
        };
        let jobs = engine.rasterizer_mut().take_jobs();
        serde_json::to_string(&jobs).unwrap_or_else(|err| {
            log::error!("cannot encode glyph jobs: {err}");
            String::from("{\"reset\":false,\"jobs\":[]}")
        })
    }

    /// Detach the feed, then release the session. Idempotent.
    pub fn shutdown(&mut self) -> Option<ShutdownReport> {
        let mut engine = self.engine.take()?;
        engine.detach_feed(&mut self.feed);
        self.timestep.reset();
        Some(engine.shutdown())
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_some()
    }

    // ---- Pointer accessors for SharedArrayBuffer reads ----

    pub fn wire_ptr(&self) -> *const f32 {
        self.wire.as_ptr()
    }

    pub fn wire_len(&self) -> u32 {
        self.wire.len() as u32
    }

    pub fn layout(&self) -> &ProtocolLayout {
        &self.layout
    }

    pub fn wire(&self) -> &[f32] {
        &self.wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emoji_drop::bridge::protocol::{
        HEADER_EVENT_COUNT, HEADER_FRAME_COUNTER, HEADER_INSTANCE_COUNT,
    };

    const DT: f32 = 1.0 / 60.0;

    fn runner() -> EngineRunner {
        let mut r = EngineRunner::new(EngineConfig::default()).unwrap();
        r.start(0).unwrap();
        r
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig::default().with_flight(0, 0.5);
        assert!(EngineRunner::new(config).is_err());
    }

    #[test]
    fn frames_are_packed_into_the_wire() {
        let mut r = runner();
        r.push_emoji("🐱", 1).unwrap();
        r.push_emoji("🐶", 2).unwrap();
        assert_eq!(r.tick(DT), 1);
        assert_eq!(r.wire()[HEADER_INSTANCE_COUNT], 2.0);
        assert_eq!(r.wire()[HEADER_FRAME_COUNTER], 1.0);
        assert_eq!(r.wire_len() as usize, r.layout().buffer_total_floats);
    }

    #[test]
    fn short_frames_do_not_tick() {
        let mut r = runner();
        assert_eq!(r.tick(DT * 0.25), 0);
        assert_eq!(r.wire()[HEADER_FRAME_COUNTER], 0.0);
    }

    #[test]
    fn events_collect_across_catch_up_ticks() {
        let mut r = runner();
        r.report_feed_error("unavailable").unwrap();
        assert_eq!(r.tick(DT * 3.5), 3);
        assert_eq!(r.wire()[HEADER_EVENT_COUNT], 1.0);
    }

    #[test]
    fn new_glyphs_become_jobs() {
        let mut r = runner();
        let startup = r.take_glyph_jobs();
        assert!(startup.contains("\u{2753}"), "{startup}");
        r.push_emoji("🎁", 1).unwrap();
        r.tick(DT);
        let jobs = r.take_glyph_jobs();
        assert!(jobs.contains("🎁"), "{jobs}");
        assert_eq!(r.take_glyph_jobs(), "{\"reset\":false,\"jobs\":[]}");
    }

    #[test]
    fn shutdown_stops_delivery() {
        let mut r = runner();
        r.push_emoji("🐱", 1).unwrap();
        r.tick(DT);
        let report = r.shutdown().unwrap();
        assert_eq!(report.particles_released, 1);
        assert!(r.push_emoji("🐱", 2).is_err());
        assert_eq!(r.tick(DT), 0);
        assert!(r.shutdown().is_none());
    }
}
