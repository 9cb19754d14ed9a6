//! The engine session: owns every subsystem and runs one tick at a time.
//!
//! A tick runs to completion before the next begins:
//! ingestion drain -> per-particle update -> conditional depth sort ->
//! eviction -> draw state. The feed only ever appends to the ingestion
//! queue; nothing else crosses the session boundary.

use glam::Vec2;

use crate::api::config::EngineConfig;
use crate::api::error::{EngineError, FeedError};
use crate::api::types::{EngineEvent, EngineEventKind, ParticleId};
use crate::assets::glyph_cache::{GlyphCache, GlyphRasterizer};
use crate::components::anchor::TargetAnchor;
use crate::components::particle::{Lifecycle, Particle, Trajectory};
use crate::core::pool::ParticlePool;
use crate::input::feed::EmojiFeed;
use crate::input::queue::{FeedNotice, IngestQueue};
use crate::renderer::frame::DrawFrame;
use crate::renderer::instance::DrawBuffer;
use crate::systems::depth::DepthSorter;
use crate::systems::effects::{Rng, SparkField};
use crate::systems::render::build_draw_buffer;
use crate::systems::simulate::{step_particle, SimParams, StepOutcome};
use crate::systems::throttle::AdmissionThrottle;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub admitted: usize,
    pub landed: usize,
    pub settled: usize,
    pub evicted: usize,
    pub trimmed: u64,
    pub live: usize,
}

/// Resources released by [`EmojiEngine::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub ticks: u64,
    pub particles_released: usize,
    pub events_discarded: usize,
    pub glyphs_released: usize,
}

/// One emoji-drop session.
pub struct EmojiEngine<R: GlyphRasterizer> {
    config: EngineConfig,
    queue: IngestQueue,
    throttle: AdmissionThrottle,
    pool: ParticlePool,
    depth: DepthSorter,
    glyphs: GlyphCache<R>,
    sparks: SparkField,
    anchor: TargetAnchor,
    params: SimParams,
    rng: Rng,
    draw: DrawBuffer,
    events: Vec<EngineEvent>,
    notices: Vec<FeedNotice>,
    touchdowns: Vec<(ParticleId, Vec2)>,
    ticks: u64,
    last: TickStats,
}

impl<R: GlyphRasterizer> EmojiEngine<R> {
    /// Validate `config`, rasterize the reserved glyphs and build an idle session.
    pub fn new(config: EngineConfig, rasterizer: R) -> Result<Self, EngineError> {
        config.validate()?;
        let glyphs = GlyphCache::new(rasterizer, &config)?;

        log::info!(
            "emoji engine ready: cap {}/tick, ceiling {}, queue bound {}, flight {} ticks",
            config.admission_cap,
            config.population_ceiling,
            config.queue_bound,
            config.flight_ticks
        );

        Ok(Self {
            queue: IngestQueue::from_config(&config),
            throttle: AdmissionThrottle::new(config.admission_cap),
            pool: ParticlePool::new(config.population_ceiling),
            depth: DepthSorter::new(),
            glyphs,
            sparks: SparkField::new(
                config.max_sparks,
                config.burst_sparks,
                config.spark_lifetime_ticks,
            ),
            anchor: TargetAnchor::from_config(&config),
            params: SimParams::from_config(&config),
            rng: Rng::new(config.seed),
            draw: DrawBuffer::with_capacity(config.population_ceiling + config.max_sparks),
            events: Vec::with_capacity(config.max_events),
            notices: Vec::new(),
            touchdowns: Vec::new(),
            ticks: 0,
            last: TickStats::default(),
            config,
        })
    }

    /// Subscribe `feed` to this session. Records stamped before `now_ms` are ignored.
    ///
    /// One feed at a time: attaching while another is live fails with
    /// [`FeedError::AlreadySubscribed`]. A failed attach leaves the live
    /// subscription untouched. The new sink starts delivering once
    /// `subscribe` has returned.
    pub fn attach_feed(&mut self, feed: &mut impl EmojiFeed, now_ms: u64) -> Result<(), EngineError> {
        if self.queue.is_attached() {
            return Err(FeedError::AlreadySubscribed.into());
        }
        let sink = self.queue.open_sink(now_ms);
        feed.subscribe(sink.clone())?;
        self.queue.activate(&sink);
        log::info!("feed attached at {now_ms}");
        Ok(())
    }

    /// Unsubscribe `feed` and refuse any delivery still in flight.
    pub fn detach_feed(&mut self, feed: &mut impl EmojiFeed) {
        feed.unsubscribe();
        self.queue.detach();
        log::info!("feed detached");
    }

    /// The ingestion queue, for hosts that enqueue directly.
    pub fn ingest_handle(&self) -> &IngestQueue {
        &self.queue
    }

    /// Run one simulation tick.
    pub fn tick(&mut self) -> TickStats {
        self.events.clear();
        let mut stats = TickStats::default();

        self.collect_feed_state(&mut stats);
        stats.admitted = self.admit();

        self.touchdowns.clear();
        for p in self.pool.iter_mut() {
            match step_particle(p, &self.params, self.glyphs.settled(), &mut self.rng) {
                StepOutcome::TouchedDown(key) => {
                    self.depth.mark_landed(key, p.id);
                    self.touchdowns.push((p.id, p.pos));
                }
                StepOutcome::Settled => stats.settled += 1,
                StepOutcome::Moving | StepOutcome::Idle => {}
            }
        }
        stats.landed = self.touchdowns.len();
        if stats.landed > 0 {
            self.depth.commit();
            self.push_event(EngineEvent::new(EngineEventKind::Landed, stats.landed as f32));
        }

        let mut evicted_through = None;
        if let Some((newest, count)) = self.pool.evict_overflow() {
            self.depth.forget_through(newest);
            evicted_through = Some(newest);
            stats.evicted = count;
            log::debug!("evicted {count} particles through {newest:?}");
            self.push_event(EngineEvent::new(EngineEventKind::Evicted, count as f32));
        }

        // Only survivors of eviction get a landing burst.
        for &(id, pos) in &self.touchdowns {
            if !matches!(evicted_through, Some(newest) if id <= newest) {
                self.sparks.burst(pos, &mut self.rng);
            }
        }
        self.sparks.tick();

        let fallbacks = self.glyphs.take_fallbacks();
        if fallbacks > 0 {
            self.push_event(EngineEvent::new(EngineEventKind::RasterFallback, fallbacks as f32));
        }

        build_draw_buffer(
            &self.pool,
            &self.depth,
            &self.sparks,
            self.glyphs.settled(),
            &mut self.draw,
        );

        self.ticks += 1;
        stats.live = self.pool.len();
        self.last = stats;
        stats
    }

    /// Trim counts and feed notices accumulated since the last tick.
    fn collect_feed_state(&mut self, stats: &mut TickStats) {
        stats.trimmed = self.queue.take_trimmed();
        if stats.trimmed > 0 {
            log::warn!("ingestion queue over bound, discarded {} oldest events", stats.trimmed);
            self.push_event(EngineEvent::new(EngineEventKind::QueueTrimmed, stats.trimmed as f32));
        }

        let rejected = self.queue.take_rejected();
        if rejected > 0 {
            log::debug!("dropped {rejected} malformed tokens");
        }

        self.notices.clear();
        self.queue.drain_notices(&mut self.notices);
        if !self.notices.is_empty() {
            for notice in &self.notices {
                match notice {
                    FeedNotice::Error(msg) => log::warn!("feed error: {msg}"),
                    FeedNotice::Disconnected(reason) => log::warn!("feed disconnected: {reason}"),
                }
            }
            let mut event = EngineEvent::new(EngineEventKind::FeedError, self.notices.len() as f32);
            event.b = self
                .notices
                .iter()
                .filter(|n| matches!(n, FeedNotice::Disconnected(_)))
                .count() as f32;
            self.push_event(event);
        }
    }

    /// Turn at most `admission_cap` queued events into particles.
    fn admit(&mut self) -> usize {
        let Self {
            queue,
            throttle,
            pool,
            glyphs,
            anchor,
            rng,
            config,
            ..
        } = self;

        throttle.admit(queue, |event| {
            let glyph = glyphs.get(&event.token);
            let launch = anchor.sample_launch(rng);
            let rest = anchor.sample_rest(rng);
            let Some(trajectory) = Trajectory::solve(launch, rest, config.flight_ticks, config.gravity)
            else {
                log::warn!("no trajectory from {launch} to {rest}, dropping {:?}", event.token);
                return;
            };
            let spin = rng.symmetric(config.max_spin);
            let id = pool.next_id();
            pool.insert(Particle::launch(id, glyph, &trajectory, config.target_scale, spin));
        })
    }

    fn push_event(&mut self, event: EngineEvent) {
        if self.events.len() < self.config.max_events {
            self.events.push(event);
        }
    }

    /// Draw state produced by the last tick.
    pub fn frame(&self) -> DrawFrame<'_> {
        DrawFrame::new(&self.draw, self.anchor.position, self.config.glyph_size, self.ticks)
    }

    /// Host notifications produced by the last tick.
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Live particles in creation order.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.pool.iter()
    }

    pub fn live_count(&self) -> usize {
        self.pool.len()
    }

    pub fn count_where(&self, pred: impl Fn(&Lifecycle) -> bool) -> usize {
        self.pool.count_where(pred)
    }

    pub fn depth_order(&self) -> &DepthSorter {
        &self.depth
    }

    pub fn glyphs(&self) -> &GlyphCache<R> {
        &self.glyphs
    }

    /// The glyph backend, for hosts that collect its pending work.
    pub fn rasterizer_mut(&mut self) -> &mut R {
        self.glyphs.rasterizer_mut()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn anchor(&self) -> Vec2 {
        self.anchor.position
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last_tick(&self) -> TickStats {
        self.last
    }

    /// Tear the session down. Consuming `self` guarantees no tick is in progress.
    ///
    /// The feed is detached first so nothing new can arrive, then pending
    /// events and particles are dropped, and finally the glyph backend
    /// releases every cell.
    pub fn shutdown(mut self) -> ShutdownReport {
        self.queue.detach();
        let events_discarded = self.queue.clear();
        let particles_released = self.pool.clear();
        self.depth.clear();
        self.sparks.clear();
        self.draw.clear();
        self.events.clear();
        let glyphs_released = self.glyphs.release_all();

        let report = ShutdownReport {
            ticks: self.ticks,
            particles_released,
            events_discarded,
            glyphs_released,
        };
        log::info!("emoji engine shut down: {report:?}");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::glyph_cache::HeadlessRasterizer;
    use crate::input::feed::ManualFeed;
    use crate::input::queue::{Delivery, EmojiEvent, FeedRecord};
    use std::rc::Rc;

    fn engine(config: EngineConfig) -> EmojiEngine<HeadlessRasterizer> {
        EmojiEngine::new(config, HeadlessRasterizer::new()).unwrap()
    }

    fn enqueue(engine: &EmojiEngine<HeadlessRasterizer>, token: &str, seq: u64) {
        engine.ingest_handle().enqueue(EmojiEvent {
            token: token.to_string(),
            timestamp: seq,
            seq,
        });
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig::default().with_flight(0, 0.5);
        assert!(matches!(
            EmojiEngine::new(config, HeadlessRasterizer::new()),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn unrasterizable_settled_glyph_is_fatal() {
        let raster = HeadlessRasterizer::new().rejecting("\u{2764}\u{fe0f}");
        assert!(matches!(
            EmojiEngine::new(EngineConfig::default(), raster),
            Err(EngineError::RequiredGlyph { .. })
        ));
    }

    #[test]
    fn tick_admits_up_to_cap() {
        let mut e = engine(EngineConfig::default().with_admission_cap(2));
        for i in 0..5 {
            enqueue(&e, "🐱", i);
        }
        assert_eq!(e.tick().admitted, 2);
        assert_eq!(e.tick().admitted, 2);
        assert_eq!(e.tick().admitted, 1);
        assert_eq!(e.live_count(), 5);
    }

    #[test]
    fn particles_land_and_settle() {
        let mut e = engine(EngineConfig::default().with_flight(20, 0.5).with_bursts(3, 5));
        enqueue(&e, "🐶", 0);
        let mut landed_at = None;
        for t in 0..200 {
            let stats = e.tick();
            if stats.landed > 0 {
                landed_at = Some(t);
                assert_eq!(e.events()[0].kind(), Some(EngineEventKind::Landed));
                assert_eq!(e.frame().spark_len, 3);
            }
        }
        // Admitted on tick 0, lands on its 20th update.
        assert_eq!(landed_at, Some(19));
        assert_eq!(e.count_where(|l| *l == Lifecycle::Landed), 1);
        let p = e.particles().next().unwrap();
        assert_eq!(p.scale, Vec2::splat(1.0));
        assert!(Rc::ptr_eq(&p.glyph, e.glyphs().settled()));
        assert_eq!(e.frame().pile_len, 1);
    }

    #[test]
    fn feed_errors_become_events() {
        let mut e = engine(EngineConfig::default());
        let mut feed = ManualFeed::new();
        e.attach_feed(&mut feed, 0).unwrap();
        feed.fail("permission denied").unwrap();
        feed.disconnect("offline").unwrap();
        e.tick();
        let ev = e.events()[0];
        assert_eq!(ev.kind(), Some(EngineEventKind::FeedError));
        assert_eq!(ev.a, 2.0);
        assert_eq!(ev.b, 1.0);
    }

    #[test]
    fn detach_stops_delivery() {
        let mut e = engine(EngineConfig::default());
        let mut feed = ManualFeed::new();
        e.attach_feed(&mut feed, 0).unwrap();
        feed.deliver(FeedRecord::new("🐱", 1)).unwrap();
        e.detach_feed(&mut feed);
        assert!(feed.deliver(FeedRecord::new("🐶", 2)).is_err());
        assert_eq!(e.tick().admitted, 1);
    }

    #[test]
    fn failed_attach_keeps_the_live_subscription() {
        let mut e = engine(EngineConfig::default());
        let mut feed = ManualFeed::new();
        e.attach_feed(&mut feed, 0).unwrap();
        assert!(matches!(
            e.attach_feed(&mut feed, 5_000),
            Err(EngineError::Feed(FeedError::AlreadySubscribed))
        ));
        assert_eq!(feed.deliver(FeedRecord::new("🐱", 20)), Ok(Delivery::Queued));

        let mut other = ManualFeed::new();
        assert!(e.attach_feed(&mut other, 0).is_err());
        assert!(!other.is_subscribed());
        assert_eq!(e.tick().admitted, 1);
    }

    #[test]
    fn evicted_landings_leave_no_sparks() {
        let mut e = engine(
            EngineConfig::default()
                .with_flight(10, 0.5)
                .with_population_ceiling(1)
                .with_bursts(4, 20),
        );
        enqueue(&e, "🐱", 0);
        for _ in 0..9 {
            assert_eq!(e.tick().landed, 0);
        }
        // The cat touches down on the same tick the dog pushes it out.
        enqueue(&e, "🐶", 1);
        let stats = e.tick();
        assert_eq!(stats.landed, 1);
        assert_eq!(stats.evicted, 1);
        assert_eq!(e.frame().spark_len, 0);
        assert_eq!(e.frame().pile_len, 0);
    }

    #[test]
    fn events_are_capped() {
        let mut config = EngineConfig::default().with_queue_bound(1);
        config.max_events = 1;
        let mut e = engine(config);
        e.ingest_handle().sink(0).report_error("late").unwrap();
        enqueue(&e, "🐱", 0);
        enqueue(&e, "🐶", 1);
        e.tick();
        assert_eq!(e.events().len(), 1);
        assert_eq!(e.events()[0].kind(), Some(EngineEventKind::QueueTrimmed));
    }

    #[test]
    fn shutdown_releases_everything() {
        let mut e = engine(EngineConfig::default());
        let mut feed = ManualFeed::new();
        e.attach_feed(&mut feed, 0).unwrap();
        for i in 0..10 {
            feed.deliver(FeedRecord::new("🐱", i)).unwrap();
        }
        e.tick();
        let report = e.shutdown();
        assert_eq!(report.ticks, 1);
        assert_eq!(report.particles_released, 4);
        assert_eq!(report.events_discarded, 6);
        assert_eq!(report.glyphs_released, 3);
        assert!(feed.deliver(FeedRecord::new("🐱", 99)).is_err());
    }
}
