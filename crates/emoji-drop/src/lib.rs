pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod renderer;
pub mod bridge;
pub mod input;
pub mod assets;

// Re-export key types at crate root for convenience
pub use api::config::EngineConfig;
pub use api::error::{ConfigError, EngineError, FeedError, RasterError};
pub use api::types::{EngineEvent, EngineEventKind, GlyphId, ParticleId};
pub use assets::glyph_cache::{AtlasCell, Glyph, GlyphCache, GlyphRasterizer, GlyphRequest, HeadlessRasterizer};
pub use bridge::protocol::ProtocolLayout;
pub use components::anchor::TargetAnchor;
pub use components::particle::{Lifecycle, Particle, Trajectory};
pub use crate::core::engine::{EmojiEngine, ShutdownReport, TickStats};
pub use crate::core::pool::ParticlePool;
pub use crate::core::time::FixedTimestep;
pub use input::feed::{EmojiFeed, ManualFeed};
pub use input::queue::{Delivery, DropReason, EmojiEvent, FeedNotice, FeedRecord, FeedSink, IngestQueue};
pub use input::token::sanitize_token;
pub use renderer::{DrawBuffer, DrawFrame, DrawInstance, DrawKind};
pub use systems::depth::{DepthKey, DepthSorter};
pub use systems::effects::{Rng, Spark, SparkField};
pub use systems::simulate::{step_particle, SimParams, StepOutcome, SETTLE_EPSILON};
pub use systems::throttle::AdmissionThrottle;
