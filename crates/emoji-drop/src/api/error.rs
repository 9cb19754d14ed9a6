use thiserror::Error;

/// Configuration rejected before any particle is spawned.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("flight duration must be at least one tick")]
    ZeroFlightDuration,
    #[error("`{field}` must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f32 },
    #[error("`{field}` = {value} is outside {range}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        range: &'static str,
    },
    #[error("`{field}` must be greater than zero")]
    ZeroCapacity { field: &'static str },
    #[error("`{field}` must not be empty")]
    EmptyGlyph { field: &'static str },
    #[error("launch/scatter extents produce a non-finite launch velocity")]
    DegenerateTrajectory,
    #[error("could not parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// A glyph backend refused to rasterize a character.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RasterError {
    #[error("unsupported glyph {0:?}")]
    Unsupported(String),
    #[error("glyph atlas is full ({capacity} cells)")]
    AtlasFull { capacity: u32 },
    #[error("glyph backend failure: {0}")]
    Backend(String),
}

/// Failures on the producer side of the ingestion queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("feed sink is detached")]
    Detached,
    #[error("feed is already subscribed")]
    AlreadySubscribed,
    #[error("feed is not subscribed")]
    NotSubscribed,
}

/// Umbrella error for engine construction.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot rasterize required glyph {glyph:?}: {source}")]
    RequiredGlyph {
        glyph: String,
        #[source]
        source: RasterError,
    },
    #[error(transparent)]
    Feed(#[from] FeedError),
}
