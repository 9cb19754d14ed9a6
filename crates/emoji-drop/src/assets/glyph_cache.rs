//! Glyph cache: one rasterized atlas cell per distinct emoji string.
//!
//! The engine never draws pixels itself. A [`GlyphRasterizer`] backend (a
//! canvas in the browser, a font rasterizer natively) paints each requested
//! glyph into its atlas cell; the cache remembers which cell holds which
//! string so repeated emoji are never rasterized twice.
//!
//! Cells 0 and 1 are reserved for the placeholder and settled glyphs, which
//! must rasterize at startup. Any later failure falls back to the placeholder.

use std::collections::HashMap;
use std::rc::Rc;

use crate::api::config::EngineConfig;
use crate::api::error::{EngineError, RasterError};
use crate::api::types::GlyphId;

/// Position of a glyph in the atlas grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AtlasCell {
    pub col: u32,
    pub row: u32,
}

/// A rasterized, reusable glyph.
#[derive(Debug, PartialEq)]
pub struct Glyph {
    pub id: GlyphId,
    pub text: String,
    pub cell: AtlasCell,
    /// True when this is the placeholder standing in for a failed glyph.
    pub fallback: bool,
}

/// What the backend is asked to paint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphRequest<'a> {
    pub id: GlyphId,
    pub text: &'a str,
    pub cell: AtlasCell,
    /// Rasterization size in pixels.
    pub size: f32,
}

/// Backend that owns the actual pixels.
pub trait GlyphRasterizer {
    /// Paint `request.text` into `request.cell`.
    fn rasterize(&mut self, request: &GlyphRequest<'_>) -> Result<(), RasterError>;

    /// Free every cell. Called once, at shutdown.
    fn release_all(&mut self);
}

/// Rasterizer for headless sessions: accepts every glyph except an explicit
/// deny-list and only counts requests.
#[derive(Debug, Default)]
pub struct HeadlessRasterizer {
    pub requests: Vec<String>,
    pub unsupported: Vec<String>,
    pub released: bool,
}

impl HeadlessRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, text: impl Into<String>) -> Self {
        self.unsupported.push(text.into());
        self
    }
}

impl GlyphRasterizer for HeadlessRasterizer {
    fn rasterize(&mut self, request: &GlyphRequest<'_>) -> Result<(), RasterError> {
        self.requests.push(request.text.to_string());
        if self.unsupported.iter().any(|u| u == request.text) {
            return Err(RasterError::Unsupported(request.text.to_string()));
        }
        Ok(())
    }

    fn release_all(&mut self) {
        self.released = true;
    }
}

/// Memoized glyph lookup, owned by one engine session.
pub struct GlyphCache<R: GlyphRasterizer> {
    rasterizer: R,
    glyphs: HashMap<String, Rc<Glyph>>,
    placeholder: Rc<Glyph>,
    settled: Rc<Glyph>,
    cols: u32,
    capacity: u32,
    size: f32,
    next_cell: u32,
    rasterizations: u64,
    fallbacks: u64,
}

impl<R: GlyphRasterizer> GlyphCache<R> {
    /// Build the cache and rasterize the two reserved glyphs.
    pub fn new(mut rasterizer: R, config: &EngineConfig) -> Result<Self, EngineError> {
        let cols = config.atlas_cols;
        let size = config.glyph_size;

        let placeholder = paint_required(&mut rasterizer, &config.placeholder_glyph, 0, cols, size)?;
        let settled = paint_required(&mut rasterizer, &config.settled_glyph, 1, cols, size)?;

        let mut glyphs = HashMap::with_capacity(64);
        glyphs.insert(placeholder.text.clone(), Rc::clone(&placeholder));
        glyphs.insert(settled.text.clone(), Rc::clone(&settled));

        Ok(Self {
            rasterizer,
            glyphs,
            placeholder,
            settled,
            cols,
            capacity: config.atlas_capacity(),
            size,
            next_cell: 2,
            rasterizations: 2,
            fallbacks: 0,
        })
    }

    /// Return the cached glyph for `text`, rasterizing it on first request.
    /// Never fails: an unsupported glyph resolves to the placeholder.
    pub fn get(&mut self, text: &str) -> Rc<Glyph> {
        if let Some(glyph) = self.glyphs.get(text) {
            return Rc::clone(glyph);
        }

        let glyph = match self.rasterize_new(text) {
            Ok(glyph) => glyph,
            Err(err) => {
                log::warn!("glyph {text:?} falls back to placeholder: {err}");
                self.fallbacks += 1;
                Rc::clone(&self.placeholder)
            }
        };
        // Failures are memoized too, so a bad glyph is attempted once per session.
        self.glyphs.insert(text.to_string(), Rc::clone(&glyph));
        glyph
    }

    fn rasterize_new(&mut self, text: &str) -> Result<Rc<Glyph>, RasterError> {
        if self.next_cell >= self.capacity {
            return Err(RasterError::AtlasFull {
                capacity: self.capacity,
            });
        }
        let id = GlyphId(self.next_cell);
        let cell = cell_for(self.next_cell, self.cols);
        self.rasterizations += 1;
        self.rasterizer.rasterize(&GlyphRequest {
            id,
            text,
            cell,
            size: self.size,
        })?;
        // Cell is only consumed once the backend accepted it.
        self.next_cell += 1;
        Ok(Rc::new(Glyph {
            id,
            text: text.to_string(),
            cell,
            fallback: false,
        }))
    }

    /// The glyph every landed particle shows.
    pub fn settled(&self) -> &Rc<Glyph> {
        &self.settled
    }

    pub fn placeholder(&self) -> &Rc<Glyph> {
        &self.placeholder
    }

    /// Distinct strings looked up so far (including the two reserved glyphs).
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Backend rasterization calls made, successful or not.
    pub fn rasterizations(&self) -> u64 {
        self.rasterizations
    }

    /// Atlas cells in use.
    pub fn cells_used(&self) -> u32 {
        self.next_cell
    }

    /// Fallbacks since the last call.
    pub fn take_fallbacks(&mut self) -> u64 {
        std::mem::take(&mut self.fallbacks)
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn rasterizer_mut(&mut self) -> &mut R {
        &mut self.rasterizer
    }

    /// Drop every cached glyph and free the backend's cells.
    /// Returns the number of distinct entries released.
    pub fn release_all(&mut self) -> usize {
        let released = self.glyphs.len();
        self.glyphs.clear();
        self.next_cell = 2;
        self.rasterizer.release_all();
        released
    }
}

fn cell_for(index: u32, cols: u32) -> AtlasCell {
    AtlasCell {
        col: index % cols,
        row: index / cols,
    }
}

fn paint_required<R: GlyphRasterizer>(
    rasterizer: &mut R,
    text: &str,
    index: u32,
    cols: u32,
    size: f32,
) -> Result<Rc<Glyph>, EngineError> {
    let id = GlyphId(index);
    let cell = cell_for(index, cols);
    rasterizer
        .rasterize(&GlyphRequest { id, text, cell, size })
        .map_err(|source| EngineError::RequiredGlyph {
            glyph: text.to_string(),
            source,
        })?;
    Ok(Rc::new(Glyph {
        id,
        text: text.to_string(),
        cell,
        fallback: index == 0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> GlyphCache<HeadlessRasterizer> {
        GlyphCache::new(HeadlessRasterizer::new(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn same_character_returns_same_glyph() {
        let mut cache = cache();
        let a = cache.get("🐱");
        let b = cache.get("🐱");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.rasterizations(), 3);
        assert_eq!(cache.rasterizer().requests.iter().filter(|r| *r == "🐱").count(), 1);
    }

    #[test]
    fn distinct_characters_get_distinct_cells() {
        let mut cache = cache();
        let a = cache.get("🐱");
        let b = cache.get("🐶");
        assert_ne!(a.cell, b.cell);
        assert_eq!(a.id, GlyphId(2));
        assert_eq!(b.id, GlyphId(3));
        assert_eq!(a.cell, AtlasCell { col: 2, row: 0 });
    }

    #[test]
    fn unsupported_glyph_falls_back_once() {
        let config = EngineConfig::default();
        let mut cache =
            GlyphCache::new(HeadlessRasterizer::new().rejecting("\u{e000}"), &config).unwrap();
        let first = cache.get("\u{e000}");
        let second = cache.get("\u{e000}");
        assert!(Rc::ptr_eq(&first, cache.placeholder()));
        assert!(Rc::ptr_eq(&first, &second));
        assert!(first.fallback);
        assert_eq!(cache.take_fallbacks(), 1);
        assert_eq!(cache.take_fallbacks(), 0);
        // The rejected glyph did not consume a cell.
        assert_eq!(cache.cells_used(), 2);
    }

    #[test]
    fn full_atlas_falls_back_to_placeholder() {
        let mut config = EngineConfig::default();
        config.atlas_cols = 3;
        config.atlas_rows = 1;
        let mut cache = GlyphCache::new(HeadlessRasterizer::new(), &config).unwrap();
        let fits = cache.get("🐱");
        let overflow = cache.get("🐶");
        assert!(!fits.fallback);
        assert!(Rc::ptr_eq(&overflow, cache.placeholder()));
    }

    #[test]
    fn failing_settled_glyph_is_a_startup_error() {
        let config = EngineConfig::default();
        let raster = HeadlessRasterizer::new().rejecting(config.settled_glyph.clone());
        let err = GlyphCache::new(raster, &config).err().unwrap();
        assert!(matches!(err, EngineError::RequiredGlyph { .. }));
    }

    #[test]
    fn settled_glyph_is_cached_under_its_text() {
        let mut cache = cache();
        let settled = Rc::clone(cache.settled());
        let looked_up = cache.get(&settled.text);
        assert!(Rc::ptr_eq(&settled, &looked_up));
    }

    #[test]
    fn release_all_frees_backend() {
        let mut cache = cache();
        cache.get("🐱");
        assert_eq!(cache.release_all(), 3);
        assert!(cache.is_empty());
        assert!(cache.rasterizer().released);
    }
}
