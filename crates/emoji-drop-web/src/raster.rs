use emoji_drop::{GlyphRasterizer, GlyphRequest, RasterError};
use serde::Serialize;

/// One glyph for the browser to paint into its atlas canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphJob {
    pub id: u32,
    pub text: String,
    pub col: u32,
    pub row: u32,
    pub size: f32,
}

/// Pending atlas work, handed to JavaScript as JSON once per frame.
#[derive(Debug, Default, Serialize)]
pub struct GlyphJobs {
    /// True when the whole atlas must be cleared before painting `jobs`.
    pub reset: bool,
    pub jobs: Vec<GlyphJob>,
}

/// Rasterizer backed by the page's atlas canvas.
///
/// Rust only decides which cell each glyph goes to; painting happens in JS
/// (`fillText` into the atlas) when it drains the job list. Characters the
/// canvas cannot render meaningfully are refused up front so the engine
/// falls back to its placeholder.
#[derive(Debug, Default)]
pub struct CanvasRasterizer {
    pending: GlyphJobs,
}

impl CanvasRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.jobs.len()
    }

    /// Take the queued work, leaving the queue empty.
    pub fn take_jobs(&mut self) -> GlyphJobs {
        std::mem::take(&mut self.pending)
    }
}

fn unrenderable(c: char) -> bool {
    matches!(c,
        '\u{E000}'..='\u{F8FF}'
        | '\u{F0000}'..='\u{FFFFD}'
        | '\u{100000}'..='\u{10FFFD}'
        | '\u{FFFD}')
}

impl GlyphRasterizer for CanvasRasterizer {
    fn rasterize(&mut self, request: &GlyphRequest<'_>) -> Result<(), RasterError> {
        if request.text.chars().any(unrenderable) {
            return Err(RasterError::Unsupported(request.text.to_string()));
        }
        self.pending.jobs.push(GlyphJob {
            id: request.id.0,
            text: request.text.to_string(),
            col: request.cell.col,
            row: request.cell.row,
            size: request.size,
        });
        Ok(())
    }

    fn release_all(&mut self) {
        self.pending.jobs.clear();
        self.pending.reset = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emoji_drop::{AtlasCell, GlyphId};

    fn request(text: &str) -> GlyphRequest<'_> {
        GlyphRequest {
            id: GlyphId(5),
            text,
            cell: AtlasCell { col: 5, row: 0 },
            size: 48.0,
        }
    }

    #[test]
    fn queues_jobs_for_javascript() {
        let mut raster = CanvasRasterizer::new();
        raster.rasterize(&request("🐱")).unwrap();
        assert_eq!(raster.pending(), 1);

        let jobs = raster.take_jobs();
        assert_eq!(jobs.jobs[0].text, "🐱");
        assert_eq!(jobs.jobs[0].col, 5);
        assert_eq!(raster.pending(), 0);

        let json = serde_json::to_string(&jobs).unwrap();
        assert!(json.contains("\"reset\":false"));
    }

    #[test]
    fn refuses_private_use_and_replacement_chars() {
        let mut raster = CanvasRasterizer::new();
        assert!(raster.rasterize(&request("\u{E000}")).is_err());
        assert!(raster.rasterize(&request("a\u{FFFD}")).is_err());
        assert_eq!(raster.pending(), 0);
    }

    #[test]
    fn release_requests_atlas_reset() {
        let mut raster = CanvasRasterizer::new();
        raster.rasterize(&request("🐶")).unwrap();
        raster.release_all();
        let jobs = raster.take_jobs();
        assert!(jobs.reset);
        assert!(jobs.jobs.is_empty());
    }
}
