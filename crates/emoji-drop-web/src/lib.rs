//! Browser exports for the emoji-drop engine.
//!
//! wasm-bindgen cannot export the runner itself, so it lives in a
//! `thread_local!` and every export goes through [`with_runner`].

pub mod raster;
pub mod runner;

pub use raster::{CanvasRasterizer, GlyphJob, GlyphJobs};
pub use runner::EngineRunner;

use std::cell::RefCell;

use emoji_drop::{Delivery, EngineConfig};
use wasm_bindgen::prelude::*;

thread_local! {
    static RUNNER: RefCell<Option<EngineRunner>> = const { RefCell::new(None) };
}

fn with_runner<R>(f: impl FnOnce(&mut EngineRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| {
        let mut borrow = cell.borrow_mut();
        match borrow.as_mut() {
            Some(runner) => Some(f(runner)),
            None => {
                log::warn!("emoji engine not initialized; call emoji_init() first");
                None
            }
        }
    })
}

/// Create the engine from a JSON config (`"{}"` for defaults).
#[wasm_bindgen]
pub fn emoji_init(config_json: &str) -> Result<(), JsError> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let config = EngineConfig::from_json(config_json)?;
    let runner = EngineRunner::new(config)?;
    RUNNER.with(|cell| {
        *cell.borrow_mut() = Some(runner);
    });
    log::info!("emoji-drop: initialized");
    Ok(())
}

/// Subscribe from now: anything stamped before this call is ignored.
#[wasm_bindgen]
pub fn emoji_start() -> Result<(), JsError> {
    let now_ms = js_sys::Date::now() as u64;
    match with_runner(|r| r.start(now_ms)) {
        Some(result) => result.map_err(JsError::from),
        None => Err(JsError::new("emoji engine not initialized")),
    }
}

/// Deliver one record from the realtime listener.
/// Returns 0 = queued, 1 = queued after trimming the backlog, 2 = dropped, -1 = not accepting.
#[wasm_bindgen]
pub fn emoji_push(emoji: &str, timestamp: f64) -> i32 {
    let delivery = with_runner(|r| r.push_emoji(emoji, timestamp as u64));
    match delivery {
        Some(Ok(Delivery::Queued)) => 0,
        Some(Ok(Delivery::QueuedWithTrim)) => 1,
        Some(Ok(Delivery::Dropped(_))) => 2,
        Some(Err(err)) => {
            log::debug!("emoji_push refused: {err}");
            -1
        }
        None => -1,
    }
}

#[wasm_bindgen]
pub fn emoji_feed_error(message: &str) {
    if let Some(Err(err)) = with_runner(|r| r.report_feed_error(message)) {
        log::debug!("feed error not forwarded: {err}");
    }
}

#[wasm_bindgen]
pub fn emoji_feed_disconnected(reason: &str) {
    if let Some(Err(err)) = with_runner(|r| r.report_disconnect(reason)) {
        log::debug!("feed disconnect not forwarded: {err}");
    }
}

/// Advance by one animation frame (`dt` in seconds). Returns ticks run.
#[wasm_bindgen]
pub fn emoji_tick(dt: f32) -> u32 {
    with_runner(|r| r.tick(dt)).unwrap_or(0)
}

/// Pending atlas paints as JSON: `{"reset": bool, "jobs": [{id, text, col, row, size}]}`.
#[wasm_bindgen]
pub fn take_glyph_jobs() -> String {
    with_runner(|r| r.take_glyph_jobs()).unwrap_or_else(|| String::from("{\"reset\":false,\"jobs\":[]}"))
}

/// Detach the feed and release everything. Safe to call twice.
#[wasm_bindgen]
pub fn emoji_shutdown() {
    let report = RUNNER.with(|cell| {
        let mut runner = cell.borrow_mut().take()?;
        runner.shutdown()
    });
    if let Some(report) = report {
        log::info!(
            "emoji-drop: shut down after {} ticks, released {} particles and {} glyphs",
            report.ticks,
            report.particles_released,
            report.glyphs_released
        );
    }
}

// ---- Data accessors ----

#[wasm_bindgen]
pub fn get_wire_ptr() -> *const f32 {
    with_runner(|r| r.wire_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_wire_len() -> u32 {
    with_runner(|r| r.wire_len()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_buffer_total_floats() -> u32 {
    with_runner(|r| r.layout().buffer_total_floats as u32).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_max_instances() -> u32 {
    with_runner(|r| r.layout().max_instances as u32).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_max_events() -> u32 {
    with_runner(|r| r.layout().max_events as u32).unwrap_or(0)
}
