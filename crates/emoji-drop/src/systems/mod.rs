pub mod depth;
pub mod effects;
pub mod render;
pub mod simulate;
pub mod throttle;
