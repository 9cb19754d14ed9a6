pub mod engine;
pub mod pool;
pub mod time;
