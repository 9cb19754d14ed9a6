pub mod instance;
pub mod frame;

pub use instance::{DrawBuffer, DrawInstance, DrawKind};
pub use frame::DrawFrame;
