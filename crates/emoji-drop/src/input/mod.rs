pub mod feed;
pub mod queue;
pub mod token;
