pub mod anchor;
pub mod particle;
