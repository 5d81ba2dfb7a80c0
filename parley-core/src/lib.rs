pub mod model;
pub mod sdp;
pub mod wire;

pub use model::*;
