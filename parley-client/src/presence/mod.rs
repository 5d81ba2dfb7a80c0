mod reconciler;

pub use reconciler::*;
