//! Anomaly Grid math utilities.

pub mod math;

pub use math::smoothing::*;
pub use math::stable::*;
pub use math::transform::ScoreTransform;
