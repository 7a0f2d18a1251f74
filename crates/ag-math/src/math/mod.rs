//! Core math modules.

pub mod smoothing;
pub mod stable;
pub mod transform;
