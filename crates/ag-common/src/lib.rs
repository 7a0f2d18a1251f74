//! Anomaly Grid common types and errors.
//!
//! This crate provides the error taxonomy shared by every workspace crate:
//! - `InvalidParameter`, `InvalidInput` and `NotFitted` contract violations
//! - Snapshot, configuration and I/O failures for the outer layers
//! - Stable error codes and categories for machine-readable reporting

pub mod error;

pub use error::{Error, ErrorCategory, Result, StructuredError};
