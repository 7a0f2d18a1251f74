//! Support library for the `anomaly-grid` binary: logging, configuration
//! resolution, exit codes and file I/O.

pub mod config;
pub mod exit_codes;
pub mod io;
pub mod logging;
