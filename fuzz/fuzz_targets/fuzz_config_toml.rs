//! Fuzz target for detector.toml parsing.

#![no_main]

use ag_cli::config::CliConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = CliConfig::from_toml(text);
    }
});
