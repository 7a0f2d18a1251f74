//! Fuzz target for model snapshot loading.
//!
//! Model files may be hand-edited or truncated; loading must return an error
//! rather than panic, and any accepted snapshot must score without panicking.

#![no_main]

use ag_core::{AnomalyDetector, DetectorConfig, ModelSnapshot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = serde_json::from_slice::<ModelSnapshot<String>>(data) else {
        return;
    };
    let Ok(detector) = AnomalyDetector::from_snapshot(&snapshot, DetectorConfig::default()) else {
        return;
    };
    let probe: Vec<Vec<String>> = vec![
        snapshot.symbols.iter().take(8).cloned().collect(),
        vec!["never-seen".to_string()],
    ];
    let probe: Vec<Vec<String>> = probe.into_iter().filter(|s| !s.is_empty()).collect();
    let _ = detector.predict_proba(&probe);
});
