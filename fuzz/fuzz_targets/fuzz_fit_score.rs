//! Fuzz target for detector training and scoring.
//!
//! Arbitrary corpora must either be rejected with an error or produce scores
//! in [0, 1) and labels in {0, 1}.

#![no_main]

use ag_core::{AnomalyDetector, DetectorConfig, ScoreTransform};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    max_order: u8,
    workers: u8,
    absolute: bool,
    threshold: f64,
    train: Vec<Vec<u8>>,
    test: Vec<Vec<u8>>,
}

fuzz_target!(|input: Input| {
    let transform = if input.absolute {
        ScoreTransform::Absolute
    } else {
        ScoreTransform::Excess
    };
    let config = match DetectorConfig::default().with_max_order(usize::from(input.max_order % 6) + 1) {
        Ok(config) => config
            .with_workers(usize::from(input.workers % 4))
            .with_score_transform(transform),
        Err(_) => return,
    };
    let mut detector = match AnomalyDetector::with_config(config) {
        Ok(detector) => detector,
        Err(_) => return,
    };
    if detector.fit(&input.train).is_err() {
        return;
    }

    if let Ok(scores) = detector.predict_proba(&input.test) {
        assert_eq!(scores.len(), input.test.len());
        for score in scores {
            assert!((0.0..1.0).contains(&score), "score out of range: {score}");
        }
    }
    if let Ok(labels) = detector.predict(&input.test, input.threshold) {
        assert!(labels.iter().all(|&l| l <= 1));
    }
});
