//! Seeded synthetic corpora.
//!
//! Normal sequences walk the alphabet cyclically from a random offset
//! (`a b c a b c ...`); anomalous sequences draw every symbol uniformly.

use ag_common::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Labelled synthetic corpus.
pub type LabeledSequences<S> = (Vec<Vec<S>>, Vec<u8>);

/// Generate `n` sequences of `length` symbols over `alphabet`.
///
/// `round(n * anomaly_rate)` of them are anomalous (label 1), placed at
/// seeded random positions.
pub fn generate_sequences<S: Clone>(
    n: usize,
    length: usize,
    alphabet: &[S],
    anomaly_rate: f64,
    seed: u64,
) -> Result<LabeledSequences<S>> {
    if alphabet.is_empty() {
        return Err(Error::invalid_parameter("alphabet must not be empty"));
    }
    if length == 0 {
        return Err(Error::invalid_parameter("sequence length must be at least 1"));
    }
    if !(0.0..=1.0).contains(&anomaly_rate) {
        return Err(Error::invalid_parameter(format!(
            "anomaly_rate must lie in [0, 1], got {}",
            anomaly_rate
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let anomalies = ((n as f64) * anomaly_rate).round() as usize;
    let mut labels: Vec<u8> = (0..n).map(|i| u8::from(i < anomalies)).collect();
    labels.shuffle(&mut rng);

    let sequences = labels
        .iter()
        .map(|&label| {
            if label == 1 {
                (0..length)
                    .map(|_| alphabet[rng.random_range(0..alphabet.len())].clone())
                    .collect()
            } else {
                let offset = rng.random_range(0..alphabet.len());
                (0..length)
                    .map(|i| alphabet[(offset + i) % alphabet.len()].clone())
                    .collect()
            }
        })
        .collect();

    debug!(n, length, anomalies, seed, "generated synthetic sequences");
    Ok((sequences, labels))
}
