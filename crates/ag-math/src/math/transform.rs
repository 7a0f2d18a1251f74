//! Surprise-to-score transforms.
//!
//! A raw mean surprise `S` (nats per symbol) is mapped onto [0, 1):
//!
//! - `Absolute`: `1 - exp(-S)`. Zero only for a perfectly predicted sequence.
//! - `Excess`: `1 - exp(-max(0, S - H))` where `H` is the mean surprise of the
//!   training corpus under the fitted model. This is the per-symbol regret over
//!   the corpus' own entropy rate, so a sequence that is as predictable as the
//!   training data scores 0.
//!
//! Both are monotone non-decreasing in `S`.

use super::stable::surprise_to_score;
use serde::{Deserialize, Serialize};

/// How raw surprise is normalized into an anomaly score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTransform {
    /// `1 - exp(-S)`.
    ///
    /// Any sequence whose mean surprise exceeds `ln 2` scores at least 0.5,
    /// including sequences copied from the training corpus. Ten `[A, B]` and
    /// ten `[A, C]` at order 2 give `S([A, B]) ≈ 0.716`, a score of about
    /// 0.51.
    Absolute,
    /// `1 - exp(-max(0, S - baseline))`, where `baseline` is the mean
    /// per-sequence surprise of the training corpus.
    ///
    /// This is the default: it measures surprise in excess of what the
    /// training data itself produces, so in the corpus above `[A, B]` scores
    /// 0 and an unseen `[X, Y]` (`S = ln 44`) scores about 0.95. Select
    /// [`ScoreTransform::Absolute`] for the plain `1 - exp(-S)` mapping.
    #[default]
    Excess,
}

impl ScoreTransform {
    /// Apply the transform to a raw mean surprise.
    pub fn apply(self, raw_surprise: f64, baseline: f64) -> f64 {
        match self {
            ScoreTransform::Absolute => surprise_to_score(raw_surprise),
            ScoreTransform::Excess => surprise_to_score(raw_surprise - baseline.max(0.0)),
        }
    }
}

impl std::str::FromStr for ScoreTransform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "absolute" | "raw" => Ok(ScoreTransform::Absolute),
            "excess" | "regret" => Ok(ScoreTransform::Excess),
            _ => Err(format!("unknown score transform: {}", s)),
        }
    }
}

impl std::fmt::Display for ScoreTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreTransform::Absolute => write!(f, "absolute"),
            ScoreTransform::Excess => write!(f, "excess"),
        }
    }
}
