//! Numerically guarded primitives for surprise (negative log-probability).
//!
//! Probabilities are clamped away from zero with [`SURPRISE_EPSILON`] before
//! taking the logarithm, so every surprise value is finite and bounded by
//! [`max_surprise`].

/// Smallest probability fed to the logarithm.
pub const SURPRISE_EPSILON: f64 = 1e-12;

/// Surprise of an event with the given probability: `-ln(max(p, ε))`.
///
/// NaN and negative inputs clamp to ε, the least likely representable event.
pub fn surprise(probability: f64) -> f64 {
    let p = if probability.is_nan() {
        SURPRISE_EPSILON
    } else {
        probability.clamp(SURPRISE_EPSILON, 1.0)
    };
    -p.ln()
}

/// Upper bound of [`surprise`]: `-ln(ε)`.
pub fn max_surprise() -> f64 {
    -SURPRISE_EPSILON.ln()
}

/// Arithmetic mean of per-position surprise values.
///
/// Returns 0.0 for an empty slice.
pub fn mean_surprise(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Map a non-negative surprise onto [0, 1): `1 - exp(-s)`.
///
/// Computed as `-expm1(-s)` to keep precision near zero. Negative and NaN
/// inputs map to 0.0.
pub fn surprise_to_score(s: f64) -> f64 {
    if s.is_nan() || s <= 0.0 {
        return 0.0;
    }
    let score = -(-s).exp_m1();
    // exp(-s) underflows for s > ~745; keep the open upper bound.
    if score >= 1.0 {
        1.0 - f64::EPSILON
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn surprise_of_certain_event_is_zero() {
        assert_eq!(surprise(1.0), 0.0);
    }

    #[test]
    fn surprise_clamps_zero_probability() {
        let s = surprise(0.0);
        assert!(s.is_finite());
        assert!(approx_eq(s, max_surprise(), 1e-12));
        assert!(approx_eq(s, 27.631_021_115_928_547, 1e-9));
    }

    #[test]
    fn surprise_handles_nan_and_negative() {
        assert_eq!(surprise(f64::NAN), max_surprise());
        assert_eq!(surprise(-0.5), max_surprise());
    }

    #[test]
    fn surprise_half() {
        assert!(approx_eq(surprise(0.5), std::f64::consts::LN_2, 1e-15));
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean_surprise(&[]), 0.0);
        assert!(approx_eq(mean_surprise(&[1.0, 2.0, 3.0]), 2.0, 1e-15));
    }

    #[test]
    fn score_bounds() {
        assert_eq!(surprise_to_score(0.0), 0.0);
        assert_eq!(surprise_to_score(-3.0), 0.0);
        assert_eq!(surprise_to_score(f64::NAN), 0.0);
        assert!(surprise_to_score(max_surprise()) < 1.0);
        assert!(surprise_to_score(1e6) < 1.0);
        assert!(approx_eq(surprise_to_score(1.0), 1.0 - (-1.0f64).exp(), 1e-15));
    }
}
