//! Count-based probability estimates.
//!
//! - Maximum-likelihood relative frequency for supported contexts
//! - Additive (Laplace) smoothing for the unconditional fallback, reserving
//!   mass for one extra "unknown" category

/// Additive-smoothing constant used by the unconditional fallback.
pub const DEFAULT_ALPHA: f64 = 1.0;

/// Relative frequency `count / total`.
///
/// Returns `None` when `total == 0`: an unobserved context carries no
/// support, which is different from a zero probability.
pub fn relative_frequency(count: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(count as f64 / total as f64)
}

/// Additively smoothed probability over `categories` known outcomes plus one
/// reserved unknown outcome:
///
/// ```text
/// P(x) = (count + α) / (total + α·(categories + 1))
/// ```
///
/// Always strictly positive for `alpha > 0`.
pub fn smoothed_probability(count: u64, total: u64, alpha: f64, categories: usize) -> f64 {
    let denominator = total as f64 + alpha * (categories as f64 + 1.0);
    if denominator <= 0.0 {
        return 0.0;
    }
    (count as f64 + alpha) / denominator
}
