//! Adaptive suffix length selection.
//!
//! Uses the birthday-paradox estimate `P(collision) = 1 - e^(-n^2 / 2d)`
//! over a base-36 space to pick the shortest suffix that keeps the
//! collision probability under a configured budget. Other components size
//! their retry budgets around this exact formula, so it must not be
//! swapped for a different approximation.

/// Tunables for adaptive ID length scaling.
///
/// Read from the database config table
/// (`max_collision_prob`, `min_hash_length`, `max_hash_length`)
/// with these defaults when unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveConfig {
    /// Threshold at which the suffix length scales up (0.25 = 25%).
    pub max_collision_prob: f64,
    /// Minimum suffix length.
    pub min_length: usize,
    /// Maximum suffix length.
    pub max_length: usize,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            max_collision_prob: 0.25,
            min_length: 4,
            max_length: 8,
        }
    }
}

/// Birthday-paradox collision estimate for `num_issues` IDs of `length`
/// base36 characters.
#[must_use]
pub fn collision_probability(num_issues: usize, length: usize) -> f64 {
    let n = num_issues as f64;
    let space = 36_f64.powi(i32::try_from(length).unwrap_or(i32::MAX));
    1.0 - (-(n * n) / (2.0 * space)).exp()
}

/// The smallest length in `[min, max]` whose collision estimate meets the
/// budget; `max` when none does (the residual risk is absorbed by nonce
/// retries, not treated as an error).
#[must_use]
pub fn optimal_length(num_issues: usize, config: &AdaptiveConfig) -> usize {
    for length in config.min_length..=config.max_length {
        if collision_probability(num_issues, length) <= config.max_collision_prob {
            return length;
        }
    }
    config.max_length
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_corpus_uses_min_length() {
        let config = AdaptiveConfig::default();
        assert_eq!(optimal_length(0, &config), 4);
        // 1 - exp(-100 / (2 * 36^4)) is far below 0.25.
        assert_eq!(optimal_length(10, &config), 4);
    }

    #[test]
    fn growing_corpus_escalates_length() {
        let config = AdaptiveConfig::default();
        let mut last = 0;
        for n in [10, 1_000, 50_000, 1_000_000] {
            let len = optimal_length(n, &config);
            assert!(len >= last, "length must be monotonic in corpus size");
            last = len;
        }
        assert!(last > 4);
    }

    #[test]
    fn saturated_corpus_falls_back_to_max() {
        let config = AdaptiveConfig::default();
        // 5M issues exceed the budget even at length 8.
        assert!(collision_probability(5_000_000, 8) > 0.25);
        assert_eq!(optimal_length(5_000_000, &config), 8);
    }

    #[test]
    fn probability_formula_is_exact() {
        // n=100, L=4: 1 - exp(-10000 / (2 * 1679616))
        let expected = 1.0 - (-10_000.0 / (2.0 * 1_679_616.0f64)).exp();
        let got = collision_probability(100, 4);
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn custom_bounds_respected() {
        let config = AdaptiveConfig {
            max_collision_prob: 0.01,
            min_length: 5,
            max_length: 6,
        };
        assert_eq!(optimal_length(0, &config), 5);
        assert_eq!(optimal_length(10_000_000, &config), 6);
    }
}
