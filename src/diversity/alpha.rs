//! Within-sample (alpha) diversity.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaMetric {
    Shannon,
    Chao1,
    Simpson,
    InverseSimpson,
}

impl AlphaMetric {
    /// Every metric, in column order.
    pub const ALL: [AlphaMetric; 4] = [
        AlphaMetric::Shannon,
        AlphaMetric::Chao1,
        AlphaMetric::Simpson,
        AlphaMetric::InverseSimpson,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AlphaMetric::Shannon => "shannon",
            AlphaMetric::Chao1 => "chao1",
            AlphaMetric::Simpson => "simpson",
            AlphaMetric::InverseSimpson => "inverse_simpson",
        }
    }

    pub fn compute(&self, counts: &[f64]) -> f64 {
        match self {
            AlphaMetric::Shannon => shannon(counts),
            AlphaMetric::Chao1 => chao1(counts),
            AlphaMetric::Simpson => simpson(counts),
            AlphaMetric::InverseSimpson => inverse_simpson(counts),
        }
    }
}

/// Observed features: count of non-zero entries.
pub fn observed_features(counts: &[f64]) -> f64 {
    counts.iter().filter(|&&c| c > 0.0).count() as f64
}

/// Shannon entropy in bits: `H = -Σ p_i log2(p_i)`.
pub fn shannon(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum()
}

/// Bias-corrected Chao1: `S_obs + F1(F1-1) / (2(F2+1))`.
pub fn chao1(counts: &[f64]) -> f64 {
    let s_obs = observed_features(counts);
    let f1 = counts.iter().filter(|&&c| (c - 1.0).abs() < 0.5).count() as f64;
    let f2 = counts.iter().filter(|&&c| (c - 2.0).abs() < 0.5).count() as f64;
    s_obs + f1 * (f1 - 1.0) / (2.0 * (f2 + 1.0))
}

/// `Σ p_i²`, or `None` for an empty sample.
fn dominance(counts: &[f64]) -> Option<f64> {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return None;
    }
    Some(
        counts
            .iter()
            .map(|&c| {
                let p = c / total;
                p * p
            })
            .sum(),
    )
}

/// Simpson's diversity `1 - Σ p_i²`; NaN for an empty sample.
pub fn simpson(counts: &[f64]) -> f64 {
    dominance(counts).map_or(f64::NAN, |d| 1.0 - d)
}

/// Inverse Simpson `1 / Σ p_i²`; NaN for an empty sample.
pub fn inverse_simpson(counts: &[f64]) -> f64 {
    dominance(counts).map_or(f64::NAN, |d| 1.0 / d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shannon_uniform_in_bits() {
        let counts = vec![25.0, 25.0, 25.0, 25.0];
        assert_relative_eq!(shannon(&counts), 2.0, epsilon = 1e-12);
        assert_eq!(shannon(&[100.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_simpson_and_inverse() {
        let counts = vec![25.0, 25.0, 25.0, 25.0];
        assert_relative_eq!(simpson(&counts), 0.75, epsilon = 1e-12);
        assert_relative_eq!(inverse_simpson(&counts), 4.0, epsilon = 1e-12);
        assert_eq!(simpson(&[100.0, 0.0]), 0.0);
    }

    #[test]
    fn test_empty_sample() {
        let empty = vec![0.0, 0.0];
        assert!(simpson(&empty).is_nan());
        assert!(inverse_simpson(&empty).is_nan());
        assert_eq!(shannon(&empty), 0.0);
        assert_eq!(chao1(&empty), 0.0);
    }

    #[test]
    fn test_chao1_bias_corrected() {
        // S_obs = 5, F1 = 3, F2 = 1 -> 5 + 3*2/(2*2) = 6.5
        let counts = vec![1.0, 1.0, 1.0, 2.0, 10.0, 0.0];
        assert_relative_eq!(chao1(&counts), 6.5, epsilon = 1e-12);
        assert_eq!(chao1(&[10.0, 20.0, 30.0]), 3.0);
    }

    #[test]
    fn test_metric_names() {
        let names: Vec<&str> = AlphaMetric::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["shannon", "chao1", "simpson", "inverse_simpson"]);
    }
}
