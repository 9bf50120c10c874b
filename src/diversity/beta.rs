//! Between-sample dissimilarities on abundance profiles.

use serde::{Deserialize, Serialize};

/// Dissimilarity metrics used for uniqueness scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetaMetric {
    BrayCurtis,
    Jaccard,
    /// Euclidean distance between CLR profiles.
    Aitchison,
    UnweightedUnifrac,
    WeightedUnifrac,
}

impl BetaMetric {
    /// Short name used in `min_<name>_<level>` columns.
    pub fn short_name(&self) -> &'static str {
        match self {
            BetaMetric::BrayCurtis => "bray",
            BetaMetric::Jaccard => "jacc",
            BetaMetric::Aitchison => "aitch",
            BetaMetric::UnweightedUnifrac => "uu",
            BetaMetric::WeightedUnifrac => "wu",
        }
    }

    pub fn is_phylogenetic(&self) -> bool {
        matches!(self, BetaMetric::UnweightedUnifrac | BetaMetric::WeightedUnifrac)
    }

    /// Non-phylogenetic metrics computed at every level.
    pub fn per_level(aitchison: bool) -> Vec<BetaMetric> {
        let mut metrics = vec![BetaMetric::BrayCurtis, BetaMetric::Jaccard];
        if aitchison {
            metrics.push(BetaMetric::Aitchison);
        }
        metrics
    }
}

/// Bray-Curtis: `Σ|a_i - b_i| / Σ(a_i + b_i)`, NaN when both are empty.
pub fn bray_curtis(a: &[f64], b: &[f64]) -> f64 {
    let (num, den) = a
        .iter()
        .zip(b)
        .fold((0.0, 0.0), |(n, d), (&ai, &bi)| (n + (ai - bi).abs(), d + ai + bi));
    if den == 0.0 {
        f64::NAN
    } else {
        num / den
    }
}

/// Jaccard distance on presence/absence, NaN when both are empty.
pub fn jaccard(a: &[f64], b: &[f64]) -> f64 {
    let (shared, union) = a.iter().zip(b).fold((0usize, 0usize), |(s, u), (&ai, &bi)| {
        let (pa, pb) = (ai > 0.0, bi > 0.0);
        (s + (pa && pb) as usize, u + (pa || pb) as usize)
    });
    if union == 0 {
        f64::NAN
    } else {
        1.0 - shared as f64 / union as f64
    }
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(ai, bi)| (ai - bi).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bray_curtis() {
        assert_eq!(bray_curtis(&[10.0, 20.0, 30.0], &[10.0, 20.0, 30.0]), 0.0);
        assert_eq!(bray_curtis(&[10.0, 0.0, 0.0], &[0.0, 0.0, 10.0]), 1.0);
        // |6-2| + |4-8| = 8 over 20
        assert_relative_eq!(bray_curtis(&[6.0, 4.0], &[2.0, 8.0]), 0.4, epsilon = 1e-12);
        assert_eq!(bray_curtis(&[0.0, 0.0], &[5.0, 0.0]), 1.0);
    }

    #[test]
    fn test_empty_pair_is_undefined() {
        assert!(bray_curtis(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0]).is_nan());
        assert!(jaccard(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0]).is_nan());
    }

    #[test]
    fn test_jaccard() {
        assert_relative_eq!(jaccard(&[1.0, 5.0, 0.0], &[3.0, 0.0, 2.0]), 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(jaccard(&[1.0, 0.0], &[7.0, 0.0]), 0.0);
        assert_eq!(jaccard(&[0.0], &[3.0]), 1.0);
    }

    #[test]
    fn test_euclidean() {
        assert_relative_eq!(euclidean(&[0.0, 3.0], &[4.0, 0.0]), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_metric_names() {
        let names: Vec<&str> = BetaMetric::per_level(true).iter().map(|m| m.short_name()).collect();
        assert_eq!(names, vec!["bray", "jacc", "aitch"]);
        assert!(BetaMetric::WeightedUnifrac.is_phylogenetic());
    }
}
