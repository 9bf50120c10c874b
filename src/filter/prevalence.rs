//! Conditional abundance/prevalence filtering for count matrices.

use crate::data::CountMatrix;
use crate::error::{Result, SweepError};
use crate::normalize::norm_tss;
use rayon::prelude::*;

/// Keep features whose relative abundance reaches `abundance` in at least a
/// `prevalence` fraction of samples.
///
/// Both thresholds are inclusive: a feature at exactly `abundance` counts as
/// present, as in qiime's `filter_features_conditionally`. Relative
/// abundance is computed per sample over all features before filtering. The result may have no features; callers decide whether that
/// is fatal.
pub fn filter_conditional(
    counts: &CountMatrix,
    abundance: f64,
    prevalence: f64,
) -> Result<CountMatrix> {
    for (name, value) in [("Abundance", abundance), ("Prevalence", prevalence)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(SweepError::InvalidParameter(format!(
                "{} threshold must be between 0 and 1, got {}",
                name, value
            )));
        }
    }

    let tss = norm_tss(counts);
    let min_samples = prevalence * counts.n_samples() as f64;

    let keep_indices: Vec<usize> = (0..counts.n_features())
        .into_par_iter()
        .filter(|&row| {
            let n_abundant = (0..tss.n_samples())
                .filter(|&j| tss.get(row, j) >= abundance)
                .count();
            n_abundant as f64 >= min_samples
        })
        .collect();

    log::debug!(
        "Conditional filter kept {} of {} features (abundance {}, prevalence {})",
        keep_indices.len(),
        counts.n_features(),
        abundance,
        prevalence
    );

    counts.subset_features(&keep_indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_matrix() -> CountMatrix {
        // 3 features × 10 samples; each sample has 100 reads
        let mut triplets = Vec::new();
        for j in 0..10 {
            triplets.push((0, j, 90));
            // B: 5% in two samples, 1% elsewhere. C: 5% then 9%
            if j < 2 {
                triplets.push((1, j, 5));
                triplets.push((2, j, 5));
            } else {
                triplets.push((1, j, 1));
                triplets.push((2, j, 9));
            }
        }
        CountMatrix::from_triplets(
            vec!["A".into(), "B".into(), "C".into()],
            (0..10).map(|j| format!("S{}", j)).collect(),
            triplets,
        )
        .unwrap()
    }

    #[test]
    fn test_conditional_filter() {
        let counts = create_test_matrix();

        let kept = filter_conditional(&counts, 0.01, 0.1).unwrap();
        assert_eq!(kept.n_features(), 3);

        // At 5%: A everywhere, B in 2/10 samples, C in 10/10
        let kept = filter_conditional(&counts, 0.05, 0.3).unwrap();
        assert_eq!(kept.feature_ids(), &["A", "C"]);

        let kept = filter_conditional(&counts, 0.05, 0.2).unwrap();
        assert_eq!(kept.feature_ids(), &["A", "B", "C"]);
    }

    #[test]
    fn test_abundance_threshold_is_inclusive() {
        let counts = create_test_matrix();
        // B sits at exactly 1% in eight samples
        let kept = filter_conditional(&counts, 0.01, 1.0).unwrap();
        assert_eq!(kept.feature_ids(), &["A", "B", "C"]);

        let kept = filter_conditional(&counts, 0.011, 1.0).unwrap();
        assert_eq!(kept.feature_ids(), &["A", "C"]);
    }

    #[test]
    fn test_filter_may_empty_table() {
        let counts = create_test_matrix();
        let kept = filter_conditional(&counts, 0.95, 0.1).unwrap();
        assert_eq!(kept.n_features(), 0);
        assert_eq!(kept.n_samples(), 10);
    }

    #[test]
    fn test_invalid_thresholds() {
        let counts = create_test_matrix();
        assert!(filter_conditional(&counts, 1.5, 0.1).is_err());
        assert!(filter_conditional(&counts, 0.01, -0.1).is_err());
    }
}
