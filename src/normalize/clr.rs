//! Centered Log-Ratio (CLR) transformation for compositional data.

use crate::data::CountMatrix;
use crate::error::{Result, SweepError};
use crate::normalize::tss::relative_abundance;
use crate::zero::add_pseudocount;
use nalgebra::DMatrix;
use rayon::prelude::*;

/// CLR-transformed values (features × samples).
#[derive(Debug, Clone)]
pub struct TransformedMatrix {
    pub data: DMatrix<f64>,
    pub feature_ids: Vec<String>,
    pub sample_ids: Vec<String>,
    /// Geometric mean of each input sample.
    pub geometric_means: Vec<f64>,
}

impl TransformedMatrix {
    pub fn get(&self, feature: usize, sample: usize) -> f64 {
        self.data[(feature, sample)]
    }

    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// One feature across samples.
    pub fn row(&self, feature: usize) -> Vec<f64> {
        self.data.row(feature).iter().cloned().collect()
    }

    /// One sample across features.
    pub fn col(&self, sample: usize) -> Vec<f64> {
        self.data.column(sample).iter().cloned().collect()
    }
}

/// Apply CLR to a strictly positive matrix.
///
/// For sample j: `clr(x_ij) = ln(x_ij) - mean_i(ln(x_ij))`.
pub fn norm_clr(
    data: &DMatrix<f64>,
    feature_ids: Vec<String>,
    sample_ids: Vec<String>,
) -> Result<TransformedMatrix> {
    let (n_features, n_samples) = data.shape();
    if n_features == 0 || n_samples == 0 {
        return Err(SweepError::EmptyData(
            "Cannot apply CLR to empty matrix".to_string(),
        ));
    }
    if let Some(((i, j), val)) = data
        .iter()
        .enumerate()
        .map(|(k, v)| ((k % n_features, k / n_features), *v))
        .find(|(_, v)| !(*v > 0.0))
    {
        return Err(SweepError::Numerical(format!(
            "CLR requires positive values; found {} at ({}, {})",
            val, i, j
        )));
    }

    let log_data = data.map(|x| x.ln());
    let mean_logs: Vec<f64> = (0..n_samples)
        .into_par_iter()
        .map(|j| log_data.column(j).sum() / n_features as f64)
        .collect();

    let clr_data = DMatrix::from_fn(n_features, n_samples, |i, j| log_data[(i, j)] - mean_logs[j]);

    Ok(TransformedMatrix {
        data: clr_data,
        feature_ids,
        sample_ids,
        geometric_means: mean_logs.iter().map(|m| m.exp()).collect(),
    })
}

/// Pseudocount, then relative abundance per sample, then CLR.
pub fn norm_clr_with_pseudocount(counts: &CountMatrix, pseudocount: f64) -> Result<TransformedMatrix> {
    let shifted = add_pseudocount(counts, pseudocount)?;
    let (proportions, _) = relative_abundance(&shifted);
    norm_clr(
        &proportions,
        counts.feature_ids().to_vec(),
        counts.sample_ids().to_vec(),
    )
}

/// Invert CLR: exponentiate and renormalize each sample to sum to one.
pub fn clr_inverse(clr: &TransformedMatrix) -> DMatrix<f64> {
    relative_abundance(&clr.data.map(|x| x.exp())).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_data() -> (DMatrix<f64>, Vec<String>, Vec<String>) {
        let data = DMatrix::from_row_slice(3, 4, &[
            10.5, 20.5, 15.5, 5.5,
            30.5, 40.5, 35.5, 25.5,
            5.5,  10.5, 8.5,  3.5,
        ]);
        let feature_ids = vec!["A".into(), "B".into(), "C".into()];
        let sample_ids = vec!["S1".into(), "S2".into(), "S3".into(), "S4".into()];
        (data, feature_ids, sample_ids)
    }

    #[test]
    fn test_clr_column_sums_zero() {
        let (data, feature_ids, sample_ids) = create_test_data();
        let result = norm_clr(&data, feature_ids, sample_ids).unwrap();

        for j in 0..result.n_samples() {
            assert_relative_eq!(result.data.column(j).sum(), 0.0, epsilon = 1e-10);
        }
        let expected_geom_mean = (10.5_f64 * 30.5 * 5.5).powf(1.0 / 3.0);
        assert_relative_eq!(result.geometric_means[0], expected_geom_mean, epsilon = 1e-10);
    }

    #[test]
    fn test_clr_manual_calculation() {
        let data = DMatrix::from_row_slice(2, 2, &[1.0, 4.0, 4.0, 1.0]);
        let result = norm_clr(&data, vec!["A".into(), "B".into()], vec!["S1".into(), "S2".into()]).unwrap();

        assert_relative_eq!(result.get(0, 0), -2.0_f64.ln(), epsilon = 1e-10);
        assert_relative_eq!(result.get(1, 0), 2.0_f64.ln(), epsilon = 1e-10);
        assert_relative_eq!(result.get(0, 1), 2.0_f64.ln(), epsilon = 1e-10);
    }

    #[test]
    fn test_clr_rejects_non_positive() {
        let data = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 4.0, 1.0]);
        assert!(norm_clr(&data, vec!["A".into(), "B".into()], vec!["S1".into(), "S2".into()]).is_err());
        let data = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, 4.0, 1.0]);
        assert!(norm_clr(&data, vec!["A".into(), "B".into()], vec!["S1".into(), "S2".into()]).is_err());
    }

    #[test]
    fn test_inverse_recovers_relative_abundance() {
        let counts = CountMatrix::from_triplets(
            vec!["A".into(), "B".into(), "C".into()],
            vec!["S1".into(), "S2".into()],
            vec![(0, 0, 10), (1, 0, 3), (0, 1, 7), (2, 1, 40)],
        )
        .unwrap();
        let clr = norm_clr_with_pseudocount(&counts, 1.0).unwrap();
        let recovered = clr_inverse(&clr);

        let (expected, _) = relative_abundance(&add_pseudocount(&counts, 1.0).unwrap());
        for (r, e) in recovered.iter().zip(expected.iter()) {
            assert_relative_eq!(*r, *e, epsilon = 1e-12);
        }
    }
}
