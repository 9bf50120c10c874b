//! Total Sum Scaling (TSS): counts to relative abundances.

use crate::data::CountMatrix;
use nalgebra::DMatrix;

/// Relative abundances (features × samples) with their library sizes.
#[derive(Debug, Clone)]
pub struct TssMatrix {
    pub data: DMatrix<f64>,
    pub feature_ids: Vec<String>,
    pub sample_ids: Vec<String>,
    /// Total counts per sample before scaling.
    pub library_sizes: Vec<f64>,
}

impl TssMatrix {
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
}

/// Scale each column of a non-negative matrix to sum to one.
///
/// Columns summing to zero stay all-zero.
pub fn relative_abundance(data: &DMatrix<f64>) -> (DMatrix<f64>, Vec<f64>) {
    let sums: Vec<f64> = data.column_iter().map(|c| c.sum()).collect();
    let mut scaled = data.clone();
    for (j, mut col) in scaled.column_iter_mut().enumerate() {
        if sums[j] > 0.0 {
            col /= sums[j];
        }
    }
    (scaled, sums)
}

/// Apply Total Sum Scaling to a count matrix.
pub fn norm_tss(counts: &CountMatrix) -> TssMatrix {
    let (data, library_sizes) = relative_abundance(&counts.to_dense());
    TssMatrix {
        data,
        feature_ids: counts.feature_ids().to_vec(),
        sample_ids: counts.sample_ids().to_vec(),
        library_sizes,
    }
}
