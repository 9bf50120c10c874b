//! Pairwise distance matrices and the per-sample uniqueness score.

use crate::error::{Result, SweepError};
use nalgebra::DMatrix;
use rayon::prelude::*;
use rayon::ThreadPool;

/// Symmetric sample × sample dissimilarities with a zero diagonal.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    sample_ids: Vec<String>,
    data: DMatrix<f64>,
}

impl DistanceMatrix {
    pub fn new(sample_ids: Vec<String>, data: DMatrix<f64>) -> Result<Self> {
        if !data.is_square() {
            return Err(SweepError::DimensionMismatch {
                expected: data.nrows(),
                actual: data.ncols(),
            });
        }
        if data.nrows() != sample_ids.len() {
            return Err(SweepError::DimensionMismatch {
                expected: data.nrows(),
                actual: sample_ids.len(),
            });
        }
        Ok(Self { sample_ids, data })
    }

    /// Fill the matrix from `dist(i, j)` on the given pool.
    ///
    /// Only the upper triangle is evaluated; the lower triangle is mirrored.
    pub fn from_pairs<F>(sample_ids: Vec<String>, pool: &ThreadPool, dist: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let n = sample_ids.len();
        let rows: Vec<Vec<f64>> = pool.install(|| {
            (0..n)
                .into_par_iter()
                .map(|i| ((i + 1)..n).map(|j| dist(i, j)).collect())
                .collect()
        });

        let mut data = DMatrix::zeros(n, n);
        for (i, row) in rows.iter().enumerate() {
            for (offset, &d) in row.iter().enumerate() {
                let j = i + 1 + offset;
                data[(i, j)] = d;
                data[(j, i)] = d;
            }
        }
        Self::new(sample_ids, data)
    }

    /// Compute every pair of profiles with `metric`; `profiles[i]` belongs to
    /// `sample_ids[i]`.
    pub fn pairwise<F>(
        sample_ids: Vec<String>,
        profiles: &[Vec<f64>],
        pool: &ThreadPool,
        metric: F,
    ) -> Result<Self>
    where
        F: Fn(&[f64], &[f64]) -> f64 + Sync,
    {
        if profiles.len() != sample_ids.len() {
            return Err(SweepError::DimensionMismatch {
                expected: sample_ids.len(),
                actual: profiles.len(),
            });
        }
        Self::from_pairs(sample_ids, pool, |i, j| metric(&profiles[i], &profiles[j]))
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[(i, j)]
    }

    /// Uniqueness: each sample's smallest distance to any other sample.
    ///
    /// The diagonal is ignored; a lone sample scores NaN.
    pub fn min_dissimilarity(&self) -> Vec<f64> {
        let n = self.n_samples();
        (0..n)
            .map(|i| {
                (0..n)
                    .filter(|&j| j != i)
                    .map(|j| self.data[(i, j)])
                    .filter(|d| !d.is_nan())
                    .fold(f64::NAN, f64::min)
            })
            .collect()
    }
}
