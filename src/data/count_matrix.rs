//! Sparse taxon-count table.

use crate::error::{SweepError, Result};
use sprs::{CsMat, TriMat};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Sparse counts indexed by (feature, sample).
///
/// Rows are features (ASVs or collapsed taxa), columns are samples.
/// Stored in CSR form, so per-feature scans are cheap and per-sample
/// profiles are gathered with [`CountMatrix::col_dense`].
#[derive(Debug, Clone)]
pub struct CountMatrix {
    data: CsMat<u64>,
    feature_ids: Vec<String>,
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new CountMatrix from a sparse matrix and identifiers.
    pub fn new(
        data: CsMat<u64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(SweepError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(SweepError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
        })
    }

    /// Build from (feature, sample, count) triplets. Zero counts are dropped.
    pub fn from_triplets(
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
        triplets: impl IntoIterator<Item = (usize, usize, u64)>,
    ) -> Result<Self> {
        let mut tri_mat = TriMat::new((feature_ids.len(), sample_ids.len()));
        for (row, col, val) in triplets {
            if row >= feature_ids.len() || col >= sample_ids.len() {
                return Err(SweepError::InvalidParameter(format!(
                    "Triplet ({}, {}) out of bounds",
                    row, col
                )));
            }
            if val > 0 {
                tri_mat.add_triplet(row, col, val);
            }
        }
        Self::new(tri_mat.to_csr(), feature_ids, sample_ids)
    }

    /// Load a count table from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is the feature ID header)
    /// - Subsequent rows: feature ID followed by counts
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Parse a count table from any reader (see [`CountMatrix::from_tsv`]).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut lines = BufReader::new(reader).lines();

        let header_line = lines
            .next()
            .ok_or_else(|| SweepError::EmptyData("Empty count table".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(SweepError::EmptyData(
                "Count table must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
        let n_samples = sample_ids.len();

        let mut triplets: Vec<(usize, usize, u64)> = Vec::new();
        let mut feature_ids: Vec<String> = Vec::new();

        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let row_idx = feature_ids.len();
            let fields: Vec<&str> = line.split('\t').collect();
            feature_ids.push(fields[0].trim().to_string());

            for (col_idx, value_str) in fields[1..].iter().enumerate().take(n_samples) {
                let trimmed = value_str.trim();
                // Counts exported as floats ("12.0") are accepted when integral.
                let value = trimmed
                    .parse::<u64>()
                    .ok()
                    .or_else(|| {
                        trimmed
                            .parse::<f64>()
                            .ok()
                            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
                            .map(|v| v as u64)
                    })
                    .ok_or_else(|| SweepError::InvalidCount {
                        value: value_str.to_string(),
                        row: row_idx,
                        col: col_idx,
                    })?;
                triplets.push((row_idx, col_idx, value));
            }
        }

        if feature_ids.is_empty() {
            return Err(SweepError::EmptyData("No features in count table".to_string()));
        }

        Self::from_triplets(feature_ids, sample_ids, triplets)
    }

    /// Get the value at (row, col), returning 0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data.get(row, col).copied().unwrap_or(0)
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.rows()
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get the underlying sparse matrix.
    #[inline]
    pub fn data(&self) -> &CsMat<u64> {
        &self.data
    }

    /// Dense counts for one feature across all samples.
    pub fn row_dense(&self, row: usize) -> Vec<u64> {
        let mut dense = vec![0u64; self.n_samples()];
        if let Some(row_vec) = self.data.outer_view(row) {
            for (col, &val) in row_vec.iter() {
                dense[col] = val;
            }
        }
        dense
    }

    /// Dense counts for one sample across all features.
    pub fn col_dense(&self, col: usize) -> Vec<f64> {
        (0..self.n_features())
            .map(|row| self.get(row, col) as f64)
            .collect()
    }

    /// Per-sample profiles (one dense vector per sample), the layout the
    /// diversity metrics consume.
    pub fn sample_profiles(&self) -> Vec<Vec<f64>> {
        let mut profiles = vec![vec![0.0; self.n_features()]; self.n_samples()];
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                profiles[col][row] = val as f64;
            }
        }
        profiles
    }

    /// Library sizes (total counts per sample).
    pub fn col_sums(&self) -> Vec<u64> {
        let mut sums = vec![0u64; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }

    /// Subset the matrix to include only specified features (by index).
    pub fn subset_features(&self, indices: &[usize]) -> Result<Self> {
        let mut triplets = Vec::new();
        let mut new_feature_ids = Vec::with_capacity(indices.len());

        for (new_row, &old_row) in indices.iter().enumerate() {
            if old_row >= self.n_features() {
                return Err(SweepError::InvalidParameter(format!(
                    "Feature index {} out of bounds",
                    old_row
                )));
            }
            new_feature_ids.push(self.feature_ids[old_row].clone());
            if let Some(row_vec) = self.data.outer_view(old_row) {
                for (col, &val) in row_vec.iter() {
                    triplets.push((new_row, col, val));
                }
            }
        }

        Self::from_triplets(new_feature_ids, self.sample_ids.clone(), triplets)
    }

    /// Restrict to the given sample identifiers, in the given order.
    pub fn subset_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let position: HashMap<&str, usize> = self
            .sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();

        let mut col_map: HashMap<usize, usize> = HashMap::with_capacity(sample_ids.len());
        for (new_col, sid) in sample_ids.iter().enumerate() {
            let old_col = position.get(sid.as_str()).ok_or_else(|| {
                SweepError::SampleMismatch(format!("Sample '{}' not found in count table", sid))
            })?;
            col_map.insert(*old_col, new_col);
        }

        let mut triplets = Vec::new();
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (old_col, &val) in row_vec.iter() {
                if let Some(&new_col) = col_map.get(&old_col) {
                    triplets.push((row, new_col, val));
                }
            }
        }

        Self::from_triplets(self.feature_ids.clone(), sample_ids.to_vec(), triplets)
    }

    /// Sum feature rows that share a label.
    ///
    /// `labels[i]` names the group of feature `i`. Groups appear in the order
    /// their label is first seen, so collapsing is deterministic.
    pub fn collapse(&self, labels: &[String]) -> Result<Self> {
        if labels.len() != self.n_features() {
            return Err(SweepError::DimensionMismatch {
                expected: self.n_features(),
                actual: labels.len(),
            });
        }

        let mut group_of: HashMap<&str, usize> = HashMap::new();
        let mut group_ids: Vec<String> = Vec::new();
        let mut sums: HashMap<(usize, usize), u64> = HashMap::new();

        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            let label = labels[row].as_str();
            let group = *group_of.entry(label).or_insert_with(|| {
                group_ids.push(label.to_string());
                group_ids.len() - 1
            });
            for (col, &val) in row_vec.iter() {
                *sums.entry((group, col)).or_insert(0) += val;
            }
        }

        Self::from_triplets(
            group_ids,
            self.sample_ids.clone(),
            sums.into_iter().map(|((g, c), v)| (g, c, v)),
        )
    }

    /// Convert to a dense matrix (f64), features × samples.
    pub fn to_dense(&self) -> nalgebra::DMatrix<f64> {
        let mut dense = nalgebra::DMatrix::zeros(self.n_features(), self.n_samples());
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                dense[(row, col)] = val as f64;
            }
        }
        dense
    }
}
