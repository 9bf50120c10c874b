//! Design matrix construction from an analysis frame.

use crate::data::frame::{AnalysisFrame, ColumnData};
use crate::error::{Result, SweepError};
use nalgebra::DMatrix;

pub const INTERCEPT: &str = "Intercept";

/// A design matrix for regression (complete-case samples × coefficients).
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    matrix: DMatrix<f64>,
    coefficient_names: Vec<String>,
    sample_ids: Vec<String>,
}

/// One block of design columns generated from a frame column.
struct TermColumns {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

/// Expand a frame column into design columns.
///
/// Numeric columns enter as-is. Categorical columns are treatment coded
/// against their first level, with columns named `term[T.level]`. Missing
/// values propagate as `NaN` in every generated column.
fn expand_term(frame: &AnalysisFrame, term: &str) -> Result<TermColumns> {
    let column = frame.require(term)?;
    match &column.data {
        ColumnData::Numeric(v) => Ok(TermColumns {
            names: vec![term.to_string()],
            columns: vec![v.clone()],
        }),
        data => {
            let levels = data.levels().unwrap_or_default();
            let labels: Vec<Option<String>> = (0..data.len()).map(|r| data.label(r)).collect();
            let mut names = Vec::new();
            let mut columns = Vec::new();
            for level in levels.iter().skip(1) {
                names.push(format!("{}[T.{}]", term, level));
                columns.push(
                    labels
                        .iter()
                        .map(|l| match l {
                            Some(l) if l == level => 1.0,
                            Some(_) => 0.0,
                            None => f64::NAN,
                        })
                        .collect(),
                );
            }
            Ok(TermColumns { names, columns })
        }
    }
}

impl DesignMatrix {
    /// Create a design matrix directly from components.
    pub fn from_matrix(
        matrix: DMatrix<f64>,
        coefficient_names: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        if matrix.ncols() != coefficient_names.len() {
            return Err(SweepError::DimensionMismatch {
                expected: matrix.ncols(),
                actual: coefficient_names.len(),
            });
        }
        if matrix.nrows() != sample_ids.len() {
            return Err(SweepError::DimensionMismatch {
                expected: matrix.nrows(),
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            matrix,
            coefficient_names,
            sample_ids,
        })
    }

    /// Linear-model design for `outcome ~ terms + variable`.
    ///
    /// Returns the design (intercept first, tested variable last) and the
    /// response. Rows with a missing value in any involved column are
    /// dropped. The outcome must be numeric-coercible.
    pub fn for_regression(
        frame: &AnalysisFrame,
        outcome: &str,
        terms: &[String],
        variable: &str,
    ) -> Result<(Self, Vec<f64>)> {
        let y_all = frame.numeric(outcome)?;

        let mut names = vec![INTERCEPT.to_string()];
        let mut columns = vec![vec![1.0; frame.n_rows()]];
        for term in terms {
            let block = expand_term(frame, term)?;
            names.extend(block.names);
            columns.extend(block.columns);
        }
        let var_col = frame.numeric(variable)?;
        names.push(variable.to_string());
        columns.push(var_col);

        let rows: Vec<usize> = (0..frame.n_rows())
            .filter(|&r| !y_all[r].is_nan() && columns.iter().all(|c| !c[r].is_nan()))
            .collect();

        let design = Self::assemble(frame, &rows, names, &columns)?;
        let y = rows.iter().map(|&r| y_all[r]).collect();
        Ok((design, y))
    }

    /// Design of numeric covariate columns without an intercept.
    ///
    /// Rows are kept only where every covariate and every `required` column
    /// is present; the kept frame row indices are returned alongside.
    pub fn from_numeric_columns(
        frame: &AnalysisFrame,
        covariates: &[String],
        required: &[&str],
    ) -> Result<(Self, Vec<usize>)> {
        let mut columns = Vec::with_capacity(covariates.len());
        for name in covariates {
            let column = frame.require(name)?;
            if column.data.is_categorical() {
                return Err(SweepError::Schema(format!(
                    "Covariate '{}' is categorical and was not encoded",
                    name
                )));
            }
            columns.push(frame.numeric(name)?);
        }
        let mut required_cols = Vec::with_capacity(required.len());
        for name in required {
            required_cols.push(frame.numeric(name)?);
        }

        let rows: Vec<usize> = (0..frame.n_rows())
            .filter(|&r| {
                columns.iter().all(|c| !c[r].is_nan())
                    && required_cols.iter().all(|c| !c[r].is_nan())
            })
            .collect();

        let design = Self::assemble(frame, &rows, covariates.to_vec(), &columns)?;
        Ok((design, rows))
    }

    fn assemble(
        frame: &AnalysisFrame,
        rows: &[usize],
        names: Vec<String>,
        columns: &[Vec<f64>],
    ) -> Result<Self> {
        let matrix = DMatrix::from_fn(rows.len(), columns.len(), |i, j| columns[j][rows[i]]);
        let sample_ids = rows
            .iter()
            .map(|&r| frame.sample_ids()[r].clone())
            .collect();
        Self::from_matrix(matrix, names, sample_ids)
    }

    /// Get the design matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Get coefficient names.
    pub fn coefficient_names(&self) -> &[String] {
        &self.coefficient_names
    }

    /// Get sample IDs.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Number of samples (rows).
    pub fn n_samples(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of coefficients (columns).
    pub fn n_coefficients(&self) -> usize {
        self.matrix.ncols()
    }

    /// Get the index of a coefficient by name.
    pub fn coefficient_index(&self, name: &str) -> Option<usize> {
        self.coefficient_names.iter().position(|n| n == name)
    }
}
