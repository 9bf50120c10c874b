//! Ordinary least squares via the SVD pseudo-inverse.

use crate::data::DesignMatrix;
use crate::error::{FitError, Result, SweepError};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// A single least-squares fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsFit {
    pub coefficient_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    /// Residual standard error.
    pub sigma: f64,
    pub r_squared: f64,
    /// Residual degrees of freedom, `n - rank`.
    pub df_residual: usize,
    pub rank: usize,
    /// Number of observations used.
    pub n_obs: usize,
}

impl OlsFit {
    pub fn coefficient_index(&self, name: &str) -> Option<usize> {
        self.coefficient_names.iter().position(|n| n == name)
    }

    /// `(estimate, standard error)` for a named coefficient.
    pub fn estimate(&self, name: &str) -> Option<(f64, f64)> {
        let idx = self.coefficient_index(name)?;
        Some((self.coefficients[idx], self.std_errors[idx]))
    }
}

/// Fit `y = X b + e`.
///
/// Coefficients are `pinv(X) y`; the covariance is `sigma² pinv(X) pinv(X)'`
/// with `sigma² = RSS / (n - rank)`. Rank-deficient designs still fit, as
/// the pseudo-inverse picks the minimum-norm solution.
pub fn fit_ols(design: &DesignMatrix, y: &[f64]) -> Result<OlsFit> {
    let x = design.matrix();
    let n = x.nrows();
    let p = x.ncols();
    if y.len() != n {
        return Err(SweepError::DimensionMismatch {
            expected: n,
            actual: y.len(),
        });
    }
    if n == 0 || p == 0 {
        return Err(FitError::InsufficientData { n, p }.into());
    }

    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    let eps = f64::EPSILON * n.max(p) as f64 * max_sv;
    let rank = svd.rank(eps);
    if rank == 0 {
        return Err(FitError::Singular.into());
    }
    if n <= rank {
        return Err(FitError::InsufficientData { n, p: rank }.into());
    }
    if rank < p {
        log::debug!("Design has rank {} with {} columns", rank, p);
    }

    let pinv = svd
        .pseudo_inverse(eps)
        .map_err(|e| FitError::Undefined(e.to_string()))?;
    let y_vec = DVector::from_column_slice(y);
    let beta = &pinv * &y_vec;

    let residuals = &y_vec - x * &beta;
    let rss = residuals.norm_squared();
    let df_residual = n - rank;
    let sigma2 = rss / df_residual as f64;

    let cov_unscaled = &pinv * pinv.transpose();
    let std_errors: Vec<f64> = (0..p).map(|j| (sigma2 * cov_unscaled[(j, j)]).sqrt()).collect();
    let coefficients: Vec<f64> = beta.iter().copied().collect();
    if coefficients.iter().chain(&std_errors).any(|v| !v.is_finite()) {
        return Err(FitError::Undefined("non-finite estimate".to_string()).into());
    }

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let tss: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };

    Ok(OlsFit {
        coefficient_names: design.coefficient_names().to_vec(),
        coefficients,
        std_errors,
        sigma: sigma2.sqrt(),
        r_squared,
        df_residual,
        rank,
        n_obs: n,
    })
}
