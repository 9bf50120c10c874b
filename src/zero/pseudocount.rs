//! Pseudocount addition for zero handling.

use crate::data::CountMatrix;
use crate::error::{Result, SweepError};
use nalgebra::DMatrix;

/// Add a pseudocount to every entry, converting to a dense
/// features × samples matrix.
///
/// The pseudocount is added to zero and non-zero entries alike, so the
/// result is strictly positive and safe to log-transform.
pub fn add_pseudocount(counts: &CountMatrix, pseudocount: f64) -> Result<DMatrix<f64>> {
    if !(pseudocount > 0.0) || !pseudocount.is_finite() {
        return Err(SweepError::InvalidParameter(format!(
            "Pseudocount must be positive, got {}",
            pseudocount
        )));
    }
    Ok(counts.to_dense().add_scalar(pseudocount))
}
