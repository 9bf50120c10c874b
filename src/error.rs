//! Error types for the cohort-sweep library.

use thiserror::Error;

/// Main error type for the library.
///
/// Everything except [`SweepError::Fit`] is fatal for a sweep: it invalidates
/// every downstream row, so the engine propagates it instead of skipping.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid count value '{value}' at row {row}, column {col}")]
    InvalidCount {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Column '{column}' is not numeric (value '{value}')")]
    NonNumeric { column: String, value: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("Formula parse error: {0}")]
    FormulaParse(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Model fit failed: {0}")]
    Fit(#[from] FitError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SweepError {
    /// Whether the sweep may log this error and continue with the next variable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SweepError::Fit(_))
    }
}

/// A regression rejected its input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("design matrix is singular")]
    Singular,

    #[error("no observed events")]
    NoEvents,

    #[error("did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("column '{column}' has zero variance")]
    ZeroVariance { column: String },

    #[error("not enough observations ({n}) for {p} parameters")]
    InsufficientData { n: usize, p: usize },

    #[error("estimate undefined: {0}")]
    Undefined(String),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, SweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fit_errors_are_recoverable() {
        assert!(SweepError::from(FitError::NoEvents).is_recoverable());
        assert!(!SweepError::Configuration("bad subset".into()).is_recoverable());
        assert!(!SweepError::MissingColumn("age".into()).is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = SweepError::NonNumeric {
            column: "bmi".into(),
            value: "high".into(),
        };
        assert_eq!(err.to_string(), "Column 'bmi' is not numeric (value 'high')");
    }
}
