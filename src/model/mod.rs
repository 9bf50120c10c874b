//! Regression families used by the sweep.
//!
//! - **OLS** for continuous outcomes
//! - **Cox proportional hazards** for mortality

pub mod cox;
pub mod lm;

pub use cox::{fit_cox, CoxFit, MAX_ITERATIONS};
pub use lm::{fit_ols, OlsFit};
