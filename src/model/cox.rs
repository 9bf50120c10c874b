//! Cox proportional-hazards regression with Efron tie handling.
//!
//! Covariates are centred and scaled before Newton-Raphson; estimates are
//! mapped back to the original scale at the end. Each Newton step is halved
//! until the partial log-likelihood stops decreasing.

use crate::data::DesignMatrix;
use crate::error::{FitError, Result, SweepError};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Newton-Raphson iteration cap.
pub const MAX_ITERATIONS: usize = 50;

/// Relative log-likelihood change treated as converged.
const TOLERANCE: f64 = 1e-9;

/// Halvings tried before a step is declared a failure.
const MAX_HALVINGS: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoxFit {
    pub coefficient_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub log_likelihood: f64,
    pub iterations: usize,
    pub n_obs: usize,
    pub n_events: usize,
}

impl CoxFit {
    pub fn coefficient_index(&self, name: &str) -> Option<usize> {
        self.coefficient_names.iter().position(|n| n == name)
    }

    /// `(estimate, standard error)` for a named coefficient.
    pub fn estimate(&self, name: &str) -> Option<(f64, f64)> {
        let idx = self.coefficient_index(name)?;
        Some((self.coefficients[idx], self.std_errors[idx]))
    }
}

/// Partial log-likelihood with its gradient and observed information.
struct Efron {
    log_lik: f64,
    gradient: DVector<f64>,
    information: DMatrix<f64>,
}

/// Sample indices ordered by descending time.
fn descending_order(times: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| times[b].total_cmp(&times[a]));
    order
}

/// Evaluate the Efron partial likelihood at `beta`.
///
/// Walks samples from the latest time backwards so the risk-set sums grow
/// incrementally. The linear predictor is shifted by its maximum, which
/// leaves every returned quantity unchanged.
fn efron(x: &DMatrix<f64>, times: &[f64], events: &[bool], order: &[usize], beta: &DVector<f64>) -> Efron {
    let n = x.nrows();
    let p = x.ncols();
    let eta = x * beta;
    let shift = eta.max();

    let mut log_lik = 0.0;
    let mut gradient = DVector::zeros(p);
    let mut information = DMatrix::zeros(p, p);

    let mut s0 = 0.0;
    let mut s1 = DVector::zeros(p);
    let mut s2 = DMatrix::zeros(p, p);

    let mut i = 0;
    while i < n {
        let t = times[order[i]];
        let mut d = 0usize;
        let mut d0 = 0.0;
        let mut d1 = DVector::zeros(p);
        let mut d2 = DMatrix::zeros(p, p);

        let mut j = i;
        while j < n && times[order[j]] == t {
            let k = order[j];
            let xk = x.row(k).transpose();
            let w = (eta[k] - shift).exp();
            let outer = &xk * xk.transpose();
            s0 += w;
            s1 += &xk * w;
            s2 += &outer * w;
            if events[k] {
                d += 1;
                d0 += w;
                d1 += &xk * w;
                d2 += &outer * w;
                log_lik += eta[k] - shift;
                gradient += &xk;
            }
            j += 1;
        }

        for l in 0..d {
            let frac = l as f64 / d as f64;
            let denom = s0 - frac * d0;
            let a = &s1 - &d1 * frac;
            let b = &s2 - &d2 * frac;
            log_lik -= denom.ln();
            gradient -= &a / denom;
            information += &b / denom - (&a * a.transpose()) / (denom * denom);
        }
        i = j;
    }

    Efron {
        log_lik,
        gradient,
        information,
    }
}

/// Fit a proportional-hazards model with `durations` as time and `events`
/// as the event indicator. The design carries no intercept.
pub fn fit_cox(design: &DesignMatrix, durations: &[f64], events: &[bool]) -> Result<CoxFit> {
    let x_raw = design.matrix();
    let n = x_raw.nrows();
    let p = x_raw.ncols();
    if durations.len() != n || events.len() != n {
        return Err(SweepError::DimensionMismatch {
            expected: n,
            actual: durations.len().min(events.len()),
        });
    }
    let n_events = events.iter().filter(|&&e| e).count();
    if n_events == 0 {
        return Err(FitError::NoEvents.into());
    }
    if n <= p {
        return Err(FitError::InsufficientData { n, p }.into());
    }

    // Centre and scale each covariate
    let mut x = x_raw.clone();
    let mut scales = Vec::with_capacity(p);
    for (j, name) in design.coefficient_names().iter().enumerate() {
        let col = x_raw.column(j);
        let mean = col.mean();
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let sd = var.sqrt();
        if sd.is_nan() || sd <= 0.0 {
            return Err(FitError::ZeroVariance {
                column: name.clone(),
            }
            .into());
        }
        x.column_mut(j).iter_mut().for_each(|v| *v = (*v - mean) / sd);
        scales.push(sd);
    }

    let order = descending_order(durations);
    let mut beta = DVector::zeros(p);
    let mut state = efron(&x, durations, events, &order, &beta);
    let mut converged = false;
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        iterations += 1;
        let step = state
            .information
            .clone()
            .cholesky()
            .ok_or(FitError::Singular)?
            .solve(&state.gradient);

        let mut scale = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_HALVINGS {
            let candidate = &beta + &step * scale;
            let next = efron(&x, durations, events, &order, &candidate);
            if next.log_lik.is_finite() && next.log_lik >= state.log_lik - TOLERANCE {
                accepted = Some((candidate, next));
                break;
            }
            scale *= 0.5;
        }
        let Some((candidate, next)) = accepted else {
            return Err(FitError::NotConverged { iterations }.into());
        };

        let change = (next.log_lik - state.log_lik).abs() / (state.log_lik.abs() + 0.1);
        beta = candidate;
        state = next;
        if change < TOLERANCE {
            converged = true;
            break;
        }
    }
    if !converged {
        return Err(FitError::NotConverged { iterations }.into());
    }

    let covariance = state
        .information
        .clone()
        .try_inverse()
        .ok_or(FitError::Singular)?;

    let coefficients: Vec<f64> = (0..p).map(|j| beta[j] / scales[j]).collect();
    let std_errors: Vec<f64> = (0..p)
        .map(|j| covariance[(j, j)].sqrt() / scales[j])
        .collect();
    if coefficients.iter().chain(&std_errors).any(|v| !v.is_finite()) {
        return Err(FitError::Undefined("non-finite estimate".to_string()).into());
    }

    log::debug!(
        "Cox fit: {} obs, {} events, {} iterations, loglik {:.4}",
        n,
        n_events,
        iterations,
        state.log_lik
    );

    Ok(CoxFit {
        coefficient_names: design.coefficient_names().to_vec(),
        coefficients,
        std_errors,
        log_likelihood: state.log_lik,
        iterations,
        n_obs: n,
        n_events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn single_covariate(values: &[f64]) -> DesignMatrix {
        DesignMatrix::from_matrix(
            DMatrix::from_column_slice(values.len(), 1, values),
            vec!["x".into()],
            (0..values.len()).map(|i| format!("S{}", i)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_closed_form_estimate() {
        // Risk sets: t=1 {0,1,0,1} a zero dies; t=2 {1,0,1} a one dies;
        // t=4 {1} a one dies. Score -e/(1+e) + 1/(1+2e) = 0 gives e^b = 1/sqrt(2).
        let design = single_covariate(&[0.0, 1.0, 0.0, 1.0]);
        let times = [1.0, 2.0, 3.0, 4.0];
        let events = [true, true, false, true];
        let fit = fit_cox(&design, &times, &events).unwrap();
        assert_eq!(fit.n_events, 3);
        assert_eq!(fit.n_obs, 4);
        assert_relative_eq!(fit.coefficients[0], -0.5 * 2f64.ln(), epsilon = 1e-4);
    }

    #[test]
    fn test_efron_ties_gradient_vanishes() {
        let x = [0.5, 1.2, -0.3, 0.8, 0.0, 1.5, -1.0, 0.2];
        let times = [5.0, 3.0, 5.0, 2.0, 8.0, 3.0, 9.0, 6.0];
        let events = [true, true, true, false, true, true, false, true];
        let fit = fit_cox(&single_covariate(&x), &times, &events).unwrap();

        let xm = DMatrix::from_column_slice(8, 1, &x);
        let order = descending_order(&times);
        let at_optimum = efron(&xm, &times, &events, &order, &DVector::from_vec(fit.coefficients.clone()));
        assert_relative_eq!(at_optimum.gradient[0], 0.0, epsilon = 1e-4);
        assert_relative_eq!(at_optimum.log_lik, fit.log_likelihood, epsilon = 1e-6);
        assert!(fit.std_errors[0] > 0.0);
    }

    #[test]
    fn test_no_events() {
        let design = single_covariate(&[0.0, 1.0, 2.0]);
        let err = fit_cox(&design, &[1.0, 2.0, 3.0], &[false, false, false]).unwrap_err();
        assert!(matches!(err, SweepError::Fit(FitError::NoEvents)));
    }

    #[test]
    fn test_constant_covariate() {
        let design = single_covariate(&[2.0, 2.0, 2.0, 2.0]);
        let err = fit_cox(&design, &[1.0, 2.0, 3.0, 4.0], &[true, true, false, true]).unwrap_err();
        assert!(matches!(
            err,
            SweepError::Fit(FitError::ZeroVariance { ref column }) if column == "x"
        ));
    }

    #[test]
    fn test_named_estimate() {
        let x = [0.5, 1.2, -0.3, 0.8, 0.0, 1.5, -1.0, 0.2];
        let times = [5.0, 3.0, 5.0, 2.0, 8.0, 3.0, 9.0, 6.0];
        let events = [true, true, true, false, true, true, false, true];
        let fit = fit_cox(&single_covariate(&x), &times, &events).unwrap();
        let (coef, se) = fit.estimate("x").unwrap();
        assert_eq!(coef, fit.coefficients[0]);
        assert_eq!(se, fit.std_errors[0]);
        assert!(fit.estimate("y").is_none());
    }
}
