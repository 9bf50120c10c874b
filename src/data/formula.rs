//! Base covariate models written as `term+term+...`.

use crate::error::{Result, SweepError};
use serde::{Deserialize, Serialize};

/// An additive covariate model such as `sex+race+bmi`.
///
/// Only main effects are supported; the outcome and the tested variable are
/// supplied separately when a regression is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    terms: Vec<String>,
}

impl Formula {
    /// Parse a model string.
    ///
    /// # Examples
    /// ```
    /// use cohort_sweep::data::Formula;
    /// let f = Formula::parse("sex + race").unwrap();
    /// assert_eq!(f.terms(), &["sex", "race"]);
    /// ```
    pub fn parse(model: &str) -> Result<Self> {
        let mut terms: Vec<String> = Vec::new();
        for raw in model.split('+') {
            let term = raw.trim();
            if term.is_empty() {
                continue;
            }
            if term.contains(['*', ':', '~', '(', ')']) {
                return Err(SweepError::FormulaParse(format!(
                    "Unsupported term '{}' in model '{}'",
                    term, model
                )));
            }
            let term = term.to_lowercase();
            if !terms.contains(&term) {
                terms.push(term);
            }
        }
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }

    /// Append a term unless already present.
    pub fn with_term(mut self, term: &str) -> Self {
        if !self.contains(term) {
            self.terms.push(term.to_string());
        }
        self
    }

    /// Remove a term if present.
    pub fn without_term(mut self, term: &str) -> Self {
        self.terms.retain(|t| t != term);
        self
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.terms.join("+"))
    }
}
