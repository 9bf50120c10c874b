//! The combinatorial sweep: subset × outcome × model × candidate variable.

use crate::aggregate::ResultWriter;
use crate::assemble::{Assembler, AssemblyOptions, SampleData};
use crate::cohort::{find_complete, is_survival_outcome, DummyMap, Subset, AGE, MORTALITY, SEX, STUDYTIME};
use crate::data::{AnalysisFrame, AnalysisRow, ColumnData, ColumnOrigin, DesignMatrix, Formula, ResultTable};
use crate::diversity::DiversityEngine;
use crate::error::{Result, SweepError};
use crate::model::{fit_cox, fit_ols};
use crate::sweep::config::SweepConfig;
use crate::test::{test_wald, test_wald_cox};

/// Derived attained-age time scale for survival fits.
pub const FOLLOWUP: &str = "followup";

/// Inputs shared by every combination.
#[derive(Debug, Clone)]
pub struct SweepInputs {
    /// Full metadata as an analysis frame.
    pub metadata: AnalysisFrame,
    pub samples: SampleData,
}

/// The model actually fitted for a combination: `+age` unless the outcome
/// is age or mortality, and no `sex` term when the subset fixes sex.
pub fn working_model(model: &Formula, outcome: &str, subset: Subset) -> Formula {
    let mut working = model.clone();
    if outcome != AGE && !is_survival_outcome(outcome) {
        working = working.with_term(AGE);
    }
    if subset.fixes_sex() {
        working = working.without_term(SEX);
    }
    working
}

/// Append `followup = studytime + age` to a survival cohort.
fn add_followup(frame: &mut AnalysisFrame) -> Result<()> {
    let studytime = frame.numeric(STUDYTIME)?;
    let age = frame.numeric(AGE)?;
    let followup = studytime.iter().zip(&age).map(|(s, a)| s + a).collect();
    if frame.has_column(FOLLOWUP) {
        log::debug!("Replacing metadata column '{}' with derived follow-up", FOLLOWUP);
        frame.remove_column(FOLLOWUP)?;
    }
    frame.push_column(FOLLOWUP, ColumnOrigin::Derived, ColumnData::Numeric(followup))
}

/// Identifies one (subset, outcome, model) cell of the sweep.
#[derive(Debug, Clone)]
struct Combination<'a> {
    subset: Subset,
    outcome: &'a str,
    model: Formula,
}

impl Combination<'_> {
    fn row(&self, variable: &str) -> AnalysisRow {
        AnalysisRow {
            subset: self.subset.to_string(),
            outcome: self.outcome.to_string(),
            variable: variable.to_string(),
            model: self.model.to_string(),
            n: 0,
            n_cases: None,
            coefficient: f64::NAN,
            std_error: f64::NAN,
            hazard_ratio: None,
            lower: f64::NAN,
            upper: f64::NAN,
            t_value: None,
            p_value: f64::NAN,
        }
    }
}

/// `outcome ~ model + variable` by least squares.
fn fit_linear_row(combo: &Combination, frame: &AnalysisFrame, variable: &str) -> Result<AnalysisRow> {
    let (design, y) = DesignMatrix::for_regression(frame, combo.outcome, combo.model.terms(), variable)?;
    let fit = fit_ols(&design, &y)?;
    let wald = test_wald(&fit, variable)?;
    Ok(AnalysisRow {
        n: fit.n_obs,
        coefficient: wald.estimate,
        std_error: wald.std_error,
        lower: wald.lower,
        upper: wald.upper,
        t_value: Some(wald.statistic),
        p_value: wald.p_value,
        ..combo.row(variable)
    })
}

/// Proportional hazards on follow-up with mortality as the event.
fn fit_survival_row(
    combo: &Combination,
    frame: &AnalysisFrame,
    covariates: &[String],
    variable: &str,
) -> Result<AnalysisRow> {
    let (design, rows) = DesignMatrix::from_numeric_columns(frame, covariates, &[FOLLOWUP, MORTALITY])?;
    let followup = frame.numeric(FOLLOWUP)?;
    let mortality = frame.numeric(MORTALITY)?;
    let durations: Vec<f64> = rows.iter().map(|&r| followup[r]).collect();
    let events: Vec<bool> = rows.iter().map(|&r| mortality[r] != 0.0).collect();

    let fit = fit_cox(&design, &durations, &events)?;
    let wald = test_wald_cox(&fit, variable)?;
    let (hr, lower, upper) = wald.exponentiated();
    Ok(AnalysisRow {
        n: fit.n_obs,
        n_cases: Some(fit.n_events),
        coefficient: wald.estimate,
        std_error: wald.std_error,
        hazard_ratio: Some(hr),
        lower,
        upper,
        p_value: wald.p_value,
        ..combo.row(variable)
    })
}

/// Drives a sweep over one set of inputs.
pub struct SweepEngine<'a> {
    config: &'a SweepConfig,
    inputs: &'a SweepInputs,
    diversity: DiversityEngine,
    options: AssemblyOptions,
}

impl<'a> SweepEngine<'a> {
    /// Validate the configuration and size the distance thread pool.
    pub fn new(config: &'a SweepConfig, inputs: &'a SweepInputs) -> Result<Self> {
        config.validate()?;
        let diversity = DiversityEngine::new(config.threads)?;
        let options = AssemblyOptions {
            levels: config.levels(),
            transform: config.transform(),
            aitchison: config.aitchison,
        };
        Ok(Self {
            config,
            inputs,
            diversity,
            options,
        })
    }

    /// Run every combination in configured order.
    ///
    /// Each combination's rows are appended to the table as a block; the
    /// writer, if given, checkpoints the whole table after every block.
    pub fn run(&self, writer: Option<&ResultWriter>) -> Result<ResultTable> {
        let subsets = self.config.subsets()?;
        let models = self.config.formulas()?;
        let outcomes = self.config.outcome_names();

        let mut table = ResultTable::new();
        for &subset in &subsets {
            log::info!("Performing analyses of {}", subset);
            for outcome in &outcomes {
                for model in &models {
                    let rows = self.run_combination(subset, outcome, model)?;
                    table.extend(rows);
                    if let Some(writer) = writer {
                        writer.checkpoint(&table, subset)?;
                    }
                }
            }
            log::info!("Finished analyses of {}", subset);
        }
        Ok(table)
    }

    /// Fit every candidate variable for one combination.
    ///
    /// Fit failures are logged and leave no row; any other error aborts.
    pub fn run_combination(&self, subset: Subset, outcome: &str, model: &Formula) -> Result<Vec<AnalysisRow>> {
        let combo = Combination {
            subset,
            outcome,
            model: working_model(model, outcome, subset),
        };
        log::info!("Subset '{}', outcome '{}', model '{}'", subset, outcome, combo.model);

        let cohort = find_complete(
            &self.inputs.metadata,
            &combo.model,
            subset,
            outcome,
            &self.config.factors,
        )?;
        if cohort.frame.n_rows() == 0 {
            log::warn!("No complete samples for subset '{}' and outcome '{}'", subset, outcome);
            return Ok(Vec::new());
        }

        let assembler = Assembler::new(&self.inputs.samples, &self.options, &self.diversity);
        let mut frame = match assembler.assemble(&cohort.frame) {
            Ok(frame) => frame,
            Err(SweepError::EmptyData(msg)) => {
                log::warn!("Skipping subset '{}' and outcome '{}': {}", subset, outcome, msg);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let survival = is_survival_outcome(outcome);
        if survival {
            add_followup(&mut frame)?;
        }
        let variables: Vec<String> = frame
            .candidate_variables()
            .into_iter()
            .map(String::from)
            .collect();
        log::debug!("{} candidate variables", variables.len());

        let mut rows = Vec::with_capacity(variables.len());
        for variable in &variables {
            let covariates = survival_covariates(&cohort.dummies, &combo.model, variable);
            let fitted = if survival {
                fit_survival_row(&combo, &frame, &covariates, variable)
            } else {
                fit_linear_row(&combo, &frame, variable)
            };
            match fitted {
                Ok(row) => rows.push(row),
                Err(e) if e.is_recoverable() => {
                    log::warn!(
                        "Failed fit for variable '{}' in subset '{}' with outcome '{}': {}. Covariates: {:?}",
                        variable,
                        subset,
                        outcome,
                        e,
                        covariates
                    );
                }
                Err(e) => return Err(e),
            }
        }
        log::info!("{} of {} variables fitted", rows.len(), variables.len());
        Ok(rows)
    }
}

/// Model columns (dummies expanded) followed by the tested variable.
fn survival_covariates(dummies: &DummyMap, model: &Formula, variable: &str) -> Vec<String> {
    let mut covariates = dummies.expand_terms(model.terms());
    covariates.push(variable.to_string());
    covariates
}

/// Convenience wrapper: build an engine and run it.
pub fn run_sweep(config: &SweepConfig, inputs: &SweepInputs, writer: Option<&ResultWriter>) -> Result<ResultTable> {
    SweepEngine::new(config, inputs)?.run(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_working_model() {
        let base = Formula::parse("sex+ppump").unwrap();
        assert_eq!(working_model(&base, "bmi", Subset::All).to_string(), "sex+ppump+age");
        assert_eq!(working_model(&base, "age", Subset::All).to_string(), "sex+ppump");
        assert_eq!(working_model(&base, "mortality", Subset::All).to_string(), "sex+ppump");
        assert_eq!(working_model(&base, "bmi", Subset::Women).to_string(), "ppump+age");
        assert_eq!(working_model(&base, "bmi", Subset::AgeBand(1)).to_string(), "sex+ppump+age");
    }

    #[test]
    fn test_model_already_with_age() {
        let base = Formula::parse("age+sex").unwrap();
        assert_eq!(working_model(&base, "bmi", Subset::Men).to_string(), "age");
    }

    #[test]
    fn test_followup_is_studytime_plus_age() {
        let mut frame = AnalysisFrame::new(vec!["S1".into(), "S2".into()]);
        frame
            .push_column("age", ColumnOrigin::Metadata, ColumnData::Numeric(vec![40.0, 61.5]))
            .unwrap();
        frame
            .push_column("studytime", ColumnOrigin::Metadata, ColumnData::Numeric(vec![5.0, 2.5]))
            .unwrap();
        add_followup(&mut frame).unwrap();
        assert_eq!(frame.numeric(FOLLOWUP).unwrap(), vec![45.0, 64.0]);
        assert_eq!(frame.column(FOLLOWUP).unwrap().origin, ColumnOrigin::Derived);
        assert!(frame.candidate_variables().is_empty());
    }

    #[test]
    fn test_survival_covariates_use_dummies() {
        let mut dummies = DummyMap::new();
        dummies.insert("race", vec!["race_black".into(), "race_asian".into()]);
        let model = Formula::parse("race+ppump").unwrap();
        assert_eq!(
            survival_covariates(&dummies, &model, "min_bray_genus"),
            vec!["race_black", "race_asian", "ppump", "min_bray_genus"]
        );
    }
}
