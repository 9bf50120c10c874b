//! Cohort selection for one (subset, outcome, model) combination.
//!
//! Drops incomplete rows, restricts to adults and the requested subset,
//! re-levels categorical covariates and, for survival outcomes, one-hot
//! encodes categorical model terms.

mod dummy;
mod relevel;
mod subset;

pub use dummy::{one_hot, DummyMap};
pub use relevel::{frequency_table, reference_order, relevel, LevelRule};
pub use subset::{Subset, ADULT_AGE, AGE_BANDS};

use crate::data::{AnalysisFrame, Formula};
use crate::error::Result;

pub const AGE: &str = "age";
pub const SEX: &str = "sex";
pub const MORTALITY: &str = "mortality";
pub const STUDYTIME: &str = "studytime";

/// Indicator covariates re-leveled in every cohort when present.
pub const BASE_FACTORS: [&str; 4] = ["ppump", "metfor", "statin", "race"];

/// Whether an outcome is analysed with a survival model.
pub fn is_survival_outcome(outcome: &str) -> bool {
    outcome == MORTALITY
}

/// A filtered, re-leveled cohort ready for assembly.
#[derive(Debug, Clone)]
pub struct Cohort {
    pub frame: AnalysisFrame,
    /// Indicator columns generated for survival designs (empty otherwise).
    pub dummies: DummyMap,
}

/// Columns that must be non-missing for a row to enter the cohort.
pub fn required_columns(model: &Formula, outcome: &str) -> Vec<String> {
    let mut columns: Vec<String> = model.terms().to_vec();
    columns.push(outcome.to_string());
    if is_survival_outcome(outcome) {
        columns.push(STUDYTIME.to_string());
        columns.push(AGE.to_string());
    }
    columns
}

/// Factor names re-leveled for a subset: the base indicators plus any
/// study-specific factors, with `sex` first unless the subset fixes it.
pub fn factor_names(subset: Subset, extra_factors: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    if !subset.fixes_sex() {
        names.push(SEX.to_string());
    }
    names.extend(BASE_FACTORS.iter().map(|f| f.to_string()));
    for factor in extra_factors {
        if !names.contains(factor) {
            names.push(factor.clone());
        }
    }
    names
}

/// Select complete, adult members of `subset` and prepare their covariates.
///
/// Missing model, outcome or age columns are schema errors. Factors that
/// the metadata does not carry are skipped.
pub fn find_complete(
    frame: &AnalysisFrame,
    model: &Formula,
    subset: Subset,
    outcome: &str,
    extra_factors: &[String],
) -> Result<Cohort> {
    let required = required_columns(model, outcome);
    let mut required_data = Vec::with_capacity(required.len());
    for name in &required {
        required_data.push(&frame.require(name)?.data);
    }

    let age = frame.numeric(AGE)?;
    let sex: Option<Vec<Option<String>>> = if subset.fixes_sex() {
        let data = &frame.require(SEX)?.data;
        Some((0..data.len()).map(|r| data.label(r)).collect())
    } else {
        None
    };

    let mut cohort = frame.filter_rows(|r| {
        required_data.iter().all(|d| !d.is_missing(r))
            && age[r] >= ADULT_AGE
            && subset.contains(sex.as_ref().and_then(|s| s[r].as_deref()), age[r])
    });
    log::debug!(
        "Subset '{}' with outcome '{}': {} of {} samples complete",
        subset,
        outcome,
        cohort.n_rows(),
        frame.n_rows()
    );

    for name in factor_names(subset, extra_factors) {
        let Some(column) = cohort.column(&name) else {
            log::debug!("Factor '{}' not in metadata, skipping", name);
            continue;
        };
        let rule = LevelRule::for_factor(&name, extra_factors);
        let releveled = relevel(&column.data, &rule);
        cohort.replace_data(&name, releveled)?;
    }

    let dummies = if is_survival_outcome(outcome) {
        one_hot(&mut cohort, model.terms())?
    } else {
        DummyMap::new()
    };

    Ok(Cohort {
        frame: cohort,
        dummies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnData, ColumnOrigin};
    use crate::error::SweepError;

    fn create_test_frame() -> AnalysisFrame {
        let ids: Vec<String> = (1..=8).map(|i| format!("S{}", i)).collect();
        let mut frame = AnalysisFrame::new(ids);
        let text = |v: &[&str]| {
            ColumnData::Text(
                v.iter()
                    .map(|s| if s.is_empty() { None } else { Some(s.to_string()) })
                    .collect(),
            )
        };
        frame
            .push_column(
                "age",
                ColumnOrigin::Metadata,
                ColumnData::Numeric(vec![17.0, 25.0, 45.0, 55.0, 65.0, 80.0, 39.9, f64::NAN]),
            )
            .unwrap();
        frame
            .push_column(
                "sex",
                ColumnOrigin::Metadata,
                text(&["men", "women", "men", "women", "men", "women", "men", "women"]),
            )
            .unwrap();
        frame
            .push_column(
                "race",
                ColumnOrigin::Metadata,
                text(&["black", "black", "white", "asian", "", "white", "black", "white"]),
            )
            .unwrap();
        frame
            .push_column(
                "statin",
                ColumnOrigin::Metadata,
                ColumnData::Numeric(vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
            )
            .unwrap();
        frame
            .push_column(
                "bmi",
                ColumnOrigin::Metadata,
                ColumnData::Numeric(vec![20.0, 21.0, 22.0, f64::NAN, 24.0, 25.0, 26.0, 27.0]),
            )
            .unwrap();
        frame
            .push_column(
                "mortality",
                ColumnOrigin::Metadata,
                ColumnData::Numeric(vec![0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]),
            )
            .unwrap();
        frame
            .push_column(
                "studytime",
                ColumnOrigin::Metadata,
                ColumnData::Numeric(vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0]),
            )
            .unwrap();
        frame
    }

    #[test]
    fn test_complete_adult_rows() {
        let frame = create_test_frame();
        let model = Formula::parse("race").unwrap();
        let cohort = find_complete(&frame, &model, Subset::All, "bmi", &[]).unwrap();
        // S1 under 18, S4 missing bmi, S5 missing race, S8 missing age
        assert_eq!(cohort.frame.sample_ids(), &["S2", "S3", "S6", "S7"]);
        assert!(cohort.dummies.is_empty());
    }

    #[test]
    fn test_relevel_in_cohort() {
        let frame = create_test_frame();
        let model = Formula::parse("race").unwrap();
        let cohort = find_complete(&frame, &model, Subset::All, "bmi", &[]).unwrap();
        let race = cohort.frame.require("race").unwrap();
        assert_eq!(race.data.levels().unwrap(), vec!["white", "black"]);
        let sex = cohort.frame.require("sex").unwrap();
        assert_eq!(sex.data.levels().unwrap(), vec!["men", "women"]);
        let statin = cohort.frame.require("statin").unwrap();
        assert_eq!(statin.data.levels().unwrap(), vec!["0", "1"]);
    }

    #[test]
    fn test_sex_subsets_partition_all() {
        let frame = create_test_frame();
        let model = Formula::parse("").unwrap();
        let all = find_complete(&frame, &model, Subset::All, "bmi", &[]).unwrap();
        let men = find_complete(&frame, &model, Subset::Men, "bmi", &[]).unwrap();
        let women = find_complete(&frame, &model, Subset::Women, "bmi", &[]).unwrap();
        assert_eq!(men.frame.n_rows() + women.frame.n_rows(), all.frame.n_rows());
        // sex is not re-leveled when the subset fixes it
        assert!(!men.frame.require("sex").unwrap().data.levels().unwrap().is_empty());
        assert!(matches!(
            men.frame.require("sex").unwrap().data,
            ColumnData::Text(_)
        ));
    }

    #[test]
    fn test_age_bands() {
        let frame = create_test_frame();
        let model = Formula::parse("").unwrap();
        let band1 = find_complete(&frame, &model, Subset::AgeBand(1), "bmi", &[]).unwrap();
        assert_eq!(band1.frame.sample_ids(), &["S2", "S7"]);
        let band5 = find_complete(&frame, &model, Subset::AgeBand(5), "bmi", &[]).unwrap();
        assert_eq!(band5.frame.sample_ids(), &["S6"]);
    }

    #[test]
    fn test_mortality_encodes_terms() {
        let frame = create_test_frame();
        let model = Formula::parse("race+statin").unwrap();
        let cohort = find_complete(&frame, &model, Subset::All, "mortality", &[]).unwrap();
        assert!(!cohort.frame.has_column("race"));
        assert!(cohort.frame.has_column("race_black"));
        assert_eq!(
            cohort.dummies.columns_for("statin").unwrap(),
            &["statin_1".to_string()]
        );
    }

    #[test]
    fn test_missing_model_term_is_schema_error() {
        let frame = create_test_frame();
        let model = Formula::parse("smoking").unwrap();
        let err = find_complete(&frame, &model, Subset::All, "bmi", &[]).unwrap_err();
        assert!(matches!(err, SweepError::MissingColumn(c) if c == "smoking"));
    }

    #[test]
    fn test_factor_names() {
        let names = factor_names(Subset::Men, &["site".to_string()]);
        assert_eq!(names, vec!["ppump", "metfor", "statin", "race", "site"]);
        assert_eq!(factor_names(Subset::All, &[])[0], "sex");
    }
}
