//! Result aggregation: checkpoint and final result files.

use crate::cohort::Subset;
use crate::data::ResultTable;
use crate::error::Result;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Date format used in result file names.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `<dir>/Results_<label>_<subset>_<cohort>_<date>.csv`
pub fn checkpoint_path(dir: &Path, label: &str, subset: Subset, cohort: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!(
        "Results_{}_{}_{}_{}.csv",
        label,
        subset,
        cohort,
        date.format(DATE_FORMAT)
    ))
}

/// `<dir>/Results_<cohort>_<label>_<date>.csv`
pub fn final_path(dir: &Path, cohort: &str, label: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!(
        "Results_{}_{}_{}.csv",
        cohort,
        label,
        date.format(DATE_FORMAT)
    ))
}

/// Writes the growing result table to disk for one run.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    checkpoint_dir: PathBuf,
    output_dir: PathBuf,
    label: String,
    cohort: String,
    date: NaiveDate,
}

impl ResultWriter {
    pub fn new(
        checkpoint_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        label: &str,
        cohort: &str,
        date: NaiveDate,
    ) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            output_dir: output_dir.into(),
            label: label.to_string(),
            cohort: cohort.to_string(),
            date,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn checkpoint_path(&self, subset: Subset) -> PathBuf {
        checkpoint_path(&self.checkpoint_dir, &self.label, subset, &self.cohort, self.date)
    }

    pub fn final_path(&self) -> PathBuf {
        final_path(&self.output_dir, &self.cohort, &self.label, self.date)
    }

    /// Overwrite the checkpoint for `subset` with the full table so far.
    pub fn checkpoint(&self, table: &ResultTable, subset: Subset) -> Result<PathBuf> {
        fs::create_dir_all(&self.checkpoint_dir)?;
        let path = self.checkpoint_path(subset);
        table.to_csv(&path)?;
        log::debug!("Checkpointed {} rows to {}", table.len(), path.display());
        Ok(path)
    }

    /// Write the complete table.
    pub fn finalize(&self, table: &ResultTable) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.final_path();
        table.to_csv(&path)?;
        log::info!("Wrote {} result rows to {}", table.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AnalysisRow;
    use tempfile::tempdir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn test_paths() {
        let dir = Path::new("out");
        assert_eq!(
            checkpoint_path(dir, "16s", Subset::AgeBand(2), "lifelines", date()),
            PathBuf::from("out/Results_16s_age_2_lifelines_2024-03-07.csv")
        );
        assert_eq!(
            final_path(dir, "lifelines", "shotgun", date()),
            PathBuf::from("out/Results_lifelines_shotgun_2024-03-07.csv")
        );
    }

    #[test]
    fn test_checkpoint_overwrites_and_finalize() {
        let dir = tempdir().unwrap();
        let writer = ResultWriter::new(
            dir.path().join("intermediatefiles"),
            dir.path(),
            "16s",
            "demo",
            date(),
        );

        let mut table = ResultTable::new();
        let first = writer.checkpoint(&table, Subset::All).unwrap();
        assert!(ResultTable::from_csv(&first).unwrap().is_empty());

        table.push(AnalysisRow {
            subset: "all".into(),
            outcome: "bmi".into(),
            variable: "chao1_genus".into(),
            model: "sex+age".into(),
            n: 10,
            n_cases: None,
            coefficient: 0.5,
            std_error: 0.25,
            hazard_ratio: None,
            lower: 0.1,
            upper: 0.9,
            t_value: Some(2.0),
            p_value: 0.08,
        });
        let second = writer.checkpoint(&table, Subset::All).unwrap();
        assert_eq!(first, second);
        assert_eq!(ResultTable::from_csv(&second).unwrap(), table);

        let final_file = writer.finalize(&table).unwrap();
        assert_eq!(final_file, dir.path().join("Results_demo_16s_2024-03-07.csv"));
        assert_eq!(ResultTable::from_csv(&final_file).unwrap().len(), 1);
    }
}
