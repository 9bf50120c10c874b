//! Sweep result rows and the append-only result table.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Estimates for one tested variable in one (subset, outcome, model).
///
/// Fields that do not apply to the regression family are `None` and are
/// written as empty CSV fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRow {
    #[serde(rename = "Datasplit")]
    pub subset: String,
    #[serde(rename = "Outcome")]
    pub outcome: String,
    #[serde(rename = "Variable")]
    pub variable: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "N")]
    pub n: usize,
    /// Number of observed events (survival fits only).
    #[serde(rename = "Ncases")]
    pub n_cases: Option<usize>,
    #[serde(rename = "Coefficient")]
    pub coefficient: f64,
    #[serde(rename = "Std.Error")]
    pub std_error: f64,
    /// Hazard ratio (survival fits only).
    #[serde(rename = "HR")]
    pub hazard_ratio: Option<f64>,
    /// Lower 95% bound; on the hazard-ratio scale for survival fits.
    #[serde(rename = "LL")]
    pub lower: f64,
    #[serde(rename = "UL")]
    pub upper: f64,
    /// t statistic (linear fits only).
    #[serde(rename = "t.value")]
    pub t_value: Option<f64>,
    #[serde(rename = "P")]
    pub p_value: f64,
}

/// Ordered, append-only collection of result rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<AnalysisRow>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: AnalysisRow) {
        self.rows.push(row);
    }

    pub fn extend<I: IntoIterator<Item = AnalysisRow>>(&mut self, rows: I) {
        self.rows.extend(rows);
    }

    pub fn rows(&self) -> &[AnalysisRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for one subset, in production order.
    pub fn for_subset<'a>(&'a self, subset: &'a str) -> impl Iterator<Item = &'a AnalysisRow> {
        self.rows.iter().filter(move |r| r.subset == subset)
    }

    /// Write as CSV (header always present, even with no rows).
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        wtr.write_record(HEADER)?;
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write to a CSV file, replacing any existing file.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(File::create(path)?)
    }

    /// Read a table previously written by [`ResultTable::to_csv`].
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let rows = rdr
            .deserialize()
            .collect::<std::result::Result<Vec<AnalysisRow>, _>>()?;
        Ok(Self { rows })
    }

    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_csv(File::open(path)?)
    }
}

/// Column header of result files.
pub const HEADER: [&str; 13] = [
    "Datasplit",
    "Outcome",
    "Variable",
    "Model",
    "N",
    "Ncases",
    "Coefficient",
    "Std.Error",
    "HR",
    "LL",
    "UL",
    "t.value",
    "P",
];
