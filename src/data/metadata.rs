//! Clinical sample metadata as loaded from a TSV table.

use crate::error::{Result, SweepError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Name of the sample identifier column after lower-casing.
pub const SAMPLE_ID_COLUMN: &str = "sampleid";

const MISSING_MARKERS: [&str; 5] = ["", "NA", "na", "NaN", "nan"];

/// A single metadata cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels.
    Categorical(String),
    /// Continuous numeric variable.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }

    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_continuous(&self) -> Option<f64> {
        match self {
            Variable::Continuous(v) => Some(*v),
            _ => None,
        }
    }
}

/// Inferred type of a metadata column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
}

/// Sample metadata, stored column-major in file order.
///
/// Column names are lower-cased on load. The `sampleid` column may appear at
/// any position and is held separately from the variable columns.
#[derive(Debug, Clone)]
pub struct Metadata {
    sample_ids: Vec<String>,
    column_names: Vec<String>,
    column_types: Vec<VariableType>,
    columns: Vec<Vec<Variable>>,
}

fn is_missing_marker(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw)
}

impl Metadata {
    /// Load metadata from a TSV file.
    ///
    /// A column is continuous when every non-missing value parses as a
    /// number, otherwise categorical.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Parse metadata from any reader (see [`Metadata::from_tsv`]).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut lines = BufReader::new(reader).lines();

        let header_line = lines
            .next()
            .ok_or_else(|| SweepError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<String> = header_line
            .split('\t')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let id_idx = header
            .iter()
            .position(|h| h == SAMPLE_ID_COLUMN)
            .ok_or_else(|| SweepError::MissingColumn(SAMPLE_ID_COLUMN.to_string()))?;

        let mut seen = HashSet::new();
        for name in &header {
            if !seen.insert(name.as_str()) {
                return Err(SweepError::Schema(format!(
                    "Duplicate metadata column '{}'",
                    name
                )));
            }
        }

        let column_names: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id_idx)
            .map(|(_, h)| h.clone())
            .collect();

        let mut sample_ids = Vec::new();
        let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); column_names.len()];

        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let sample_id = fields.get(id_idx).map(|s| s.trim()).unwrap_or("");
            if sample_id.is_empty() {
                return Err(SweepError::Schema(format!(
                    "Row {} has no sample identifier",
                    sample_ids.len() + 1
                )));
            }
            sample_ids.push(sample_id.to_string());

            let mut col = 0;
            for (field_idx, _) in header.iter().enumerate() {
                if field_idx == id_idx {
                    continue;
                }
                let raw = fields.get(field_idx).map(|s| s.trim()).unwrap_or("");
                raw_columns[col].push(raw.to_string());
                col += 1;
            }
        }

        if sample_ids.is_empty() {
            return Err(SweepError::EmptyData("No samples in metadata".to_string()));
        }

        let mut column_types = Vec::with_capacity(column_names.len());
        let mut columns = Vec::with_capacity(column_names.len());

        for raw in raw_columns {
            let all_numeric = raw
                .iter()
                .all(|v| is_missing_marker(v) || v.parse::<f64>().is_ok());
            let var_type = if all_numeric {
                VariableType::Continuous
            } else {
                VariableType::Categorical
            };

            let values = raw
                .into_iter()
                .map(|v| {
                    if is_missing_marker(&v) {
                        Variable::Missing
                    } else {
                        match var_type {
                            VariableType::Continuous => v
                                .parse::<f64>()
                                .map(Variable::Continuous)
                                .unwrap_or(Variable::Missing),
                            VariableType::Categorical => Variable::Categorical(v),
                        }
                    }
                })
                .collect();

            column_types.push(var_type);
            columns.push(values);
        }

        Ok(Self {
            sample_ids,
            column_names,
            column_types,
            columns,
        })
    }

    /// Sample IDs in file order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Variable column names (lower-cased, excluding `sampleid`).
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == column)
    }

    /// Get all values for a column.
    pub fn column(&self, column: &str) -> Result<&[Variable]> {
        self.column_index(column)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| SweepError::MissingColumn(column.to_string()))
    }

    /// Get the inferred type of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_index(column).map(|i| self.column_types[i])
    }

    /// Get a single value.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        let row = self.sample_ids.iter().position(|s| s == sample_id)?;
        let col = self.column_index(column)?;
        self.columns[col].get(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_tsv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Age\tSampleID\tSex\tBMI").unwrap();
        writeln!(file, "25\tS1\tmen\t22.5").unwrap();
        writeln!(file, "30\tS2\twomen\tNA").unwrap();
        writeln!(file, "NaN\tS3\t\t30.1").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_sample_id_column_anywhere() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert_eq!(meta.sample_ids(), &["S1", "S2", "S3"]);
        assert_eq!(meta.column_names(), &["age", "sex", "bmi"]);
        assert_eq!(meta.n_columns(), 3);
    }

    #[test]
    fn test_type_inference_and_missing_markers() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert_eq!(meta.column_type("age"), Some(VariableType::Continuous));
        assert_eq!(meta.column_type("sex"), Some(VariableType::Categorical));
        assert_eq!(meta.get("S2", "age").unwrap().as_continuous(), Some(30.0));
        assert!(meta.get("S3", "age").unwrap().is_missing());
        assert!(meta.get("S3", "sex").unwrap().is_missing());
        assert!(meta.get("S2", "bmi").unwrap().is_missing());
        assert_eq!(meta.get("S1", "sex").unwrap().as_categorical(), Some("men"));
    }

    #[test]
    fn test_missing_sample_id_column() {
        let tsv = "id\tage\nS1\t20\n";
        let err = Metadata::from_reader(tsv.as_bytes()).unwrap_err();
        assert!(matches!(err, SweepError::MissingColumn(c) if c == "sampleid"));
    }

    #[test]
    fn test_missing_column_lookup() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();
        assert!(meta.column("mortality").is_err());
        assert!(meta.column("bmi").is_ok());
    }
}
