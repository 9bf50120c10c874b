//! The wide per-sample analysis frame that regressions read from.

use crate::data::metadata::{Metadata, Variable, VariableType};
use crate::error::{Result, SweepError};

/// Values of one frame column. Missing numeric values are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    /// Categorical column with an ordered level set; the first level is the
    /// reference.
    Factor {
        levels: Vec<String>,
        codes: Vec<Option<usize>>,
    },
    /// Free-form strings with no declared level order.
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Factor { codes, .. } => codes.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v[row].is_nan(),
            ColumnData::Factor { codes, .. } => codes[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
        }
    }

    pub fn is_categorical(&self) -> bool {
        !matches!(self, ColumnData::Numeric(_))
    }

    /// String form of a value, `None` when missing.
    pub fn label(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Numeric(v) => {
                let x = v[row];
                if x.is_nan() {
                    None
                } else {
                    Some(format_number(x))
                }
            }
            ColumnData::Factor { levels, codes } => codes[row].map(|c| levels[c].clone()),
            ColumnData::Text(v) => v[row].clone(),
        }
    }

    /// Levels of a categorical column in coding order.
    ///
    /// Factors keep their declared order; text columns use sorted distinct
    /// values. Numeric columns have no levels.
    pub fn levels(&self) -> Option<Vec<String>> {
        match self {
            ColumnData::Numeric(_) => None,
            ColumnData::Factor { levels, .. } => Some(levels.clone()),
            ColumnData::Text(v) => {
                let mut levels: Vec<String> = v.iter().flatten().cloned().collect();
                levels.sort();
                levels.dedup();
                Some(levels)
            }
        }
    }

    fn select(&self, rows: &[usize]) -> Self {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Factor { levels, codes } => ColumnData::Factor {
                levels: levels.clone(),
                codes: rows.iter().map(|&r| codes[r]).collect(),
            },
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }
}

/// Integral values print without a fractional part so that `1.0` and `"1"`
/// name the same level.
pub(crate) fn format_number(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// Where a frame column came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOrigin {
    /// Loaded from the metadata table.
    Metadata,
    /// One-hot indicator generated from a categorical model term.
    Dummy { term: String },
    /// Alpha diversity or beta uniqueness score.
    Diversity,
    /// Log-ratio transformed taxon abundance.
    Feature,
    /// Computed from other columns (e.g. follow-up time).
    Derived,
}

impl ColumnOrigin {
    /// Whether columns of this origin are tested as sweep variables.
    pub fn is_candidate(&self) -> bool {
        matches!(self, ColumnOrigin::Diversity | ColumnOrigin::Feature)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub origin: ColumnOrigin,
    pub data: ColumnData,
}

/// Samples × named columns, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFrame {
    sample_ids: Vec<String>,
    columns: Vec<Column>,
}

impl AnalysisFrame {
    /// An empty frame over the given samples.
    pub fn new(sample_ids: Vec<String>) -> Self {
        Self {
            sample_ids,
            columns: Vec::new(),
        }
    }

    /// Convert loaded metadata into a frame, one column per metadata column.
    pub fn from_metadata(metadata: &Metadata) -> Result<Self> {
        let mut frame = Self::new(metadata.sample_ids().to_vec());
        for name in metadata.column_names() {
            let values = metadata.column(name)?;
            let data = match metadata.column_type(name) {
                Some(VariableType::Continuous) => ColumnData::Numeric(
                    values
                        .iter()
                        .map(|v| v.as_continuous().unwrap_or(f64::NAN))
                        .collect(),
                ),
                _ => ColumnData::Text(
                    values
                        .iter()
                        .map(|v| match v {
                            Variable::Categorical(s) => Some(s.clone()),
                            Variable::Continuous(x) => Some(format_number(*x)),
                            Variable::Missing => None,
                        })
                        .collect(),
                ),
            };
            frame.push_column(name, ColumnOrigin::Metadata, data)?;
        }
        Ok(frame)
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.sample_ids.len()
    }

    #[inline]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column, failing with `MissingColumn`.
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| SweepError::MissingColumn(name.to_string()))
    }

    /// Numeric view of a column; text values must parse as numbers.
    pub fn numeric(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.require(name)?;
        match &column.data {
            ColumnData::Numeric(v) => Ok(v.clone()),
            other => (0..other.len())
                .map(|row| match other.label(row) {
                    None => Ok(f64::NAN),
                    Some(label) => label.parse::<f64>().map_err(|_| SweepError::NonNumeric {
                        column: name.to_string(),
                        value: label,
                    }),
                })
                .collect(),
        }
    }

    /// Append a column. Names must be unique and lengths must match.
    pub fn push_column(&mut self, name: &str, origin: ColumnOrigin, data: ColumnData) -> Result<()> {
        if data.len() != self.n_rows() {
            return Err(SweepError::DimensionMismatch {
                expected: self.n_rows(),
                actual: data.len(),
            });
        }
        if self.has_column(name) {
            return Err(SweepError::Schema(format!("Duplicate column '{}'", name)));
        }
        self.columns.push(Column {
            name: name.to_string(),
            origin,
            data,
        });
        Ok(())
    }

    /// Replace a column's values in place, keeping its name and position.
    pub fn replace_data(&mut self, name: &str, data: ColumnData) -> Result<()> {
        let n_rows = self.n_rows();
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| SweepError::MissingColumn(name.to_string()))?;
        if data.len() != n_rows {
            return Err(SweepError::DimensionMismatch {
                expected: n_rows,
                actual: data.len(),
            });
        }
        column.data = data;
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Result<Column> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SweepError::MissingColumn(name.to_string()))?;
        Ok(self.columns.remove(idx))
    }

    /// Keep only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            sample_ids: rows.iter().map(|&r| self.sample_ids[r].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    origin: c.origin.clone(),
                    data: c.data.select(rows),
                })
                .collect(),
        }
    }

    /// Keep rows for which `keep` returns true.
    pub fn filter_rows<F: Fn(usize) -> bool>(&self, keep: F) -> Self {
        let rows: Vec<usize> = (0..self.n_rows()).filter(|&r| keep(r)).collect();
        self.select_rows(&rows)
    }

    /// Columns tested one at a time by the sweep, in frame order.
    pub fn candidate_variables(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.origin.is_candidate())
            .map(|c| c.name.as_str())
            .collect()
    }
}
