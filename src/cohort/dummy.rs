//! One-hot encoding of categorical model terms.

use crate::data::{AnalysisFrame, ColumnData, ColumnOrigin};
use crate::error::Result;

/// Record of which indicator columns were generated for which term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DummyMap {
    entries: Vec<(String, Vec<String>)>,
}

impl DummyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, term: &str, columns: Vec<String>) {
        self.entries.push((term.to_string(), columns));
    }

    /// Indicator columns generated for `term`, if it was encoded.
    pub fn columns_for(&self, term: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(t, _)| t == term)
            .map(|(_, cols)| cols.as_slice())
    }

    /// Whether `column` is an indicator generated for any term.
    pub fn contains_column(&self, column: &str) -> bool {
        self.entries
            .iter()
            .any(|(_, cols)| cols.iter().any(|c| c == column))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand model terms to the frame columns that represent them.
    pub fn expand_terms(&self, terms: &[String]) -> Vec<String> {
        terms
            .iter()
            .flat_map(|t| match self.columns_for(t) {
                Some(cols) => cols.to_vec(),
                None => vec![t.clone()],
            })
            .collect()
    }
}

/// Replace each categorical term with drop-first indicator columns named
/// `<term>_<level>`, appended at the end of the frame.
///
/// Missing values stay missing in every indicator. Numeric terms are left
/// untouched.
pub fn one_hot(frame: &mut AnalysisFrame, terms: &[String]) -> Result<DummyMap> {
    let mut map = DummyMap::new();
    for term in terms {
        let column = frame.require(term)?;
        if !column.data.is_categorical() {
            continue;
        }
        let data = column.data.clone();
        let levels = data.levels().unwrap_or_default();
        frame.remove_column(term)?;

        let mut generated = Vec::new();
        for level in levels.iter().skip(1) {
            let name = format!("{}_{}", term, level);
            let values = (0..data.len())
                .map(|r| match data.label(r) {
                    Some(l) if &l == level => 1.0,
                    Some(_) => 0.0,
                    None => f64::NAN,
                })
                .collect();
            frame.push_column(
                &name,
                ColumnOrigin::Dummy { term: term.clone() },
                ColumnData::Numeric(values),
            )?;
            generated.push(name);
        }
        log::debug!("Encoded '{}' as {:?}", term, generated);
        map.insert(term, generated);
    }
    Ok(map)
}
