//! Feature-id → lineage map used to collapse counts to genus/species.

use crate::error::{Result, SweepError};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const RANK_SEPARATOR: &str = "; ";

/// Lineage strings keyed by feature identifier.
///
/// Lineages are semicolon-separated rank lists ending in
/// `...; g__Genus; s__Species`.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyMap {
    lineages: HashMap<String, String>,
}

impl TaxonomyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a taxonomy TSV with `Feature ID` and `Taxon` columns.
    ///
    /// Header names are matched case-insensitively; other columns (such as
    /// `Confidence`) are ignored.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut lines = BufReader::new(reader).lines();
        let header_line = lines
            .next()
            .ok_or_else(|| SweepError::EmptyData("Empty taxonomy file".to_string()))??;
        let header: Vec<String> = header_line
            .split('\t')
            .map(|h| h.trim().to_lowercase())
            .collect();

        let id_idx = header
            .iter()
            .position(|h| h == "feature id" || h == "feature_id" || h == "featureid")
            .ok_or_else(|| SweepError::MissingColumn("Feature ID".to_string()))?;
        let taxon_idx = header
            .iter()
            .position(|h| h == "taxon")
            .ok_or_else(|| SweepError::MissingColumn("Taxon".to_string()))?;

        let mut map = Self::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let (Some(id), Some(taxon)) = (fields.get(id_idx), fields.get(taxon_idx)) else {
                return Err(SweepError::Schema(format!(
                    "Taxonomy row has too few fields: '{}'",
                    line
                )));
            };
            map.insert(id.trim(), taxon.trim());
        }
        Ok(map)
    }

    pub fn insert(&mut self, feature_id: &str, lineage: &str) {
        self.lineages
            .insert(feature_id.to_string(), lineage.to_string());
    }

    pub fn lineage(&self, feature_id: &str) -> Option<&str> {
        self.lineages.get(feature_id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.lineages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineages.is_empty()
    }

    /// Genus label: the second-to-last rank of the lineage.
    pub fn genus(&self, feature_id: &str) -> String {
        self.rank_from_end(feature_id, 2)
            .map(|g| g.to_string())
            .unwrap_or_else(|| format!("Unknown_Genus_{}", feature_id))
    }

    /// Species label: the last rank with spaces replaced by underscores.
    pub fn species(&self, feature_id: &str) -> String {
        self.rank_from_end(feature_id, 1)
            .map(|s| s.replace(' ', "_"))
            .unwrap_or_else(|| format!("Unknown_Species_{}", feature_id))
    }

    /// Lineage rank counted from the end (1 = last). Lineages too short to
    /// have that rank yield `None`.
    fn rank_from_end(&self, feature_id: &str, from_end: usize) -> Option<&str> {
        let ranks: Vec<&str> = self.lineage(feature_id)?.split(RANK_SEPARATOR).collect();
        if ranks.len() < from_end.max(2) {
            return None;
        }
        let rank = ranks[ranks.len() - from_end].trim();
        if rank.is_empty() {
            None
        } else {
            Some(rank)
        }
    }
}
