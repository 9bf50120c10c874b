//! Per-level feature tables: taxonomic collapse, conditional filter and CLR.

use crate::data::{CountMatrix, TaxonomyMap};
use crate::error::Result;
use crate::filter::filter_conditional;
use crate::normalize::{norm_clr_with_pseudocount, TransformedMatrix};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Taxonomic resolution of a feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomicLevel {
    /// Uncollapsed amplicon sequence variants.
    Asv,
    Genus,
    Species,
}

impl TaxonomicLevel {
    pub fn name(&self) -> &'static str {
        match self {
            TaxonomicLevel::Asv => "asv",
            TaxonomicLevel::Genus => "genus",
            TaxonomicLevel::Species => "species",
        }
    }

    /// Whether the level contributes log-ratio feature columns.
    pub fn has_log_ratio_features(&self) -> bool {
        !matches!(self, TaxonomicLevel::Asv)
    }

    /// Levels processed for a run label. Amplicon (`16s`) data is not
    /// resolved to species.
    pub fn for_label(label: &str) -> Vec<TaxonomicLevel> {
        let mut levels = vec![TaxonomicLevel::Asv, TaxonomicLevel::Genus];
        if !is_amplicon_label(label) {
            levels.push(TaxonomicLevel::Species);
        }
        levels
    }
}

impl fmt::Display for TaxonomicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether a processing label denotes amplicon sequencing.
pub fn is_amplicon_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("16s")
}

/// Thresholds for the conditional filter and the CLR pseudocount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformConfig {
    /// Minimum relative abundance counted as "present".
    pub abundance: f64,
    /// Minimum fraction of samples in which a feature must be present.
    pub prevalence: f64,
    pub pseudocount: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            abundance: 0.01,
            prevalence: 0.1,
            pseudocount: 1.0,
        }
    }
}

/// Counts and log-ratio twin for one taxonomic level.
#[derive(Debug, Clone)]
pub struct LevelTable {
    pub level: TaxonomicLevel,
    /// Counts used for diversity (filtered for collapsed levels).
    pub counts: CountMatrix,
    /// CLR values of `counts` (absent at ASV level).
    pub clr: Option<TransformedMatrix>,
}

/// Sum ASV counts into genus or species labels derived from the lineage.
pub fn collapse(
    counts: &CountMatrix,
    taxonomy: &TaxonomyMap,
    level: TaxonomicLevel,
) -> Result<CountMatrix> {
    let labels: Vec<String> = counts
        .feature_ids()
        .iter()
        .map(|id| match level {
            TaxonomicLevel::Asv => id.clone(),
            TaxonomicLevel::Genus => taxonomy.genus(id),
            TaxonomicLevel::Species => taxonomy.species(id),
        })
        .collect();
    counts.collapse(&labels)
}

/// Build the table for one level.
///
/// Collapsed levels are filtered and CLR transformed. A level with no
/// features left after filtering yields `None`.
pub fn transform_level(
    counts: &CountMatrix,
    taxonomy: &TaxonomyMap,
    level: TaxonomicLevel,
    config: &TransformConfig,
) -> Result<Option<LevelTable>> {
    if !level.has_log_ratio_features() {
        return Ok(Some(LevelTable {
            level,
            counts: counts.clone(),
            clr: None,
        }));
    }

    let collapsed = collapse(counts, taxonomy, level)?;
    let filtered = filter_conditional(&collapsed, config.abundance, config.prevalence)?;
    log::info!(
        "{} level: {} taxa collapsed, {} retained after filtering",
        level,
        collapsed.n_features(),
        filtered.n_features()
    );
    if filtered.n_features() == 0 {
        log::warn!("No {} features pass the abundance filter; skipping level", level);
        return Ok(None);
    }

    let clr = norm_clr_with_pseudocount(&filtered, config.pseudocount)?;
    Ok(Some(LevelTable {
        level,
        counts: filtered,
        clr: Some(clr),
    }))
}
