//! Dataset assembly: align a cohort with the count table and join diversity
//! scores and log-ratio features onto it.
//!
//! The sample intersection computed here is the only alignment step. Every
//! diversity matrix and feature column below is derived from the aligned
//! counts, so rows can never drift out of register with the metadata.

use crate::data::{AnalysisFrame, ColumnData, ColumnOrigin, CountMatrix, PhyloTree, TaxonomyMap};
use crate::diversity::{alpha_column, uniqueness_column, BetaMetric, DiversityEngine};
use crate::error::{Result, SweepError};
use crate::features::{transform_level, LevelTable, TaxonomicLevel, TransformConfig};
use regex::Regex;
use std::collections::HashSet;

/// Sample-side inputs shared by every combination of a sweep.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub counts: CountMatrix,
    pub taxonomy: TaxonomyMap,
    pub tree: Option<PhyloTree>,
}

/// What to compute for each assembled frame.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub levels: Vec<TaxonomicLevel>,
    pub transform: TransformConfig,
    /// Add Aitchison uniqueness next to Bray-Curtis and Jaccard.
    pub aitchison: bool,
}

impl AssemblyOptions {
    /// Options for a processing label with default thresholds.
    pub fn for_label(label: &str) -> Self {
        Self {
            levels: TaxonomicLevel::for_label(label),
            transform: TransformConfig::default(),
            aitchison: false,
        }
    }
}

/// Restrict a cohort and the count table to their shared samples.
///
/// Samples keep the cohort's row order; counts are reordered to match.
pub fn align_samples(cohort: &AnalysisFrame, counts: &CountMatrix) -> Result<(AnalysisFrame, CountMatrix)> {
    let in_counts: HashSet<&str> = counts.sample_ids().iter().map(String::as_str).collect();
    let rows: Vec<usize> = cohort
        .sample_ids()
        .iter()
        .enumerate()
        .filter(|(_, id)| in_counts.contains(id.as_str()))
        .map(|(i, _)| i)
        .collect();

    if rows.is_empty() {
        return Err(SweepError::EmptyData(
            "No samples shared between metadata and count table".to_string(),
        ));
    }
    if rows.len() < cohort.n_rows() {
        log::debug!(
            "{} of {} cohort samples have no counts",
            cohort.n_rows() - rows.len(),
            cohort.n_rows()
        );
    }

    let frame = cohort.select_rows(&rows);
    let counts = counts.subset_samples(frame.sample_ids())?;
    Ok((frame, counts))
}

/// Generates frame-safe column names restricted to `[0-9a-zA-Z_]`.
struct ColumnNamer {
    disallowed: Regex,
}

impl ColumnNamer {
    fn new() -> Result<Self> {
        let disallowed = Regex::new(r"[^0-9a-zA-Z_]")
            .map_err(|e| SweepError::InvalidParameter(e.to_string()))?;
        Ok(Self { disallowed })
    }

    fn sanitize(&self, name: &str) -> String {
        let spaced = name.replace(['-', ' '], "_");
        let clean = self.disallowed.replace_all(&spaced, "").into_owned();
        if clean.is_empty() {
            "unnamed".to_string()
        } else {
            clean
        }
    }

    /// Sanitize `name` and append it to `frame`, suffixing `_2`, `_3`, ...
    /// when the cleaned name is already taken.
    fn push(&self, frame: &mut AnalysisFrame, name: &str, origin: ColumnOrigin, values: Vec<f64>) -> Result<()> {
        let base = self.sanitize(name);
        let mut column = base.clone();
        let mut suffix = 2;
        while frame.has_column(&column) {
            column = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        if column != base {
            log::warn!("Column '{}' already present; adding '{}' as '{}'", base, name, column);
        }
        frame.push_column(&column, origin, ColumnData::Numeric(values))
    }
}

/// Public form of the column-name cleaning applied to added columns.
pub fn sanitize_column_name(name: &str) -> Result<String> {
    Ok(ColumnNamer::new()?.sanitize(name))
}

/// Builds the wide analysis frame for one cohort.
pub struct Assembler<'a> {
    data: &'a SampleData,
    options: &'a AssemblyOptions,
    engine: &'a DiversityEngine,
}

impl<'a> Assembler<'a> {
    pub fn new(data: &'a SampleData, options: &'a AssemblyOptions, engine: &'a DiversityEngine) -> Self {
        Self {
            data,
            options,
            engine,
        }
    }

    /// Per-level tables for the aligned counts; empty levels are dropped.
    fn level_tables(&self, counts: &CountMatrix) -> Result<Vec<LevelTable>> {
        let mut tables = Vec::with_capacity(self.options.levels.len());
        for &level in &self.options.levels {
            if let Some(table) =
                transform_level(counts, &self.data.taxonomy, level, &self.options.transform)?
            {
                tables.push(table);
            }
        }
        Ok(tables)
    }

    /// Align `cohort` with the counts and append diversity and feature columns.
    ///
    /// Column order: uniqueness per metric then level, UniFrac at ASV level,
    /// alpha per level then metric, genus features, species features.
    pub fn assemble(&self, cohort: &AnalysisFrame) -> Result<AnalysisFrame> {
        let (mut frame, counts) = align_samples(cohort, &self.data.counts)?;
        let tables = self.level_tables(&counts)?;
        let namer = ColumnNamer::new()?;

        for metric in BetaMetric::per_level(self.options.aitchison) {
            for table in &tables {
                let scores = self.engine.uniqueness(&table.counts, metric, None)?;
                namer.push(
                    &mut frame,
                    &uniqueness_column(metric, table.level),
                    ColumnOrigin::Diversity,
                    scores,
                )?;
            }
        }

        let asv = tables.iter().find(|t| t.level == TaxonomicLevel::Asv);
        match (&self.data.tree, asv) {
            (Some(tree), Some(table)) => {
                for metric in [BetaMetric::UnweightedUnifrac, BetaMetric::WeightedUnifrac] {
                    let scores = self.engine.uniqueness(&table.counts, metric, Some(tree))?;
                    namer.push(
                        &mut frame,
                        &uniqueness_column(metric, table.level),
                        ColumnOrigin::Diversity,
                        scores,
                    )?;
                }
            }
            (None, Some(_)) => log::info!("No phylogenetic tree supplied, skipping UniFrac"),
            _ => {}
        }

        for table in &tables {
            for (metric, values) in self.engine.alpha(&table.counts) {
                namer.push(
                    &mut frame,
                    &alpha_column(metric, table.level),
                    ColumnOrigin::Diversity,
                    values,
                )?;
            }
        }

        for table in &tables {
            let Some(clr) = &table.clr else { continue };
            for (i, feature) in clr.feature_ids.iter().enumerate() {
                namer.push(&mut frame, feature, ColumnOrigin::Feature, clr.row(i))?;
            }
        }

        log::info!(
            "Assembled {} samples x {} columns ({} candidates)",
            frame.n_rows(),
            frame.n_columns(),
            frame.candidate_variables().len()
        );
        Ok(frame)
    }
}
