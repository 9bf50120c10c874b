//! Run configuration for a sweep.

use crate::cohort::Subset;
use crate::data::Formula;
use crate::error::{Result, SweepError};
use crate::features::{TaxonomicLevel, TransformConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_threads() -> usize {
    6
}

fn default_label() -> String {
    "16s".to_string()
}

fn default_abundance() -> f64 {
    0.01
}

fn default_prevalence() -> f64 {
    0.1
}

fn default_pseudocount() -> f64 {
    1.0
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("intermediatefiles")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Everything that shapes a sweep besides the input tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Base covariate models, e.g. `sex+ppump`.
    pub models: Vec<String>,
    pub outcomes: Vec<String>,
    /// Cohort label used in output file names.
    pub cohort: String,
    /// Subset tokens: `all`, `men`, `women`, `age_1` .. `age_5`.
    pub subsets: Vec<String>,
    /// Worker threads for pairwise distances.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Processing label; `16s` restricts features to genus level.
    #[serde(default = "default_label")]
    pub label: String,
    /// Study-specific categorical covariates.
    #[serde(default)]
    pub factors: Vec<String>,
    #[serde(default)]
    pub aitchison: bool,
    #[serde(default = "default_abundance")]
    pub abundance: f64,
    #[serde(default = "default_prevalence")]
    pub prevalence: f64,
    #[serde(default = "default_pseudocount")]
    pub pseudocount: f64,
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Parse a factor string: `NA` means none, surrounding single quotes are
/// stripped and names are comma separated.
pub fn parse_factors(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(trimmed);
    if unquoted.is_empty() || unquoted == "NA" {
        return Vec::new();
    }
    unquoted
        .split(',')
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Non-empty lines of a list file.
fn read_lines(path: &Path) -> Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

impl SweepConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(SweepError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(SweepError::from)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    /// Build from newline-delimited model, outcome and subset files and a
    /// cohort file whose first line is the label.
    pub fn from_list_files(
        models: &Path,
        outcomes: &Path,
        cohort: &Path,
        subsets: &Path,
        factors: &str,
    ) -> Result<Self> {
        let cohort = read_lines(cohort)?.into_iter().next().unwrap_or_default();
        Ok(Self {
            models: read_lines(models)?,
            outcomes: read_lines(outcomes)?,
            cohort,
            subsets: read_lines(subsets)?,
            factors: parse_factors(factors),
            ..Self::example()
        })
    }

    /// A small configuration suitable as a template.
    pub fn example() -> Self {
        Self {
            models: vec!["sex+ppump".to_string(), "sex+ppump+metfor".to_string()],
            outcomes: vec!["bmi".to_string(), "mortality".to_string()],
            cohort: "cohort".to_string(),
            subsets: vec!["all".to_string(), "men".to_string(), "women".to_string()],
            threads: default_threads(),
            label: default_label(),
            factors: Vec::new(),
            aitchison: false,
            abundance: default_abundance(),
            prevalence: default_prevalence(),
            pseudocount: default_pseudocount(),
            checkpoint_dir: default_checkpoint_dir(),
            output_dir: default_output_dir(),
        }
    }

    /// Parsed subset selectors, in configured order.
    pub fn subsets(&self) -> Result<Vec<Subset>> {
        self.subsets.iter().map(|s| s.parse()).collect()
    }

    /// Parsed base models, in configured order.
    pub fn formulas(&self) -> Result<Vec<Formula>> {
        self.models.iter().map(|m| Formula::parse(m)).collect()
    }

    /// Outcome names as matched against lower-cased metadata headers.
    pub fn outcome_names(&self) -> Vec<String> {
        self.outcomes.iter().map(|o| o.trim().to_lowercase()).collect()
    }

    pub fn levels(&self) -> Vec<TaxonomicLevel> {
        TaxonomicLevel::for_label(&self.label)
    }

    pub fn transform(&self) -> TransformConfig {
        TransformConfig {
            abundance: self.abundance,
            prevalence: self.prevalence,
            pseudocount: self.pseudocount,
        }
    }

    /// Reject configurations that would invalidate every row of a sweep.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(SweepError::Configuration(msg));
        if self.models.is_empty() {
            return fail("No models configured".to_string());
        }
        if self.outcomes.is_empty() {
            return fail("No outcomes configured".to_string());
        }
        if self.subsets.is_empty() {
            return fail("No subsets configured".to_string());
        }
        if self.cohort.trim().is_empty() {
            return fail("Cohort label is empty".to_string());
        }
        if self.threads == 0 {
            return fail("Thread count must be at least 1".to_string());
        }
        for (name, value) in [("abundance", self.abundance), ("prevalence", self.prevalence)] {
            if !(0.0..=1.0).contains(&value) {
                return fail(format!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if !(self.pseudocount > 0.0 && self.pseudocount.is_finite()) {
            return fail(format!("Pseudocount must be positive, got {}", self.pseudocount));
        }
        self.subsets()?;
        self.formulas()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_parse_factors() {
        assert!(parse_factors("NA").is_empty());
        assert!(parse_factors("").is_empty());
        assert_eq!(parse_factors("'Smoking,Region'"), vec!["smoking", "region"]);
        assert_eq!(parse_factors("diet"), vec!["diet"]);
    }

    #[test]
    fn test_yaml_defaults() {
        let yaml = "models: [sex]\noutcomes: [bmi]\ncohort: lifelines\nsubsets: [all]\n";
        let config = SweepConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.threads, 6);
        assert_eq!(config.label, "16s");
        assert_eq!(config.checkpoint_dir, PathBuf::from("intermediatefiles"));
        assert_eq!(config.levels(), vec![TaxonomicLevel::Asv, TaxonomicLevel::Genus]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = SweepConfig::example();
        let back = SweepConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_validate_rejects_bad_subset() {
        let mut config = SweepConfig::example();
        config.subsets.push("elderly".to_string());
        assert!(matches!(config.validate(), Err(SweepError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_thresholds() {
        let mut config = SweepConfig::example();
        config.prevalence = 1.5;
        assert!(config.validate().is_err());
        let mut config = SweepConfig::example();
        config.threads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_list_files() {
        let dir = tempdir().unwrap();
        let write = |name: &str, body: &str| {
            let path = dir.path().join(name);
            let mut f = fs::File::create(&path).unwrap();
            f.write_all(body.as_bytes()).unwrap();
            path
        };
        let models = write("models.txt", "sex+ppump\nsex+race\n");
        let outcomes = write("outcomes.txt", "bmi\nmortality\n\n");
        let cohort = write("cohort.txt", "lifelines\nignored\n");
        let subsets = write("subsets.txt", "all\nmen\n");

        let config = SweepConfig::from_list_files(&models, &outcomes, &cohort, &subsets, "NA").unwrap();
        assert_eq!(config.models, vec!["sex+ppump", "sex+race"]);
        assert_eq!(config.outcomes, vec!["bmi", "mortality"]);
        assert_eq!(config.cohort, "lifelines");
        assert_eq!(config.subsets().unwrap(), vec![Subset::All, Subset::Men]);
        assert!(config.factors.is_empty());
    }
}
