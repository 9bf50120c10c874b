//! Per-feature relative-abundance profile.

use crate::data::CountMatrix;
use crate::error::Result;
use crate::normalize::norm_tss;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Relative abundance counted as "present" in the profile.
pub const PRESENCE_THRESHOLD: f64 = 0.01;

/// Abundance summary for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAbundance {
    #[serde(rename = "Feature")]
    pub feature: String,
    /// Genus rank parsed from the feature's lineage string.
    #[serde(rename = "Genus")]
    pub genus: String,
    /// Percentage of samples at or above the presence threshold.
    #[serde(rename = "Percentage_present")]
    pub percent_present: f64,
    #[serde(rename = "Mean_Abundance")]
    pub mean: f64,
    #[serde(rename = "Median_Abundance")]
    pub median: f64,
    /// Sample standard deviation.
    #[serde(rename = "SD_Abundance")]
    pub sd: f64,
}

/// Abundance summaries for every feature of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbundanceProfile {
    pub n_samples: usize,
    pub threshold: f64,
    pub features: Vec<FeatureAbundance>,
}

impl AbundanceProfile {
    /// Features present in at least `percent` of samples.
    pub fn features_above(&self, percent: f64) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.percent_present >= percent)
            .map(|f| f.feature.as_str())
            .collect()
    }

    /// Write as tab-separated text with a header row.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        for feature in &self.features {
            wtr.serialize(feature)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_tsv(File::create(path)?)
    }

    /// Serialize the whole profile, including sample count and threshold.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for AbundanceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Abundance Profile")?;
        writeln!(f, "  Features: {}", self.features.len())?;
        writeln!(f, "  Samples:  {}", self.n_samples)?;
        let widespread = self.features_above(10.0).len();
        writeln!(
            f,
            "  Present (>= {:.0}%) in at least 10% of samples: {}",
            self.threshold * 100.0,
            widespread
        )?;
        Ok(())
    }
}

/// Profile relative abundances of `counts`, one entry per feature in table
/// order. Empty samples contribute zeros.
pub fn profile_abundance(counts: &CountMatrix, threshold: f64) -> AbundanceProfile {
    let tss = norm_tss(counts);
    let n_samples = tss.n_samples();

    let features = (0..tss.n_features())
        .map(|i| {
            let row = tss.row(i);
            let present = row.iter().filter(|&&p| p >= threshold).count();
            let mean = if n_samples > 0 {
                row.iter().sum::<f64>() / n_samples as f64
            } else {
                f64::NAN
            };
            let sd = if n_samples > 1 {
                (row.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n_samples - 1) as f64).sqrt()
            } else {
                f64::NAN
            };
            FeatureAbundance {
                feature: tss.feature_ids[i].clone(),
                genus: genus_name(&tss.feature_ids[i]).to_string(),
                percent_present: if n_samples > 0 {
                    present as f64 / n_samples as f64 * 100.0
                } else {
                    0.0
                },
                mean,
                median: median(&row),
                sd,
            }
        })
        .collect();

    AbundanceProfile {
        n_samples,
        threshold,
        features,
    }
}

/// Innermost `g__` rank of a `;`-separated lineage, or the whole string
/// when it carries none.
pub fn genus_name(taxon: &str) -> &str {
    taxon
        .split(';')
        .rev()
        .map(str::trim)
        .find(|rank| rank.starts_with("g__"))
        .unwrap_or(taxon)
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_matrix() -> CountMatrix {
        // Sample totals: 100, 200, 50, 100
        CountMatrix::from_triplets(
            vec!["g__A".into(), "g__B".into()],
            vec!["S1".into(), "S2".into(), "S3".into(), "S4".into()],
            vec![
                (0, 0, 99), (1, 0, 1),
                (0, 1, 100), (1, 1, 100),
                (0, 2, 50),
                (0, 3, 100),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_profile_values() {
        let profile = profile_abundance(&create_test_matrix(), PRESENCE_THRESHOLD);
        assert_eq!(profile.n_samples, 4);

        let b = &profile.features[1];
        assert_eq!(b.feature, "g__B");
        // 0.01 in S1 counts as present, S3 and S4 are zero
        assert_relative_eq!(b.percent_present, 50.0);
        assert_relative_eq!(b.mean, (0.01 + 0.5) / 4.0, epsilon = 1e-12);
        assert_relative_eq!(b.median, 0.005, epsilon = 1e-12);

        let a = &profile.features[0];
        assert_relative_eq!(a.percent_present, 100.0);
        assert_relative_eq!(a.median, 0.995, epsilon = 1e-12);
    }

    #[test]
    fn test_genus_name() {
        assert_eq!(genus_name("d__Bacteria; f__Lachnospiraceae; g__Blautia"), "g__Blautia");
        assert_eq!(genus_name("d__Bacteria;g__Blautia;s__Blautia obeum"), "g__Blautia");
        assert_eq!(genus_name("g__Prevotella_9"), "g__Prevotella_9");
        assert_eq!(genus_name("Unknown_Genus_asv7"), "Unknown_Genus_asv7");
    }

    #[test]
    fn test_profile_carries_genus_column() {
        let counts = CountMatrix::from_triplets(
            vec!["d__Bacteria; g__Blautia".into(), "Unknown_Genus_asv9".into()],
            vec!["S1".into(), "S2".into()],
            vec![(0, 0, 10), (1, 0, 5), (0, 1, 3)],
        )
        .unwrap();
        let profile = profile_abundance(&counts, PRESENCE_THRESHOLD);
        assert_eq!(profile.features[0].genus, "g__Blautia");
        assert_eq!(profile.features[1].genus, "Unknown_Genus_asv9");

        let mut buf = Vec::new();
        profile.write_tsv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("d__Bacteria; g__Blautia\tg__Blautia\t"));
    }

    #[test]
    fn test_sd_is_sample_sd() {
        let profile = profile_abundance(&create_test_matrix(), PRESENCE_THRESHOLD);
        let b = &profile.features[1];
        let values = [0.01, 0.5, 0.0, 0.0];
        let mean = values.iter().sum::<f64>() / 4.0;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
        assert_relative_eq!(b.sd, var.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_write_tsv() {
        let profile = profile_abundance(&create_test_matrix(), PRESENCE_THRESHOLD);
        let mut buf = Vec::new();
        profile.write_tsv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "Feature\tGenus\tPercentage_present\tMean_Abundance\tMedian_Abundance\tSD_Abundance"
        );
        assert_eq!(text.lines().count(), 3);
        assert_eq!(profile.features_above(75.0), vec!["g__A"]);
    }

    #[test]
    fn test_json_keeps_column_names() {
        let profile = profile_abundance(&create_test_matrix(), PRESENCE_THRESHOLD);
        let json = profile.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["n_samples"], 4);
        assert_eq!(value["features"][0]["Feature"], "g__A");
        assert_eq!(value["features"][1]["Percentage_present"], 50.0);
    }
}
