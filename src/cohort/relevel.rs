//! Deterministic reference levels for categorical covariates.

use crate::data::ColumnData;

/// How the level order of a factor is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelRule {
    /// A fixed level list; values outside it become missing.
    Fixed(Vec<String>),
    /// Observed levels in first-appearance order, with `level` moved first
    /// when observed.
    PreferFirst(String),
    /// Most frequent observed level first.
    MostFrequent,
}

impl LevelRule {
    /// The rule applied to a named factor.
    ///
    /// `sex` is fixed to `[men, women]`, `race` puts `white` first,
    /// user-supplied factors lead with their most frequent level, and every
    /// other factor is a `[0, 1]` indicator.
    pub fn for_factor(name: &str, extra_factors: &[String]) -> Self {
        match name {
            "sex" => LevelRule::Fixed(vec!["men".into(), "women".into()]),
            "race" => LevelRule::PreferFirst("white".into()),
            _ if extra_factors.iter().any(|f| f == name) => LevelRule::MostFrequent,
            _ => LevelRule::Fixed(vec!["0".into(), "1".into()]),
        }
    }
}

/// Distinct non-missing labels with their counts, in first-appearance order.
pub fn frequency_table<I, S>(labels: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut table: Vec<(String, usize)> = Vec::new();
    for label in labels.into_iter().flatten() {
        let label = label.as_ref();
        match table.iter_mut().find(|(l, _)| l == label) {
            Some(entry) => entry.1 += 1,
            None => table.push((label.to_string(), 1)),
        }
    }
    table
}

/// Ordered level list for a factor; the first entry is the reference.
///
/// `observed` is a frequency table in first-appearance order. Ties for the
/// most frequent level go to the earliest-appearing label.
pub fn reference_order(rule: &LevelRule, observed: &[(String, usize)]) -> Vec<String> {
    match rule {
        LevelRule::Fixed(levels) => levels.clone(),
        LevelRule::PreferFirst(first) => {
            let mut levels = Vec::with_capacity(observed.len());
            if observed.iter().any(|(l, _)| l == first) {
                levels.push(first.clone());
            }
            levels.extend(
                observed
                    .iter()
                    .filter(|(l, _)| l != first)
                    .map(|(l, _)| l.clone()),
            );
            levels
        }
        LevelRule::MostFrequent => {
            let mut top: Option<&(String, usize)> = None;
            for entry in observed {
                if top.map_or(true, |t| entry.1 > t.1) {
                    top = Some(entry);
                }
            }
            let Some((top_label, _)) = top else {
                return Vec::new();
            };
            let mut levels = vec![top_label.clone()];
            levels.extend(
                observed
                    .iter()
                    .filter(|(l, _)| l != top_label)
                    .map(|(l, _)| l.clone()),
            );
            levels
        }
    }
}

/// Recode a column as a factor under `rule`.
pub fn relevel(data: &ColumnData, rule: &LevelRule) -> ColumnData {
    let labels: Vec<Option<String>> = (0..data.len()).map(|r| data.label(r)).collect();
    let levels = reference_order(rule, &frequency_table(labels.iter().cloned()));
    let codes = labels
        .iter()
        .map(|l| l.as_ref().and_then(|l| levels.iter().position(|lv| lv == l)))
        .collect();
    ColumnData::Factor { levels, codes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, usize)]) -> Vec<(String, usize)> {
        pairs.iter().map(|(l, n)| (l.to_string(), *n)).collect()
    }

    #[test]
    fn test_frequency_table_first_appearance() {
        let t = frequency_table(vec![Some("b"), None, Some("a"), Some("b")]);
        assert_eq!(t, table(&[("b", 2), ("a", 1)]));
    }

    #[test]
    fn test_binary_reference_is_zero() {
        let rule = LevelRule::for_factor("statin", &[]);
        let levels = reference_order(&rule, &table(&[("1", 40), ("0", 3)]));
        assert_eq!(levels, vec!["0", "1"]);
    }

    #[test]
    fn test_race_white_first() {
        let rule = LevelRule::for_factor("race", &[]);
        let levels = reference_order(&rule, &table(&[("black", 5), ("asian", 2), ("white", 1)]));
        assert_eq!(levels, vec!["white", "black", "asian"]);

        let levels = reference_order(&rule, &table(&[("black", 5), ("asian", 2)]));
        assert_eq!(levels, vec!["black", "asian"]);
    }

    #[test]
    fn test_most_frequent_with_ties() {
        let rule = LevelRule::for_factor("site", &["site".to_string()]);
        let levels = reference_order(&rule, &table(&[("a", 2), ("b", 5), ("c", 5)]));
        assert_eq!(levels, vec!["b", "a", "c"]);
        assert!(reference_order(&rule, &[]).is_empty());
    }

    #[test]
    fn test_relevel_numeric_indicator() {
        let data = ColumnData::Numeric(vec![1.0, 0.0, 2.0, f64::NAN]);
        let rule = LevelRule::for_factor("ppump", &[]);
        match relevel(&data, &rule) {
            ColumnData::Factor { levels, codes } => {
                assert_eq!(levels, vec!["0", "1"]);
                assert_eq!(codes, vec![Some(1), Some(0), None, None]);
            }
            other => panic!("expected factor, got {:?}", other),
        }
    }

    #[test]
    fn test_relevel_sex_drops_unknown_labels() {
        let data = ColumnData::Text(vec![Some("women".into()), Some("other".into()), Some("men".into())]);
        let rule = LevelRule::for_factor("sex", &[]);
        match relevel(&data, &rule) {
            ColumnData::Factor { levels, codes } => {
                assert_eq!(levels, vec!["men", "women"]);
                assert_eq!(codes, vec![Some(1), None, Some(0)]);
            }
            other => panic!("expected factor, got {:?}", other),
        }
    }
}
