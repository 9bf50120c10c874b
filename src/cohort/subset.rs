//! Population subsets a sweep can be restricted to.

use crate::error::{Result, SweepError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Half-open age bands `[lower, upper)` for `age_1` .. `age_5`.
pub const AGE_BANDS: [(f64, f64); 5] = [
    (18.0, 40.0),
    (40.0, 50.0),
    (50.0, 60.0),
    (60.0, 70.0),
    (70.0, f64::INFINITY),
];

/// Minimum age for inclusion in any subset.
pub const ADULT_AGE: f64 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Subset {
    All,
    Men,
    Women,
    /// One of the fixed age bands, numbered from 1.
    AgeBand(usize),
}

impl Subset {
    /// Whether every member shares the same sex, making `sex` a constant.
    pub fn fixes_sex(&self) -> bool {
        matches!(self, Subset::Men | Subset::Women)
    }

    /// Whether a sample with the given sex label and age belongs here.
    pub fn contains(&self, sex: Option<&str>, age: f64) -> bool {
        match self {
            Subset::All => true,
            Subset::Men => sex == Some("men"),
            Subset::Women => sex == Some("women"),
            Subset::AgeBand(band) => {
                let (lower, upper) = AGE_BANDS[band - 1];
                age >= lower && age < upper
            }
        }
    }
}

impl FromStr for Subset {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        match token {
            "all" => Ok(Subset::All),
            "men" => Ok(Subset::Men),
            "women" => Ok(Subset::Women),
            _ => token
                .strip_prefix("age_")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| (1..=AGE_BANDS.len()).contains(n))
                .map(Subset::AgeBand)
                .ok_or_else(|| SweepError::Configuration(format!("Invalid subset: {}", token))),
        }
    }
}

impl TryFrom<String> for Subset {
    type Error = SweepError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Subset> for String {
    fn from(s: Subset) -> Self {
        s.to_string()
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subset::All => write!(f, "all"),
            Subset::Men => write!(f, "men"),
            Subset::Women => write!(f, "women"),
            Subset::AgeBand(n) => write!(f, "age_{}", n),
        }
    }
}
