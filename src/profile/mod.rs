//! Feature abundance profiling for count tables.

mod abundance;

pub use abundance::{genus_name, profile_abundance, AbundanceProfile, FeatureAbundance, PRESENCE_THRESHOLD};
