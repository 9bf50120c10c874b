//! Cohort Sweep Library
//!
//! Combinatorial association sweeps between microbiome features and
//! clinical outcomes: for every (subset × outcome × base model), each
//! diversity score and log-ratio taxon abundance is tested as an added
//! covariate and its estimate collected into one result table.
//!
//! # Overview
//!
//! - **data**: Core data structures (CountMatrix, Metadata, AnalysisFrame, results)
//! - **cohort**: Cohort filtering, re-leveling and one-hot encoding
//! - **filter**: Conditional abundance/prevalence filter
//! - **zero**: Zero handling (pseudocount)
//! - **normalize**: Relative abundance and CLR
//! - **features**: Per-level taxonomic collapse and transform
//! - **diversity**: Alpha metrics, beta uniqueness and UniFrac
//! - **assemble**: Sample alignment and the wide analysis frame
//! - **model**: Least squares and Cox proportional hazards
//! - **test**: Wald inference
//! - **sweep**: The combinatorial engine and run configuration
//! - **aggregate**: Checkpoint and final result files
//! - **profile**: Feature abundance profiles
//!
//! # Example
//!
//! ```no_run
//! use cohort_sweep::prelude::*;
//!
//! let config = SweepConfig::from_yaml_file("sweep.yaml").unwrap();
//! let inputs = SweepInputs {
//!     metadata: AnalysisFrame::from_metadata(&Metadata::from_tsv("metadata.tsv").unwrap()).unwrap(),
//!     samples: SampleData {
//!         counts: CountMatrix::from_tsv("counts.tsv").unwrap(),
//!         taxonomy: TaxonomyMap::from_tsv("taxonomy.tsv").unwrap(),
//!         tree: None,
//!     },
//! };
//! let results = run_sweep(&config, &inputs, None).unwrap();
//! results.to_csv("results.csv").unwrap();
//! ```

pub mod aggregate;
pub mod assemble;
pub mod cohort;
pub mod data;
pub mod diversity;
pub mod error;
pub mod features;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod profile;
pub mod sweep;
pub mod test;
pub mod zero;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::aggregate::{checkpoint_path, final_path, ResultWriter};
    pub use crate::assemble::{align_samples, Assembler, AssemblyOptions, SampleData};
    pub use crate::cohort::{find_complete, Cohort, DummyMap, LevelRule, Subset};
    pub use crate::data::{
        AnalysisFrame, AnalysisRow, ColumnData, ColumnOrigin, CountMatrix, DesignMatrix, Formula,
        Metadata, PhyloTree, ResultTable, TaxonomyMap, Variable,
    };
    pub use crate::diversity::{AlphaMetric, BetaMetric, DistanceMatrix, DiversityEngine};
    pub use crate::error::{FitError, Result, SweepError};
    pub use crate::features::{transform_level, LevelTable, TaxonomicLevel, TransformConfig};
    pub use crate::filter::filter_conditional;
    pub use crate::model::{fit_cox, fit_ols, CoxFit, OlsFit};
    pub use crate::normalize::{clr_inverse, norm_clr, norm_tss, TransformedMatrix};
    pub use crate::profile::{profile_abundance, AbundanceProfile};
    pub use crate::sweep::{run_sweep, working_model, SweepConfig, SweepEngine, SweepInputs};
    pub use crate::test::{test_wald, test_wald_cox, WaldResult};
    pub use crate::zero::add_pseudocount;
}
