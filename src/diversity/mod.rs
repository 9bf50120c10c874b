//! Alpha diversity and beta uniqueness per taxonomic level.
//!
//! Pairwise distance computation is the only parallel stage of a sweep; it
//! runs on a dedicated pool sized to the configured thread budget.

pub mod alpha;
pub mod beta;
pub mod distance;
pub mod unifrac;

pub use alpha::{chao1, inverse_simpson, shannon, simpson, AlphaMetric};
pub use beta::{bray_curtis, euclidean, jaccard, BetaMetric};
pub use distance::DistanceMatrix;
pub use unifrac::BranchProfiles;

use crate::data::{CountMatrix, PhyloTree};
use crate::error::{Result, SweepError};
use crate::features::TaxonomicLevel;
use crate::normalize::norm_clr_with_pseudocount;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Pseudocount applied before the CLR underlying Aitchison distance.
pub const AITCHISON_PSEUDOCOUNT: f64 = 1.0;

/// `<metric>_<level>`, e.g. `shannon_genus`.
pub fn alpha_column(metric: AlphaMetric, level: TaxonomicLevel) -> String {
    format!("{}_{}", metric.name(), level.name())
}

/// `min_<metric>_<level>`, e.g. `min_bray_genus`.
pub fn uniqueness_column(metric: BetaMetric, level: TaxonomicLevel) -> String {
    format!("min_{}_{}", metric.short_name(), level.name())
}

pub struct DiversityEngine {
    pool: ThreadPool,
}

impl DiversityEngine {
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(SweepError::InvalidParameter(
                "Thread count must be at least 1".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
        Ok(Self { pool })
    }

    /// Alpha metrics for every sample, one vector per metric in
    /// [`AlphaMetric::ALL`] order.
    pub fn alpha(&self, counts: &CountMatrix) -> Vec<(AlphaMetric, Vec<f64>)> {
        let profiles = counts.sample_profiles();
        AlphaMetric::ALL
            .iter()
            .map(|m| (*m, profiles.iter().map(|p| m.compute(p)).collect()))
            .collect()
    }

    /// Full distance matrix for a non-phylogenetic metric.
    pub fn distance_matrix(&self, counts: &CountMatrix, metric: BetaMetric) -> Result<DistanceMatrix> {
        let ids = counts.sample_ids().to_vec();
        match metric {
            BetaMetric::BrayCurtis => {
                DistanceMatrix::pairwise(ids, &counts.sample_profiles(), &self.pool, bray_curtis)
            }
            BetaMetric::Jaccard => {
                DistanceMatrix::pairwise(ids, &counts.sample_profiles(), &self.pool, jaccard)
            }
            BetaMetric::Aitchison => {
                let clr = norm_clr_with_pseudocount(counts, AITCHISON_PSEUDOCOUNT)?;
                let profiles: Vec<Vec<f64>> = (0..clr.n_samples()).map(|j| clr.col(j)).collect();
                DistanceMatrix::pairwise(ids, &profiles, &self.pool, euclidean)
            }
            BetaMetric::UnweightedUnifrac | BetaMetric::WeightedUnifrac => Err(
                SweepError::InvalidParameter(format!("{:?} requires a phylogenetic tree", metric)),
            ),
        }
    }

    /// Distance matrix for a UniFrac metric.
    pub fn phylogenetic_matrix(
        &self,
        counts: &CountMatrix,
        tree: &PhyloTree,
        metric: BetaMetric,
    ) -> Result<DistanceMatrix> {
        let branches = BranchProfiles::new(tree, counts)?;
        let ids = counts.sample_ids().to_vec();
        match metric {
            BetaMetric::UnweightedUnifrac => {
                DistanceMatrix::from_pairs(ids, &self.pool, |a, b| branches.unweighted(a, b))
            }
            BetaMetric::WeightedUnifrac => {
                DistanceMatrix::from_pairs(ids, &self.pool, |a, b| branches.weighted_normalized(a, b))
            }
            other => self.distance_matrix(counts, other),
        }
    }

    /// Uniqueness scores for one metric.
    pub fn uniqueness(
        &self,
        counts: &CountMatrix,
        metric: BetaMetric,
        tree: Option<&PhyloTree>,
    ) -> Result<Vec<f64>> {
        let dm = match (metric.is_phylogenetic(), tree) {
            (true, Some(tree)) => self.phylogenetic_matrix(counts, tree, metric)?,
            _ => self.distance_matrix(counts, metric)?,
        };
        Ok(dm.min_dissimilarity())
    }
}
