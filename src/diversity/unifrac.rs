//! Phylogenetic UniFrac distances over a rooted tree.

use crate::data::{CountMatrix, PhyloTree};
use crate::error::{Result, SweepError};

/// Per-sample branch abundances, ready for pairwise UniFrac.
///
/// `branch[n]` is the summed count of every leaf below node `n`, so a branch
/// is observed in a sample when its entry is positive.
#[derive(Debug, Clone)]
pub struct BranchProfiles {
    lengths: Vec<f64>,
    /// Root-to-leaf distance for each node that is a leaf, else 0.
    leaf_depths: Vec<f64>,
    profiles: Vec<Vec<f64>>,
    totals: Vec<f64>,
}

impl BranchProfiles {
    /// Map each sample of `counts` onto the tree. Every feature must be a
    /// tree leaf.
    pub fn new(tree: &PhyloTree, counts: &CountMatrix) -> Result<Self> {
        let leaf_of: Vec<usize> = counts
            .feature_ids()
            .iter()
            .map(|id| {
                tree.leaf_idx(id).ok_or_else(|| {
                    SweepError::Schema(format!("Feature '{}' is not a leaf of the tree", id))
                })
            })
            .collect::<Result<_>>()?;

        let nodes = tree.nodes();
        let n_nodes = nodes.len();
        let mut profiles = vec![vec![0.0; n_nodes]; counts.n_samples()];
        for (row, row_vec) in counts.data().outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                profiles[col][leaf_of[row]] += val as f64;
            }
        }
        for profile in &mut profiles {
            for i in (0..n_nodes).rev() {
                let below: f64 = nodes[i].children.iter().map(|&c| profile[c]).sum();
                profile[i] += below;
            }
        }

        let mut leaf_depths = vec![0.0; n_nodes];
        for &leaf in &leaf_of {
            leaf_depths[leaf] = tree.depth(leaf);
        }
        let mut lengths: Vec<f64> = nodes.iter().map(|n| n.branch_length).collect();
        // The root has no branch above it.
        lengths[0] = 0.0;

        let totals = profiles.iter().map(|p| p[0]).collect();
        Ok(Self {
            lengths,
            leaf_depths,
            profiles,
            totals,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.profiles.len()
    }

    /// Unweighted UniFrac: unique branch length over observed branch length.
    pub fn unweighted(&self, a: usize, b: usize) -> f64 {
        let (pa, pb) = (&self.profiles[a], &self.profiles[b]);
        let mut unique = 0.0;
        let mut observed = 0.0;
        for (n, &len) in self.lengths.iter().enumerate() {
            let (in_a, in_b) = (pa[n] > 0.0, pb[n] > 0.0);
            if in_a || in_b {
                observed += len;
                if in_a != in_b {
                    unique += len;
                }
            }
        }
        if observed > 0.0 {
            unique / observed
        } else {
            0.0
        }
    }

    /// Normalized weighted UniFrac:
    /// `Σ_b l_b |pA_b - pB_b| / Σ_leaves d_leaf (pA_leaf + pB_leaf)`,
    /// where `p` are proportions of each sample's total.
    pub fn weighted_normalized(&self, a: usize, b: usize) -> f64 {
        let (pa, pb) = (&self.profiles[a], &self.profiles[b]);
        let (ta, tb) = (self.totals[a], self.totals[b]);
        let frac = |v: f64, t: f64| if t > 0.0 { v / t } else { 0.0 };

        let mut num = 0.0;
        let mut den = 0.0;
        for n in 0..self.lengths.len() {
            let (fa, fb) = (frac(pa[n], ta), frac(pb[n], tb));
            num += self.lengths[n] * (fa - fb).abs();
            if self.leaf_depths[n] > 0.0 {
                den += self.leaf_depths[n] * (fa + fb);
            }
        }
        if den > 0.0 {
            num / den
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_data() -> (PhyloTree, CountMatrix) {
        let tree = PhyloTree::from_newick("((A:1,B:1):1,(C:1,D:1):1);").unwrap();
        let counts = CountMatrix::from_triplets(
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            vec!["S1".into(), "S2".into(), "S3".into()],
            vec![
                (0, 0, 10), (1, 0, 10),
                (0, 1, 10), (1, 1, 10),
                (2, 2, 5), (3, 2, 15),
            ],
        )
        .unwrap();
        (tree, counts)
    }

    #[test]
    fn test_identical_samples() {
        let (tree, counts) = create_test_data();
        let bp = BranchProfiles::new(&tree, &counts).unwrap();
        assert_eq!(bp.unweighted(0, 1), 0.0);
        assert_eq!(bp.weighted_normalized(0, 1), 0.0);
    }

    #[test]
    fn test_disjoint_clades() {
        let (tree, counts) = create_test_data();
        let bp = BranchProfiles::new(&tree, &counts).unwrap();
        // No shared branches at all
        assert_relative_eq!(bp.unweighted(0, 2), 1.0, epsilon = 1e-12);
        // Every leaf sits at depth 2; all mass differs
        assert_relative_eq!(bp.weighted_normalized(0, 2), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_partial_overlap() {
        let tree = PhyloTree::from_newick("((A:1,B:1):1,(C:1,D:1):1);").unwrap();
        let counts = CountMatrix::from_triplets(
            vec!["A".into(), "B".into()],
            vec!["S1".into(), "S2".into()],
            vec![(0, 0, 10), (0, 1, 5), (1, 1, 5)],
        )
        .unwrap();
        let bp = BranchProfiles::new(&tree, &counts).unwrap();
        // Observed: AB clade, A, B = 3; unique: B = 1
        assert_relative_eq!(bp.unweighted(0, 1), 1.0 / 3.0, epsilon = 1e-12);
        // num = |1-0.5| + |0-0.5| = 1, den = 2*(1+0.5) + 2*(0+0.5) = 4
        assert_relative_eq!(bp.weighted_normalized(0, 1), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_feature_missing_from_tree() {
        let tree = PhyloTree::from_newick("(A:1,B:1);").unwrap();
        let counts = CountMatrix::from_triplets(
            vec!["A".into(), "Z".into()],
            vec!["S1".into()],
            vec![(0, 0, 1), (1, 0, 1)],
        )
        .unwrap();
        assert!(matches!(
            BranchProfiles::new(&tree, &counts),
            Err(SweepError::Schema(_))
        ));
    }
}
