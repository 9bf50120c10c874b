//! Rooted phylogenetic tree parsed from Newick.

use crate::error::{Result, SweepError};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A node in array form. Children always have larger indices than their
/// parent, so a reverse index scan visits every subtree before its root.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Parent index (the root is its own parent).
    pub parent: usize,
    /// Length of the branch above this node.
    pub branch_length: f64,
    /// Leaf label, empty for unlabeled internal nodes.
    pub label: String,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct PhyloTree {
    nodes: Vec<TreeNode>,
    leaf_index: HashMap<String, usize>,
}

impl PhyloTree {
    pub fn from_newick_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_newick(&fs::read_to_string(path)?)
    }

    /// Parse a Newick string such as `((A:0.1,B:0.2):0.3,C:0.4);`.
    ///
    /// Missing branch lengths default to 0. Leaf labels must be unique.
    pub fn from_newick(newick: &str) -> Result<Self> {
        let text = newick.trim().trim_end_matches(';');
        if text.is_empty() {
            return Err(SweepError::EmptyData("Empty Newick tree".to_string()));
        }

        let mut nodes = vec![TreeNode {
            parent: 0,
            branch_length: 0.0,
            label: String::new(),
            children: Vec::new(),
        }];
        let mut stack: Vec<usize> = vec![0];
        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '(' => {
                    let parent = *stack.last().unwrap_or(&0);
                    let idx = push_child(&mut nodes, parent, String::new(), 0.0);
                    stack.push(idx);
                    i += 1;
                }
                ')' => {
                    if stack.len() < 2 {
                        return Err(SweepError::Schema(
                            "Unbalanced ')' in Newick tree".to_string(),
                        ));
                    }
                    let closed = stack.pop().unwrap_or(0);
                    i += 1;
                    let (label, length, consumed) = parse_label_length(&chars[i..])?;
                    nodes[closed].label = label;
                    nodes[closed].branch_length = length;
                    i += consumed;
                }
                ',' => i += 1,
                c if c.is_whitespace() => i += 1,
                _ => {
                    let (label, length, consumed) = parse_label_length(&chars[i..])?;
                    let parent = *stack.last().unwrap_or(&0);
                    push_child(&mut nodes, parent, label, length);
                    i += consumed.max(1);
                }
            }
        }

        if stack.len() != 1 {
            return Err(SweepError::Schema(
                "Unbalanced '(' in Newick tree".to_string(),
            ));
        }

        let mut leaf_index = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            if node.children.is_empty() && !node.label.is_empty() {
                if leaf_index.insert(node.label.clone(), idx).is_some() {
                    return Err(SweepError::Schema(format!(
                        "Duplicate leaf label '{}' in tree",
                        node.label
                    )));
                }
            }
        }

        Ok(Self { nodes, leaf_index })
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.leaf_index.len()
    }

    /// Index of a leaf by label.
    pub fn leaf_idx(&self, label: &str) -> Option<usize> {
        self.leaf_index.get(label).copied()
    }

    /// Summed branch length from a node up to the root.
    pub fn depth(&self, mut node: usize) -> f64 {
        let mut total = 0.0;
        while node != 0 {
            total += self.nodes[node].branch_length;
            node = self.nodes[node].parent;
        }
        total
    }
}

fn push_child(nodes: &mut Vec<TreeNode>, parent: usize, label: String, length: f64) -> usize {
    let idx = nodes.len();
    nodes.push(TreeNode {
        parent,
        branch_length: length,
        label,
        children: Vec::new(),
    });
    nodes[parent].children.push(idx);
    idx
}

/// Read `label[:length]` up to the next structural character.
fn parse_label_length(chars: &[char]) -> Result<(String, f64, usize)> {
    let mut label = String::new();
    let mut length_str = String::new();
    let mut in_length = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '(' | ')' | ',' | ';' => break,
            ':' => in_length = true,
            '\'' | '"' => {}
            c if in_length => length_str.push(c),
            c => label.push(c),
        }
        i += 1;
    }

    let length_str = length_str.trim();
    let length = if length_str.is_empty() {
        0.0
    } else {
        length_str.parse::<f64>().map_err(|_| {
            SweepError::Schema(format!("Invalid branch length '{}'", length_str))
        })?
    };
    if length < 0.0 || !length.is_finite() {
        return Err(SweepError::Schema(format!(
            "Invalid branch length '{}'",
            length_str
        )));
    }
    Ok((label.trim().to_string(), length, i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_with_lengths() {
        let tree = PhyloTree::from_newick("((A:0.1,B:0.2):0.3,C:0.4);").unwrap();
        assert_eq!(tree.n_leaves(), 3);
        let a = tree.leaf_idx("A").unwrap();
        assert_relative_eq!(tree.depth(a), 0.4, epsilon = 1e-12);
        let c = tree.leaf_idx("C").unwrap();
        assert_relative_eq!(tree.depth(c), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_children_after_parents() {
        let tree = PhyloTree::from_newick("(((A:1,B:1)x:1,C:2):1,D:3);").unwrap();
        for (idx, node) in tree.nodes().iter().enumerate() {
            for &child in &node.children {
                assert!(child > idx);
            }
        }
    }

    #[test]
    fn test_missing_lengths_default_to_zero() {
        let tree = PhyloTree::from_newick("(A,B);").unwrap();
        let a = tree.leaf_idx("A").unwrap();
        assert_eq!(tree.depth(a), 0.0);
    }

    #[test]
    fn test_malformed_trees() {
        assert!(PhyloTree::from_newick("((A:1,B:1);").is_err());
        assert!(PhyloTree::from_newick("(A:1,B:1));").is_err());
        assert!(PhyloTree::from_newick("(A:x,B:1);").is_err());
        assert!(PhyloTree::from_newick("(A:1,A:1);").is_err());
        assert!(PhyloTree::from_newick(";").is_err());
    }
}
