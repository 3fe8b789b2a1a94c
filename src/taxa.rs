//! Ordered taxon universe shared by every tree being compared.
//!
//! # CRITICAL: bit positions come from taxon NAMES, not node IDs
//! Node IDs are assigned during tree construction and differ across trees.
//! Taxon names are consistent. The universe maps each name to a fixed index,
//! and that index is the bit position used by every split.

use std::collections::HashMap;

use phylotree::tree::Tree as PhyloTree;

use crate::bitset::Bitset;
use crate::error::{Result, SplitError};

/// Ordered, duplicate-free taxon labels with stable indices.
///
/// Once a label is admitted its index never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonUniverse {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl TaxonUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a universe in the given order; repeated labels keep their first index.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut universe = Self::new();
        for label in labels {
            universe.admit(label);
        }
        universe
    }

    /// Infers a universe from the leaf names of `tree`.
    ///
    /// Leaves are sorted alphabetically so that the same leaf set always maps
    /// to the same bit positions, whatever order the tree lists them in.
    /// Unnamed leaves are skipped.
    pub fn from_tree(tree: &PhyloTree) -> Self {
        let mut names: Vec<String> = tree
            .get_leaves()
            .iter()
            .filter_map(|leaf_id| tree.get(leaf_id).ok()?.name.clone())
            .collect();
        names.sort();
        Self::from_labels(names)
    }

    /// Adds `label` if absent and returns its index.
    pub fn admit<S: Into<String>>(&mut self, label: S) -> usize {
        let label = label.into();
        if let Some(&idx) = self.index.get(&label) {
            return idx;
        }
        let idx = self.labels.len();
        self.index.insert(label.clone(), idx);
        self.labels.push(label);
        idx
    }

    /// Bit position of `label`.
    pub fn bit_for(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of u64 words in a mask over this universe.
    pub fn words(&self) -> usize {
        self.labels.len().div_ceil(64)
    }

    /// One bit set per admitted taxon.
    pub fn full_mask(&self) -> Bitset {
        let mut mask = Bitset::zeros(self.words());
        for idx in 0..self.labels.len() {
            mask.set(idx);
        }
        mask
    }

    /// Single-taxon split for `label`.
    pub fn singleton(&self, label: &str) -> Result<Bitset> {
        let idx = self
            .bit_for(label)
            .ok_or_else(|| SplitError::UnknownTaxon(label.to_string()))?;
        let mut mask = Bitset::zeros(self.words());
        mask.set(idx);
        Ok(mask)
    }

    /// Labels on the set side of `split`, in index order.
    pub fn taxa_in(&self, split: &Bitset) -> Vec<&str> {
        split
            .ones()
            .take_while(|&idx| idx < self.labels.len())
            .map(|idx| self.labels[idx].as_str())
            .collect()
    }
}
