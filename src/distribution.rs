//! Split frequencies, branch lengths and node ages across many trees.
//!
//! # Overview
//! A [`SplitDistribution`] folds trees in one at a time. For every split a
//! tree contains it records:
//! - one occurrence (at most once per tree)
//! - one branch-length sample (0.0 when the edge has no length)
//! - one node-age sample (tip distance of the edge's head node)
//!
//! Frequencies are occurrence counts divided by the number of trees counted.
//! They are cached and recomputed only after more trees have been folded in.
//!
//! # All-or-nothing aggregation
//! A tree is fully encoded before anything is committed. If encoding fails
//! (for example a leaf names a taxon outside the universe) the distribution
//! is left exactly as it was.

use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use phylotree::tree::Tree as PhyloTree;
use tracing::{debug, trace};

use crate::bitset::{Bitset, is_informative_split, render_split, render_split_reversed};
use crate::encode::{SplitEncoding, encode_splits, encode_trees};
use crate::error::{Result, SplitError};
use crate::split_map::SplitMap;
use crate::taxa::TaxonUniverse;

/// How incoming trees are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionConfig {
    /// Canonicalize splits so that both sides of a bipartition count as one.
    pub unrooted: bool,
    /// Skip branch-length samples.
    pub ignore_edge_lengths: bool,
    /// Skip node-age samples.
    pub ignore_node_ages: bool,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        DistributionConfig {
            unrooted: true,
            ignore_edge_lengths: false,
            ignore_node_ages: false,
        }
    }
}

/// The four totals reported by [`SplitDistribution::splits_considered`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitsConsidered {
    /// Sum of occurrence counts over all splits.
    pub total: usize,
    /// Number of distinct splits.
    pub unique: usize,
    /// Sum of occurrence counts over informative splits.
    pub informative_total: usize,
    /// Number of distinct informative splits.
    pub informative_unique: usize,
}

/// Aggregated statistics of one split.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitSummary {
    pub split: Bitset,
    pub count: usize,
    pub frequency: f64,
    pub mean_edge_length: Option<f64>,
    pub mean_node_age: Option<f64>,
    pub informative: bool,
}

#[derive(Debug, Clone, Default)]
struct SplitSamples {
    count: usize,
    edge_lengths: Vec<f64>,
    node_ages: Vec<f64>,
}

/// Append-only aggregate of splits over a collection of trees.
#[derive(Debug, Clone)]
pub struct SplitDistribution {
    universe: Arc<TaxonUniverse>,
    full_mask: Bitset,
    config: DistributionConfig,
    trees_counted: usize,
    /// Split keys in the order they were first seen.
    splits: Vec<Bitset>,
    samples: SplitMap<SplitSamples>,
    freqs: HashMap<Bitset, f64>,
    /// `trees_counted` at the last frequency computation.
    freqs_stamp: Option<usize>,
}

impl SplitDistribution {
    /// Unrooted distribution collecting lengths and ages.
    pub fn new(universe: impl Into<Arc<TaxonUniverse>>) -> Self {
        Self::with_config(universe, DistributionConfig::default())
    }

    pub fn with_config(universe: impl Into<Arc<TaxonUniverse>>, config: DistributionConfig) -> Self {
        let universe = universe.into();
        let full_mask = universe.full_mask();
        let samples = Self::empty_samples(config.unrooted, &full_mask);
        SplitDistribution {
            universe,
            full_mask,
            config,
            trees_counted: 0,
            splits: Vec::new(),
            samples,
            freqs: HashMap::new(),
            freqs_stamp: None,
        }
    }

    fn empty_samples(unrooted: bool, full_mask: &Bitset) -> SplitMap<SplitSamples> {
        if unrooted {
            SplitMap::canonical(full_mask.clone())
        } else {
            SplitMap::raw()
        }
    }

    pub fn universe(&self) -> &TaxonUniverse {
        &self.universe
    }

    pub fn config(&self) -> DistributionConfig {
        self.config
    }

    /// Switches between rooted and unrooted aggregation.
    ///
    /// Only allowed before the first tree is counted, since existing keys
    /// would otherwise mix both conventions.
    pub fn set_unrooted(&mut self, unrooted: bool) -> Result<()> {
        if unrooted == self.config.unrooted {
            return Ok(());
        }
        if self.trees_counted > 0 {
            return Err(SplitError::InvalidArgument(format!(
                "cannot change rootedness after {} trees were counted",
                self.trees_counted
            )));
        }
        self.config.unrooted = unrooted;
        self.samples = Self::empty_samples(unrooted, &self.full_mask);
        Ok(())
    }

    /// Only allowed before the first tree is counted, so that every split
    /// keeps one length sample per occurrence or none at all.
    pub fn set_ignore_edge_lengths(&mut self, ignore: bool) -> Result<()> {
        self.ensure_unchanged_or_empty(ignore == self.config.ignore_edge_lengths, "edge lengths")?;
        self.config.ignore_edge_lengths = ignore;
        Ok(())
    }

    /// Same restriction as [`set_ignore_edge_lengths`](Self::set_ignore_edge_lengths).
    pub fn set_ignore_node_ages(&mut self, ignore: bool) -> Result<()> {
        self.ensure_unchanged_or_empty(ignore == self.config.ignore_node_ages, "node ages")?;
        self.config.ignore_node_ages = ignore;
        Ok(())
    }

    fn ensure_unchanged_or_empty(&self, unchanged: bool, what: &str) -> Result<()> {
        if unchanged || self.trees_counted == 0 {
            return Ok(());
        }
        Err(SplitError::InvalidArgument(format!(
            "cannot change whether {what} are ignored after {} trees were counted",
            self.trees_counted
        )))
    }

    pub fn trees_counted(&self) -> usize {
        self.trees_counted
    }

    /// Encodes `tree` against the shared universe and adds its splits.
    ///
    /// Leaf labels are resolved to the shared universe's bit positions, so a
    /// tree built with its own taxon ordering is remapped on the way in.
    ///
    /// # Errors
    /// `UnknownTaxon` if a leaf is not in the universe; nothing is recorded
    /// for that tree.
    pub fn count_splits_on_tree(&mut self, tree: &PhyloTree) -> Result<()> {
        let universe = Arc::clone(&self.universe);
        let encoding = encode_splits(tree, Some(universe.as_ref()), Some(self.config.unrooted))?;
        self.commit(&encoding);
        Ok(())
    }

    /// Adds a tree that was already encoded, e.g. by [`encode_trees`].
    ///
    /// # Errors
    /// `InvalidArgument` if the encoding used another taxon universe or the
    /// opposite rootedness.
    pub fn count_encoding(&mut self, encoding: &SplitEncoding<'_>) -> Result<()> {
        let same_universe = std::ptr::eq(encoding.universe(), self.universe.as_ref())
            || encoding.universe().labels() == self.universe.labels();
        if !same_universe {
            return Err(SplitError::InvalidArgument(
                "encoding was built against a different taxon universe".to_string(),
            ));
        }
        if encoding.is_canonical() != self.config.unrooted {
            return Err(SplitError::InvalidArgument(format!(
                "encoding is {} but the distribution is {}",
                rootedness(encoding.is_canonical()),
                rootedness(self.config.unrooted)
            )));
        }
        self.commit(encoding);
        Ok(())
    }

    /// Encodes `trees` in parallel, then folds them in input order.
    ///
    /// Each tree is all-or-nothing. Folding stops at the first tree that
    /// fails; trees before it stay counted.
    pub fn count_splits_on_trees(&mut self, trees: Vec<PhyloTree>) -> Result<usize> {
        let universe = Arc::clone(&self.universe);
        let encodings = encode_trees(trees, &universe, Some(self.config.unrooted));

        let mut counted = 0;
        for encoding in encodings {
            self.commit(&encoding?);
            counted += 1;
        }
        Ok(counted)
    }

    fn commit(&mut self, encoding: &SplitEncoding<'_>) {
        self.trees_counted += 1;

        // Sorted so that first-seen order does not depend on hash order.
        let edges = encoding
            .split_edges()
            .iter()
            .sorted_by(|a, b| a.0.cmp(b.0));
        for (split, edge) in edges {
            if !self.samples.contains_key(split) {
                self.splits.push(self.samples.key_for(split).into_owned());
            }
            let samples = self.samples.entry(split.clone()).or_default();
            samples.count += 1;
            if !self.config.ignore_edge_lengths {
                samples.edge_lengths.push(edge.length.unwrap_or(0.0));
            }
            if !self.config.ignore_node_ages {
                samples.node_ages.push(edge.head_age);
            }
        }

        debug!(
            trees_counted = self.trees_counted,
            tree_splits = encoding.split_edges().len(),
            unique_splits = self.splits.len(),
            "counted splits on tree"
        );
    }

    /// Split keys in first-seen order (canonical when unrooted).
    pub fn splits(&self) -> &[Bitset] {
        &self.splits
    }

    pub fn unique_splits(&self) -> usize {
        self.splits.len()
    }

    /// Number of trees containing `split` (either orientation when unrooted).
    pub fn split_occurrence(&self, split: &Bitset) -> usize {
        self.samples.get(split).map_or(0, |s| s.count)
    }

    /// Branch-length samples of `split`, one per tree that contained it.
    pub fn edge_lengths(&self, split: &Bitset) -> Option<&[f64]> {
        self.samples.get(split).map(|s| s.edge_lengths.as_slice())
    }

    /// Node-age samples of `split`, one per tree that contained it.
    pub fn node_ages(&self, split: &Bitset) -> Option<&[f64]> {
        self.samples.get(split).map(|s| s.node_ages.as_slice())
    }

    /// Totals over all observed splits, split by informativeness.
    pub fn splits_considered(&self) -> SplitsConsidered {
        let mut considered = SplitsConsidered::default();
        for (split, samples) in self.samples.iter() {
            considered.unique += 1;
            considered.total += samples.count;
            if is_informative_split(split, &self.full_mask) {
                considered.informative_unique += 1;
                considered.informative_total += samples.count;
            }
        }
        considered
    }

    /// Frequency of every observed split, cached until more trees arrive.
    pub fn split_frequencies(&mut self) -> &HashMap<Bitset, f64> {
        if self.freqs_stamp != Some(self.trees_counted) {
            self.calc_freqs();
        }
        &self.freqs
    }

    /// Recomputes the frequency table regardless of the cache stamp.
    pub fn calc_freqs(&mut self) -> &HashMap<Bitset, f64> {
        let total = self.trees_counted.max(1) as f64;
        self.freqs = self
            .samples
            .iter()
            .map(|(split, samples)| (split.clone(), samples.count as f64 / total))
            .collect();
        self.freqs_stamp = Some(self.trees_counted);
        trace!(
            trees_counted = self.trees_counted,
            splits = self.freqs.len(),
            "recomputed split frequencies"
        );
        &self.freqs
    }

    /// Frequency of one split, computed directly without touching the cache.
    pub fn frequency_of(&self, split: &Bitset) -> Option<f64> {
        let total = self.trees_counted.max(1) as f64;
        self.samples.get(split).map(|s| s.count as f64 / total)
    }

    /// One summary per split, by decreasing count, ties by split value.
    pub fn summaries(&self) -> Vec<SplitSummary> {
        let total = self.trees_counted.max(1) as f64;
        self.samples
            .iter()
            .map(|(split, samples)| SplitSummary {
                split: split.clone(),
                count: samples.count,
                frequency: samples.count as f64 / total,
                mean_edge_length: mean(&samples.edge_lengths),
                mean_node_age: mean(&samples.node_ages),
                informative: is_informative_split(split, &self.full_mask),
            })
            .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.split.cmp(&b.split)))
            .collect()
    }

    /// Group-frequency table of the informative splits, one line per split:
    /// `pattern  count  percent%`, `*` marking taxa on the split side.
    ///
    /// `first_taxon_left` renders taxon 0 in the first column, as PAUP* does.
    pub fn render_table(&self, first_taxon_left: bool) -> Vec<String> {
        let taxon_count = self.universe.len();
        self.summaries()
            .into_iter()
            .filter(|summary| summary.informative)
            .map(|summary| {
                let pattern = if first_taxon_left {
                    render_split_reversed(&summary.split, taxon_count, '*', '.')
                } else {
                    render_split(&summary.split, taxon_count, '*', '.')
                };
                format!("{pattern}  {}  {:.2}%", summary.count, summary.frequency * 100.0)
            })
            .collect()
    }
}

fn rootedness(canonical: bool) -> &'static str {
    if canonical { "unrooted" } else { "rooted" }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
