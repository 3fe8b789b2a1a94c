//! Python binding layer for split frequency calculations.
//!
//! Provides Python functions that count splits over a list of Newick trees.

use phylotree::tree::Tree as PhyloTree;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::distribution::{DistributionConfig, SplitDistribution};
use crate::bitset::{render_split, render_split_reversed};
use crate::taxa::TaxonUniverse;

/// Count split frequencies across Newick trees.
///
/// Args:
///     newicks: List of Newick strings sharing one leaf set
///     unrooted: Treat both sides of a bipartition as one split (default: True)
///     first_taxon_left: Render patterns with the first taxon leftmost (default: True)
///
/// Returns:
///     A tuple of (taxa, splits) where:
///     - taxa is the list of taxon labels in bit order
///     - splits is a list of (pattern, count, frequency) sorted by decreasing count
///
/// Raises:
///     ValueError: If no trees are given, a tree fails to parse, or a tree
///     names a taxon missing from the first tree
#[pyfunction]
#[pyo3(signature = (newicks, unrooted=true, first_taxon_left=true))]
fn split_frequencies(
    newicks: Vec<String>,
    unrooted: bool,
    first_taxon_left: bool,
) -> PyResult<(Vec<String>, Vec<(String, usize, f64)>)> {
    let dist = count_all(&newicks, unrooted)?;
    let taxon_count = dist.universe().len();

    let rows = dist
        .summaries()
        .into_iter()
        .map(|summary| {
            let pattern = if first_taxon_left {
                render_split_reversed(&summary.split, taxon_count, '*', '.')
            } else {
                render_split(&summary.split, taxon_count, '*', '.')
            };
            (pattern, summary.count, summary.frequency)
        })
        .collect();

    Ok((dist.universe().labels().to_vec(), rows))
}

/// Split totals across Newick trees.
///
/// Returns:
///     (total, unique, informative_total, informative_unique)
#[pyfunction]
#[pyo3(signature = (newicks, unrooted=true))]
fn splits_considered(newicks: Vec<String>, unrooted: bool) -> PyResult<(usize, usize, usize, usize)> {
    let considered = count_all(&newicks, unrooted)?.splits_considered();
    Ok((
        considered.total,
        considered.unique,
        considered.informative_total,
        considered.informative_unique,
    ))
}

/// Helper function to parse trees and fold them into one distribution.
/// The taxon universe comes from the first tree.
fn count_all(newicks: &[String], unrooted: bool) -> PyResult<SplitDistribution> {
    let trees = newicks
        .iter()
        .enumerate()
        .map(|(idx, newick)| {
            PhyloTree::from_newick(newick)
                .map_err(|e| PyValueError::new_err(format!("Failed to parse tree {idx}: {e}")))
        })
        .collect::<PyResult<Vec<_>>>()?;

    let first = trees
        .first()
        .ok_or_else(|| PyValueError::new_err("No trees to count"))?;
    let universe = TaxonUniverse::from_tree(first);

    let config = DistributionConfig {
        unrooted,
        ..DistributionConfig::default()
    };
    let mut dist = SplitDistribution::with_config(universe, config);
    dist.count_splits_on_trees(trees)
        .map_err(|e| PyValueError::new_err(format!("Failed to count splits: {e}")))?;

    Ok(dist)
}

/// Python module definition
#[pymodule]
fn phylo_splits(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(split_frequencies, m)?)?;
    m.add_function(wrap_pyfunction!(splits_considered, m)?)?;
    Ok(())
}
