//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `bitset`: arbitrary-width split bitsets and bit utilities (popcount, index iteration, rendering).
//! - `taxa`: ordered taxon universe assigning bit positions.
//! - `split_map`: split-keyed map with canonicalization for unrooted comparison.
//! - `encode`: per-tree split encoding (postorder mask aggregation).
//! - `distribution`: split frequencies, branch lengths and node ages across trees.
//! - `error`: crate error type.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod bitset;
pub mod distribution;
pub mod encode;
pub mod error;
pub mod split_map;
pub mod taxa;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use bitset::{
    Bitset, is_informative_split, iter_set_bit_indices, population_count, render_split,
    render_split_reversed, split_to_list,
};
pub use distribution::{DistributionConfig, SplitDistribution, SplitSummary, SplitsConsidered};
pub use encode::{SplitEdge, SplitEncoding, encode_splits, encode_trees};
pub use error::{Result, SplitError};
pub use split_map::{KeyMode, SplitMap};
pub use taxa::TaxonUniverse;
