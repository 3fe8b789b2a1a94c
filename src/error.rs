//! Error type shared by the split encoder and the split distribution.

use phylotree::tree::TreeError;
use thiserror::Error;

/// Errors raised while counting bits, encoding trees or aggregating splits.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Bad input to a bit utility (negative value, malformed split text,
    /// encoding built against another universe).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A leaf label that is not part of the taxon universe.
    #[error("unknown taxon: '{0}'")]
    UnknownTaxon(String),

    /// Failure reported by the tree collaborator.
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

pub type Result<T> = std::result::Result<T, SplitError>;
