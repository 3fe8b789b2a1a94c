//! Encode the splits induced by every edge of a phylogenetic tree.
//!
//! # Overview
//! Every node heads exactly one edge (the edge leading into it from its
//! parent; the root heads the virtual root edge). The split of an edge is the
//! set of taxa below its head node:
//!
//! ```text
//!      root
//!     /    \
//!   {A,B}  {C,D}  ← the edge above this node induces {A,B} | {C,D}
//! ```
//!
//! Masks are built bottom-up: a leaf contributes its taxon bit, an internal
//! node the OR of its children. The encoder does not touch the tree; the
//! result is a [`SplitEncoding`] keyed by head node id.

use std::borrow::Cow;
use std::collections::HashMap;

use phylotree::tree::Tree as PhyloTree;
use rayon::prelude::*;
use tracing::warn;

use crate::bitset::Bitset;
use crate::error::Result;
use crate::split_map::SplitMap;
use crate::taxa::TaxonUniverse;

/// Node identifier used by `phylotree`.
pub type NodeId = usize;

/// The edge that induces a split, identified by its head node.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitEdge {
    /// Node at the lower end of the edge.
    pub head: NodeId,
    /// Branch length, if the tree carries one.
    pub length: Option<f64>,
    /// Distance from the head node to its furthest descendant tip.
    pub head_age: f64,
}

/// Per-edge split masks and the split → edge map of one tree.
#[derive(Debug, Clone)]
pub struct SplitEncoding<'u> {
    universe: Cow<'u, TaxonUniverse>,
    root: NodeId,
    masks: HashMap<NodeId, Bitset>,
    split_edges: SplitMap<SplitEdge>,
    unlabeled_leaves: usize,
}

impl<'u> SplitEncoding<'u> {
    /// Universe the masks were computed against (inferred when none was given).
    pub fn universe(&self) -> &TaxonUniverse {
        &self.universe
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Split mask of the edge headed by `node`.
    pub fn mask_of(&self, node: NodeId) -> Option<&Bitset> {
        self.masks.get(&node)
    }

    /// Split → edge map; canonicalizing when the tree was treated as unrooted.
    pub fn split_edges(&self) -> &SplitMap<SplitEdge> {
        &self.split_edges
    }

    /// Edge inducing `split`, looked up through the map's key rule.
    pub fn edge_for(&self, split: &Bitset) -> Option<&SplitEdge> {
        self.split_edges.get(split)
    }

    pub fn is_canonical(&self) -> bool {
        self.split_edges.is_canonical()
    }

    /// Number of encoded edges (one per node).
    pub fn edge_count(&self) -> usize {
        self.masks.len()
    }

    /// Leaves without a taxon; each contributed an empty mask.
    pub fn unlabeled_leaves(&self) -> usize {
        self.unlabeled_leaves
    }

    pub fn is_fully_labeled(&self) -> bool {
        self.unlabeled_leaves == 0
    }
}

/// Encode one split per edge of `tree`.
///
/// # Parameters
/// - `universe`: taxon universe giving bit positions. `None` infers one from
///   the tree's leaf names (sorted, see [`TaxonUniverse::from_tree`]).
/// - `unrooted`: `Some(false)` keys the map by raw masks, `Some(true)` by
///   canonical masks. `None` follows `tree.is_rooted()`.
///
/// # Algorithm
/// 1. Postorder over the nodes (children before parents)
/// 2. **Leaf**: singleton bit of its taxon, or the empty mask if unlabeled
/// 3. **Internal node**: OR of all child masks
/// 4. Tip distance in the same pass: max over children of child age + child edge length
/// 5. Insert every (mask → edge) into the map; later edges win on key collisions
///
/// # Errors
/// - `UnknownTaxon` if a leaf label is missing from the supplied universe
/// - `Tree` if the tree has no root or refers to missing nodes
pub fn encode_splits<'u>(
    tree: &PhyloTree,
    universe: Option<&'u TaxonUniverse>,
    unrooted: Option<bool>,
) -> Result<SplitEncoding<'u>> {
    let universe = match universe {
        Some(u) => Cow::Borrowed(u),
        None => Cow::Owned(TaxonUniverse::from_tree(tree)),
    };

    let rooted = match unrooted {
        Some(flag) => !flag,
        None => tree.is_rooted()?,
    };
    let mut split_edges = if rooted {
        SplitMap::raw()
    } else {
        SplitMap::canonical(universe.full_mask())
    };

    let root = tree.get_root()?;
    let order = postorder(tree, root)?;
    let words = universe.words();

    let mut masks: HashMap<NodeId, Bitset> = HashMap::with_capacity(order.len());
    let mut ages: HashMap<NodeId, f64> = HashMap::with_capacity(order.len());
    let mut unlabeled_leaves = 0;

    for &node_id in &order {
        let node = tree.get(&node_id)?;

        let (mask, age) = if node.children.is_empty() {
            let mask = match node.name.as_deref().filter(|name| !name.is_empty()) {
                Some(label) => universe.singleton(label)?,
                None => {
                    unlabeled_leaves += 1;
                    warn!(node = node_id, "leaf has no taxon, encoding an empty split");
                    Bitset::zeros(words)
                }
            };
            (mask, 0.0)
        } else {
            let mut mask = Bitset::zeros(words);
            let mut age = 0.0f64;
            for child_id in &node.children {
                if let Some(child_mask) = masks.get(child_id) {
                    mask.or_assign(child_mask);
                }
                let child_length = tree.get(child_id)?.parent_edge.unwrap_or(0.0);
                let child_age = ages.get(child_id).copied().unwrap_or(0.0);
                age = age.max(child_age + child_length);
            }
            (mask, age)
        };

        split_edges.insert(
            mask.clone(),
            SplitEdge {
                head: node_id,
                length: node.parent_edge,
                head_age: age,
            },
        );
        masks.insert(node_id, mask);
        ages.insert(node_id, age);
    }

    Ok(SplitEncoding {
        universe,
        root,
        masks,
        split_edges,
        unlabeled_leaves,
    })
}

/// Encode many trees concurrently against one universe.
///
/// Encodings are self-contained, so the trees are consumed. Results keep the
/// input order; each tree succeeds or fails on its own.
pub fn encode_trees(
    trees: Vec<PhyloTree>,
    universe: &TaxonUniverse,
    unrooted: Option<bool>,
) -> Vec<Result<SplitEncoding<'_>>> {
    trees
        .into_par_iter()
        .map(|tree| encode_splits(&tree, Some(universe), unrooted))
        .collect()
}

/// Node ids in postorder, children visited in stored order.
///
/// Iterative so that deep caterpillar trees cannot overflow the stack.
fn postorder(tree: &PhyloTree, root: NodeId) -> Result<Vec<NodeId>> {
    let mut order = Vec::new();
    let mut stack = vec![(root, false)];

    while let Some((node_id, expanded)) = stack.pop() {
        if expanded {
            order.push(node_id);
            continue;
        }
        stack.push((node_id, true));
        let node = tree.get(&node_id)?;
        for &child_id in node.children.iter().rev() {
            stack.push((child_id, false));
        }
    }

    Ok(order)
}
