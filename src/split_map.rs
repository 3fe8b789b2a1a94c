//! Mapping keyed by split, with optional canonicalization for unrooted trees.
//!
//! # The problem
//! Removing an edge of an unrooted tree splits the taxa into two sides, and
//! either side describes the same bipartition:
//!
//! ```text
//! A --\                   /-- C
//!     node1 ------- node2
//! B --/                   \-- D
//!
//! {A,B} = 0b0011 and {C,D} = 0b1100 are the same split.
//! ```
//!
//! Depending on where a tree is rooted, the encoder sees one side or the
//! other. Without canonicalization identical trees would produce different
//! keys.
//!
//! # Rule
//! The canonical key is the side that does NOT contain the taxon at index 0.
//! If bit 0 is set, the key is `split ^ full_mask`; otherwise the split itself.
//!
//! | Split        | Has A? | Canonical     |
//! |--------------|--------|---------------|
//! | {A,B} 0b0011 | YES    | 0b1100 (flip) |
//! | {C,D} 0b1100 | NO     | 0b1100 (keep) |

use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::bitset::Bitset;

/// How a [`SplitMap`] turns a split into a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMode {
    /// Keys are the splits exactly as given (rooted comparison).
    Raw,
    /// Keys are normalized against `full_mask` (unrooted comparison).
    Canonical { full_mask: Bitset },
}

/// A map from split to `V`.
///
/// In [`KeyMode::Canonical`] every insert and lookup goes through
/// [`SplitMap::key_for`], so a split and its complement always resolve to
/// the same entry.
#[derive(Debug, Clone)]
pub struct SplitMap<V> {
    mode: KeyMode,
    entries: HashMap<Bitset, V>,
}

impl<V> SplitMap<V> {
    pub fn raw() -> Self {
        SplitMap {
            mode: KeyMode::Raw,
            entries: HashMap::new(),
        }
    }

    pub fn canonical(full_mask: Bitset) -> Self {
        SplitMap {
            mode: KeyMode::Canonical { full_mask },
            entries: HashMap::new(),
        }
    }

    pub fn mode(&self) -> &KeyMode {
        &self.mode
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self.mode, KeyMode::Canonical { .. })
    }

    /// The key under which `split` is stored.
    pub fn key_for<'a>(&self, split: &'a Bitset) -> Cow<'a, Bitset> {
        match &self.mode {
            KeyMode::Raw => Cow::Borrowed(split),
            KeyMode::Canonical { full_mask } => canonical_split(split, full_mask),
        }
    }

    /// Inserts `value` under the key of `split`, returning the previous value.
    pub fn insert(&mut self, split: Bitset, value: V) -> Option<V> {
        let key = self.owned_key(split);
        self.entries.insert(key, value)
    }

    pub fn get(&self, split: &Bitset) -> Option<&V> {
        self.entries.get(self.key_for(split).as_ref())
    }

    pub fn get_mut(&mut self, split: &Bitset) -> Option<&mut V> {
        let key = self.key_for(split).into_owned();
        self.entries.get_mut(&key)
    }

    pub fn contains_key(&self, split: &Bitset) -> bool {
        self.get(split).is_some()
    }

    pub fn entry(&mut self, split: Bitset) -> Entry<'_, Bitset, V> {
        let key = self.owned_key(split);
        self.entries.entry(key)
    }

    /// [`key_for`](Self::key_for) for an owned split, reusing it when no
    /// flip is needed.
    fn owned_key(&self, split: Bitset) -> Bitset {
        let flipped = match self.key_for(&split) {
            Cow::Owned(key) => Some(key),
            Cow::Borrowed(_) => None,
        };
        flipped.unwrap_or(split)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys, already canonical in canonical mode.
    pub fn keys(&self) -> impl Iterator<Item = &Bitset> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Bitset, &V)> {
        self.entries.iter()
    }
}

/// Canonical representative of `{split, split ^ full_mask}`: the member
/// without taxon 0.
pub fn canonical_split<'a>(split: &'a Bitset, full_mask: &Bitset) -> Cow<'a, Bitset> {
    if split.contains(0) {
        Cow::Owned(split.xor(full_mask))
    } else {
        Cow::Borrowed(split)
    }
}
