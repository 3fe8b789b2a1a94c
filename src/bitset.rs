//! Arbitrary-width bitsets for splits, plus the bit utilities built on them.
//!
//! # Overview
//! A split (bipartition) is stored as a bitset over the taxon universe.
//! Each bit position corresponds to a taxon index.
//!
//! # Example
//! For a universe [A, B, C, D] mapped to indices [0, 1, 2, 3]:
//! - Split {A, C} → bitset `0b0101` (bits 0 and 2 set)
//! - Split {B, C, D} → bitset `0b1110` (bits 1, 2, 3 set)
//!
//! Besides the [`Bitset`] type itself this module holds the free functions
//! that operate on split values: [`population_count`],
//! [`iter_set_bit_indices`], [`is_informative_split`] and the renderers used
//! for human-readable reports.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr, BitXor};
use std::str::FromStr;

use crate::error::{Result, SplitError};

/// Number of set bits for every 4-bit value.
const NIBBLE_BITS: [u8; 16] = [0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4];

/// A growable bitset representing which taxa sit on one side of a split.
///
/// Internally stores bits in `Vec<u64>` words to support arbitrarily large
/// taxon universes. Each u64 word holds 64 taxon indices.
///
/// Equality, hashing and ordering look at the numeric value only: trailing
/// zero words are ignored, so `Bitset(vec![3])` and `Bitset(vec![3, 0])` are
/// the same split. Ordering compares the value as an unsigned big integer.
#[derive(Clone, Debug, Default)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Creates a new bitset with all bits set to 0.
    ///
    /// # Parameters
    /// - `words`: Number of u64 words to preallocate. Calculate as `(num_taxa + 63) / 64`
    ///
    /// # Example
    /// ```
    /// # use phylo_splits::bitset::Bitset;
    /// // For a universe with 100 taxa, need 2 words (128 bits)
    /// let bs = Bitset::zeros(2);
    /// assert_eq!(bs.0.len(), 2);
    /// assert!(bs.is_zero());
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Empty bitset sized for `taxon_count` taxa.
    pub fn for_taxa(taxon_count: usize) -> Self {
        Self::zeros(taxon_count.div_ceil(64))
    }

    /// Bitset holding a single machine word.
    ///
    /// ```
    /// # use phylo_splits::bitset::Bitset;
    /// let ab = Bitset::from_word(0b0011);
    /// assert!(ab.contains(0) && ab.contains(1) && !ab.contains(2));
    /// ```
    pub fn from_word(word: u64) -> Self {
        Bitset(vec![word])
    }

    /// Bitset with exactly the given indices set.
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        let mut bitset = Bitset::default();
        for idx in indices {
            bitset.set(idx);
        }
        bitset
    }

    /// Sets the bit at the given index to 1, growing the word array if needed.
    ///
    /// # Example
    /// ```
    /// # use phylo_splits::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);  // Taxon 0 on this side
    /// bs.set(5);  // Taxon 5 on this side
    /// assert_eq!(bs.0[0], 0b00100001);
    /// bs.set(70); // Spills into a second word
    /// assert_eq!(bs.0.len(), 2);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        let word = idx >> 6; // Equivalent to idx / 64
        let bit = idx & 63; // Equivalent to idx % 64
        if word >= self.0.len() {
            self.0.resize(word + 1, 0);
        }
        self.0[word] |= 1u64 << bit;
    }

    /// Returns true if the bit at `idx` is set.
    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.0
            .get(idx >> 6)
            .is_some_and(|word| word & (1u64 << (idx & 63)) != 0)
    }

    /// Performs bitwise OR with another bitset (union operation).
    ///
    /// Merges two taxon sets: `self` becomes `self ∪ other`
    ///
    /// # Example
    /// ```
    /// # use phylo_splits::bitset::Bitset;
    /// let mut left = Bitset::zeros(1);
    /// left.set(0);   // {0}
    ///
    /// let mut right = Bitset::zeros(1);
    /// right.set(1);  // {1}
    ///
    /// left.or_assign(&right);  // {0} ∪ {1} = {0, 1}
    /// assert_eq!(left.0[0], 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        if other.0.len() > self.0.len() {
            self.0.resize(other.0.len(), 0);
        }
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Bitwise XOR. Used to flip a split to its complement within the full mask.
    pub fn xor(&self, other: &Bitset) -> Bitset {
        let len = self.0.len().max(other.0.len());
        Bitset(
            (0..len)
                .map(|i| self.word(i) ^ other.word(i))
                .collect(),
        )
    }

    /// Bitwise AND (intersection).
    pub fn and(&self, other: &Bitset) -> Bitset {
        Bitset(
            self.0
                .iter()
                .zip(&other.0)
                .map(|(a, b)| a & b)
                .collect(),
        )
    }

    #[inline]
    fn word(&self, i: usize) -> u64 {
        self.0.get(i).copied().unwrap_or(0)
    }

    /// True when no bit is set.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    /// Counts the number of set bits (population count).
    ///
    /// Walks each word four bits at a time through a 16-entry table, so the
    /// work is bounded by the width of the bitset divided by four.
    ///
    /// # Example
    /// ```
    /// # use phylo_splits::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(2);
    /// bs.set(5);
    /// assert_eq!(bs.count_ones(), 3);
    /// ```
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|&w| nibble_count(w)).sum()
    }

    /// More than one bit set, i.e. `(x - 1) & x != 0` for the integer value.
    pub fn has_multiple_bits(&self) -> bool {
        let mut seen = false;
        for &w in &self.0 {
            if w == 0 {
                continue;
            }
            if seen || w & (w - 1) != 0 {
                return true;
            }
            seen = true;
        }
        false
    }

    /// Index of the highest set bit, `None` for an empty bitset.
    pub fn highest_set_bit(&self) -> Option<usize> {
        self.0
            .iter()
            .rposition(|&w| w != 0)
            .map(|i| i * 64 + 63 - self.0[i].leading_zeros() as usize)
    }

    /// Ascending indices of the set bits.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(i, &word)| {
            (0..64)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| i * 64 + bit)
        })
    }

    fn significant(&self) -> &[u64] {
        let len = self.0.iter().rposition(|&w| w != 0).map_or(0, |i| i + 1);
        &self.0[..len]
    }
}

#[inline]
fn nibble_count(mut word: u64) -> usize {
    let mut n = 0usize;
    while word != 0 {
        n += NIBBLE_BITS[(word & 0x0F) as usize] as usize;
        word >>= 4;
    }
    n
}

impl PartialEq for Bitset {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for Bitset {}

impl Hash for Bitset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl Ord for Bitset {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.significant(), other.significant());
        a.len()
            .cmp(&b.len())
            .then_with(|| a.iter().rev().cmp(b.iter().rev()))
    }
}

impl PartialOrd for Bitset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl BitOr for &Bitset {
    type Output = Bitset;

    fn bitor(self, rhs: &Bitset) -> Bitset {
        let mut out = self.clone();
        out.or_assign(rhs);
        out
    }
}

impl BitXor for &Bitset {
    type Output = Bitset;

    fn bitxor(self, rhs: &Bitset) -> Bitset {
        self.xor(rhs)
    }
}

impl BitAnd for &Bitset {
    type Output = Bitset;

    fn bitand(self, rhs: &Bitset) -> Bitset {
        self.and(rhs)
    }
}

impl From<u64> for Bitset {
    fn from(word: u64) -> Self {
        Bitset::from_word(word)
    }
}

/// Binary digits, most significant first. The empty set prints as `0`.
impl fmt::Display for Bitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.highest_set_bit() {
            None => write!(f, "0"),
            Some(top) => {
                let digits: String = (0..=top)
                    .rev()
                    .map(|i| if self.contains(i) { '1' } else { '0' })
                    .collect();
                f.write_str(&digits)
            }
        }
    }
}

/// Parses binary digits (optionally prefixed with `0b`, `_` separators allowed).
impl FromStr for Bitset {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim();
        let digits = digits.strip_prefix("0b").unwrap_or(digits);
        let bits: Vec<char> = digits.chars().filter(|&c| c != '_').collect();
        if bits.is_empty() {
            return Err(SplitError::InvalidArgument(format!(
                "'{s}' is not a binary split value"
            )));
        }

        let mut bitset = Bitset::for_taxa(bits.len());
        for (pos, ch) in bits.iter().rev().enumerate() {
            match ch {
                '1' => bitset.set(pos),
                '0' => {}
                other => {
                    return Err(SplitError::InvalidArgument(format!(
                        "'{s}' is not a binary split value (found '{other}')"
                    )));
                }
            }
        }
        Ok(bitset)
    }
}

/// Population count of a primitive integer.
///
/// Accepts any integer that converts losslessly into `u128`; negative values
/// are rejected with [`SplitError::InvalidArgument`].
///
/// ```
/// # use phylo_splits::bitset::population_count;
/// assert_eq!(population_count(0b1011_0001u32).unwrap(), 4);
/// assert!(population_count(-3i64).is_err());
/// ```
pub fn population_count<V>(value: V) -> Result<usize>
where
    V: TryInto<u128> + Copy + fmt::Display,
{
    let v: u128 = value
        .try_into()
        .map_err(|_| SplitError::InvalidArgument(format!("negative argument: {value}")))?;
    Ok(Bitset(vec![v as u64, (v >> 64) as u64]).count_ones())
}

/// Lazy iterator over the indices of the bits set in `value & mask`.
///
/// Cloning the iterator restarts from the cloned position, so a fresh clone
/// taken before iteration replays the whole sequence.
#[derive(Clone, Debug)]
pub struct SetBitIndices<'a> {
    masked: Bitset,
    mask: Option<&'a Bitset>,
    position: usize,
    end: usize,
    index: usize,
    reindex_within_mask: bool,
}

impl Iterator for SetBitIndices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.position < self.end {
            let pos = self.position;
            self.position += 1;

            let current = self.index;
            let counts = !self.reindex_within_mask || self.mask.is_none_or(|m| m.contains(pos));
            if counts {
                self.index += 1;
            }
            if self.masked.contains(pos) {
                return Some(current);
            }
        }
        None
    }
}

/// Indices of the bits set in `value & mask`.
///
/// - `mask`: `None` means every bit.
/// - `one_based`: bit 0 is reported as 1.
/// - `reindex_within_mask`: an index counts only the positions that are set in
///   `mask`, i.e. the position inside the masked sub-universe. Otherwise every
///   bit position advances the counter.
///
/// ```
/// # use phylo_splits::bitset::{iter_set_bit_indices, Bitset};
/// let split = Bitset::from_word(0b1010);
/// let mask = Bitset::from_word(0b1110);
/// let absolute: Vec<_> = iter_set_bit_indices(&split, Some(&mask), false, false).collect();
/// let local: Vec<_> = iter_set_bit_indices(&split, Some(&mask), false, true).collect();
/// assert_eq!(absolute, vec![1, 3]);
/// assert_eq!(local, vec![0, 2]);
/// ```
pub fn iter_set_bit_indices<'a>(
    value: &Bitset,
    mask: Option<&'a Bitset>,
    one_based: bool,
    reindex_within_mask: bool,
) -> SetBitIndices<'a> {
    let masked = match mask {
        Some(m) => value.and(m),
        None => value.clone(),
    };
    let end = masked.highest_set_bit().map_or(0, |top| top + 1);
    SetBitIndices {
        masked,
        mask,
        position: 0,
        end,
        index: usize::from(one_based),
        reindex_within_mask,
    }
}

/// [`iter_set_bit_indices`] collected into a vector.
pub fn split_to_list(
    value: &Bitset,
    mask: Option<&Bitset>,
    one_based: bool,
    reindex_within_mask: bool,
) -> Vec<usize> {
    iter_set_bit_indices(value, mask, one_based, reindex_within_mask).collect()
}

/// A split is informative when both sides hold more than one taxon.
///
/// Tested as "neither `split` nor `split ^ full_mask` is zero or a power of
/// two". Single-taxon splits say nothing about relationships among the rest.
pub fn is_informative_split(split: &Bitset, full_mask: &Bitset) -> bool {
    split.has_multiple_bits() && split.xor(full_mask).has_multiple_bits()
}

/// Fixed-width rendering with the highest taxon index leftmost.
///
/// ```
/// # use phylo_splits::bitset::{render_split, Bitset};
/// assert_eq!(render_split(&Bitset::from_word(0b0011), 5, '*', '.'), "...**");
/// ```
pub fn render_split(split: &Bitset, taxon_count: usize, present: char, absent: char) -> String {
    (0..taxon_count)
        .rev()
        .map(|i| if split.contains(i) { present } else { absent })
        .collect()
}

/// Fixed-width rendering with the first taxon leftmost (PAUP* convention).
///
/// ```
/// # use phylo_splits::bitset::{render_split_reversed, Bitset};
/// assert_eq!(render_split_reversed(&Bitset::from_word(0b0011), 5, '*', '.'), "**...");
/// ```
pub fn render_split_reversed(
    split: &Bitset,
    taxon_count: usize,
    present: char,
    absent: char,
) -> String {
    (0..taxon_count)
        .map(|i| if split.contains(i) { present } else { absent })
        .collect()
}

/// Inverse of [`render_split`] (`first_taxon_left == false`) and
/// [`render_split_reversed`] (`first_taxon_left == true`).
pub fn parse_rendered_split(
    text: &str,
    present: char,
    absent: char,
    first_taxon_left: bool,
) -> Result<Bitset> {
    let symbols: Vec<char> = text.chars().collect();
    let width = symbols.len();
    let mut split = Bitset::for_taxa(width);

    for (pos, &symbol) in symbols.iter().enumerate() {
        let idx = if first_taxon_left { pos } else { width - 1 - pos };
        if symbol == present {
            split.set(idx);
        } else if symbol != absent {
            return Err(SplitError::InvalidArgument(format!(
                "unexpected symbol '{symbol}' in rendered split '{text}'"
            )));
        }
    }
    Ok(split)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for bitsets spanning one to three words.
    fn bitset() -> impl Strategy<Value = Bitset> {
        proptest::collection::vec(any::<u64>(), 1..=3).prop_map(Bitset)
    }

    proptest! {
        #[test]
        fn popcount_matches_binary_ones(v in any::<u64>()) {
            let expected = format!("{v:b}").chars().filter(|&c| c == '1').count();
            prop_assert_eq!(population_count(v).unwrap(), expected);
        }

        #[test]
        fn popcount_rejects_every_negative(v in i64::MIN..0) {
            prop_assert!(population_count(v).is_err());
        }

        #[test]
        fn nibble_count_matches_hardware(bs in bitset()) {
            let hw: usize = bs.0.iter().map(|w| w.count_ones() as usize).sum();
            prop_assert_eq!(bs.count_ones(), hw);
        }

        #[test]
        fn informative_iff_both_sides_larger_than_one(n in 3usize..100, seed in any::<u64>()) {
            let full = Bitset::from_indices(0..n);
            let split = Bitset::from_indices((0..n).filter(|i| (seed.rotate_left(*i as u32) & 1) == 1));
            prop_assume!(!split.is_zero() && split != full);
            let expected = split.count_ones() > 1 && split.xor(&full).count_ones() > 1;
            prop_assert_eq!(is_informative_split(&split, &full), expected);
        }

        #[test]
        fn render_then_parse_restores_split(bs in bitset(), n in 1usize..192) {
            let restricted = bs.and(&Bitset::from_indices(0..n));
            let forward = render_split(&bs, n, '*', '.');
            let reversed = render_split_reversed(&bs, n, '*', '.');
            prop_assert_eq!(forward.len(), n);
            prop_assert_eq!(parse_rendered_split(&forward, '*', '.', false).unwrap(), restricted.clone());
            prop_assert_eq!(parse_rendered_split(&reversed, '*', '.', true).unwrap(), restricted);
        }

        #[test]
        fn display_then_parse_roundtrip(bs in bitset()) {
            prop_assert_eq!(bs.to_string().parse::<Bitset>().unwrap(), bs);
        }
    }
}
