//! Fixed-width bit vectors for line assignments.
//!
//! A [`BitSet`] holds one bit per circuit line: bit `i` is the value carried by
//! line `i`. Simulators consume and produce full-width assignments of this type,
//! and truth tables use it as the (ordered, hashable) key of their rows.

use std::fmt::{Debug, Display, Formatter};

/// A bit vector of fixed width backed by a vector of u64 words.
///
/// Bits above `width` are always zero, so derived equality and ordering only
/// depend on the visible bits.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BitSet {
    /// Storage: each u64 holds 64 bits
    words: Vec<u64>,
    /// Number of valid bits
    width: usize,
}

impl BitSet {
    /// Number of bits per word.
    const BITS_PER_WORD: usize = 64;

    /// Creates an all-zero bit set of the given width.
    pub fn new(width: usize) -> Self {
        let num_words = width.div_ceil(Self::BITS_PER_WORD);
        Self {
            words: vec![0; num_words],
            width,
        }
    }

    /// Creates a bit set of the given width whose low bits are taken from `value`.
    ///
    /// Bit `i` of `value` becomes bit `i` of the set; bits of `value` at or above
    /// `width` are ignored.
    pub fn from_u64(width: usize, value: u64) -> Self {
        let mut bs = Self::new(width);
        if let Some(first) = bs.words.first_mut() {
            *first = value;
        }
        bs.mask_tail();
        bs
    }

    /// Creates a bit set from a sequence of booleans, index 0 first.
    pub fn from_bools(bits: impl IntoIterator<Item = bool>) -> Self {
        let bits: Vec<bool> = bits.into_iter().collect();
        let mut bs = Self::new(bits.len());
        for (i, &b) in bits.iter().enumerate() {
            bs.set(i, b);
        }
        bs
    }

    /// Returns the low 64 bits as an integer.
    ///
    /// # Panics
    ///
    /// Panics if the width exceeds 64.
    pub fn to_u64(&self) -> u64 {
        assert!(
            self.width <= Self::BITS_PER_WORD,
            "Bit set of width {} does not fit into u64",
            self.width
        );
        self.words.first().copied().unwrap_or(0)
    }

    /// Returns the number of bits.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Word holding bit `index` and the mask selecting it.
    #[inline]
    fn locate(index: usize) -> (usize, u64) {
        (index / Self::BITS_PER_WORD, 1 << (index % Self::BITS_PER_WORD))
    }

    fn mask_tail(&mut self) {
        let rem = self.width % Self::BITS_PER_WORD;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }

    /// Returns the bit at the given index.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.width, "Bit {} out of range (width {})", index, self.width);
        let (word, mask) = Self::locate(index);
        self.words[word] & mask != 0
    }

    /// Sets the bit at the given index to `value`.
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.width, "Bit {} out of range (width {})", index, self.width);
        let (word, mask) = Self::locate(index);
        if value {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
    }

    /// Inverts the bit at the given index.
    #[inline]
    pub fn flip(&mut self, index: usize) {
        assert!(index < self.width, "Bit {} out of range (width {})", index, self.width);
        let (word, mask) = Self::locate(index);
        self.words[word] ^= mask;
    }

    /// Exchanges the bits at two indices.
    pub fn swap(&mut self, a: usize, b: usize) {
        let (va, vb) = (self.get(a), self.get(b));
        self.set(a, vb);
        self.set(b, va);
    }

    /// Returns true if every listed bit is set.
    pub fn all(&self, indices: impl IntoIterator<Item = usize>) -> bool {
        indices.into_iter().all(|i| self.get(i))
    }

    /// Returns an iterator over all bits, index 0 first.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.width).map(move |i| self.get(i))
    }

    /// Indices of the lines set to one, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(w * Self::BITS_PER_WORD + bit)
            })
        })
    }
}

impl Default for BitSet {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Display for BitSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for b in self.bits() {
            write!(f, "{}", if b { '1' } else { '0' })?;
        }
        Ok(())
    }
}

impl Debug for BitSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BitSet({})", self)
    }
}
