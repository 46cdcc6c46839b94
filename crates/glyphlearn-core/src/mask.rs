//! Fixed-size bit masks
//!
//! Proto and config selections handed to the geometry matcher are bit
//! masks over the ids of one compiled class.

use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// A fixed-length bit vector
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitMask {
    words: Vec<u64>,
    len: usize,
}

/// Mask over the protos of a class
pub type ProtoMask = BitMask;

/// Mask over the configs of a class
pub type ConfigMask = BitMask;

impl BitMask {
    /// Creates a mask of `len` bits, all off
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Creates a mask of `len` bits, all on
    pub fn all_on(len: usize) -> Self {
        let mut mask = Self::new(len);
        for i in 0..len {
            mask.set(i);
        }
        mask
    }

    /// Number of bits in the mask
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the mask has zero bits
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Turns bit `i` on. Out-of-range bits are ignored.
    pub fn set(&mut self, i: usize) {
        if i < self.len {
            self.words[i / WORD_BITS] |= 1 << (i % WORD_BITS);
        }
    }

    /// Turns bit `i` off
    pub fn reset(&mut self, i: usize) {
        if i < self.len {
            self.words[i / WORD_BITS] &= !(1 << (i % WORD_BITS));
        }
    }

    /// Tests bit `i`; out-of-range bits read as off
    #[inline]
    pub fn test(&self, i: usize) -> bool {
        i < self.len && self.words[i / WORD_BITS] & (1 << (i % WORD_BITS)) != 0
    }

    /// Turns every bit off
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Number of bits that are on
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates over the indices of the bits that are on, ascending
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.test(i))
    }

    /// Returns true if the word storage covers exactly `len` bits
    ///
    /// Always true for masks built through this API; deserialized masks
    /// must be checked before use.
    pub fn is_well_formed(&self) -> bool {
        self.words.len() == self.len.div_ceil(WORD_BITS)
    }
}

impl FromIterator<usize> for BitMask {
    /// Collects bit indices into a mask just large enough to hold them
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let ids: Vec<usize> = iter.into_iter().collect();
        let len = ids.iter().max().map_or(0, |&m| m + 1);
        let mut mask = BitMask::new(len);
        for id in ids {
            mask.set(id);
        }
        mask
    }
}
