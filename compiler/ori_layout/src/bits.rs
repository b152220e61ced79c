//! Fixed-length bit vector for spare-bit masks and wide constants.
//!
//! Bit `i` is bit `i % 8` of byte `i / 8` of the value's storage, so bit 0
//! is the least significant bit of the first byte. The same type doubles
//! as an arbitrary-width integer constant (bit 0 = LSB) when an encoded
//! extra inhabitant is wider than a machine word.
//!
//! Storage is inline for values up to 128 bits, which covers nearly every
//! payload the compiler lays out.

use smallvec::SmallVec;

const WORD_BITS: usize = 64;

/// A bit vector of explicit length.
///
/// Invariant: bits at positions `>= len` in the last word are always zero,
/// so derived equality and hashing compare only meaningful bits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct BitVector {
    words: SmallVec<[u64; 2]>,
    len: usize,
}

impl BitVector {
    /// An empty vector (no bits at all).
    pub fn new() -> Self {
        Self::default()
    }

    /// `len` bits, all clear.
    pub fn zeros(len: usize) -> Self {
        let mut words = SmallVec::new();
        words.resize(len.div_ceil(WORD_BITS), 0);
        Self { words, len }
    }

    /// `len` bits, all set.
    pub fn ones(len: usize) -> Self {
        let mut bits = Self::zeros(len);
        for word in &mut bits.words {
            *word = u64::MAX;
        }
        bits.clear_tail();
        bits
    }

    /// `len` bits with exactly the listed positions set.
    ///
    /// Positions `>= len` are ignored.
    pub fn from_positions(len: usize, positions: &[usize]) -> Self {
        let mut bits = Self::zeros(len);
        for &pos in positions {
            if pos < len {
                bits.set(pos, true);
            }
        }
        bits
    }

    /// Mask for a value that only uses its low `used_bits` bits out of
    /// `storage_bits`: every higher bit is spare.
    ///
    /// `bool` stored in a byte is `high_bits_spare(8, 1)`.
    pub fn high_bits_spare(storage_bits: usize, used_bits: usize) -> Self {
        let mut bits = Self::zeros(storage_bits);
        for pos in used_bits..storage_bits {
            bits.set(pos, true);
        }
        bits
    }

    /// A `width`-bit integer holding `value` (truncated to `width`).
    pub fn from_u64(width: usize, value: u64) -> Self {
        let mut bits = Self::zeros(width);
        if let Some(first) = bits.words.first_mut() {
            *first = value;
        }
        bits.clear_tail();
        bits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value of bit `pos`; positions past the end read as clear.
    #[inline]
    pub fn get(&self, pos: usize) -> bool {
        if pos >= self.len {
            return false;
        }
        (self.words[pos / WORD_BITS] >> (pos % WORD_BITS)) & 1 == 1
    }

    /// Set or clear bit `pos`. Debug-asserts that `pos < len`.
    #[inline]
    pub fn set(&mut self, pos: usize, value: bool) {
        debug_assert!(pos < self.len, "bit {pos} out of range (len {})", self.len);
        if pos >= self.len {
            return;
        }
        let word = &mut self.words[pos / WORD_BITS];
        let bit = 1u64 << (pos % WORD_BITS);
        if value {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }

    /// True if any bit is set.
    pub fn any(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Grow or shrink to `len` bits. New bits are clear.
    pub fn resize(&mut self, len: usize) {
        self.words.resize(len.div_ceil(WORD_BITS), 0);
        self.len = len;
        self.clear_tail();
    }

    /// Positions of set bits, lowest first.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let tz = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * WORD_BITS + tz)
            })
        })
    }

    /// Index one past the highest set bit, or 0 if none is set.
    pub fn active_len(&self) -> usize {
        self.iter_ones().last().map_or(0, |pos| pos + 1)
    }

    /// Bits `8 * index .. 8 * index + 8` as a byte.
    pub fn byte(&self, index: usize) -> u8 {
        let start = index * 8;
        if start >= self.len {
            return 0;
        }
        let word = self.words[start / WORD_BITS];
        // `start % 64` is a multiple of 8, so a byte never straddles words.
        ((word >> (start % WORD_BITS)) & 0xFF) as u8
    }

    /// The low 64 bits as an integer.
    pub fn low_u64(&self) -> u64 {
        self.words.first().copied().unwrap_or(0)
    }

    /// Backing words, least significant first.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    fn clear_tail(&mut self) {
        let tail = self.len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
    }
}
