//! Byte sizes and alignments.
//!
//! `Size` is a plain byte count. `Alignment` is a validated power of two,
//! so every consumer can rely on `value() - 1` being a contiguous mask.

use std::fmt;

use crate::LayoutError;

/// A storage size in bytes. May be zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Size(u64);

impl Size {
    /// The empty size.
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Byte count.
    #[inline]
    pub const fn bytes(self) -> u64 {
        self.0
    }

    /// Bit count (`bytes * 8`), saturating at `u64::MAX`.
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0.saturating_mul(8)
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Round up to the next multiple of `align`, or `None` if that is not
    /// representable.
    #[inline]
    #[must_use]
    pub const fn checked_round_up_to_alignment(self, align: Alignment) -> Option<Self> {
        let mask = align.mask();
        match self.0.checked_add(mask) {
            Some(padded) => Some(Self(padded & !mask)),
            None => None,
        }
    }

    /// Round up to the next multiple of `align`.
    ///
    /// Saturates at the largest multiple of `align` when the rounded size is
    /// not representable. Layout descriptors reject such sizes up front.
    #[inline]
    #[must_use]
    pub const fn round_up_to_alignment(self, align: Alignment) -> Self {
        match self.checked_round_up_to_alignment(align) {
            Some(rounded) => rounded,
            None => Self(u64::MAX & !align.mask()),
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

/// A positive power-of-two byte alignment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment(u64);

impl Alignment {
    /// Byte alignment (no constraint).
    pub const ONE: Self = Self(1);

    /// Validate and wrap a byte alignment.
    pub fn new(bytes: u64) -> Result<Self, LayoutError> {
        if bytes.is_power_of_two() {
            Ok(Self(bytes))
        } else {
            Err(LayoutError::InvalidAlignment(bytes))
        }
    }

    /// `2^log2` bytes. Debug-asserts `log2 < 64`.
    #[inline]
    pub const fn from_log2(log2: u32) -> Self {
        debug_assert!(log2 < 64);
        Self(1 << log2)
    }

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// `value - 1`; the low bits an aligned address always has clear.
    #[inline]
    pub const fn mask(self) -> u64 {
        self.0 - 1
    }

    /// `log2(value)`.
    #[inline]
    pub const fn log2(self) -> u32 {
        self.0.trailing_zeros()
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "align({})", self.0)
    }
}
