//! Where a fixed type's extra inhabitants come from.
//!
//! Most types derive their extra inhabitants from spare bits. Heap object
//! references have none (every bit of a pointer can be significant) but
//! have invalid *values* instead: no object lives in the null page, so
//! every pointer-aligned address below the target's least valid pointer
//! is free for an enclosing enum to use.

use crate::emit::{Address, FunctionEmitter, IrGenFunction, ValueId, INDEX_BITS};
use crate::spare_bits::INDEX_MAX;
use crate::{Alignment, BitVector, LayoutError, Size, TargetLayout};

/// Extra-inhabitant strategy of a fixed type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtraInhabitants {
    /// Derived from the descriptor's spare-bit mask.
    #[default]
    SpareBits,
    /// Aligned pointer values below the least valid pointer.
    ReservedPointers(ReservedPointers),
}

/// Invalid low addresses of a pointer-sized reference.
///
/// Extra inhabitant `i` is the address `i * alignment`; index 0 is null.
/// Every value below `limit` is an extra inhabitant and every value at or
/// above it is a valid pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ReservedPointers {
    limit: u64,
    alignment: Alignment,
    pointer_bits: u32,
}

impl ReservedPointers {
    /// The reserved range is the target's least valid pointer, clamped so
    /// that every reserved value has an index below [`INDEX_MAX`] and fits
    /// in a pointer.
    pub fn new(target: &TargetLayout, alignment: Alignment) -> Self {
        let pointer_bits = target.pointer_bits();
        let index_limit = u64::from(INDEX_MAX)
            .checked_mul(alignment.value())
            .unwrap_or(u64::MAX);
        let pointer_limit = if pointer_bits >= u64::BITS {
            u64::MAX
        } else {
            (1u64 << pointer_bits) - 1
        };
        Self {
            limit: target
                .least_valid_pointer()
                .min(index_limit)
                .min(pointer_limit),
            alignment,
            pointer_bits,
        }
    }

    /// First value that is not reserved.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn count(&self) -> u32 {
        let slots = self.limit.div_ceil(self.alignment.value());
        u32::try_from(slots).map_or(INDEX_MAX, |n| n.min(INDEX_MAX))
    }

    pub fn encode(&self, bit_width: u32, index: u32) -> Result<BitVector, LayoutError> {
        let count = self.count();
        if index >= count {
            return Err(LayoutError::IndexOutOfRange { index, count });
        }
        let value = u64::from(index) << self.alignment.log2();
        let required = u64::BITS - value.leading_zeros();
        if required > bit_width {
            return Err(LayoutError::BitWidthTooSmall {
                width: bit_width,
                required,
            });
        }
        Ok(BitVector::from_u64(bit_width as usize, value))
    }

    pub fn index_of(&self, pattern: &BitVector) -> Option<u32> {
        if pattern.words().iter().skip(1).any(|&w| w != 0) {
            return None;
        }
        let value = pattern.low_u64();
        if value >= self.limit {
            return None;
        }
        u32::try_from(value >> self.alignment.log2()).ok()
    }

    pub(crate) fn emit_index_of<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        src: Address,
    ) -> ValueId {
        let bits = self.pointer_bits;
        let e = igf.emitter();
        let value = e.load_int(src, Size::ZERO, bits);
        let limit = e.const_int(bits, self.limit);
        let is_extra = e.icmp_ult(value, limit);
        let shift = e.const_int(bits, u64::from(self.alignment.log2()));
        let slot = e.lshr(value, shift);
        let index = if bits == INDEX_BITS {
            slot
        } else {
            e.trunc(slot, INDEX_BITS)
        };
        let valid = e.const_int(INDEX_BITS, u64::from(u32::MAX));
        e.select(is_extra, index, valid)
    }

    pub(crate) fn emit_store<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        index: ValueId,
        dest: Address,
    ) {
        let bits = self.pointer_bits;
        let e = igf.emitter();
        let wide = if bits == INDEX_BITS {
            index
        } else {
            e.zext(index, bits)
        };
        let shift = e.const_int(bits, u64::from(self.alignment.log2()));
        let value = e.shl(wide, shift);
        e.store_int(value, dest, Size::ZERO);
    }
}
