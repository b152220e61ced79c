//! Spare-bit extra inhabitants.
//!
//! A type's spare bits are storage bits no valid value ever sets. Any
//! non-zero assignment to them is an "extra inhabitant": a bit pattern an
//! enclosing enum can use as a discriminant without growing its storage.
//!
//! # Index mapping
//!
//! Spare-bit positions are scanned lowest first. Extra inhabitant `i` sets
//! the k-th spare bit iff bit k of `i + 1` is set; the all-zero assignment
//! is reserved for valid values and decodes to `-1`. Indices are unique
//! 31-bit identifiers, so the count saturates at [`INDEX_MAX`] and only the
//! lowest 31 spare bits ever take part in the mapping.
//!
//! # Emission
//!
//! Run-time decode and store work one storage byte at a time. Within a
//! byte, each contiguous run of spare bits moves with a single shift and
//! mask, so a byte like `0b1111_1110` (a `bool`) costs one shift, not seven.

use crate::emit::{Address, FunctionEmitter, IrGenFunction, ValueId, INDEX_BITS};
use crate::{BitVector, LayoutError, Size};

/// Largest extra-inhabitant index (`2^31 - 1`).
pub const INDEX_MAX: u32 = i32::MAX as u32;

/// Spare bits that can take part in the index mapping.
const INDEX_SPARE_BITS: u32 = 31;

/// Encoded value of a valid (non-inhabitant) representation.
const VALID_VALUE_INDEX: u64 = u32::MAX as u64;

/// Number of extra inhabitants `mask` provides: `2^popcount - 1`,
/// saturating at [`INDEX_MAX`].
pub fn extra_inhabitant_count(mask: &BitVector) -> u32 {
    let spare = mask.count_ones();
    if spare >= INDEX_SPARE_BITS {
        INDEX_MAX
    } else {
        (1u32 << spare) - 1
    }
}

/// The `bit_width`-bit pattern of extra inhabitant `index`.
pub fn encode(mask: &BitVector, bit_width: u32, index: u32) -> Result<BitVector, LayoutError> {
    let count = extra_inhabitant_count(mask);
    if index >= count {
        return Err(LayoutError::IndexOutOfRange { index, count });
    }

    let value = index + 1;
    let mut pattern = BitVector::zeros(bit_width as usize);
    for (k, pos) in mask.iter_ones().enumerate().take(INDEX_SPARE_BITS as usize) {
        if (value >> k) & 1 == 0 {
            continue;
        }
        if pos >= bit_width as usize {
            return Err(LayoutError::BitWidthTooSmall {
                width: bit_width,
                required: u32::try_from(pos + 1).unwrap_or(u32::MAX),
            });
        }
        pattern.set(pos, true);
    }
    tracing::trace!(index, bit_width, "encoded spare-bit extra inhabitant");
    Ok(pattern)
}

/// Index of the extra inhabitant `pattern` represents, or `None` if the
/// pattern's spare bits are all clear (a valid value).
///
/// A pattern that sets only spare bits beyond the lowest 31 is never
/// produced by [`encode`]; it decodes to [`INDEX_MAX`], which is outside
/// `[0, count)`.
pub fn index_of(mask: &BitVector, pattern: &BitVector) -> Option<u32> {
    let mut dense = 0u32;
    let mut any = false;
    for (k, pos) in mask.iter_ones().enumerate() {
        if !pattern.get(pos) {
            continue;
        }
        any = true;
        if k < INDEX_SPARE_BITS as usize {
            dense |= 1 << k;
        }
    }
    match (any, dense) {
        (false, _) => None,
        (true, 0) => Some(INDEX_MAX),
        (true, v) => Some(v - 1),
    }
}

/// Intersect `mask` into an enum's running spare-bit accumulator.
///
/// A shorter accumulator is first extended with `mask`'s own bits; bits
/// past the end of `mask` are left alone, since they belong to a larger
/// payload. Folding every payload in any order yields the intersection.
pub fn merge_into(mask: &BitVector, accumulator: &mut BitVector) {
    let common = accumulator.len().min(mask.len());
    if accumulator.len() < mask.len() {
        accumulator.resize(mask.len());
        for pos in mask.iter_ones().filter(|&pos| pos >= common) {
            accumulator.set(pos, true);
        }
    }
    for pos in 0..common {
        if accumulator.get(pos) && !mask.get(pos) {
            accumulator.set(pos, false);
        }
    }
}

/// Contiguous runs of set bits in a byte, as `(shift, len)`, lowest first.
fn byte_runs(byte: u8) -> impl Iterator<Item = (u32, u32)> {
    let mut rest = byte;
    std::iter::from_fn(move || {
        if rest == 0 {
            return None;
        }
        let shift = rest.trailing_zeros();
        let len = (rest >> shift).trailing_ones();
        // `len` may be 8 only when `shift` is 0.
        rest &= !(((1u16 << len) - 1) << shift) as u8;
        Some((shift, len))
    })
}

fn low_mask(len: u32) -> u64 {
    (1u64 << len) - 1
}

/// Emit code computing the extra-inhabitant index stored at `src`, as an
/// `i32` that is `-1` for valid values.
pub(crate) fn emit_index_of<E: FunctionEmitter>(
    igf: &mut IrGenFunction<E>,
    mask: &BitVector,
    src: Address,
) -> ValueId {
    let spare = mask.count_ones();
    if spare == 0 {
        return igf.emitter().const_int(INDEX_BITS, VALID_VALUE_INDEX);
    }

    let e = igf.emitter();
    let zero = e.const_int(INDEX_BITS, 0);
    let mut gathered = zero;
    let mut any = zero;
    let mut dense = 0u32;

    for byte_index in 0..mask.len().div_ceil(8) {
        let byte_mask = mask.byte(byte_index);
        if byte_mask == 0 {
            continue;
        }
        let byte = e.load_int(src, Size::new(byte_index as u64), 8);
        let byte_mask_val = e.const_int(8, u64::from(byte_mask));
        let masked = e.and(byte, byte_mask_val);
        let wide = e.zext(masked, INDEX_BITS);
        any = e.or(any, wide);

        for (shift, len) in byte_runs(byte_mask) {
            if dense < INDEX_SPARE_BITS {
                let take = len.min(INDEX_SPARE_BITS - dense);
                let mut piece = wide;
                if shift != 0 {
                    let amount = e.const_int(INDEX_BITS, u64::from(shift));
                    piece = e.lshr(piece, amount);
                }
                let run_mask = e.const_int(INDEX_BITS, low_mask(take));
                piece = e.and(piece, run_mask);
                if dense != 0 {
                    let amount = e.const_int(INDEX_BITS, u64::from(dense));
                    piece = e.shl(piece, amount);
                }
                gathered = e.or(gathered, piece);
            }
            dense += len;
        }
    }

    let is_valid = e.icmp_eq(any, zero);
    let one = e.const_int(INDEX_BITS, 1);
    let mut index = e.sub(gathered, one);
    if spare > INDEX_SPARE_BITS {
        let only_high_bits = e.icmp_eq(gathered, zero);
        let saturated = e.const_int(INDEX_BITS, u64::from(INDEX_MAX));
        index = e.select(only_high_bits, saturated, index);
    }
    let valid = e.const_int(INDEX_BITS, VALID_VALUE_INDEX);
    tracing::trace!(spare, "emitted spare-bit extra inhabitant decode");
    e.select(is_valid, valid, index)
}

/// Emit code storing extra inhabitant `index` (an `i32`) into the `size`
/// bytes at `dest`. The destination is zeroed first.
pub(crate) fn emit_store<E: FunctionEmitter>(
    igf: &mut IrGenFunction<E>,
    mask: &BitVector,
    size: Size,
    index: ValueId,
    dest: Address,
) {
    let e = igf.emitter();
    e.memset_zero(dest, size);

    let one = e.const_int(INDEX_BITS, 1);
    let value = e.add(index, one);
    let mut dense = 0u32;

    for byte_index in 0..mask.len().div_ceil(8) {
        let byte_mask = mask.byte(byte_index);
        if byte_mask == 0 {
            continue;
        }
        let mut byte_value: Option<ValueId> = None;
        for (shift, len) in byte_runs(byte_mask) {
            if dense < INDEX_SPARE_BITS {
                let take = len.min(INDEX_SPARE_BITS - dense);
                let mut piece = value;
                if dense != 0 {
                    let amount = e.const_int(INDEX_BITS, u64::from(dense));
                    piece = e.lshr(piece, amount);
                }
                let run_mask = e.const_int(INDEX_BITS, low_mask(take));
                piece = e.and(piece, run_mask);
                if shift != 0 {
                    let amount = e.const_int(INDEX_BITS, u64::from(shift));
                    piece = e.shl(piece, amount);
                }
                byte_value = Some(match byte_value {
                    Some(acc) => e.or(acc, piece),
                    None => piece,
                });
            }
            dense += len;
        }
        if let Some(byte_value) = byte_value {
            let byte = e.trunc(byte_value, 8);
            e.store_int(byte, dest, Size::new(byte_index as u64));
        }
    }
    tracing::trace!(%size, "emitted spare-bit extra inhabitant store");
}
