//! `FixedTypeInfo`: everything the compiler knows about a type whose
//! layout is a compile-time constant.
//!
//! Design from Swift's `FixedTypeInfo`: a layout descriptor plus an
//! extra-inhabitant strategy, answering both static queries (sizes, masks,
//! bit patterns) and emitting the code-generation glue for them. Every
//! run-time value it produces is a constant; nothing is loaded from a
//! witness table.

use crate::emit::{Address, ConstantId, FunctionEmitter, IrGenFunction, IrGenModule, ModuleEmitter};
use crate::emit::{ReprId, ValueId};
use crate::inhabitants::{ExtraInhabitants, ReservedPointers};
use crate::{spare_bits, Alignment, BitVector, LayoutDescriptor, LayoutError, Size, TargetLayout};
use crate::{LayoutState, TypeFlags};

/// Layout, spare bits and extra inhabitants of one fixed-layout type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedTypeInfo {
    repr: ReprId,
    layout: LayoutDescriptor,
    inhabitants: ExtraInhabitants,
}

impl FixedTypeInfo {
    /// A type whose size and alignment are already known.
    pub fn new(
        repr: ReprId,
        size: Size,
        spare_bits: BitVector,
        alignment: Alignment,
        flags: TypeFlags,
    ) -> Result<Self, LayoutError> {
        Ok(Self {
            repr,
            layout: LayoutDescriptor::fixed(size, spare_bits, alignment, flags)?,
            inhabitants: ExtraInhabitants::SpareBits,
        })
    }

    /// A type whose layout is supplied later by
    /// [`complete_fixed`](Self::complete_fixed).
    pub fn pending(repr: ReprId, spare_bits: BitVector, flags: TypeFlags) -> Self {
        Self {
            repr,
            layout: LayoutDescriptor::pending(spare_bits, flags),
            inhabitants: ExtraInhabitants::SpareBits,
        }
    }

    /// A strong reference to a heap object: pointer-sized, no spare bits,
    /// with the reserved low addresses as extra inhabitants.
    pub fn heap_reference(repr: ReprId, target: &TargetLayout) -> Result<Self, LayoutError> {
        let align = target.pointer_align();
        Ok(Self::new(
            repr,
            target.pointer_size(),
            BitVector::new(),
            align,
            TypeFlags::BITWISE_TAKABLE,
        )?
        .with_extra_inhabitants(ExtraInhabitants::ReservedPointers(ReservedPointers::new(
            target, align,
        ))))
    }

    #[must_use]
    pub fn with_extra_inhabitants(mut self, inhabitants: ExtraInhabitants) -> Self {
        self.inhabitants = inhabitants;
        self
    }

    /// Finalize a pending layout. Allowed exactly once.
    pub fn complete_fixed(&mut self, size: Size, alignment: Alignment) -> Result<(), LayoutError> {
        self.layout.finalize(size, alignment)
    }

    pub fn repr(&self) -> ReprId {
        self.repr
    }

    pub fn layout(&self) -> &LayoutDescriptor {
        &self.layout
    }

    pub fn layout_state(&self) -> LayoutState {
        self.layout.state()
    }

    pub fn extra_inhabitants(&self) -> &ExtraInhabitants {
        &self.inhabitants
    }

    pub fn flags(&self) -> TypeFlags {
        self.layout.flags()
    }

    pub fn is_trivial(&self) -> bool {
        self.layout.is_trivial()
    }

    pub fn is_bitwise_takable(&self) -> bool {
        self.layout.is_bitwise_takable()
    }

    // ── Static layout ───────────────────────────────────────────

    pub fn is_known_empty(&self) -> Result<bool, LayoutError> {
        self.layout.is_known_empty()
    }

    pub fn fixed_size(&self) -> Result<Size, LayoutError> {
        self.layout.size()
    }

    pub fn fixed_alignment(&self) -> Result<Alignment, LayoutError> {
        self.layout.alignment()
    }

    pub fn fixed_stride(&self) -> Result<Size, LayoutError> {
        self.layout.stride()
    }

    // ── Spare bits ──────────────────────────────────────────────

    pub fn spare_bits(&self) -> &BitVector {
        self.layout.spare_bits()
    }

    pub fn has_fixed_spare_bits(&self) -> bool {
        self.spare_bits().any()
    }

    /// AND this type's spare bits into an enum's running mask.
    pub fn apply_fixed_spare_bits_mask(&self, accumulator: &mut BitVector) {
        spare_bits::merge_into(self.spare_bits(), accumulator);
    }

    // ── Extra inhabitants ───────────────────────────────────────

    pub fn fixed_extra_inhabitant_count(&self) -> u32 {
        match &self.inhabitants {
            ExtraInhabitants::SpareBits => self.spare_bit_extra_inhabitant_count(),
            ExtraInhabitants::ReservedPointers(r) => r.count(),
        }
    }

    /// Count derived from spare bits alone, whatever the strategy.
    pub fn spare_bit_extra_inhabitant_count(&self) -> u32 {
        spare_bits::extra_inhabitant_count(self.spare_bits())
    }

    pub fn may_have_extra_inhabitants(&self) -> bool {
        self.fixed_extra_inhabitant_count() > 0
    }

    /// The `bit_width`-bit pattern of extra inhabitant `index`.
    pub fn extra_inhabitant_pattern(
        &self,
        bit_width: u32,
        index: u32,
    ) -> Result<BitVector, LayoutError> {
        match &self.inhabitants {
            ExtraInhabitants::SpareBits => spare_bits::encode(self.spare_bits(), bit_width, index),
            ExtraInhabitants::ReservedPointers(r) => r.encode(bit_width, index),
        }
    }

    /// Inverse of [`extra_inhabitant_pattern`](Self::extra_inhabitant_pattern);
    /// `None` for a valid value.
    pub fn extra_inhabitant_index_of(&self, pattern: &BitVector) -> Option<u32> {
        match &self.inhabitants {
            ExtraInhabitants::SpareBits => spare_bits::index_of(self.spare_bits(), pattern),
            ExtraInhabitants::ReservedPointers(r) => r.index_of(pattern),
        }
    }

    /// Extra inhabitant `index` as a module constant of `bit_width` bits.
    pub fn fixed_extra_inhabitant_value<M: ModuleEmitter>(
        &self,
        igm: &mut IrGenModule<M>,
        bit_width: u32,
        index: u32,
    ) -> Result<ConstantId, LayoutError> {
        let pattern = self.extra_inhabitant_pattern(bit_width, index)?;
        Ok(igm.const_int(&pattern))
    }

    /// Like [`fixed_extra_inhabitant_value`](Self::fixed_extra_inhabitant_value)
    /// but always encoding through spare bits. Enum layout uses this for
    /// payloads whose own strategy is not spare-bit based.
    pub fn spare_bit_extra_inhabitant_value<M: ModuleEmitter>(
        &self,
        igm: &mut IrGenModule<M>,
        bit_width: u32,
        index: u32,
    ) -> Result<ConstantId, LayoutError> {
        let pattern = spare_bits::encode(self.spare_bits(), bit_width, index)?;
        Ok(igm.const_int(&pattern))
    }

    /// Emit code producing the extra-inhabitant index of the value at `src`
    /// as an `i32`, or `-1` if it is a valid value. The layout must be
    /// finalized, as for [`store_extra_inhabitant`](Self::store_extra_inhabitant).
    pub fn extra_inhabitant_index<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        src: Address,
    ) -> Result<ValueId, LayoutError> {
        self.fixed_size()?;
        Ok(match &self.inhabitants {
            ExtraInhabitants::SpareBits => spare_bits::emit_index_of(igf, self.spare_bits(), src),
            ExtraInhabitants::ReservedPointers(r) => r.emit_index_of(igf, src),
        })
    }

    /// Emit code writing extra inhabitant `index` (an `i32` in
    /// `[0, count)`) to `dest`.
    pub fn store_extra_inhabitant<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        index: ValueId,
        dest: Address,
    ) -> Result<(), LayoutError> {
        if !self.may_have_extra_inhabitants() {
            return Err(LayoutError::NoExtraInhabitants);
        }
        match &self.inhabitants {
            ExtraInhabitants::SpareBits => {
                let size = self.fixed_size()?;
                spare_bits::emit_store(igf, self.spare_bits(), size, index, dest);
            }
            ExtraInhabitants::ReservedPointers(r) => r.emit_store(igf, index, dest),
        }
        Ok(())
    }

    // ── Run-time values ─────────────────────────────────────────

    pub fn size<E: FunctionEmitter>(&self, igf: &mut IrGenFunction<E>) -> Result<ValueId, LayoutError> {
        let size = self.fixed_size()?;
        Ok(igf.const_size(size.bytes()))
    }

    pub fn alignment_mask<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
    ) -> Result<ValueId, LayoutError> {
        let align = self.fixed_alignment()?;
        Ok(igf.const_size(align.mask()))
    }

    pub fn stride<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
    ) -> Result<ValueId, LayoutError> {
        let stride = self.fixed_stride()?;
        Ok(igf.const_size(stride.bytes()))
    }

    pub fn size_and_alignment_mask<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
    ) -> Result<(ValueId, ValueId), LayoutError> {
        Ok((self.size(igf)?, self.alignment_mask(igf)?))
    }

    pub fn size_and_alignment_mask_and_stride<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
    ) -> Result<(ValueId, ValueId, ValueId), LayoutError> {
        let (size, mask) = self.size_and_alignment_mask(igf)?;
        Ok((size, mask, self.stride(igf)?))
    }

    // ── Module constants ────────────────────────────────────────

    pub fn static_size<M: ModuleEmitter>(
        &self,
        igm: &mut IrGenModule<M>,
    ) -> Result<ConstantId, LayoutError> {
        let size = self.fixed_size()?;
        Ok(igm.const_size(size.bytes()))
    }

    pub fn static_alignment_mask<M: ModuleEmitter>(
        &self,
        igm: &mut IrGenModule<M>,
    ) -> Result<ConstantId, LayoutError> {
        let align = self.fixed_alignment()?;
        Ok(igm.const_size(align.mask()))
    }

    pub fn static_stride<M: ModuleEmitter>(
        &self,
        igm: &mut IrGenModule<M>,
    ) -> Result<ConstantId, LayoutError> {
        let stride = self.fixed_stride()?;
        Ok(igm.const_size(stride.bytes()))
    }

    /// Fixed types need no run-time witness table setup.
    pub fn initialize_value_witness_table<E: FunctionEmitter>(
        &self,
        _igf: &mut IrGenFunction<E>,
        _table: Address,
    ) {
    }
}

/// Spare bits common to every payload of an enum.
pub fn merge_payload_spare_bits(payloads: &[&FixedTypeInfo]) -> BitVector {
    let mut accumulator = BitVector::new();
    for payload in payloads {
        payload.apply_fixed_spare_bits_mask(&mut accumulator);
    }
    accumulator
}
