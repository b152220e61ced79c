//! Capability dispatch over every type the code generator lays out.
//!
//! `TypeInfo` is closed: a type either has a fixed layout, answered
//! statically by [`FixedTypeInfo`], or a layout known only at run time
//! (generic parameters, resilient types), answered by calling into the
//! type's value-witness table. Callers that need a fixed layout use
//! [`TypeInfo::as_fixed`] instead of matching on the variant themselves.

use crate::emit::{Address, FunctionEmitter, IrGenFunction, ReprId, ValueId, ValueWitness};
use crate::storage::StackAllocation;
use crate::{Alignment, FixedTypeInfo, LayoutError, Size, TypeFlags};

/// Layout information for a type whose size is only known at run time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonFixedTypeInfo {
    repr: ReprId,
    /// Lower bound on the run-time alignment.
    best_known_alignment: Alignment,
    flags: TypeFlags,
}

impl NonFixedTypeInfo {
    pub fn new(repr: ReprId, best_known_alignment: Alignment, flags: TypeFlags) -> Self {
        Self {
            repr,
            best_known_alignment,
            flags: flags.normalized(),
        }
    }

    pub fn best_known_alignment(&self) -> Alignment {
        self.best_known_alignment
    }

    fn witness<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        witness: ValueWitness,
        args: &[ValueId],
    ) -> ValueId {
        igf.emitter().value_witness(self.repr, witness, args)
    }
}

/// A type's layout capabilities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeInfo {
    Fixed(FixedTypeInfo),
    NonFixed(NonFixedTypeInfo),
}

impl From<FixedTypeInfo> for TypeInfo {
    fn from(info: FixedTypeInfo) -> Self {
        Self::Fixed(info)
    }
}

impl From<NonFixedTypeInfo> for TypeInfo {
    fn from(info: NonFixedTypeInfo) -> Self {
        Self::NonFixed(info)
    }
}

impl TypeInfo {
    pub fn is_fixed_size(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }

    pub fn as_fixed(&self) -> Option<&FixedTypeInfo> {
        match self {
            Self::Fixed(info) => Some(info),
            Self::NonFixed(_) => None,
        }
    }

    pub fn as_fixed_mut(&mut self) -> Option<&mut FixedTypeInfo> {
        match self {
            Self::Fixed(info) => Some(info),
            Self::NonFixed(_) => None,
        }
    }

    pub fn repr(&self) -> ReprId {
        match self {
            Self::Fixed(info) => info.repr(),
            Self::NonFixed(info) => info.repr,
        }
    }

    pub fn flags(&self) -> TypeFlags {
        match self {
            Self::Fixed(info) => info.flags(),
            Self::NonFixed(info) => info.flags,
        }
    }

    /// Statically known alignment (a lower bound for non-fixed types).
    pub fn best_known_alignment(&self) -> Result<Alignment, LayoutError> {
        match self {
            Self::Fixed(info) => info.fixed_alignment(),
            Self::NonFixed(info) => Ok(info.best_known_alignment),
        }
    }

    pub fn fixed_size(&self) -> Result<Size, LayoutError> {
        self.as_fixed()
            .ok_or(LayoutError::NotFixedSize)
            .and_then(FixedTypeInfo::fixed_size)
    }

    /// Fixed types always answer `true` exactly when their count is
    /// non-zero; non-fixed types may, and must be asked at run time.
    pub fn may_have_extra_inhabitants(&self) -> bool {
        match self {
            Self::Fixed(info) => info.may_have_extra_inhabitants(),
            Self::NonFixed(_) => true,
        }
    }

    pub fn size<E: FunctionEmitter>(&self, igf: &mut IrGenFunction<E>) -> Result<ValueId, LayoutError> {
        match self {
            Self::Fixed(info) => info.size(igf),
            Self::NonFixed(info) => Ok(info.witness(igf, ValueWitness::Size, &[])),
        }
    }

    pub fn alignment_mask<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
    ) -> Result<ValueId, LayoutError> {
        match self {
            Self::Fixed(info) => info.alignment_mask(igf),
            Self::NonFixed(info) => Ok(info.witness(igf, ValueWitness::AlignmentMask, &[])),
        }
    }

    pub fn stride<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
    ) -> Result<ValueId, LayoutError> {
        match self {
            Self::Fixed(info) => info.stride(igf),
            Self::NonFixed(info) => Ok(info.witness(igf, ValueWitness::Stride, &[])),
        }
    }

    pub fn extra_inhabitant_index<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        src: Address,
    ) -> Result<ValueId, LayoutError> {
        match self {
            Self::Fixed(info) => info.extra_inhabitant_index(igf, src),
            Self::NonFixed(info) => {
                Ok(info.witness(igf, ValueWitness::ExtraInhabitantIndex, &[src.ptr]))
            }
        }
    }

    pub fn store_extra_inhabitant<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        index: ValueId,
        dest: Address,
    ) -> Result<(), LayoutError> {
        match self {
            Self::Fixed(info) => info.store_extra_inhabitant(igf, index, dest),
            Self::NonFixed(info) => {
                info.witness(igf, ValueWitness::StoreExtraInhabitant, &[index, dest.ptr]);
                Ok(())
            }
        }
    }

    pub fn initialize_with_take<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        dest: Address,
        src: Address,
    ) -> Result<(), LayoutError> {
        match self {
            Self::Fixed(info) => info.initialize_with_take(igf, dest, src),
            Self::NonFixed(info) => {
                info.witness(igf, ValueWitness::InitializeWithTake, &[dest.ptr, src.ptr]);
                Ok(())
            }
        }
    }

    /// Stack slots need a fixed size; dynamically sized values live in
    /// boxes or caller-provided buffers.
    pub fn allocate_stack<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        name: &str,
    ) -> Result<StackAllocation, LayoutError> {
        self.as_fixed()
            .ok_or(LayoutError::NotFixedSize)?
            .allocate_stack(igf, name)
    }

    pub fn initialize_value_witness_table<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        table: Address,
    ) {
        match self {
            Self::Fixed(info) => info.initialize_value_witness_table(igf, table),
            Self::NonFixed(info) => {
                info.witness(igf, ValueWitness::InitializeTable, &[table.ptr]);
            }
        }
    }
}

#[cfg(test)]
mod tests;
