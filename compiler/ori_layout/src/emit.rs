//! Code-generation glue: the emission targets layout queries write into.
//!
//! The layout subsystem never talks to a backend directly. Function-level
//! facts (loads, stores, arithmetic, stack slots) go through a
//! [`FunctionEmitter`]; artifact-level constants go through a
//! [`ModuleEmitter`]. Both hand back opaque `Copy` IDs, following the
//! arena + ID pattern of the LLVM `IrBuilder`, so no backend lifetime
//! leaks into this crate.
//!
//! [`IrGenFunction`] and [`IrGenModule`] wrap an emitter with the state the
//! layout code itself owns: the target description, the live stack
//! allocations of the current scope, and the module constant cache.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{Alignment, BitVector, LayoutError, Size, TargetLayout};

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

/// Opaque handle to a function-local value produced by an emitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueId(u32);

/// Opaque handle to a module-level constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstantId(u32);

/// Opaque handle to a type's backend representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ReprId(u32);

macro_rules! impl_id {
    ($($id:ident),*) => {$(
        impl $id {
            /// Sentinel for "no handle".
            pub const NONE: Self = Self(u32::MAX);

            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// True if this is the `NONE` sentinel.
            #[inline]
            pub const fn is_none(self) -> bool {
                self.0 == u32::MAX
            }
        }
    )*};
}

impl_id!(ValueId, ConstantId, ReprId);

/// A pointer value together with the alignment it is known to have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Address {
    pub ptr: ValueId,
    pub align: Alignment,
}

impl Address {
    pub fn new(ptr: ValueId, align: Alignment) -> Self {
        Self { ptr, align }
    }
}

/// A heap allocation made through the reference-counting runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManagedBox {
    /// The owning reference; retain/release operate on this.
    pub owner: ValueId,
    /// Pointer to the payload storage inside the box.
    pub payload: ValueId,
}

/// Entries of a run-time value-witness table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueWitness {
    Size,
    AlignmentMask,
    Stride,
    ExtraInhabitantIndex,
    StoreExtraInhabitant,
    InitializeWithTake,
    /// Populate a freshly allocated witness table from type metadata.
    InitializeTable,
}

// ---------------------------------------------------------------------------
// Emitter traits
// ---------------------------------------------------------------------------

/// Function-local emission target.
///
/// Integer values are at most 64 bits wide; wider storage is accessed one
/// piece at a time. Binary operations require operands of equal width.
pub trait FunctionEmitter {
    /// Integer constant of `bits` width (value truncated to width).
    fn const_int(&mut self, bits: u32, value: u64) -> ValueId;

    /// Load a `bits`-wide integer from `addr + offset`.
    fn load_int(&mut self, addr: Address, offset: Size, bits: u32) -> ValueId;

    /// Store an integer to `addr + offset`.
    fn store_int(&mut self, value: ValueId, addr: Address, offset: Size);

    fn and(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId;
    fn or(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId;
    fn shl(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId;
    fn lshr(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId;
    fn add(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId;
    fn sub(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId;

    /// `lhs == rhs` as a 1-bit value.
    fn icmp_eq(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId;
    /// Unsigned `lhs < rhs` as a 1-bit value.
    fn icmp_ult(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId;

    fn select(&mut self, cond: ValueId, then_val: ValueId, else_val: ValueId) -> ValueId;
    fn zext(&mut self, value: ValueId, bits: u32) -> ValueId;
    fn trunc(&mut self, value: ValueId, bits: u32) -> ValueId;

    /// Fill `size` bytes at `dest` with zero.
    fn memset_zero(&mut self, dest: Address, size: Size);
    /// Copy `size` bytes; the ranges do not overlap.
    fn memcpy(&mut self, dest: Address, src: Address, size: Size);

    /// Reserve `size` bytes aligned to `align` in the current frame.
    fn stack_alloc(&mut self, size: Size, align: Alignment, name: &str) -> ValueId;
    /// End the lifetime of a stack slot returned by `stack_alloc`.
    fn stack_release(&mut self, ptr: ValueId, size: Size);

    /// Allocate a reference-counted box with `size` payload bytes.
    fn alloc_box(&mut self, size: Size, align: Alignment, name: &str) -> ManagedBox;

    /// Read or invoke a value witness of a run-time-sized type.
    fn value_witness(&mut self, ty: ReprId, witness: ValueWitness, args: &[ValueId]) -> ValueId;
}

/// Whole-artifact constant pool.
pub trait ModuleEmitter {
    /// Register an integer constant whose width is `value.len()` bits.
    fn const_int(&mut self, value: &BitVector) -> ConstantId;
}

// ---------------------------------------------------------------------------
// IrGenFunction
// ---------------------------------------------------------------------------

/// Width of extra-inhabitant indices (`i32`; `-1` means "valid value").
pub const INDEX_BITS: u32 = 32;

/// Per-function emission state.
///
/// Tracks the live stack allocations of the current scope, with the size
/// each was allocated with, so that out-of-order releases are caught at the
/// release site.
pub struct IrGenFunction<E> {
    emitter: E,
    target: TargetLayout,
    live_stack: SmallVec<[(ValueId, Size); 8]>,
}

impl<E: FunctionEmitter> IrGenFunction<E> {
    pub fn new(emitter: E, target: TargetLayout) -> Self {
        Self {
            emitter,
            target,
            live_stack: SmallVec::new(),
        }
    }

    #[inline]
    pub fn emitter(&mut self) -> &mut E {
        &mut self.emitter
    }

    pub fn into_emitter(self) -> E {
        self.emitter
    }

    pub fn target(&self) -> &TargetLayout {
        &self.target
    }

    /// Pointer-width integer constant (sizes, masks, strides).
    pub fn const_size(&mut self, value: u64) -> ValueId {
        let bits = self.target.pointer_bits();
        self.emitter.const_int(bits, value)
    }

    /// `i32` constant for extra-inhabitant indices.
    pub fn const_index(&mut self, value: u32) -> ValueId {
        self.emitter.const_int(INDEX_BITS, u64::from(value))
    }

    /// Stack slots not yet released and their sizes, outermost first.
    pub fn live_stack_allocations(&self) -> &[(ValueId, Size)] {
        &self.live_stack
    }

    pub(crate) fn push_stack_allocation(&mut self, ptr: ValueId, size: Size) {
        self.live_stack.push((ptr, size));
    }

    /// Pop `ptr` if it is the innermost live allocation, returning the size
    /// it was allocated with.
    pub(crate) fn pop_stack_allocation(&mut self, ptr: ValueId) -> Result<Size, LayoutError> {
        let innermost = self.live_stack.last().map(|&(live, _)| live);
        if innermost != Some(ptr) {
            tracing::error!(
                released = ?ptr,
                ?innermost,
                "stack allocation released out of order"
            );
            return Err(LayoutError::StackReleaseOutOfOrder {
                released: ptr,
                innermost,
            });
        }
        Ok(self.live_stack.pop().map_or(Size::ZERO, |(_, size)| size))
    }
}

// ---------------------------------------------------------------------------
// IrGenModule
// ---------------------------------------------------------------------------

/// Per-module emission state with a deduplicating constant cache.
pub struct IrGenModule<M> {
    emitter: M,
    target: TargetLayout,
    constants: FxHashMap<BitVector, ConstantId>,
}

impl<M: ModuleEmitter> IrGenModule<M> {
    pub fn new(emitter: M, target: TargetLayout) -> Self {
        Self {
            emitter,
            target,
            constants: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn emitter(&mut self) -> &mut M {
        &mut self.emitter
    }

    pub fn into_emitter(self) -> M {
        self.emitter
    }

    pub fn target(&self) -> &TargetLayout {
        &self.target
    }

    /// Constant of `value.len()` bits, registered once per distinct value.
    pub fn const_int(&mut self, value: &BitVector) -> ConstantId {
        if let Some(&id) = self.constants.get(value) {
            return id;
        }
        let id = self.emitter.const_int(value);
        self.constants.insert(value.clone(), id);
        id
    }

    /// Pointer-width integer constant.
    pub fn const_size(&mut self, value: u64) -> ConstantId {
        let bits = self.target.pointer_bits() as usize;
        self.const_int(&BitVector::from_u64(bits, value))
    }
}
