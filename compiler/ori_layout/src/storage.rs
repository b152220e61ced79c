//! Storage for fixed-layout values: stack slots, managed boxes, and the
//! default bitwise take.
//!
//! Stack slots nest strictly. Each allocation is pushed on the function's
//! live-allocation stack and may only be released while it is innermost.

use crate::emit::{Address, FunctionEmitter, IrGenFunction, ManagedBox, ValueId};
use crate::{FixedTypeInfo, LayoutError, Size};

/// A live stack slot and the size it was allocated with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "stack allocations must be released"]
pub struct StackAllocation {
    pub address: Address,
    pub size: Size,
}

impl StackAllocation {
    /// End the slot's lifetime. Fails unless it is the innermost live slot.
    pub fn release<E: FunctionEmitter>(self, igf: &mut IrGenFunction<E>) -> Result<(), LayoutError> {
        release_stack(igf, self.address.ptr)
    }
}

/// Releases with the size recorded at allocation, whichever type asks.
fn release_stack<E: FunctionEmitter>(
    igf: &mut IrGenFunction<E>,
    ptr: ValueId,
) -> Result<(), LayoutError> {
    let size = igf.pop_stack_allocation(ptr)?;
    igf.emitter().stack_release(ptr, size);
    Ok(())
}

impl FixedTypeInfo {
    /// Reserve a slot for one value in the current frame.
    pub fn allocate_stack<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        name: &str,
    ) -> Result<StackAllocation, LayoutError> {
        let size = self.fixed_size()?;
        let align = self.fixed_alignment()?;
        let ptr = igf.emitter().stack_alloc(size, align, name);
        igf.push_stack_allocation(ptr, size);
        tracing::trace!(name, %size, %align, "allocated stack slot");
        Ok(StackAllocation {
            address: Address::new(ptr, align),
            size,
        })
    }

    /// Release a slot obtained from [`allocate_stack`](Self::allocate_stack).
    /// The slot is released with the size it was allocated with.
    #[allow(clippy::unused_self)]
    pub fn deallocate_stack<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        addr: Address,
    ) -> Result<(), LayoutError> {
        release_stack(igf, addr.ptr)
    }

    /// Allocate a reference-counted box holding one value.
    ///
    /// Returns the payload address and the owning handle.
    pub fn allocate_box<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        name: &str,
    ) -> Result<(Address, ManagedBox), LayoutError> {
        let size = self.fixed_size()?;
        let align = self.fixed_alignment()?;
        let managed = igf.emitter().alloc_box(size, align, name);
        Ok((Address::new(managed.payload, align), managed))
    }

    /// Move the value at `src` to `dest` with a byte copy. `src` is
    /// uninitialized afterwards.
    pub fn initialize_with_take<E: FunctionEmitter>(
        &self,
        igf: &mut IrGenFunction<E>,
        dest: Address,
        src: Address,
    ) -> Result<(), LayoutError> {
        if !self.is_bitwise_takable() {
            return Err(LayoutError::NotBitwiseTakable);
        }
        let size = self.fixed_size()?;
        if !size.is_zero() {
            igf.emitter().memcpy(dest, src, size);
        }
        Ok(())
    }
}
