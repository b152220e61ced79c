//! Layout descriptor: size, alignment, spare bits and value flags.
//!
//! A descriptor is either built with its layout already known, or created
//! `Pending` and completed exactly once by [`LayoutDescriptor::finalize`].
//! The pending path exists for recursive types, whose layout can only be
//! computed after the type graph that refers to them has been built.

use bitflags::bitflags;

use crate::{Alignment, BitVector, LayoutError, Size};

bitflags! {
    /// How values of a type may be copied and moved.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
    pub struct TypeFlags: u8 {
        /// Copy and destroy are no-ops on the bytes (no embedded ownership).
        const TRIVIAL = 1 << 0;
        /// A value can be moved to a new address with a plain byte copy.
        const BITWISE_TAKABLE = 1 << 1;
    }
}

impl TypeFlags {
    /// Flags for plain-old-data types.
    pub const fn pod() -> Self {
        Self::TRIVIAL.union(Self::BITWISE_TAKABLE)
    }

    /// Trivial types are always bitwise-takable.
    #[must_use]
    pub const fn normalized(self) -> Self {
        if self.contains(Self::TRIVIAL) {
            self.union(Self::BITWISE_TAKABLE)
        } else {
            self
        }
    }
}

/// Lifecycle of a descriptor's size and alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum LayoutState {
    /// Layout not yet known (recursive type under construction).
    Pending,
    /// Layout known and immutable.
    Fixed { size: Size, alignment: Alignment },
}

impl LayoutState {
    /// The single `Pending -> Fixed` transition.
    pub fn finalize(self, size: Size, alignment: Alignment) -> Result<Self, LayoutError> {
        match self {
            Self::Pending => Ok(Self::Fixed { size, alignment }),
            Self::Fixed { .. } => Err(LayoutError::AlreadyFixed),
        }
    }

    pub fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed { .. })
    }
}

/// The layout facts of one fixed-layout type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutDescriptor {
    state: LayoutState,
    /// Bit `i` set means bit `i` of the storage is never significant.
    spare_bits: BitVector,
    flags: TypeFlags,
}

impl LayoutDescriptor {
    /// A descriptor whose layout is already known.
    pub fn fixed(
        size: Size,
        spare_bits: BitVector,
        alignment: Alignment,
        flags: TypeFlags,
    ) -> Result<Self, LayoutError> {
        check_layout(&spare_bits, size, alignment)?;
        Ok(Self {
            state: LayoutState::Fixed { size, alignment },
            spare_bits,
            flags: flags.normalized(),
        })
    }

    /// A descriptor completed later by [`finalize`](Self::finalize).
    pub fn pending(spare_bits: BitVector, flags: TypeFlags) -> Self {
        Self {
            state: LayoutState::Pending,
            spare_bits,
            flags: flags.normalized(),
        }
    }

    /// Supply size and alignment of a pending descriptor.
    pub fn finalize(&mut self, size: Size, alignment: Alignment) -> Result<(), LayoutError> {
        let state = self.state.finalize(size, alignment)?;
        check_layout(&self.spare_bits, size, alignment)?;
        tracing::debug!(%size, %alignment, "finalized pending layout");
        self.state = state;
        Ok(())
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    pub fn is_fixed(&self) -> bool {
        self.state.is_fixed()
    }

    /// Storage size in bytes.
    pub fn size(&self) -> Result<Size, LayoutError> {
        match self.state {
            LayoutState::Fixed { size, .. } => Ok(size),
            LayoutState::Pending => Err(LayoutError::NotFinalized),
        }
    }

    pub fn alignment(&self) -> Result<Alignment, LayoutError> {
        match self.state {
            LayoutState::Fixed { alignment, .. } => Ok(alignment),
            LayoutState::Pending => Err(LayoutError::NotFinalized),
        }
    }

    /// Size rounded up to alignment: the distance between array elements.
    pub fn stride(&self) -> Result<Size, LayoutError> {
        match self.state {
            LayoutState::Fixed { size, alignment } => Ok(size.round_up_to_alignment(alignment)),
            LayoutState::Pending => Err(LayoutError::NotFinalized),
        }
    }

    /// True if the type occupies no storage.
    pub fn is_known_empty(&self) -> Result<bool, LayoutError> {
        self.size().map(Size::is_zero)
    }

    pub fn spare_bits(&self) -> &BitVector {
        &self.spare_bits
    }

    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    pub fn is_trivial(&self) -> bool {
        self.flags.contains(TypeFlags::TRIVIAL)
    }

    pub fn is_bitwise_takable(&self) -> bool {
        self.flags.contains(TypeFlags::BITWISE_TAKABLE)
    }
}

fn check_layout(
    spare_bits: &BitVector,
    size: Size,
    alignment: Alignment,
) -> Result<(), LayoutError> {
    if size.checked_round_up_to_alignment(alignment).is_none() {
        return Err(LayoutError::SizeOverflow {
            size: size.bytes(),
            alignment: alignment.value(),
        });
    }
    if spare_bits.len() as u64 > size.bits() {
        return Err(LayoutError::SpareBitsExceedStorage {
            mask_bits: spare_bits.len(),
            storage_bits: size.bits(),
        });
    }
    Ok(())
}
