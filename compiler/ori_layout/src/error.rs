//! Contract violations raised by the layout subsystem.
//!
//! Every variant is an internal compiler error: it means another part of
//! the compiler called into `ori_layout` incorrectly, never that the user's
//! program is malformed. Callers abort the current compilation run when
//! they see one.

use crate::emit::ValueId;

/// A violated precondition of a layout operation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// `finalize` called on a descriptor whose layout is already fixed.
    #[error("internal compiler error: layout is already fixed and cannot be finalized again")]
    AlreadyFixed,

    /// Size or alignment read from a descriptor still awaiting `finalize`.
    #[error("internal compiler error: layout queried before it was finalized")]
    NotFinalized,

    /// Alignment that is zero or not a power of two.
    #[error("internal compiler error: alignment {0} is not a positive power of two")]
    InvalidAlignment(u64),

    /// Size whose stride does not fit in 64 bits.
    #[error(
        "internal compiler error: size {size} bytes overflows when rounded up to \
         alignment {alignment}"
    )]
    SizeOverflow { size: u64, alignment: u64 },

    /// Spare-bit mask longer than the storage it describes.
    #[error(
        "internal compiler error: spare-bit mask has {mask_bits} bits but storage is only \
         {storage_bits} bits wide"
    )]
    SpareBitsExceedStorage { mask_bits: usize, storage_bits: u64 },

    /// Extra-inhabitant index outside `[0, count)`.
    #[error("internal compiler error: extra inhabitant index {index} out of range (count {count})")]
    IndexOutOfRange { index: u32, count: u32 },

    /// Extra inhabitant stored into a type that has none.
    #[error("internal compiler error: type has no extra inhabitants to store")]
    NoExtraInhabitants,

    /// Requested constant width cannot hold the encoded pattern.
    #[error(
        "internal compiler error: bit width {width} cannot hold an extra inhabitant needing \
         {required} bits"
    )]
    BitWidthTooSmall { width: u32, required: u32 },

    /// Stack release that is not the most recent live allocation.
    #[error(
        "internal compiler error: stack allocation {released:?} released out of order \
         (innermost live allocation is {innermost:?})"
    )]
    StackReleaseOutOfOrder {
        released: ValueId,
        innermost: Option<ValueId>,
    },

    /// Default take used on a type that cannot be moved with a plain copy.
    #[error("internal compiler error: type is not bitwise-takable and has no take override")]
    NotBitwiseTakable,

    /// Fixed-size query on a type whose layout is only known at run time.
    #[error("internal compiler error: type does not have a fixed layout")]
    NotFixedSize,

    /// Target triple outside the supported list.
    #[error("internal compiler error: unsupported target '{0}'")]
    UnsupportedTarget(String),
}

impl LayoutError {
    /// Layout errors are always internal compiler errors.
    pub fn is_ice(&self) -> bool {
        true
    }
}
