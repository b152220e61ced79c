//! Target facts needed to lay out and describe fixed types.
//!
//! Only the handful of numbers the layout glue consumes live here: the
//! pointer size (the width of run-time size/alignment/stride values) and
//! the least valid pointer value (which bounds the extra inhabitants of
//! heap references).

use crate::{Alignment, LayoutError, Size};

/// Target triples the layout subsystem knows about.
pub const SUPPORTED_TARGETS: &[&str] = &[
    "x86_64-unknown-linux-gnu",
    "x86_64-unknown-linux-musl",
    "aarch64-unknown-linux-gnu",
    "aarch64-unknown-linux-musl",
    "x86_64-apple-darwin",
    "aarch64-apple-darwin",
    "x86_64-pc-windows-msvc",
    "x86_64-pc-windows-gnu",
    "wasm32-unknown-unknown",
    "wasm32-wasi",
];

/// Addresses below the first page are never valid object pointers.
const DEFAULT_LEAST_VALID_POINTER: u64 = 4096;

/// Layout-relevant facts about the compilation target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetLayout {
    pointer_size: Size,
    pointer_align: Alignment,
    least_valid_pointer: u64,
}

impl TargetLayout {
    /// The target the compiler itself runs on.
    pub fn host() -> Self {
        if cfg!(target_pointer_width = "32") {
            Self::pointer_width_32()
        } else {
            Self::pointer_width_64()
        }
    }

    /// `wasm32-*`: 4-byte pointers.
    pub fn wasm32() -> Self {
        Self::pointer_width_32()
    }

    /// Look up a supported target triple.
    pub fn from_triple(triple: &str) -> Result<Self, LayoutError> {
        if !SUPPORTED_TARGETS.contains(&triple) {
            return Err(LayoutError::UnsupportedTarget(triple.to_owned()));
        }
        if triple.starts_with("wasm32") {
            Ok(Self::wasm32())
        } else {
            Ok(Self::pointer_width_64())
        }
    }

    /// Override the least valid pointer value.
    #[must_use]
    pub fn with_least_valid_pointer(mut self, value: u64) -> Self {
        self.least_valid_pointer = value;
        self
    }

    pub fn pointer_size(&self) -> Size {
        self.pointer_size
    }

    pub fn pointer_align(&self) -> Alignment {
        self.pointer_align
    }

    /// Width in bits of run-time size, alignment-mask and stride values.
    pub fn pointer_bits(&self) -> u32 {
        u32::try_from(self.pointer_size.bits()).unwrap_or(u32::MAX)
    }

    pub fn least_valid_pointer(&self) -> u64 {
        self.least_valid_pointer
    }

    fn pointer_width_64() -> Self {
        Self {
            pointer_size: Size::new(8),
            pointer_align: Alignment::from_log2(3),
            least_valid_pointer: DEFAULT_LEAST_VALID_POINTER,
        }
    }

    fn pointer_width_32() -> Self {
        Self {
            pointer_size: Size::new(4),
            pointer_align: Alignment::from_log2(2),
            least_valid_pointer: DEFAULT_LEAST_VALID_POINTER,
        }
    }
}

impl Default for TargetLayout {
    fn default() -> Self {
        Self::host()
    }
}
