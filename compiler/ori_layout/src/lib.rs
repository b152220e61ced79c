//! Fixed-layout type information for Ori code generation.
//!
//! This crate answers the layout questions the backend asks about types
//! whose size and alignment are compile-time constants, and emits the glue
//! code that goes with them:
//!
//! - **Layout descriptors** ([`LayoutDescriptor`]): size, alignment, stride,
//!   spare-bit mask and [`TypeFlags`], fixed once (possibly lazily, for
//!   recursive types).
//! - **Spare-bit engine** ([`spare_bits`]): the bijection between
//!   extra-inhabitant indices and bit patterns over a type's unused bits,
//!   plus the mask fold used for enum layout.
//! - **Storage** ([`storage`]): LIFO stack slots, managed boxes, and the
//!   default bitwise take.
//! - **Capability dispatch** ([`TypeInfo`]): fixed types answered statically,
//!   run-time-sized types through value witnesses.
//!
//! # Design
//!
//! Modeled on Swift's `FixedTypeInfo`. The crate is backend-independent:
//! emission goes through the [`FunctionEmitter`](emit::FunctionEmitter) and
//! [`ModuleEmitter`](emit::ModuleEmitter) traits, which the LLVM backend
//! implements over its `IrBuilder`.
//!
//! # Debug Environment Variables
//!
//! - `RUST_LOG=ori_layout=debug`: log layout finalization.
//! - `RUST_LOG=ori_layout=trace`: also log every extra-inhabitant encode
//!   and emitted decode/store.

#![allow(
    // Bit positions and byte offsets move between usize, u32 and u64;
    // every value involved is bounded by a type's storage width.
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

mod bits;
mod config;
mod descriptor;
pub mod emit;
mod error;
mod fixed;
pub mod inhabitants;
pub mod spare_bits;
pub mod storage;
mod type_info;
mod units;

#[cfg(test)]
mod test_helpers;

use std::sync::Once;

pub use bits::BitVector;
pub use config::{TargetLayout, SUPPORTED_TARGETS};
pub use descriptor::{LayoutDescriptor, LayoutState, TypeFlags};
pub use error::LayoutError;
pub use fixed::{merge_payload_spare_bits, FixedTypeInfo};
pub use inhabitants::{ExtraInhabitants, ReservedPointers};
pub use spare_bits::INDEX_MAX;
pub use storage::StackAllocation;
pub use type_info::{NonFixedTypeInfo, TypeInfo};
pub use units::{Alignment, Size};

static TRACING_INIT: Once = Once::new();

/// Install a tracing subscriber for layout debugging.
///
/// Does nothing unless `RUST_LOG` is set; safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
