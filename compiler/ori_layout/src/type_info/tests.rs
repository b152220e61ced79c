use pretty_assertions::assert_eq;

use crate::emit::IrGenFunction;
use crate::test_helpers::{EvalEmitter, Op};
use crate::{BitVector, TargetLayout};

use super::*;

fn fixed_bool() -> TypeInfo {
    FixedTypeInfo::new(
        ReprId::from_raw(1),
        Size::new(1),
        BitVector::high_bits_spare(8, 1),
        Alignment::ONE,
        TypeFlags::pod(),
    )
    .unwrap_or_else(|e| panic!("{e}"))
    .into()
}

fn generic() -> TypeInfo {
    NonFixedTypeInfo::new(ReprId::from_raw(7), Alignment::ONE, TypeFlags::empty()).into()
}

fn igf() -> IrGenFunction<EvalEmitter> {
    IrGenFunction::new(EvalEmitter::new(), TargetLayout::host())
}

#[test]
fn classification() {
    assert!(fixed_bool().is_fixed_size());
    assert!(fixed_bool().as_fixed().is_some());
    assert!(!generic().is_fixed_size());
    assert!(generic().as_fixed().is_none());
    assert_eq!(generic().repr(), ReprId::from_raw(7));
    assert_eq!(generic().fixed_size(), Err(LayoutError::NotFixedSize));
    assert_eq!(fixed_bool().fixed_size(), Ok(Size::new(1)));
    assert_eq!(generic().best_known_alignment(), Ok(Alignment::ONE));
}

#[test]
fn as_fixed_mut_completes_pending_layout() {
    let mut info: TypeInfo =
        FixedTypeInfo::pending(ReprId::from_raw(2), BitVector::new(), TypeFlags::pod()).into();
    assert_eq!(info.fixed_size(), Err(LayoutError::NotFinalized));
    let result = info
        .as_fixed_mut()
        .map(|fixed| fixed.complete_fixed(Size::new(16), Alignment::from_log2(3)));
    assert_eq!(result, Some(Ok(())));
    assert_eq!(info.fixed_size(), Ok(Size::new(16)));
    assert!(info.flags().contains(TypeFlags::BITWISE_TAKABLE));
}

#[test]
fn fixed_queries_stay_static() {
    let info = fixed_bool();
    let mut igf = igf();
    let size = info.size(&mut igf).unwrap_or_else(|e| panic!("{e}"));
    let stride = info.stride(&mut igf).unwrap_or_else(|e| panic!("{e}"));
    let mask = info.alignment_mask(&mut igf).unwrap_or_else(|e| panic!("{e}"));
    let emitter = igf.into_emitter();
    assert_eq!(
        (emitter.value(size), emitter.value(stride), emitter.value(mask)),
        (1, 1, 0)
    );
    assert!(emitter.witness_calls().is_empty());
}

#[test]
fn non_fixed_queries_go_through_witnesses() {
    let info = generic();
    let mut igf = igf();
    let buf = igf.emitter().place(&[0; 16], Alignment::ONE);
    let other = igf.emitter().place(&[0; 16], Alignment::ONE);

    info.size(&mut igf).unwrap_or_else(|e| panic!("{e}"));
    info.alignment_mask(&mut igf).unwrap_or_else(|e| panic!("{e}"));
    info.stride(&mut igf).unwrap_or_else(|e| panic!("{e}"));
    info.extra_inhabitant_index(&mut igf, buf)
        .unwrap_or_else(|e| panic!("{e}"));
    let index = igf.const_index(0);
    assert_eq!(info.store_extra_inhabitant(&mut igf, index, buf), Ok(()));
    assert_eq!(info.initialize_with_take(&mut igf, other, buf), Ok(()));
    info.initialize_value_witness_table(&mut igf, buf);

    let emitter = igf.into_emitter();
    let repr = ReprId::from_raw(7);
    let expected: Vec<(ReprId, ValueWitness, Vec<ValueId>)> = vec![
        (repr, ValueWitness::Size, vec![]),
        (repr, ValueWitness::AlignmentMask, vec![]),
        (repr, ValueWitness::Stride, vec![]),
        (repr, ValueWitness::ExtraInhabitantIndex, vec![buf.ptr]),
        (repr, ValueWitness::StoreExtraInhabitant, vec![index, buf.ptr]),
        (repr, ValueWitness::InitializeWithTake, vec![other.ptr, buf.ptr]),
        (repr, ValueWitness::InitializeTable, vec![buf.ptr]),
    ];
    assert_eq!(emitter.witness_calls(), expected.as_slice());
    assert!(emitter.ops().contains(&Op::Witness(ValueWitness::InitializeTable)));
}

#[test]
fn non_fixed_types_cannot_use_stack_slots() {
    let mut igf = igf();
    assert_eq!(
        generic().allocate_stack(&mut igf, "tmp"),
        Err(LayoutError::NotFixedSize)
    );
    let slot = fixed_bool()
        .allocate_stack(&mut igf, "flag")
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(slot.release(&mut igf), Ok(()));
}

#[test]
fn extra_inhabitant_capability() {
    assert!(generic().may_have_extra_inhabitants());
    assert!(fixed_bool().may_have_extra_inhabitants());

    let info = fixed_bool();
    let mut igf = igf();
    let slot = igf.emitter().place(&[1], Alignment::ONE);
    let decoded = info
        .extra_inhabitant_index(&mut igf, slot)
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(igf.into_emitter().index_value(decoded), -1);
}
