//! Emitters for unit tests.
//!
//! [`EvalEmitter`] executes every instruction as soon as it is emitted,
//! against a sparse little-endian byte memory, and keeps a log of what was
//! emitted. That lets tests check both the result of emitted code and its
//! shape (e.g. "only constants"). [`RecordingModule`] stores module
//! constants in registration order.

use rustc_hash::FxHashMap;

use crate::emit::{
    Address, ConstantId, FunctionEmitter, ManagedBox, ModuleEmitter, ReprId, ValueId, ValueWitness,
};
use crate::{Alignment, BitVector, Size};

/// Emitted instruction kinds, in emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    Const,
    Load,
    Store,
    Arith,
    Cmp,
    Select,
    Cast,
    Memset,
    Memcpy,
    StackAlloc,
    StackRelease,
    AllocBox,
    Witness(ValueWitness),
}

/// Start of the fake address space; below it is the "null page".
const BASE_ADDRESS: u64 = 0x1_0000;

/// Refcount header placed in front of every box payload.
const BOX_HEADER: u64 = 16;

fn width_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

pub(crate) struct EvalEmitter {
    values: Vec<(u64, u32)>,
    memory: FxHashMap<u64, u8>,
    next_address: u64,
    ops: Vec<Op>,
    released: Vec<(ValueId, Size)>,
    witness_calls: Vec<(ReprId, ValueWitness, Vec<ValueId>)>,
}

impl EvalEmitter {
    pub(crate) fn new() -> Self {
        Self {
            values: Vec::new(),
            memory: FxHashMap::default(),
            next_address: BASE_ADDRESS,
            ops: Vec::new(),
            released: Vec::new(),
            witness_calls: Vec::new(),
        }
    }

    /// Place `bytes` in fresh memory and return an address for them.
    ///
    /// Setup only: nothing is added to the op log.
    pub(crate) fn place(&mut self, bytes: &[u8], align: Alignment) -> Address {
        let addr = self.bump(bytes.len().max(1) as u64, align);
        self.write_bytes(addr, bytes);
        Address::new(self.push(addr, 64), align)
    }

    /// Integer value of an emitted value.
    pub(crate) fn value(&self, id: ValueId) -> u64 {
        self.values[id.raw() as usize].0
    }

    /// Bit width of an emitted value.
    pub(crate) fn width(&self, id: ValueId) -> u32 {
        self.values[id.raw() as usize].1
    }

    /// An `i32` result reinterpreted as signed.
    pub(crate) fn index_value(&self, id: ValueId) -> i32 {
        i32::from_ne_bytes((self.value(id) as u32).to_ne_bytes())
    }

    pub(crate) fn read_bytes(&self, addr: Address, len: usize) -> Vec<u8> {
        let base = self.value(addr.ptr);
        (0..len as u64)
            .map(|i| self.memory.get(&(base + i)).copied().unwrap_or(0))
            .collect()
    }

    pub(crate) fn fill(&mut self, addr: Address, len: usize, byte: u8) {
        let base = self.value(addr.ptr);
        for i in 0..len as u64 {
            self.memory.insert(base + i, byte);
        }
    }

    pub(crate) fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub(crate) fn released(&self) -> &[(ValueId, Size)] {
        &self.released
    }

    pub(crate) fn witness_calls(&self) -> &[(ReprId, ValueWitness, Vec<ValueId>)] {
        &self.witness_calls
    }

    fn push(&mut self, value: u64, bits: u32) -> ValueId {
        let id = ValueId::from_raw(self.values.len() as u32);
        self.values.push((value & width_mask(bits), bits));
        id
    }

    fn emit(&mut self, op: Op, value: u64, bits: u32) -> ValueId {
        self.ops.push(op);
        self.push(value, bits)
    }

    fn bump(&mut self, size: u64, align: Alignment) -> u64 {
        let addr = (self.next_address + align.mask()) & !align.mask();
        self.next_address = addr + size;
        addr
    }

    fn write_bytes(&mut self, addr: u64, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.memory.insert(addr + i as u64, b);
        }
    }

    fn binary(&mut self, lhs: ValueId, rhs: ValueId, f: impl Fn(u64, u64, u32) -> u64) -> ValueId {
        let (l, bits) = self.values[lhs.raw() as usize];
        let (r, rbits) = self.values[rhs.raw() as usize];
        assert_eq!(bits, rbits, "operand width mismatch");
        self.emit(Op::Arith, f(l, r, bits), bits)
    }
}

impl FunctionEmitter for EvalEmitter {
    fn const_int(&mut self, bits: u32, value: u64) -> ValueId {
        self.emit(Op::Const, value, bits)
    }

    fn load_int(&mut self, addr: Address, offset: Size, bits: u32) -> ValueId {
        let base = self.value(addr.ptr) + offset.bytes();
        let value = (0..u64::from(bits / 8)).fold(0u64, |acc, i| {
            let byte = self.memory.get(&(base + i)).copied().unwrap_or(0);
            acc | (u64::from(byte) << (8 * i))
        });
        self.emit(Op::Load, value, bits)
    }

    fn store_int(&mut self, value: ValueId, addr: Address, offset: Size) {
        self.ops.push(Op::Store);
        let (v, bits) = self.values[value.raw() as usize];
        let base = self.value(addr.ptr) + offset.bytes();
        let bytes: Vec<u8> = (0..bits / 8).map(|i| (v >> (8 * i)) as u8).collect();
        self.write_bytes(base, &bytes);
    }

    fn and(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(lhs, rhs, |l, r, _| l & r)
    }

    fn or(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(lhs, rhs, |l, r, _| l | r)
    }

    fn shl(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(lhs, rhs, |l, r, bits| if r >= u64::from(bits) { 0 } else { l << r })
    }

    fn lshr(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(lhs, rhs, |l, r, bits| if r >= u64::from(bits) { 0 } else { l >> r })
    }

    fn add(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(lhs, rhs, |l, r, _| l.wrapping_add(r))
    }

    fn sub(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(lhs, rhs, |l, r, _| l.wrapping_sub(r))
    }

    fn icmp_eq(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let result = self.value(lhs) == self.value(rhs);
        self.emit(Op::Cmp, u64::from(result), 1)
    }

    fn icmp_ult(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let result = self.value(lhs) < self.value(rhs);
        self.emit(Op::Cmp, u64::from(result), 1)
    }

    fn select(&mut self, cond: ValueId, then_val: ValueId, else_val: ValueId) -> ValueId {
        let chosen = if self.value(cond) != 0 { then_val } else { else_val };
        let (v, bits) = self.values[chosen.raw() as usize];
        self.emit(Op::Select, v, bits)
    }

    fn zext(&mut self, value: ValueId, bits: u32) -> ValueId {
        let v = self.value(value);
        self.emit(Op::Cast, v, bits)
    }

    fn trunc(&mut self, value: ValueId, bits: u32) -> ValueId {
        let v = self.value(value);
        self.emit(Op::Cast, v, bits)
    }

    fn memset_zero(&mut self, dest: Address, size: Size) {
        self.ops.push(Op::Memset);
        let base = self.value(dest.ptr);
        for i in 0..size.bytes() {
            self.memory.insert(base + i, 0);
        }
    }

    fn memcpy(&mut self, dest: Address, src: Address, size: Size) {
        self.ops.push(Op::Memcpy);
        let bytes = self.read_bytes(src, size.bytes() as usize);
        let base = self.value(dest.ptr);
        self.write_bytes(base, &bytes);
    }

    fn stack_alloc(&mut self, size: Size, align: Alignment, _name: &str) -> ValueId {
        let addr = self.bump(size.bytes().max(1), align);
        self.emit(Op::StackAlloc, addr, 64)
    }

    fn stack_release(&mut self, ptr: ValueId, size: Size) {
        self.ops.push(Op::StackRelease);
        self.released.push((ptr, size));
    }

    fn alloc_box(&mut self, size: Size, align: Alignment, _name: &str) -> ManagedBox {
        let header_align = Alignment::from_log2(align.log2().max(3));
        let header = self.bump(BOX_HEADER + size.bytes(), header_align);
        let payload = (header + BOX_HEADER + align.mask()) & !align.mask();
        self.next_address = self.next_address.max(payload + size.bytes());
        let owner = self.emit(Op::AllocBox, header, 64);
        let payload = self.push(payload, 64);
        ManagedBox { owner, payload }
    }

    fn value_witness(&mut self, ty: ReprId, witness: ValueWitness, args: &[ValueId]) -> ValueId {
        self.witness_calls.push((ty, witness, args.to_vec()));
        self.emit(Op::Witness(witness), 0, 64)
    }
}

/// Module emitter that keeps every registered constant.
pub(crate) struct RecordingModule {
    constants: Vec<BitVector>,
}

impl RecordingModule {
    pub(crate) fn new() -> Self {
        Self {
            constants: Vec::new(),
        }
    }

    pub(crate) fn constant(&self, id: ConstantId) -> &BitVector {
        &self.constants[id.raw() as usize]
    }

    pub(crate) fn len(&self) -> usize {
        self.constants.len()
    }
}

impl ModuleEmitter for RecordingModule {
    fn const_int(&mut self, value: &BitVector) -> ConstantId {
        self.constants.push(value.clone());
        ConstantId::from_raw((self.constants.len() - 1) as u32)
    }
}
