//! Evaluation value handles
//!
//! Evaluating an IR node yields either an address into interpreter memory
//! (the lvalue path) or an immediate scalar copy. Scalars are kept as raw
//! little-endian bytes so assignment and argument passing reduce to byte
//! copies regardless of type.

use crate::memory::Memory;
use kiln_common::KilnResult;
use kiln_resolver::{TypeArena, TypeId};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy)]
pub struct Value {
    /// When set, the value lives in interpreter memory at this address
    pub place: Option<u64>,
    imm: [u8; 16],
    pub ty: TypeId,
}

impl Value {
    pub fn unit() -> Self {
        Self { place: None, imm: [0; 16], ty: TypeArena::NULL }
    }

    pub fn at(addr: u64, ty: TypeId) -> Self {
        Self { place: Some(addr), imm: [0; 16], ty }
    }

    pub fn from_bytes(bytes: &[u8], ty: TypeId) -> Self {
        let mut imm = [0u8; 16];
        imm[..bytes.len()].copy_from_slice(bytes);
        Self { place: None, imm, ty }
    }

    pub fn from_i64(value: i64, ty: TypeId) -> Self {
        Self::from_bytes(&value.to_le_bytes(), ty)
    }

    pub fn from_f64(value: f64, ty: TypeId) -> Self {
        Self::from_bytes(&value.to_le_bytes(), ty)
    }

    pub fn from_bool(value: bool, ty: TypeId) -> Self {
        Self::from_bytes(&[value as u8], ty)
    }

    pub fn from_u64(value: u64, ty: TypeId) -> Self {
        Self::from_bytes(&value.to_le_bytes(), ty)
    }

    /// The same value viewed as another type (identity casts).
    pub fn retyped(mut self, ty: TypeId) -> Self {
        self.ty = ty;
        self
    }

    /// A fat `{ count, data }` pair (array views, strings).
    pub fn from_pair(first: i64, second: u64, ty: TypeId) -> Self {
        let mut imm = [0u8; 16];
        imm[..8].copy_from_slice(&first.to_le_bytes());
        imm[8..].copy_from_slice(&second.to_le_bytes());
        Self { place: None, imm, ty }
    }

    pub fn read_i64(&self, memory: &Memory) -> KilnResult<i64> {
        match self.place {
            Some(addr) => memory.load_i64(addr),
            None => Ok(i64::from_le_bytes(self.imm[..8].try_into().unwrap())),
        }
    }

    pub fn read_f64(&self, memory: &Memory) -> KilnResult<f64> {
        match self.place {
            Some(addr) => memory.load_f64(addr),
            None => Ok(f64::from_le_bytes(self.imm[..8].try_into().unwrap())),
        }
    }

    pub fn read_u64(&self, memory: &Memory) -> KilnResult<u64> {
        Ok(self.read_i64(memory)? as u64)
    }

    pub fn read_bool(&self, memory: &Memory) -> KilnResult<bool> {
        match self.place {
            Some(addr) => Ok(memory.load_u8(addr)? != 0),
            None => Ok(self.imm[0] != 0),
        }
    }

    pub fn read_u8(&self, memory: &Memory) -> KilnResult<u8> {
        match self.place {
            Some(addr) => memory.load_u8(addr),
            None => Ok(self.imm[0]),
        }
    }

    /// The value's first `len` bytes, loading through the address when the
    /// value lives in memory.
    pub fn bytes(&self, memory: &Memory, len: u64) -> KilnResult<SmallVec<[u8; 16]>> {
        match self.place {
            Some(addr) => memory.load_bytes(addr, len),
            None => Ok(SmallVec::from_slice(&self.imm[..len.min(16) as usize])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::STACK_BASE;
    use pretty_assertions::assert_eq;

    #[test]
    fn immediate_round_trips_scalars() {
        let memory = Memory::new(64, 0);
        let v = Value::from_i64(-7, TypeArena::INTEGER);
        assert_eq!(v.read_i64(&memory).unwrap(), -7);
        let r = Value::from_f64(1.25, TypeArena::REAL);
        assert_eq!(r.read_f64(&memory).unwrap(), 1.25);
        let b = Value::from_bool(true, TypeArena::BOOL);
        assert!(b.read_bool(&memory).unwrap());
    }

    #[test]
    fn addressed_values_read_through_memory() {
        let mut memory = Memory::new(64, 0);
        memory.store_i64(STACK_BASE + 8, 99).unwrap();
        let v = Value::at(STACK_BASE + 8, TypeArena::INTEGER);
        assert_eq!(v.read_i64(&memory).unwrap(), 99);
    }

    #[test]
    fn pair_packs_count_and_data() {
        let memory = Memory::new(64, 0);
        let v = Value::from_pair(4, 0x4000_0000, TypeArena::STRING);
        assert_eq!(v.read_i64(&memory).unwrap(), 4);
        assert_eq!(&v.bytes(&memory, 16).unwrap()[8..16], &0x4000_0000u64.to_le_bytes());
    }
}
