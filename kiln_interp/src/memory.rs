//! The interpreter's byte-addressable memory model
//!
//! Three segments sit behind 64-bit virtual addresses: the call stack, the
//! global/BSS segment (which also carries the string pool after the BSS
//! watermark), and the heap. Pointer values stored in program memory are
//! these virtual addresses, so runs are deterministic down to printed
//! pointers.

use kiln_common::{KilnError, KilnResult};
use kiln_memory::HeapAllocator;
use smallvec::SmallVec;
use std::fmt;

pub const STACK_BASE: u64 = 0x1_0000;
pub const GLOBAL_BASE: u64 = 0x4000_0000;
pub use kiln_memory::HEAP_BASE;

/// Classification returned by the memory-type probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    Stack,
    Global,
    Heap,
    Invalid,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::Stack => write!(f, "stack"),
            MemoryKind::Global => write!(f, "global"),
            MemoryKind::Heap => write!(f, "heap"),
            MemoryKind::Invalid => write!(f, "(invalid)"),
        }
    }
}

pub struct Memory {
    pub stack: Vec<u8>,
    pub global: Vec<u8>,
    pub heap: HeapAllocator,
}

fn invalid_access(addr: u64, len: u64) -> KilnError {
    KilnError::runtime_error(format!("invalid memory access of {} byte(s) at 0x{:x}", len, addr))
}

impl Memory {
    pub fn new(stack_size: usize, global_size: usize) -> Self {
        Self {
            stack: vec![0u8; stack_size],
            global: vec![0u8; global_size],
            heap: HeapAllocator::new(),
        }
    }

    /// Classify an address. A heap address inside a free-list bucket is
    /// invalid: the storage was handed back.
    pub fn kind(&self, addr: u64) -> MemoryKind {
        if addr >= STACK_BASE && addr < STACK_BASE + self.stack.len() as u64 {
            return MemoryKind::Stack;
        }
        if addr >= GLOBAL_BASE && addr < GLOBAL_BASE + self.global.len() as u64 {
            return MemoryKind::Global;
        }
        if self.heap.contains(addr) {
            if self.heap.is_free(addr) {
                return MemoryKind::Invalid;
            }
            return MemoryKind::Heap;
        }
        MemoryKind::Invalid
    }

    pub fn slice(&self, addr: u64, len: u64) -> KilnResult<&[u8]> {
        let end = addr.checked_add(len).ok_or_else(|| invalid_access(addr, len))?;
        if addr >= STACK_BASE && end <= STACK_BASE + self.stack.len() as u64 {
            let start = (addr - STACK_BASE) as usize;
            return Ok(&self.stack[start..start + len as usize]);
        }
        if addr >= GLOBAL_BASE && end <= GLOBAL_BASE + self.global.len() as u64 {
            let start = (addr - GLOBAL_BASE) as usize;
            return Ok(&self.global[start..start + len as usize]);
        }
        self.heap.slice(addr, len).ok_or_else(|| invalid_access(addr, len))
    }

    pub fn slice_mut(&mut self, addr: u64, len: u64) -> KilnResult<&mut [u8]> {
        let end = addr.checked_add(len).ok_or_else(|| invalid_access(addr, len))?;
        if addr >= STACK_BASE && end <= STACK_BASE + self.stack.len() as u64 {
            let start = (addr - STACK_BASE) as usize;
            return Ok(&mut self.stack[start..start + len as usize]);
        }
        if addr >= GLOBAL_BASE && end <= GLOBAL_BASE + self.global.len() as u64 {
            let start = (addr - GLOBAL_BASE) as usize;
            return Ok(&mut self.global[start..start + len as usize]);
        }
        self.heap.slice_mut(addr, len).ok_or_else(|| invalid_access(addr, len))
    }

    pub fn load_bytes(&self, addr: u64, len: u64) -> KilnResult<SmallVec<[u8; 16]>> {
        Ok(SmallVec::from_slice(self.slice(addr, len)?))
    }

    pub fn store_bytes(&mut self, addr: u64, bytes: &[u8]) -> KilnResult<()> {
        self.slice_mut(addr, bytes.len() as u64)?.copy_from_slice(bytes);
        Ok(())
    }

    /// Overlap-safe copy between any two addresses.
    pub fn copy(&mut self, dst: u64, src: u64, len: u64) -> KilnResult<()> {
        let bytes = self.load_bytes(src, len)?;
        self.store_bytes(dst, &bytes)
    }

    pub fn load_u8(&self, addr: u64) -> KilnResult<u8> {
        Ok(self.slice(addr, 1)?[0])
    }

    pub fn load_u64(&self, addr: u64) -> KilnResult<u64> {
        let bytes = self.slice(addr, 8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn load_i64(&self, addr: u64) -> KilnResult<i64> {
        Ok(self.load_u64(addr)? as i64)
    }

    pub fn load_f64(&self, addr: u64) -> KilnResult<f64> {
        Ok(f64::from_bits(self.load_u64(addr)?))
    }

    pub fn store_u8(&mut self, addr: u64, value: u8) -> KilnResult<()> {
        self.slice_mut(addr, 1)?[0] = value;
        Ok(())
    }

    pub fn store_u64(&mut self, addr: u64, value: u64) -> KilnResult<()> {
        self.store_bytes(addr, &value.to_le_bytes())
    }

    pub fn store_i64(&mut self, addr: u64, value: i64) -> KilnResult<()> {
        self.store_u64(addr, value as u64)
    }

    pub fn store_f64(&mut self, addr: u64, value: f64) -> KilnResult<()> {
        self.store_u64(addr, value.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn probe_classifies_each_segment() {
        let mut memory = Memory::new(1024, 64);
        assert_eq!(memory.kind(STACK_BASE), MemoryKind::Stack);
        assert_eq!(memory.kind(GLOBAL_BASE + 63), MemoryKind::Global);
        assert_eq!(memory.kind(GLOBAL_BASE + 64), MemoryKind::Invalid);
        assert_eq!(memory.kind(0), MemoryKind::Invalid);

        let p = memory.heap.alloc(8).unwrap();
        assert_eq!(memory.kind(p), MemoryKind::Heap);
        memory.heap.free(p).unwrap();
        assert_eq!(memory.kind(p), MemoryKind::Invalid);
    }

    #[test]
    fn loads_and_stores_round_trip() {
        let mut memory = Memory::new(1024, 0);
        memory.store_i64(STACK_BASE + 16, -42).unwrap();
        assert_eq!(memory.load_i64(STACK_BASE + 16).unwrap(), -42);
        memory.store_f64(STACK_BASE + 24, 2.5).unwrap();
        assert_eq!(memory.load_f64(STACK_BASE + 24).unwrap(), 2.5);
    }

    #[test]
    fn out_of_range_access_is_an_error() {
        let memory = Memory::new(64, 0);
        assert!(memory.load_u64(STACK_BASE + 60).is_err());
        assert!(memory.load_u64(0x2000).is_err());
    }

    #[test]
    fn copy_handles_overlapping_ranges() {
        let mut memory = Memory::new(64, 0);
        memory.store_bytes(STACK_BASE, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        memory.copy(STACK_BASE + 4, STACK_BASE, 8).unwrap();
        assert_eq!(memory.slice(STACK_BASE + 4, 8).unwrap(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
