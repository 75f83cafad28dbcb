//! Linear memory instances with bounds-checked access.
//!
//! All accessors validate the address range against the memory's current
//! size before touching it. Out-of-bounds access traps with
//! `memoryAddressOutOfBounds`.

use keystone_primitives::{MemoryType, PAGE_SIZE};

use crate::error::RuntimeError;
use crate::trap::{Trap, TrapKind};

/// A linear memory owned by one compartment.
#[derive(Debug, Clone)]
pub struct MemoryInstance {
    ty: MemoryType,
    max_pages: u64,
    data: Vec<u8>,
}

impl MemoryInstance {
    /// Allocate `ty.size.min` zeroed pages; growth stops at the smaller of
    /// the declared maximum and `limit_pages`. Fails instead of aborting if
    /// the host cannot provide the storage.
    pub(crate) fn new(ty: MemoryType, limit_pages: u64) -> Result<Self, RuntimeError> {
        let max_pages = ty.size.effective_max(limit_pages).min(limit_pages);
        let bytes = ty.size.min.saturating_mul(PAGE_SIZE as u64);
        let out_of_memory = || RuntimeError::OutOfMemory {
            what: "memory",
            bytes,
        };
        let len = usize::try_from(bytes).map_err(|_| out_of_memory())?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| out_of_memory())?;
        data.resize(len, 0);
        Ok(Self {
            ty,
            max_pages,
            data,
        })
    }

    pub fn ty(&self) -> &MemoryType {
        &self.ty
    }

    /// Current size in pages.
    pub fn pages(&self) -> u64 {
        (self.data.len() / PAGE_SIZE) as u64
    }

    pub fn max_pages(&self) -> u64 {
        self.max_pages
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Grow by `delta` pages. Returns the previous size in pages, or `None`
    /// (leaving the memory unchanged) if the maximum would be exceeded.
    pub fn grow(&mut self, delta: u64) -> Option<u64> {
        let previous = self.pages();
        let new_pages = previous.checked_add(delta)?;
        if new_pages > self.max_pages {
            return None;
        }
        let len = usize::try_from(new_pages).ok()?.checked_mul(PAGE_SIZE)?;
        self.data.try_reserve_exact(len - self.data.len()).ok()?;
        self.data.resize(len, 0);
        Some(previous)
    }

    /// Borrow `len` bytes at `address`.
    pub fn read_bytes(&self, address: u64, len: u64) -> Result<&[u8], Trap> {
        let (start, end) = self.range(address, len)?;
        Ok(&self.data[start..end])
    }

    /// Copy `bytes` to `address`.
    pub fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Result<(), Trap> {
        let (start, end) = self.range(address, bytes.len() as u64)?;
        self.data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn load_u8(&self, address: u64) -> Result<u8, Trap> {
        Ok(self.read_bytes(address, 1)?[0])
    }

    pub fn store_u8(&mut self, address: u64, value: u8) -> Result<(), Trap> {
        self.write_bytes(address, &[value])
    }

    /// Read an i32 value (little-endian) at `address`.
    pub fn load_i32(&self, address: u64) -> Result<i32, Trap> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Write an i32 value (little-endian) at `address`.
    pub fn store_i32(&mut self, address: u64, value: i32) -> Result<(), Trap> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn range(&self, address: u64, len: u64) -> Result<(usize, usize), Trap> {
        let end = address
            .checked_add(len)
            .ok_or_else(|| Trap::new(TrapKind::MemoryAddressOutOfBounds))?;
        if end > self.data.len() as u64 {
            return Err(Trap::new(TrapKind::MemoryAddressOutOfBounds));
        }
        Ok((address as usize, end as usize))
    }
}
