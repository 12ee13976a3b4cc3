//! RAM-backed NVM.
//!
//! Stands in for the MCU's data EEPROM on the host and in tests.  Starts
//! erased (all zero), like a freshly programmed part.

use crate::ports::{NvmError, NvmPort};

pub struct MemoryNvm<const N: usize = 1024> {
    bytes: [u8; N],
    writes: u32,
}

impl<const N: usize> MemoryNvm<N> {
    pub fn new() -> Self {
        Self {
            bytes: [0; N],
            writes: 0,
        }
    }

    /// Number of byte writes since creation.
    pub fn writes(&self) -> u32 {
        self.writes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl<const N: usize> Default for MemoryNvm<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> NvmPort for MemoryNvm<N> {
    fn read_byte(&mut self, addr: u16) -> Result<u8, NvmError> {
        self.bytes
            .get(addr as usize)
            .copied()
            .ok_or(NvmError::AddressOutOfRange)
    }

    fn write_byte(&mut self, addr: u16, value: u8) -> Result<(), NvmError> {
        let slot = self
            .bytes
            .get_mut(addr as usize)
            .ok_or(NvmError::AddressOutOfRange)?;
        *slot = value;
        self.writes += 1;
        Ok(())
    }
}
