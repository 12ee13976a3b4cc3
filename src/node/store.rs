//! Register store.
//!
//! One 32-bit value per address, plus a static description of each
//! address: access class, NVM backing and error sentinel.  The layout is
//! the common range followed by the active variant's range, fixed when the
//! node is built.
//!
//! The store does no access control; that is the Dispatcher's job.  Every
//! method here is the trusted (internal) path.

use heapless::Vec;

use super::field;
use crate::error::{NodeError, Result};

/// Upper bound on the address space (addresses are single bytes).
pub const MAX_REGISTERS: usize = 256;

/// Origin of a register operation.  The only trust boundary of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    /// Generated inside the firmware: no access check, no side effects,
    /// no live refresh.
    Internal,
    /// Received from the bus / radio: full access check, side effects,
    /// refresh-before-read.
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Static description of one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSpec {
    pub access: Access,
    pub nvm_backed: bool,
    /// Value held while uninitialised or after a failed measurement.
    pub error_value: u32,
}

impl RegisterSpec {
    pub const fn read_only(error_value: u32) -> Self {
        Self {
            access: Access::ReadOnly,
            nvm_backed: false,
            error_value,
        }
    }

    pub const fn read_write(error_value: u32) -> Self {
        Self {
            access: Access::ReadWrite,
            nvm_backed: false,
            error_value,
        }
    }

    /// Mark the register as mirrored in NVM.
    pub const fn nvm(self) -> Self {
        Self {
            nvm_backed: true,
            ..self
        }
    }
}

/// The node's register bank.
#[derive(Debug)]
pub struct RegisterStore {
    specs: Vec<RegisterSpec, MAX_REGISTERS>,
    values: Vec<u32, MAX_REGISTERS>,
}

impl RegisterStore {
    /// Build the layout `common ++ variant`, every register holding its
    /// error sentinel.
    ///
    /// Fails with [`NodeError::InvalidAddress`] if the tables do not fit
    /// the single-byte address space.
    pub fn new(common: &[RegisterSpec], variant: &[RegisterSpec]) -> Result<Self> {
        let mut specs = Vec::new();
        let mut values = Vec::new();
        for spec in common.iter().chain(variant) {
            specs.push(*spec).map_err(|_| NodeError::InvalidAddress)?;
            values
                .push(spec.error_value)
                .map_err(|_| NodeError::InvalidAddress)?;
        }
        Ok(Self { specs, values })
    }

    /// One past the highest valid address.
    pub fn last_address(&self) -> usize {
        self.values.len()
    }

    pub fn spec(&self, addr: u8) -> Result<&RegisterSpec> {
        self.specs
            .get(addr as usize)
            .ok_or(NodeError::InvalidAddress)
    }

    pub fn read(&self, addr: u8) -> Result<u32> {
        self.values
            .get(addr as usize)
            .copied()
            .ok_or(NodeError::InvalidAddress)
    }

    /// Masked read-modify-write.  Bits outside `mask` are untouched.
    pub fn write(&mut self, addr: u8, value: u32, mask: u32) -> Result<()> {
        let reg = self
            .values
            .get_mut(addr as usize)
            .ok_or(NodeError::InvalidAddress)?;
        *reg = field::merge(*reg, value, mask);
        Ok(())
    }

    /// Restore one register to its error sentinel.
    pub fn reset(&mut self, addr: u8) -> Result<()> {
        let error_value = self.spec(addr)?.error_value;
        self.write(addr, error_value, u32::MAX)
    }

    /// Restore every register to its error sentinel.
    pub fn reset_all(&mut self) {
        for (value, spec) in self.values.iter_mut().zip(self.specs.iter()) {
            *value = spec.error_value;
        }
    }
}
