//! Borrowed view of the node handed to adapter hooks.
//!
//! Hooks get the store, the board and the power arbiter through this
//! struct, never through globals.  All store access here is the trusted
//! (internal) path.

use log::{info, warn};

use super::field::FieldWrite;
use super::nvm;
use super::store::RegisterStore;
use crate::error::{ErrorCollector, ErrorStack, NodeError, Result};
use crate::ports::Board;
use crate::power::PowerControl;

pub struct NodeContext<'a> {
    store: &'a mut RegisterStore,
    pub board: &'a mut dyn Board,
    pub power: &'a mut dyn PowerControl,
    errors: &'a mut ErrorStack,
}

impl<'a> NodeContext<'a> {
    pub fn new(
        store: &'a mut RegisterStore,
        board: &'a mut dyn Board,
        power: &'a mut dyn PowerControl,
        errors: &'a mut ErrorStack,
    ) -> Self {
        Self {
            store,
            board,
            power,
            errors,
        }
    }

    pub fn read(&self, addr: u8) -> Result<u32> {
        self.store.read(addr)
    }

    pub fn write(&mut self, addr: u8, value: u32, mask: u32) -> Result<()> {
        self.store.write(addr, value, mask)
    }

    pub fn write_fields(&mut self, addr: u8, fields: FieldWrite) -> Result<()> {
        self.store.write(addr, fields.value, fields.mask)
    }

    /// Restore `addr` to its error sentinel.
    pub fn reset(&mut self, addr: u8) -> Result<()> {
        self.store.reset(addr)
    }

    pub fn read_nvm(&mut self, addr: u8) -> Result<u32> {
        Ok(nvm::read_word(&mut *self.board, addr)?)
    }

    pub fn write_nvm(&mut self, addr: u8, value: u32) -> Result<()> {
        Ok(nvm::write_word(&mut *self.board, addr, value)?)
    }

    /// Record one fan-out step into `collector` and the node's error stack.
    pub fn record<T>(&mut self, collector: &mut ErrorCollector, result: Result<T>) -> Option<T> {
        collector.record(&mut *self.errors, result)
    }

    pub fn pop_error(&mut self) -> Option<NodeError> {
        self.errors.pop()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Copy the NVM mirror of `addr` into the store.
    pub fn load_from_nvm(&mut self, addr: u8) -> Result<()> {
        let value = self.read_nvm(addr)?;
        self.store.write(addr, value, u32::MAX)
    }

    /// Write `addr` to NVM if the mirrored word differs from the register.
    /// Returns `true` if NVM was written.
    pub fn persist_if_changed(&mut self, addr: u8) -> Result<bool> {
        if !self.store.spec(addr)?.nvm_backed {
            warn!("register 0x{addr:02X} is not NVM backed");
            return Ok(false);
        }
        let value = self.store.read(addr)?;
        if self.read_nvm(addr)? == value {
            return Ok(false);
        }
        self.write_nvm(addr, value)?;
        info!("register 0x{addr:02X} persisted: 0x{value:08X}");
        Ok(true)
    }
}
