//! NVM address mapping.
//!
//! ```text
//!  offset 0x00        node bus address (1 byte)
//!  offset 0x10 + 4*a  register `a`, little-endian word
//! ```

use crate::ports::{NvmError, NvmPort};

/// NVM offset of this node's own bus address.
pub const SELF_ADDRESS: u16 = 0x00;
/// NVM offset of register 0.
pub const REGISTERS_BASE: u16 = 0x10;

/// NVM offset of the word mirroring register `addr`.
pub const fn register_offset(addr: u8) -> u16 {
    REGISTERS_BASE + 4 * addr as u16
}

pub fn read_word<N: NvmPort + ?Sized>(nvm: &mut N, addr: u8) -> Result<u32, NvmError> {
    let base = register_offset(addr);
    let mut bytes = [0u8; 4];
    for (i, byte) in (0u16..).zip(bytes.iter_mut()) {
        *byte = nvm.read_byte(base + i)?;
    }
    Ok(u32::from_le_bytes(bytes))
}

pub fn write_word<N: NvmPort + ?Sized>(nvm: &mut N, addr: u8, value: u32) -> Result<(), NvmError> {
    let base = register_offset(addr);
    for (i, byte) in (0u16..).zip(value.to_le_bytes()) {
        nvm.write_byte(base + i, byte)?;
    }
    Ok(())
}
