//! Bit-field helpers for 32-bit registers.
//!
//! A field is described by its in-place mask (e.g. `0x0000_FF00`).  Field
//! values are passed right-aligned and shifted into place here.

/// Merge `value` into `reg`, touching only the bits selected by `mask`.
pub const fn merge(reg: u32, value: u32, mask: u32) -> u32 {
    (reg & !mask) | (value & mask)
}

const fn shift(mask: u32) -> u32 {
    if mask == 0 { 0 } else { mask.trailing_zeros() }
}

/// Extract the right-aligned field selected by `mask`.
pub const fn read(reg: u32, mask: u32) -> u32 {
    (reg & mask) >> shift(mask)
}

/// Accumulates field writes into a `(value, mask)` pair for one masked
/// register write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldWrite {
    pub value: u32,
    pub mask: u32,
}

impl FieldWrite {
    pub const fn new() -> Self {
        Self { value: 0, mask: 0 }
    }

    /// Add one field.  Bits of `field` that do not fit the mask are dropped.
    #[must_use]
    pub const fn with(self, field: u32, mask: u32) -> Self {
        Self {
            value: merge(self.value, field << shift(mask), mask),
            mask: self.mask | mask,
        }
    }
}

/// Mask of byte `index` (0..4) of a register, least-significant first.
pub const fn byte_mask(index: usize) -> u32 {
    0xFF << ((index % 4) * 8)
}

/// Two-bit representation of a hardware output bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BitState {
    Zero = 0b00,
    One = 0b01,
    ForcedHardware = 0b10,
    Error = 0b11,
}

impl BitState {
    pub fn from_bool(on: bool) -> Self {
        if on { Self::One } else { Self::Zero }
    }

    pub fn from_raw(raw: u32) -> Self {
        match raw & 0b11 {
            0b00 => Self::Zero,
            0b01 => Self::One,
            0b10 => Self::ForcedHardware,
            _ => Self::Error,
        }
    }
}

// ── Measurement encoding ──────────────────────────────────────

/// Largest valid 16-bit millivolt value; `0xFFFF` is the error sentinel.
pub const MV_MAX: u32 = 0xFFFE;
pub const MV_ERROR: u32 = 0xFFFF;
/// Largest valid 24-bit microamp value; `0xFF_FFFF` is the error sentinel.
pub const UA_MAX: u32 = 0x00FF_FFFE;
pub const UA_ERROR: u32 = 0x00FF_FFFF;
pub const DEGREES_ERROR: u32 = 0x7F;

/// Clamp a millivolt sample into its 16-bit field.
pub fn encode_mv(mv: i32) -> u32 {
    (mv.max(0) as u32).min(MV_MAX)
}

/// Clamp a microamp sample into its 24-bit field.
pub fn encode_ua(ua: i32) -> u32 {
    (ua.max(0) as u32).min(UA_MAX)
}

/// Two's complement byte, clamped to -128..=126 (127 is the sentinel).
pub fn encode_degrees(celsius: i32) -> u32 {
    (celsius.clamp(-128, 126) as i8) as u8 as u32
}
