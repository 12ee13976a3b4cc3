//! Peripheral drivers behind the port traits.

pub mod led;
pub mod load;
