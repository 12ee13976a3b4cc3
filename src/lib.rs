//! Register bus and power domain arbiter for the node module family.
//!
//! Every module exposes its behaviour as a bank of 32-bit registers behind
//! one [`Node`](node::Node), and shares the board's switchable rails through
//! the reference-counted [`PowerArbiter`](power::PowerArbiter).  Hardware is
//! reached only through the traits in [`ports`] and [`power`], so the whole
//! core runs on the host against the simulation adapters.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod drivers;
pub mod error;
pub mod isr;
pub mod modules;
pub mod node;
pub mod ports;
pub mod power;
pub mod scheduler;
