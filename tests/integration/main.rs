//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one area of the node
//! against mock adapters.  All tests run on the host with no real hardware
//! required.

mod load_control_tests;
mod mock_hw;
mod node_tests;
mod power_tests;
mod relay_tests;
