//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements                   | Connects to                  |
//! |------------|------------------------------|------------------------------|
//! | `hardware` | RailPort, SettleDelay        | embedded-hal GPIO and delay  |
//! | `nvm`      | NvmPort                      | RAM-backed EEPROM image      |
//! | `board`    | Board (all node ports)       | individual drivers           |
//! | `sim`      | AnalogPort, SystemControl, … | host simulation              |
//! | `log_sink` | log::Log                     | stderr console               |

pub mod board;
pub mod hardware;
pub mod log_sink;
pub mod nvm;
pub mod sim;
