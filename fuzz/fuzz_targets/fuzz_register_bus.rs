//! Fuzz target: external register traffic
//!
//! Decodes the input as a stream of bus operations and replays them
//! against a load-control node on simulated hardware, checking that:
//! - nothing panics
//! - rejected external writes leave the store untouched
//! - no power domain is left held after an operation returns
//!
//! Each operation is 10 bytes: `[op, addr, value (4, LE), mask (4, LE)]`.
//!
//! cargo fuzz run fuzz_register_bus

#![no_main]

use libfuzzer_sys::fuzz_target;
use regnode::adapters::board::BoardAdapter;
use regnode::adapters::hardware::{GpioRails, HalDelay};
use regnode::adapters::nvm::MemoryNvm;
use regnode::adapters::sim::{SimAnalog, SimClock, SimPin, SimSystem, SimTimer};
use regnode::config::NodeConfig;
use regnode::drivers::led::{BlinkCells, LedController};
use regnode::drivers::load::LoadOutput;
use regnode::error::NodeError;
use regnode::modules::LoadControlModule;
use regnode::node::{Node, RequestSource};
use regnode::ports::AnalogChannel;
use regnode::power::{DomainState, PowerControl, PowerDomain};

static BLINK: BlinkCells = BlinkCells::new();

fuzz_target!(|data: &[u8]| {
    let mut analog = SimAnalog::new();
    for (channel, value) in AnalogChannel::ALL.into_iter().zip([3300, 25, 12_000, 5_000, 80_000, 12_600]) {
        analog.set(channel, value);
    }
    let board = BoardAdapter::new(
        MemoryNvm::<1024>::new(),
        analog,
        LedController::new(&BLINK, SimTimer::default()),
        SimSystem::default(),
    );
    let rails = GpioRails::new().with_rail(PowerDomain::Analog, SimPin::default());
    let power = regnode::power::PowerArbiter::new(rails, HalDelay::new(SimClock::default()));
    let module = LoadControlModule::new(LoadOutput::new(SimPin::default()), false);
    let Ok(mut node) = Node::new(NodeConfig::default(), module, board, power) else {
        return;
    };
    if node.init().is_err() {
        return;
    }

    let last = node.last_address() as u8;
    let mut now = 0u32;
    for op in data.chunks_exact(10) {
        let addr = op[1];
        let value = u32::from_le_bytes([op[2], op[3], op[4], op[5]]);
        let mask = u32::from_le_bytes([op[6], op[7], op[8], op[9]]);

        match op[0] % 5 {
            0 => {
                let before: Vec<_> = (0..last)
                    .map(|a| node.read_register(RequestSource::Internal, a))
                    .collect();
                let result = node.write_register(RequestSource::External, addr, value, mask);
                if matches!(result, Err(NodeError::AccessViolation | NodeError::InvalidAddress)) {
                    let after: Vec<_> = (0..last)
                        .map(|a| node.read_register(RequestSource::Internal, a))
                        .collect();
                    assert_eq!(before, after, "rejected write changed the store");
                }
            }
            1 => {
                let _ = node.read_register(RequestSource::External, addr);
            }
            2 => {
                let len = (op[2] % 24) as usize;
                let _ = node.write_byte_array(RequestSource::External, addr, &op[..len.min(op.len())]);
            }
            3 => {
                let mut out = [0u8; 16];
                let len = (op[2] % 17) as usize;
                let _ = node.read_byte_array(RequestSource::External, addr, &mut out[..len]);
            }
            _ => {
                now = now.saturating_add(u32::from(op[2]));
                let _ = node.process(now);
            }
        }

        for domain in PowerDomain::ALL {
            assert_eq!(node.power().state(domain), DomainState::Off, "{domain:?} leaked");
        }
        if node.board().system().resets() > 0 {
            return;
        }
    }
});
