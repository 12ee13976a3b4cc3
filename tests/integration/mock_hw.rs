//! Mock hardware for integration tests.
//!
//! The output and LED mocks record every call so tests can assert on the
//! full command history.  NVM, the analog front end, rails and delays use
//! the crate's own simulation adapters.

use regnode::adapters::board::BoardAdapter;
use regnode::adapters::hardware::{GpioRails, HalDelay};
use regnode::adapters::nvm::MemoryNvm;
use regnode::adapters::sim::{SimAnalog, SimClock, SimPin, SimSystem};
use regnode::config::{BmsConfig, ModuleConfig, NodeConfig};
use regnode::drivers::led::LedColor;
use regnode::modules::{LoadControlModule, RelayModule};
use regnode::node::Node;
use regnode::ports::{AnalogChannel, IndicatorLed, LedError, LoadError, LoadPort};
use regnode::power::{PowerArbiter, PowerDomain};

// ── Output driver ─────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockLoad {
    pub on: bool,
    /// Every `set_output_state` argument, in order.
    pub calls: Vec<bool>,
    pub fail_write: bool,
    pub fail_readback: bool,
}

impl LoadPort for MockLoad {
    fn set_output_state(&mut self, on: bool) -> Result<(), LoadError> {
        self.calls.push(on);
        if self.fail_write {
            return Err(LoadError::GpioWriteFailed);
        }
        self.on = on;
        Ok(())
    }

    fn output_state(&mut self) -> Result<bool, LoadError> {
        if self.fail_readback {
            return Err(LoadError::StateUnknown);
        }
        Ok(self.on)
    }
}

// ── Indicator LED ─────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockLed {
    pub blinks: Vec<(u32, LedColor)>,
    pub stops: u32,
    pub active: bool,
}

impl IndicatorLed for MockLed {
    fn start_single_blink(&mut self, duration_ms: u32, color: LedColor) -> Result<(), LedError> {
        if duration_ms == 0 {
            return Err(LedError::NullDuration);
        }
        self.blinks.push((duration_ms, color));
        self.active = true;
        Ok(())
    }

    fn stop_blink(&mut self) -> Result<(), LedError> {
        self.stops += 1;
        self.active = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

// ── Node assembly ─────────────────────────────────────────────

pub type MockBoard = BoardAdapter<MemoryNvm<1024>, SimAnalog, MockLed, SimSystem>;
pub type MockPower = PowerArbiter<GpioRails<SimPin>, HalDelay<SimClock>>;
pub type LoadNode = Node<LoadControlModule<MockLoad>, MockBoard, MockPower>;
pub type RelayNode = Node<RelayModule<MockLoad>, MockBoard, MockPower>;

pub const VMCU_MV: i32 = 3300;
pub const TMCU_DEGREES: i32 = 25;
pub const VIN_MV: i32 = 12_000;
pub const VOUT_MV: i32 = 5_000;
pub const IOUT_UA: i32 = 120_000;
pub const VCOM_MV: i32 = 12_600;

/// Board with a blank NVM and plausible readings on every channel.
pub fn make_board() -> MockBoard {
    let mut analog = SimAnalog::new();
    analog.set(AnalogChannel::VmcuMv, VMCU_MV);
    analog.set(AnalogChannel::TmcuDegrees, TMCU_DEGREES);
    analog.set(AnalogChannel::VinMv, VIN_MV);
    analog.set(AnalogChannel::VoutMv, VOUT_MV);
    analog.set(AnalogChannel::IoutUa, IOUT_UA);
    analog.set(AnalogChannel::VcomMv, VCOM_MV);
    BoardAdapter::new(
        MemoryNvm::new(),
        analog,
        MockLed::default(),
        SimSystem::default(),
    )
}

/// Arbiter with only the analog rail fitted.
pub fn make_power() -> MockPower {
    let rails = GpioRails::new().with_rail(PowerDomain::Analog, SimPin::default());
    PowerArbiter::new(rails, HalDelay::new(SimClock::default()))
}

pub fn load_config(forced_hardware: bool) -> NodeConfig {
    NodeConfig {
        module: ModuleConfig::LoadControl { forced_hardware },
        ..NodeConfig::default()
    }
}

/// Load-control node on `board`, initialised.
pub fn make_load_node_on(config: NodeConfig, board: MockBoard) -> LoadNode {
    let forced = matches!(
        config.module,
        ModuleConfig::LoadControl {
            forced_hardware: true
        }
    );
    let module =
        LoadControlModule::new(MockLoad::default(), forced).with_factory_reset(config.factory_reset);
    let mut node = Node::new(config, module, board, make_power()).expect("layout");
    node.init().expect("init");
    node
}

pub fn make_load_node(forced_hardware: bool) -> LoadNode {
    make_load_node_on(load_config(forced_hardware), make_board())
}

/// Relay node without the current indicator, so only the relay touches
/// the analog front end.
pub fn make_relay_node(forced_hardware: bool, bms: Option<BmsConfig>) -> RelayNode {
    let config = NodeConfig {
        module: ModuleConfig::Relay {
            forced_hardware,
            bms,
        },
        factory_reset: true,
        iout_indicator: None,
        ..NodeConfig::default()
    };
    let module = RelayModule::new(MockLoad::default(), forced_hardware, bms)
        .with_factory_reset(config.factory_reset);
    let mut node = Node::new(config, module, make_board(), make_power()).expect("layout");
    node.init().expect("init");
    node
}
