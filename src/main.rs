//! RegNode host simulation runner.
//!
//! Runs the cooperative main loop of one node against simulated
//! peripherals, on virtual time, and plays a short bus script against it.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  SimAnalog  MemoryNvm  LedController  SimSystem   (BoardAdapter)│
//! │  GpioRails<SimPin>  HalDelay<SimClock>            (PowerArbiter)│
//! │                                                               │
//! │  ─────────────── Port Trait Boundary ───────────────          │
//! │                                                               │
//! │     Node ── common registers ── ModuleAdapter (variant)       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `regnode-sim [config.json] [seconds]`

use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, error, info, warn};

use regnode::adapters::board::BoardAdapter;
use regnode::adapters::hardware::{GpioRails, HalDelay};
use regnode::adapters::log_sink;
use regnode::adapters::nvm::MemoryNvm;
use regnode::adapters::sim::{SimAnalog, SimClock, SimPin, SimPwm, SimSystem, SimTimer};
use regnode::config::NodeConfig;
use regnode::drivers::led::{BlinkCells, DimmingHandler, DimmingTimer, LedController};
use regnode::drivers::load::LoadOutput;
use regnode::isr::IsrCounter;
use regnode::modules::{self, load_control};
use regnode::node::{Node, RequestSource, common};
use regnode::ports::AnalogChannel;
use regnode::power::{PowerArbiter, PowerDomain};

/// Shared between the dimming "ISR" and the LED controller.
static BLINK: BlinkCells = BlinkCells::new();
/// Uptime seconds, advanced by the tick "ISR".
static UPTIME: IsrCounter = IsrCounter::new();

const DEFAULT_SECONDS: u32 = 120;

fn load_config(path: Option<&str>) -> Result<NodeConfig> {
    let Some(path) = path else {
        info!("No config file, using defaults");
        return Ok(NodeConfig::default());
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {path}"))?;
    NodeConfig::from_json(&bytes).map_err(|e| anyhow!("config {path}: {e}"))
}

fn main() -> Result<()> {
    log_sink::init(LevelFilter::Info).map_err(|e| anyhow!("logger: {e}"))?;

    let args: Vec<String> = std::env::args().collect();
    let config = load_config(args.get(1).map(String::as_str))?;
    let seconds = match args.get(2) {
        Some(s) => s.parse::<u32>().with_context(|| format!("bad duration {s:?}"))?,
        None => DEFAULT_SECONDS,
    };
    info!("RegNode sim v{}", env!("CARGO_PKG_VERSION"));

    // ── Board ─────────────────────────────────────────────────
    let mut analog = SimAnalog::new();
    analog.set(AnalogChannel::VmcuMv, 3300);
    analog.set(AnalogChannel::TmcuDegrees, 24);
    analog.set(AnalogChannel::VinMv, 12_000);
    analog.set(AnalogChannel::VoutMv, 5_000);
    analog.set(AnalogChannel::IoutUa, 120_000);
    analog.set(AnalogChannel::VcomMv, 12_600);

    let board = BoardAdapter::new(
        MemoryNvm::<1024>::new(),
        analog,
        LedController::new(&BLINK, SimTimer::default()),
        SimSystem::default(),
    );
    let rails = GpioRails::new().with_rail(PowerDomain::Analog, SimPin::default());
    let power = PowerArbiter::new(rails, HalDelay::new(SimClock::default()));
    let adapter = modules::select(&config.module, config.factory_reset, LoadOutput::new(SimPin::default()));

    let mut node = Node::new(config, adapter, board, power).map_err(|e| anyhow!("node: {e}"))?;
    node.init().map_err(|e| anyhow!("init: {e}"))?;

    let mut dimming = DimmingHandler::new(&BLINK, SimPwm::default(), SimPwm::default(), SimPwm::default());

    // ── Main loop ─────────────────────────────────────────────
    let mut resets = 0;
    for _ in 0..seconds {
        UPTIME.increment();
        let now = UPTIME.get();

        run_dimming(&mut node, &mut dimming);
        bus_script(&mut node, now);

        if let Err(e) = node.process(now) {
            warn!("process at {now}s: {e}");
        }
        let seen = node.board().system().resets();
        if seen != resets {
            resets = seen;
            node.init().map_err(|e| anyhow!("re-init: {e}"))?;
        }
    }

    info!(
        "Done after {seconds}s: state {:?}, {} errors pending, {} NVM writes",
        node.state(),
        node.errors().len(),
        node.board().nvm().writes()
    );
    Ok(())
}

type SimNode = Node<
    Box<dyn modules::ModuleAdapter>,
    BoardAdapter<MemoryNvm<1024>, SimAnalog, LedController<'static, SimTimer>, SimSystem>,
    PowerArbiter<GpioRails<SimPin>, HalDelay<SimClock>>,
>;

/// Stand-in for the dimming timer interrupt: one second worth of ticks.
fn run_dimming(node: &mut SimNode, dimming: &mut DimmingHandler<'static, SimPwm, SimPwm, SimPwm>) {
    let Some(period) = node.board().led().timer().period_ms() else {
        return;
    };
    for _ in 0..(1000 / period.max(1)) {
        match dimming.on_timer_tick() {
            Ok(false) => {}
            Ok(true) => {
                let _ = node.board_mut().led_mut().timer_mut().stop();
                return;
            }
            Err(e) => {
                error!("dimming: {e}");
                return;
            }
        }
    }
}

/// Bus master traffic replayed at fixed uptimes.
fn bus_script(node: &mut SimNode, now: u32) {
    let ext = RequestSource::External;
    let result = match now {
        5 => node.write_register(
            ext,
            load_control::CONTROL_1,
            load_control::CONTROL_1_MASK_DDEN,
            load_control::CONTROL_1_MASK_DDEN,
        ),
        6 => node.write_register(
            ext,
            common::CONTROL_0,
            common::CONTROL_0_MASK_MTRG,
            common::CONTROL_0_MASK_MTRG,
        ),
        7 => (common::NODE_ID..node.last_address() as u8).try_for_each(|addr| {
            node.read_register(ext, addr)
                .map(|value| info!("bus: [0x{addr:02X}] = 0x{value:08X}"))
        }),
        8 => node.write_register(ext, load_control::CONFIGURATION_0, 0x0010, 0xFFFF),
        9 => node.write_register(ext, common::STATUS_0, 0, u32::MAX),
        _ => Ok(()),
    };
    if let Err(e) = result {
        warn!("bus at {now}s: {e} (code 0x{:04X})", e.code());
    }
}
