//! Module adapters: one per hardware variant.
//!
//! | Variant         | Adapter              | Requester | Actuator       |
//! |-----------------|----------------------|-----------|----------------|
//! | DC-DC load      | `LoadControlModule`  | `Ddrm`    | DC-DC enable   |
//! | Low-voltage relay | `RelayModule`      | `Lvrm`    | relay coil     |
//!
//! The variant is chosen once at startup from [`ModuleConfig`]; shared
//! code only ever sees `dyn ModuleAdapter`.  Adapter register addresses are
//! absolute and start at [`common::LAST`](crate::node::common::LAST).

pub mod load_control;
pub mod relay;

pub use load_control::LoadControlModule;
pub use relay::RelayModule;

use log::{info, warn};

use crate::config::ModuleConfig;
use crate::error::{NodeError, Result};
use crate::node::NodeContext;
use crate::node::field::BitState;
use crate::node::store::RegisterSpec;
use crate::ports::LoadPort;
use crate::power::RequesterId;

/// Contract every hardware variant implements.
pub trait ModuleAdapter {
    fn name(&self) -> &'static str;

    /// Board identifier reported in `NODE_ID`.
    fn board_id(&self) -> u8;

    /// Tag used when this module holds a power domain.
    fn requester(&self) -> RequesterId;

    /// Specs of the variant range, starting at the first variant address.
    fn register_table(&self) -> &'static [RegisterSpec];

    /// Seed flags, load NVM configuration, reset volatile registers to
    /// their sentinels and refresh status once.
    fn init_registers(&mut self, ctx: &mut NodeContext<'_>) -> Result<()>;

    /// Refresh a live register before an external read.  No-op for other
    /// addresses.  Always leaves the store in a defined state.
    fn update_register(&mut self, ctx: &mut NodeContext<'_>, addr: u8) -> Result<()>;

    /// Side effects of an external write, run after the bits are committed.
    fn check_register(&mut self, ctx: &mut NodeContext<'_>, addr: u8, mask: u32) -> Result<()>;

    /// Measurement hook run on `MTRG`.
    fn measure(&mut self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Periodic work from the main loop.
    fn process(&mut self, _ctx: &mut NodeContext<'_>, _now_secs: u32) -> Result<()> {
        Ok(())
    }

    /// `true` while the module needs the main loop to stay awake.
    fn is_active(&self) -> bool {
        false
    }
}

impl<T: ModuleAdapter + ?Sized> ModuleAdapter for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn board_id(&self) -> u8 {
        (**self).board_id()
    }

    fn requester(&self) -> RequesterId {
        (**self).requester()
    }

    fn register_table(&self) -> &'static [RegisterSpec] {
        (**self).register_table()
    }

    fn init_registers(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        (**self).init_registers(ctx)
    }

    fn update_register(&mut self, ctx: &mut NodeContext<'_>, addr: u8) -> Result<()> {
        (**self).update_register(ctx, addr)
    }

    fn check_register(&mut self, ctx: &mut NodeContext<'_>, addr: u8, mask: u32) -> Result<()> {
        (**self).check_register(ctx, addr, mask)
    }

    fn measure(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        (**self).measure(ctx)
    }

    fn process(&mut self, ctx: &mut NodeContext<'_>, now_secs: u32) -> Result<()> {
        (**self).process(ctx, now_secs)
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}

/// Build the adapter named by `config` around the board's output driver.
pub fn select<L: LoadPort + 'static>(
    config: &ModuleConfig,
    factory_reset: bool,
    output: L,
) -> Box<dyn ModuleAdapter> {
    let module: Box<dyn ModuleAdapter> = match config {
        ModuleConfig::LoadControl { forced_hardware } => Box::new(
            LoadControlModule::new(output, *forced_hardware).with_factory_reset(factory_reset),
        ),
        ModuleConfig::Relay {
            forced_hardware,
            bms,
        } => Box::new(
            RelayModule::new(output, *forced_hardware, *bms).with_factory_reset(factory_reset),
        ),
    };
    info!("module: {} selected", module.name());
    module
}

// ───────────────────────────────────────────────────────────────
// Shared actuation policy
// ───────────────────────────────────────────────────────────────

/// Drive `output` to `requested` unless the pin is hardware-forced.
///
/// Returns `true` if the actuator was called.  The actuator is only called
/// when the requested state differs from `current`.
pub(crate) fn actuate<L: LoadPort + ?Sized>(
    output: &mut L,
    forced_hardware: bool,
    current: Option<bool>,
    requested: bool,
) -> Result<bool> {
    if forced_hardware {
        return Err(NodeError::ForcedHardwareConflict);
    }
    if current == Some(requested) {
        return Ok(false);
    }
    output.set_output_state(requested)?;
    info!("output switched {}", if requested { "on" } else { "off" });
    Ok(true)
}

/// Read the output back as its two-bit representation.
///
/// A readback failure yields [`BitState::Error`] together with the error,
/// so the caller can store a defined value before reporting it.
pub(crate) fn output_bit_state<L: LoadPort + ?Sized>(
    output: &mut L,
    forced_hardware: bool,
) -> (BitState, Result<()>) {
    if forced_hardware {
        return (BitState::ForcedHardware, Ok(()));
    }
    match output.output_state() {
        Ok(on) => (BitState::from_bool(on), Ok(())),
        Err(e) => {
            warn!("output readback failed: {e}");
            (BitState::Error, Err(e.into()))
        }
    }
}

/// Last known software state, if any.
pub(crate) fn known_state(state: BitState) -> Option<bool> {
    match state {
        BitState::Zero => Some(false),
        BitState::One => Some(true),
        BitState::ForcedHardware | BitState::Error => None,
    }
}
