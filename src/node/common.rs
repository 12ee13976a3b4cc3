//! Common register range, identical on every module variant.
//!
//! | Addr | Register      | Access | Fields                                        |
//! |------|---------------|--------|-----------------------------------------------|
//! | 0x00 | NODE_ID       | RO     | node address (0-7), board id (8-15)           |
//! | 0x01 | HW_VERSION    | RO     | major (0-7), minor (8-15)                     |
//! | 0x02 | SW_VERSION    | RO     | major (0-7), minor (8-15), patch (16-23)      |
//! | 0x03 | FLAGS_0       | RO     | current indicator fitted (bit 0)              |
//! | 0x04 | ERROR_STACK   | RO     | next recorded error code (0-15)               |
//! | 0x05 | CONTROL_0     | RW     | RTRG (bit 0), MTRG (bit 1), BFC (bit 2)       |
//! | 0x06 | STATUS_0      | RO     | BF (bit 0), ESF (bit 1)                       |
//! | 0x07 | ANALOG_DATA_0 | RO     | VMCU mV (0-15), TMCU °C (16-23)               |

use log::{debug, info};

use super::context::NodeContext;
use super::field::{self, FieldWrite};
use super::nvm;
use super::store::RegisterSpec;
use crate::error::{ErrorCollector, Result};
use crate::modules::ModuleAdapter;
use crate::ports::AnalogChannel;
use crate::power::{DelayMode, PowerDomain, RequesterId};

pub const NODE_ID: u8 = 0x00;
pub const HW_VERSION: u8 = 0x01;
pub const SW_VERSION: u8 = 0x02;
pub const FLAGS_0: u8 = 0x03;
pub const ERROR_STACK: u8 = 0x04;
pub const CONTROL_0: u8 = 0x05;
pub const STATUS_0: u8 = 0x06;
pub const ANALOG_DATA_0: u8 = 0x07;
/// First variant address.
pub const LAST: u8 = 0x08;

pub const NODE_ID_MASK_NODE_ADDR: u32 = 0x0000_00FF;
pub const NODE_ID_MASK_BOARD_ID: u32 = 0x0000_FF00;
pub const HW_VERSION_MASK_MAJOR: u32 = 0x0000_00FF;
pub const HW_VERSION_MASK_MINOR: u32 = 0x0000_FF00;
pub const SW_VERSION_MASK_MAJOR: u32 = 0x0000_00FF;
pub const SW_VERSION_MASK_MINOR: u32 = 0x0000_FF00;
pub const SW_VERSION_MASK_PATCH: u32 = 0x00FF_0000;
pub const FLAGS_0_MASK_IOUT_INDICATOR: u32 = 0x0000_0001;
pub const ERROR_STACK_MASK_ERROR: u32 = 0x0000_FFFF;
pub const CONTROL_0_MASK_RTRG: u32 = 0x0000_0001;
pub const CONTROL_0_MASK_MTRG: u32 = 0x0000_0002;
pub const CONTROL_0_MASK_BFC: u32 = 0x0000_0004;
pub const STATUS_0_MASK_BF: u32 = 0x0000_0001;
pub const STATUS_0_MASK_ESF: u32 = 0x0000_0002;
pub const ANALOG_DATA_0_MASK_VMCU: u32 = 0x0000_FFFF;
pub const ANALOG_DATA_0_MASK_TMCU: u32 = 0x00FF_0000;

pub static REGISTERS: [RegisterSpec; LAST as usize] = [
    RegisterSpec::read_only(0),
    RegisterSpec::read_only(0),
    RegisterSpec::read_only(0),
    RegisterSpec::read_only(0),
    RegisterSpec::read_only(0),
    RegisterSpec::read_write(0),
    RegisterSpec::read_only(0),
    RegisterSpec::read_only((field::DEGREES_ERROR << 16) | field::MV_ERROR),
];

/// Static facts about this node written into the identity registers.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub board_id: u8,
    pub hw_version_major: u8,
    pub hw_version_minor: u8,
    pub iout_indicator_fitted: bool,
}

fn sw_version() -> FieldWrite {
    let part = |s: &str| s.parse::<u32>().unwrap_or(0);
    FieldWrite::new()
        .with(part(env!("CARGO_PKG_VERSION_MAJOR")), SW_VERSION_MASK_MAJOR)
        .with(part(env!("CARGO_PKG_VERSION_MINOR")), SW_VERSION_MASK_MINOR)
        .with(part(env!("CARGO_PKG_VERSION_PATCH")), SW_VERSION_MASK_PATCH)
}

/// Fill the common range.  Returns the node address read from NVM.
///
/// With `factory_address`, that address is first written to NVM.
pub fn init(ctx: &mut NodeContext<'_>, identity: &Identity, factory_address: Option<u8>) -> Result<u8> {
    if let Some(address) = factory_address {
        ctx.board.write_byte(nvm::SELF_ADDRESS, address)?;
        info!("node: factory address 0x{address:02X} written");
    }
    let address = ctx.board.read_byte(nvm::SELF_ADDRESS)?;

    ctx.write_fields(
        NODE_ID,
        FieldWrite::new()
            .with(u32::from(address), NODE_ID_MASK_NODE_ADDR)
            .with(u32::from(identity.board_id), NODE_ID_MASK_BOARD_ID),
    )?;
    ctx.write_fields(
        HW_VERSION,
        FieldWrite::new()
            .with(u32::from(identity.hw_version_major), HW_VERSION_MASK_MAJOR)
            .with(u32::from(identity.hw_version_minor), HW_VERSION_MASK_MINOR),
    )?;
    ctx.write_fields(SW_VERSION, sw_version())?;
    ctx.write_fields(
        FLAGS_0,
        FieldWrite::new().with(
            u32::from(identity.iout_indicator_fitted),
            FLAGS_0_MASK_IOUT_INDICATOR,
        ),
    )?;
    ctx.reset(ANALOG_DATA_0)?;
    ctx.write(STATUS_0, STATUS_0_MASK_BF, STATUS_0_MASK_BF)?;
    Ok(address)
}

/// Refresh a live common register before an external read.
pub fn update_register(ctx: &mut NodeContext<'_>, addr: u8) -> Result<()> {
    if addr == STATUS_0 {
        let esf = u32::from(ctx.has_errors());
        ctx.write_fields(STATUS_0, FieldWrite::new().with(esf, STATUS_0_MASK_ESF))?;
    }
    Ok(())
}

/// Load the oldest recorded error code into `ERROR_STACK` (0 when empty).
pub fn pop_error(ctx: &mut NodeContext<'_>) -> Result<()> {
    let code = ctx.pop_error().map_or(0, |e| u32::from(e.code()));
    ctx.write_fields(ERROR_STACK, FieldWrite::new().with(code, ERROR_STACK_MASK_ERROR))?;
    update_register(ctx, STATUS_0)
}

/// Side effects of an external write to the common range.
pub fn check_register<M: ModuleAdapter + ?Sized>(
    ctx: &mut NodeContext<'_>,
    adapter: &mut M,
    addr: u8,
    mask: u32,
) -> Result<()> {
    if addr != CONTROL_0 {
        return Ok(());
    }
    let control = ctx.read(CONTROL_0)?;

    if mask & CONTROL_0_MASK_BFC != 0 && field::read(control, CONTROL_0_MASK_BFC) != 0 {
        ctx.write(STATUS_0, 0, STATUS_0_MASK_BF)?;
        ctx.write(CONTROL_0, 0, CONTROL_0_MASK_BFC)?;
        debug!("node: boot flag cleared");
    }

    if mask & CONTROL_0_MASK_MTRG != 0 && field::read(control, CONTROL_0_MASK_MTRG) != 0 {
        let mut collector = ErrorCollector::new();
        let result = measure(ctx);
        ctx.record(&mut collector, result);
        let result = adapter.measure(ctx);
        ctx.record(&mut collector, result);
        ctx.write(CONTROL_0, 0, CONTROL_0_MASK_MTRG)?;
        collector.finish()?;
    }
    Ok(())
}

/// MCU supply voltage and die temperature.
pub fn measure(ctx: &mut NodeContext<'_>) -> Result<()> {
    ctx.power
        .enable(RequesterId::Common, PowerDomain::Analog, DelayMode::Active);
    let result = sample(ctx);
    ctx.power.disable(RequesterId::Common, PowerDomain::Analog);
    result
}

fn sample(ctx: &mut NodeContext<'_>) -> Result<()> {
    ctx.reset(ANALOG_DATA_0)?;
    let vmcu_mv = ctx.board.convert(AnalogChannel::VmcuMv)?;
    let tmcu_degrees = ctx.board.convert(AnalogChannel::TmcuDegrees)?;
    ctx.write_fields(
        ANALOG_DATA_0,
        FieldWrite::new()
            .with(field::encode_mv(vmcu_mv), ANALOG_DATA_0_MASK_VMCU)
            .with(field::encode_degrees(tmcu_degrees), ANALOG_DATA_0_MASK_TMCU),
    )
}
