//! DC-DC load-control module.
//!
//! One software-switched DC-DC converter feeding a load, with input/output
//! voltage and output current sensing on the analog front end.
//!
//! | Addr | Register        | Access | NVM | Fields                          |
//! |------|-----------------|--------|-----|---------------------------------|
//! | 0x08 | FLAGS_1         | RO     |     | DDFH (bit 0)                    |
//! | 0x09 | CONFIGURATION_0 | RW     | yes | IOUT offset (0-15)              |
//! | 0x0A | STATUS_1        | RO     |     | DDENST (0-1)                    |
//! | 0x0B | CONTROL_1       | RW     |     | DDEN (bit 0)                    |
//! | 0x0C | ANALOG_DATA_1   | RO     |     | VIN mV (0-15), VOUT mV (16-31)  |
//! | 0x0D | ANALOG_DATA_2   | RO     |     | IOUT µA (0-23)                  |

use log::{debug, info};

use super::{ModuleAdapter, actuate, known_state, output_bit_state};
use crate::error::Result;
use crate::node::NodeContext;
use crate::node::common;
use crate::node::field::{self, BitState, FieldWrite};
use crate::node::store::RegisterSpec;
use crate::ports::{AnalogChannel, LoadPort};
use crate::power::{DelayMode, PowerDomain, RequesterId};

pub const FLAGS_1: u8 = common::LAST;
pub const CONFIGURATION_0: u8 = common::LAST + 1;
pub const STATUS_1: u8 = common::LAST + 2;
pub const CONTROL_1: u8 = common::LAST + 3;
pub const ANALOG_DATA_1: u8 = common::LAST + 4;
pub const ANALOG_DATA_2: u8 = common::LAST + 5;
/// One past the last load-control register.
pub const LAST: u8 = common::LAST + 6;

pub const FLAGS_1_MASK_DDFH: u32 = 0x0000_0001;
pub const CONFIGURATION_0_MASK_IOUT_OFFSET: u32 = 0x0000_FFFF;
pub const STATUS_1_MASK_DDENST: u32 = 0x0000_0003;
pub const CONTROL_1_MASK_DDEN: u32 = 0x0000_0001;
pub const ANALOG_DATA_1_MASK_VIN: u32 = 0x0000_FFFF;
pub const ANALOG_DATA_1_MASK_VOUT: u32 = 0xFFFF_0000;
pub const ANALOG_DATA_2_MASK_IOUT: u32 = 0x00FF_FFFF;

/// The current-sense amplifier is not valid below this output voltage.
pub const IOUT_MEASUREMENT_VOUT_MIN_MV: i32 = 4500;

static REGISTERS: [RegisterSpec; (LAST - common::LAST) as usize] = [
    RegisterSpec::read_only(0),
    RegisterSpec::read_write(0).nvm(),
    RegisterSpec::read_only(BitState::Error as u32),
    RegisterSpec::read_write(0),
    RegisterSpec::read_only((field::MV_ERROR << 16) | field::MV_ERROR),
    RegisterSpec::read_only(field::UA_ERROR),
];

const BOARD_ID: u8 = 0x0B;
const REQUESTER: RequesterId = RequesterId::Ddrm;

pub struct LoadControlModule<L> {
    output: L,
    /// DC-DC enable is wired in hardware, not driven by the MCU.
    forced_hardware: bool,
    factory_reset: bool,
    /// Last observed DDENST.
    state: BitState,
}

impl<L: LoadPort> LoadControlModule<L> {
    pub fn new(output: L, forced_hardware: bool) -> Self {
        Self {
            output,
            forced_hardware,
            factory_reset: false,
            state: BitState::Error,
        }
    }

    /// Overwrite the NVM configuration with factory values on init.
    pub fn with_factory_reset(mut self, factory_reset: bool) -> Self {
        self.factory_reset = factory_reset;
        self
    }

    pub fn output(&self) -> &L {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut L {
        &mut self.output
    }

    fn reset_analog_data(ctx: &mut NodeContext<'_>) -> Result<()> {
        ctx.reset(ANALOG_DATA_1)?;
        ctx.reset(ANALOG_DATA_2)
    }

    fn apply(&mut self, ctx: &mut NodeContext<'_>, addr: u8, mask: u32) -> Result<()> {
        let value = ctx.read(addr)?;
        match addr {
            CONFIGURATION_0 if mask != 0 => {
                ctx.persist_if_changed(addr)?;
            }
            CONTROL_1 if mask & CONTROL_1_MASK_DDEN != 0 => {
                ctx.power.enable(REQUESTER, PowerDomain::Analog, DelayMode::Active);
                let requested = field::read(value, CONTROL_1_MASK_DDEN) != 0;
                actuate(
                    &mut self.output,
                    self.forced_hardware,
                    known_state(self.state),
                    requested,
                )?;
            }
            _ => {}
        }
        Ok(())
    }

    fn sample(ctx: &mut NodeContext<'_>) -> Result<()> {
        Self::reset_analog_data(ctx)?;
        let vin_mv = ctx.board.convert(AnalogChannel::VinMv)?;
        let vout_mv = ctx.board.convert(AnalogChannel::VoutMv)?;
        let iout_ua = if vout_mv >= IOUT_MEASUREMENT_VOUT_MIN_MV {
            Some(ctx.board.convert(AnalogChannel::IoutUa)?)
        } else {
            debug!("load: VOUT {vout_mv} mV below sensing threshold, IOUT not sampled");
            None
        };
        ctx.write_fields(
            ANALOG_DATA_1,
            FieldWrite::new()
                .with(field::encode_mv(vin_mv), ANALOG_DATA_1_MASK_VIN)
                .with(field::encode_mv(vout_mv), ANALOG_DATA_1_MASK_VOUT),
        )?;
        if let Some(iout_ua) = iout_ua {
            ctx.write_fields(
                ANALOG_DATA_2,
                FieldWrite::new().with(field::encode_ua(iout_ua), ANALOG_DATA_2_MASK_IOUT),
            )?;
        }
        Ok(())
    }
}

impl<L: LoadPort> ModuleAdapter for LoadControlModule<L> {
    fn name(&self) -> &'static str {
        "load-control"
    }

    fn board_id(&self) -> u8 {
        BOARD_ID
    }

    fn requester(&self) -> RequesterId {
        REQUESTER
    }

    fn register_table(&self) -> &'static [RegisterSpec] {
        &REGISTERS
    }

    fn init_registers(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.state = BitState::Error;
        if self.factory_reset {
            ctx.write_fields(
                CONFIGURATION_0,
                FieldWrite::new().with(0, CONFIGURATION_0_MASK_IOUT_OFFSET),
            )?;
            ctx.persist_if_changed(CONFIGURATION_0)?;
        }
        ctx.write_fields(
            FLAGS_1,
            FieldWrite::new().with(u32::from(self.forced_hardware), FLAGS_1_MASK_DDFH),
        )?;
        ctx.load_from_nvm(CONFIGURATION_0)?;
        Self::reset_analog_data(ctx)?;
        self.update_register(ctx, STATUS_1)
    }

    fn update_register(&mut self, ctx: &mut NodeContext<'_>, addr: u8) -> Result<()> {
        if addr != STATUS_1 {
            return Ok(());
        }
        let (state, result) = output_bit_state(&mut self.output, self.forced_hardware);
        self.state = state;
        ctx.write_fields(
            STATUS_1,
            FieldWrite::new().with(state as u32, STATUS_1_MASK_DDENST),
        )?;
        result
    }

    fn check_register(&mut self, ctx: &mut NodeContext<'_>, addr: u8, mask: u32) -> Result<()> {
        let result = self.apply(ctx, addr, mask);
        // Runs on every path, including errors from `apply`.
        ctx.power.disable(REQUESTER, PowerDomain::Analog);
        let refresh = self.update_register(ctx, STATUS_1);
        if let Err(e) = result {
            info!("load: write to 0x{addr:02X} rejected: {e}");
        }
        result.and(refresh)
    }

    fn measure(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        ctx.power.enable(REQUESTER, PowerDomain::Analog, DelayMode::Active);
        let result = Self::sample(ctx);
        ctx.power.disable(REQUESTER, PowerDomain::Analog);
        result
    }
}
