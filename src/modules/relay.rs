//! Low-voltage relay module.
//!
//! A bistable relay switching a load from a common (battery) input.  In BMS
//! mode the module drives the relay itself from the battery voltage, with
//! hysteresis between two NVM-backed thresholds.
//!
//! | Addr | Register        | Access | NVM | Fields                                   |
//! |------|-----------------|--------|-----|------------------------------------------|
//! | 0x08 | FLAGS_1         | RO     |     | RLFH (bit 0), BMSF (bit 1)               |
//! | 0x09 | CONFIGURATION_0 | RW     | yes | VBATT low (0-15), VBATT high (16-31) mV  |
//! | 0x0A | STATUS_1        | RO     |     | RLSTST (0-1)                             |
//! | 0x0B | CONTROL_1       | RW     |     | RLST (bit 0)                             |
//! | 0x0C | ANALOG_DATA_1   | RO     |     | VCOM mV (0-15), VOUT mV (16-31)          |
//! | 0x0D | ANALOG_DATA_2   | RO     |     | IOUT µA (0-23)                           |

use log::{debug, info, warn};

use super::{ModuleAdapter, actuate, known_state, output_bit_state};
use crate::config::BmsConfig;
use crate::error::Result;
use crate::node::NodeContext;
use crate::node::common;
use crate::node::field::{self, BitState, FieldWrite};
use crate::node::store::RegisterSpec;
use crate::ports::{AnalogChannel, LoadPort};
use crate::power::{DelayMode, PowerDomain, RequesterId};
use crate::scheduler::PeriodicTask;

pub const FLAGS_1: u8 = common::LAST;
pub const CONFIGURATION_0: u8 = common::LAST + 1;
pub const STATUS_1: u8 = common::LAST + 2;
pub const CONTROL_1: u8 = common::LAST + 3;
pub const ANALOG_DATA_1: u8 = common::LAST + 4;
pub const ANALOG_DATA_2: u8 = common::LAST + 5;
pub const LAST: u8 = common::LAST + 6;

pub const FLAGS_1_MASK_RLFH: u32 = 0x0000_0001;
pub const FLAGS_1_MASK_BMSF: u32 = 0x0000_0002;
pub const CONFIGURATION_0_MASK_VBATT_LOW: u32 = 0x0000_FFFF;
pub const CONFIGURATION_0_MASK_VBATT_HIGH: u32 = 0xFFFF_0000;
pub const STATUS_1_MASK_RLSTST: u32 = 0x0000_0003;
pub const CONTROL_1_MASK_RLST: u32 = 0x0000_0001;
pub const ANALOG_DATA_1_MASK_VCOM: u32 = 0x0000_FFFF;
pub const ANALOG_DATA_1_MASK_VOUT: u32 = 0xFFFF_0000;
pub const ANALOG_DATA_2_MASK_IOUT: u32 = 0x00FF_FFFF;

static REGISTERS: [RegisterSpec; (LAST - common::LAST) as usize] = [
    RegisterSpec::read_only(0),
    RegisterSpec::read_write(0).nvm(),
    RegisterSpec::read_only(BitState::Error as u32),
    RegisterSpec::read_write(0),
    RegisterSpec::read_only((field::MV_ERROR << 16) | field::MV_ERROR),
    RegisterSpec::read_only(field::UA_ERROR),
];

const BOARD_ID: u8 = 0x01;
const REQUESTER: RequesterId = RequesterId::Lvrm;

struct Bms {
    config: BmsConfig,
    task: PeriodicTask,
}

pub struct RelayModule<L> {
    output: L,
    forced_hardware: bool,
    factory_reset: bool,
    state: BitState,
    bms: Option<Bms>,
}

impl<L: LoadPort> RelayModule<L> {
    pub fn new(output: L, forced_hardware: bool, bms: Option<BmsConfig>) -> Self {
        Self {
            output,
            forced_hardware,
            factory_reset: false,
            state: BitState::Error,
            bms: bms.map(|config| Bms {
                config,
                task: PeriodicTask::new("bms", config.period_secs),
            }),
        }
    }

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

    fn factory_thresholds(&self) -> FieldWrite {
        let config = self.bms.as_ref().map(|b| b.config).unwrap_or_default();
        FieldWrite::new()
            .with(u32::from(config.low_threshold_mv), CONFIGURATION_0_MASK_VBATT_LOW)
            .with(u32::from(config.high_threshold_mv), CONFIGURATION_0_MASK_VBATT_HIGH)
    }

    fn apply(&mut self, ctx: &mut NodeContext<'_>, addr: u8, mask: u32) -> Result<()> {
        let value = ctx.read(addr)?;
        match addr {
            CONFIGURATION_0 if mask != 0 => {
                ctx.persist_if_changed(addr)?;
            }
            CONTROL_1 if mask & CONTROL_1_MASK_RLST != 0 => {
                let requested = field::read(value, CONTROL_1_MASK_RLST) != 0;
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
        ctx.reset(ANALOG_DATA_1)?;
        ctx.reset(ANALOG_DATA_2)?;
        let vcom_mv = ctx.board.convert(AnalogChannel::VcomMv)?;
        let vout_mv = ctx.board.convert(AnalogChannel::VoutMv)?;
        let iout_ua = ctx.board.convert(AnalogChannel::IoutUa)?;
        ctx.write_fields(
            ANALOG_DATA_1,
            FieldWrite::new()
                .with(field::encode_mv(vcom_mv), ANALOG_DATA_1_MASK_VCOM)
                .with(field::encode_mv(vout_mv), ANALOG_DATA_1_MASK_VOUT),
        )?;
        ctx.write_fields(
            ANALOG_DATA_2,
            FieldWrite::new().with(field::encode_ua(iout_ua), ANALOG_DATA_2_MASK_IOUT),
        )
    }

    /// Battery hysteresis: open below the low threshold, close above the
    /// high one, hold in between.
    fn bms_step(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        ctx.power.enable(REQUESTER, PowerDomain::Analog, DelayMode::Active);
        let vbatt = ctx.board.convert(AnalogChannel::VcomMv);
        ctx.power.disable(REQUESTER, PowerDomain::Analog);
        let vbatt_mv = vbatt?;

        let config = ctx.read(CONFIGURATION_0)?;
        let low_mv = field::read(config, CONFIGURATION_0_MASK_VBATT_LOW) as i32;
        let high_mv = field::read(config, CONFIGURATION_0_MASK_VBATT_HIGH) as i32;
        let requested = if vbatt_mv < low_mv {
            false
        } else if vbatt_mv > high_mv {
            true
        } else {
            debug!("bms: {vbatt_mv} mV within [{low_mv}, {high_mv}], holding");
            return Ok(());
        };

        let result = actuate(
            &mut self.output,
            self.forced_hardware,
            known_state(self.state),
            requested,
        );
        if let Ok(true) = result {
            info!("bms: battery at {vbatt_mv} mV, relay {}", if requested { "closed" } else { "opened" });
            ctx.write_fields(
                CONTROL_1,
                FieldWrite::new().with(u32::from(requested), CONTROL_1_MASK_RLST),
            )?;
        }
        let refresh = self.update_register(ctx, STATUS_1);
        result.and(refresh)
    }
}

impl<L: LoadPort> ModuleAdapter for RelayModule<L> {
    fn name(&self) -> &'static str {
        "relay"
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
        if let Some(bms) = self.bms.as_mut() {
            bms.task.reset();
        }
        if self.factory_reset {
            ctx.write_fields(CONFIGURATION_0, self.factory_thresholds())?;
            ctx.persist_if_changed(CONFIGURATION_0)?;
        }
        ctx.write_fields(
            FLAGS_1,
            FieldWrite::new()
                .with(u32::from(self.forced_hardware), FLAGS_1_MASK_RLFH)
                .with(u32::from(self.bms.is_some()), FLAGS_1_MASK_BMSF),
        )?;
        ctx.load_from_nvm(CONFIGURATION_0)?;
        ctx.reset(ANALOG_DATA_1)?;
        ctx.reset(ANALOG_DATA_2)?;
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
            FieldWrite::new().with(state as u32, STATUS_1_MASK_RLSTST),
        )?;
        result
    }

    fn check_register(&mut self, ctx: &mut NodeContext<'_>, addr: u8, mask: u32) -> Result<()> {
        let result = self.apply(ctx, addr, mask);
        ctx.power.disable(REQUESTER, PowerDomain::Analog);
        let refresh = self.update_register(ctx, STATUS_1);
        if let Err(e) = result {
            info!("relay: write to 0x{addr:02X} rejected: {e}");
        }
        result.and(refresh)
    }

    fn measure(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        ctx.power.enable(REQUESTER, PowerDomain::Analog, DelayMode::Active);
        let result = Self::sample(ctx);
        ctx.power.disable(REQUESTER, PowerDomain::Analog);
        result
    }

    fn process(&mut self, ctx: &mut NodeContext<'_>, now_secs: u32) -> Result<()> {
        let due = match self.bms.as_mut() {
            Some(bms) => bms.task.poll(now_secs),
            None => return Ok(()),
        };
        if !due {
            return Ok(());
        }
        if self.forced_hardware {
            warn!("bms: relay is forced by hardware, skipping");
            return Ok(());
        }
        self.bms_step(ctx)
    }
}
