//! Output-current indicator.
//!
//! Housekeeping task: samples the input voltage and output current on a
//! slow period, and blinks the RGB LED with a color picked from the current
//! on a faster one.  Nothing is shown while the board runs without input
//! power.

use log::debug;

use super::context::NodeContext;
use crate::config::IndicatorConfig;
use crate::drivers::led::LedColor;
use crate::error::Result;
use crate::power::{DelayMode, PowerDomain, RequesterId};
use crate::scheduler::PeriodicTask;

/// Lower bound (µA) of each color bucket, ascending.
pub const COLOR_TABLE: [(i32, LedColor); 7] = [
    (0, LedColor::Green),
    (50_000, LedColor::Yellow),
    (500_000, LedColor::Red),
    (1_000_000, LedColor::Magenta),
    (2_000_000, LedColor::Blue),
    (3_000_000, LedColor::Cyan),
    (4_000_000, LedColor::White),
];

/// Color of the highest bucket whose threshold does not exceed `iout_ua`.
/// Bucket 0 is the catch-all, including for negative readings.
pub fn color_for(iout_ua: i32) -> LedColor {
    COLOR_TABLE
        .iter()
        .rev()
        .find(|(threshold, _)| iout_ua >= *threshold)
        .map_or(COLOR_TABLE[0].1, |(_, color)| *color)
}

pub struct IoutIndicator {
    config: IndicatorConfig,
    measurement: PeriodicTask,
    blink: PeriodicTask,
    input_voltage_mv: i32,
    iout_ua: i32,
}

impl IoutIndicator {
    pub fn new(config: IndicatorConfig) -> Self {
        Self {
            measurement: PeriodicTask::new("iout measurement", config.measurement_period_secs),
            blink: PeriodicTask::new("iout indicator", config.indicator_period_secs),
            config,
            input_voltage_mv: 0,
            iout_ua: 0,
        }
    }

    /// Forget previous samples; both tasks become due.
    pub fn reset(&mut self) {
        self.measurement.reset();
        self.blink.reset();
        self.input_voltage_mv = 0;
        self.iout_ua = 0;
    }

    fn powered(&self) -> bool {
        self.input_voltage_mv > self.config.power_threshold_mv
    }

    pub fn process(&mut self, ctx: &mut NodeContext<'_>, now_secs: u32) -> Result<()> {
        if self.measurement.poll(now_secs) {
            ctx.power
                .enable(RequesterId::Node, PowerDomain::Analog, DelayMode::Active);
            let result = self.sample(ctx);
            ctx.power.disable(RequesterId::Node, PowerDomain::Analog);
            result?;
        }
        if self.blink.poll(now_secs) && self.powered() {
            let color = color_for(self.iout_ua);
            debug!("indicator: {} uA -> {:?}", self.iout_ua, color);
            ctx.board
                .start_single_blink(self.config.blink_duration_ms, color)?;
        }
        Ok(())
    }

    fn sample(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        // A failed conversion counts as unpowered until the next good sample.
        let vin = ctx.board.convert(self.config.input_channel);
        self.input_voltage_mv = vin.unwrap_or(0);
        vin?;
        if self.powered() {
            self.iout_ua = ctx.board.convert(self.config.current_channel)?;
        }
        Ok(())
    }

    pub fn input_voltage_mv(&self) -> i32 {
        self.input_voltage_mv
    }

    pub fn iout_ua(&self) -> i32 {
        self.iout_ua
    }
}
