//! RGB status LED, single-blink driver.
//!
//! A blink is a fade-in / fade-out walk over a perceptual dimming table,
//! one step per dimming-timer tick.  The driver is split in two halves that
//! share only [`BlinkCells`]:
//!
//! ```text
//!  main loop                         dimming timer ISR
//!  ┌───────────────┐  color, restart ┌────────────────┐
//!  │ LedController │────────────────▶│ DimmingHandler │──▶ R/G/B PWM
//!  │ (IndicatorLed)│◀────────────────│                │
//!  └───────────────┘      done       └────────────────┘
//! ```
//!
//! The controller writes `color` and raises `restart` only while the timer
//! is stopped or about to be restarted; the handler is the only writer of
//! `done` once a blink is running.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use crate::isr::IsrFlag;
use crate::ports::{IndicatorLed, LedError};

/// Bit 0 red, bit 1 green, bit 2 blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedColor {
    Off = 0b000,
    Red = 0b001,
    Green = 0b010,
    Yellow = 0b011,
    Blue = 0b100,
    Magenta = 0b101,
    Cyan = 0b110,
    White = 0b111,
}

impl LedColor {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b001 => Self::Red,
            0b010 => Self::Green,
            0b011 => Self::Yellow,
            0b100 => Self::Blue,
            0b101 => Self::Magenta,
            0b110 => Self::Cyan,
            0b111 => Self::White,
            _ => Self::Off,
        }
    }

    pub const fn red(self) -> bool {
        self as u8 & 0b001 != 0
    }

    pub const fn green(self) -> bool {
        self as u8 & 0b010 != 0
    }

    pub const fn blue(self) -> bool {
        self as u8 & 0b100 != 0
    }
}

pub const DIMMING_LUT_SIZE: usize = 100;

/// Duty cycle (%) per dimming step, roughly perceptually linear.
pub const DIMMING_LUT: [u8; DIMMING_LUT_SIZE] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 1, //
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, //
    2, 2, 2, 2, 2, 2, 2, 3, 3, 3, //
    3, 3, 3, 4, 4, 4, 4, 5, 5, 5, //
    5, 6, 6, 6, 7, 7, 8, 8, 8, 9, //
    9, 10, 10, 11, 11, 12, 13, 13, 14, 15, //
    15, 16, 17, 18, 19, 20, 21, 22, 23, 24, //
    25, 26, 28, 29, 30, 32, 34, 35, 37, 39, //
    41, 43, 45, 47, 49, 52, 54, 57, 59, 62, //
    65, 69, 72, 75, 79, 83, 87, 91, 95, 100,
];

/// Dimming timer period for a blink of `duration_ms` (up and down the
/// table).  Never zero.
pub const fn dimming_period_ms(duration_ms: u32) -> u32 {
    let period = duration_ms / (2 * DIMMING_LUT_SIZE as u32);
    if period == 0 { 1 } else { period }
}

/// Cells shared between the two halves.
#[derive(Debug)]
pub struct BlinkCells {
    color: AtomicU8,
    restart: IsrFlag,
    done: AtomicBool,
}

impl BlinkCells {
    pub const fn new() -> Self {
        Self {
            color: AtomicU8::new(LedColor::Off as u8),
            restart: IsrFlag::new(),
            done: AtomicBool::new(true),
        }
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl Default for BlinkCells {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic timer driving [`DimmingHandler::on_timer_tick`].
pub trait DimmingTimer {
    fn start(&mut self, period_ms: u32) -> Result<(), LedError>;

    fn stop(&mut self) -> Result<(), LedError>;
}

// ── Main-loop half ────────────────────────────────────────────

pub struct LedController<'a, T> {
    cells: &'a BlinkCells,
    timer: T,
}

impl<'a, T: DimmingTimer> LedController<'a, T> {
    pub fn new(cells: &'a BlinkCells, timer: T) -> Self {
        Self { cells, timer }
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// The ISR glue stops the timer once the handler reports the end.
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    fn arm(&mut self, color: LedColor, period_ms: u32) -> Result<(), LedError> {
        self.timer.stop()?;
        self.cells.color.store(color as u8, Ordering::Release);
        self.cells.done.store(false, Ordering::Release);
        self.cells.restart.set();
        self.timer.start(period_ms)
    }
}

impl<T: DimmingTimer> IndicatorLed for LedController<'_, T> {
    fn start_single_blink(&mut self, duration_ms: u32, color: LedColor) -> Result<(), LedError> {
        if duration_ms == 0 {
            return Err(LedError::NullDuration);
        }
        debug!("led: blink {:?} for {} ms", color, duration_ms);
        self.arm(color, dimming_period_ms(duration_ms))
    }

    /// The handler switches the channels off on the next tick.
    fn stop_blink(&mut self) -> Result<(), LedError> {
        self.arm(LedColor::Off, 1)
    }

    fn is_active(&self) -> bool {
        !self.cells.is_done()
    }
}

// ── ISR half ──────────────────────────────────────────────────

pub struct DimmingHandler<'a, R, G, B> {
    cells: &'a BlinkCells,
    red: R,
    green: G,
    blue: B,
    index: usize,
    rising: bool,
}

impl<'a, R: SetDutyCycle, G: SetDutyCycle, B: SetDutyCycle> DimmingHandler<'a, R, G, B> {
    pub fn new(cells: &'a BlinkCells, red: R, green: G, blue: B) -> Self {
        Self {
            cells,
            red,
            green,
            blue,
            index: 0,
            rising: true,
        }
    }

    fn apply(&mut self, color: LedColor, percent: u8) -> Result<(), LedError> {
        let duty = |on: bool| if on { percent } else { 0 };
        self.red
            .set_duty_cycle_percent(duty(color.red()))
            .map_err(|_| LedError::PwmFailed)?;
        self.green
            .set_duty_cycle_percent(duty(color.green()))
            .map_err(|_| LedError::PwmFailed)?;
        self.blue
            .set_duty_cycle_percent(duty(color.blue()))
            .map_err(|_| LedError::PwmFailed)
    }

    fn finish(&mut self) -> Result<bool, LedError> {
        self.rising = true;
        self.index = 0;
        let result = self.apply(LedColor::Off, 0);
        self.cells.done.store(true, Ordering::Release);
        result.map(|()| true)
    }

    /// One dimming step.  Returns `Ok(true)` when the blink is over and
    /// the timer should be stopped.
    pub fn on_timer_tick(&mut self) -> Result<bool, LedError> {
        if self.cells.restart.take() {
            self.index = 0;
            self.rising = true;
        }
        let color = LedColor::from_bits(self.cells.color.load(Ordering::Acquire));
        if color == LedColor::Off {
            return self.finish();
        }
        self.apply(color, DIMMING_LUT[self.index])?;
        if self.rising {
            self.index += 1;
            if self.index >= DIMMING_LUT_SIZE - 1 {
                self.rising = false;
            }
        } else {
            self.index -= 1;
            if self.index == 0 {
                return self.finish();
            }
        }
        Ok(false)
    }

    pub fn channels(&self) -> (&R, &G, &B) {
        (&self.red, &self.green, &self.blue)
    }
}
