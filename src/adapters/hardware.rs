//! Hardware adapter: bridges embedded-hal peripherals to the power seams.
//!
//! [`GpioRails`] switches one enable pin per fitted power domain;
//! [`HalDelay`] waits out settle delays on a blocking delay provider.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, error};

use crate::power::{DelayMode, PowerDomain, RailError, RailPort, SettleDelay};

/// Rail enable pins, one optional pin per domain.
pub struct GpioRails<P> {
    pins: [Option<P>; PowerDomain::COUNT],
}

impl<P: OutputPin> GpioRails<P> {
    /// No rail fitted.
    pub fn new() -> Self {
        Self {
            pins: core::array::from_fn(|_| None),
        }
    }

    /// Fit `domain` with its enable pin (active high).
    pub fn with_rail(mut self, domain: PowerDomain, pin: P) -> Self {
        self.pins[domain.index()] = Some(pin);
        self
    }

    pub fn pin(&self, domain: PowerDomain) -> Option<&P> {
        self.pins[domain.index()].as_ref()
    }
}

impl<P: OutputPin> Default for GpioRails<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin> RailPort for GpioRails<P> {
    fn set_rail(&mut self, domain: PowerDomain, on: bool) -> Result<(), RailError> {
        let pin = self.pins[domain.index()]
            .as_mut()
            .ok_or(RailError::NotFitted)?;
        let result = if on { pin.set_high() } else { pin.set_low() };
        result.map_err(|e| {
            error!("rails: {:?} pin failed: {e:?}", domain);
            RailError::PinFailed
        })
    }
}

/// Settle delays on an embedded-hal delay provider.
///
/// The HAL delay has no low-power variant, so `Sleep` busy-waits too.
pub struct HalDelay<D> {
    delay: D,
}

impl<D: DelayNs> HalDelay<D> {
    pub fn new(delay: D) -> Self {
        Self { delay }
    }

    pub fn inner(&self) -> &D {
        &self.delay
    }
}

impl<D: DelayNs> SettleDelay for HalDelay<D> {
    // `DelayNs` only blocks; `Sleep` falls back to the same busy-wait as
    // `Active`.  A board with a low-power wait supplies its own `SettleDelay`.
    fn settle(&mut self, ms: u32, mode: DelayMode) {
        debug!("settle: {} ms ({:?})", ms, mode);
        self.delay.delay_ms(ms);
    }
}
