//! Power domain arbiter.
//!
//! Reference-counted enable/disable of the board's switchable rails.
//! Each [`RequesterId`] holds a domain at most once; the rail is physically
//! on iff at least one requester holds it.
//!
//! ```text
//!  holders: 0 ──enable──▶ 1   rail on, settle delay, then return
//!           N ──enable──▶ N+1 return immediately
//!           N ──disable─▶ N-1 return immediately
//!           1 ──disable─▶ 0   rail off
//! ```
//!
//! Every `enable` must be matched by a `disable` from the same requester,
//! including on error paths, or the rail leaks.

use log::{debug, error};

// ═══════════════════════════════════════════════════════════════
//  Identifiers
// ═══════════════════════════════════════════════════════════════

/// Switchable board rails.  Which ones are physically fitted is a board
/// concern (see [`RailPort`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PowerDomain {
    /// Analog front end (dividers, current-sense amplifiers, ADC reference).
    Analog = 0,
    Digital = 1,
    Sensors = 2,
    Radio = 3,
    Tcxo = 4,
    Gps = 5,
    McuTcxo = 6,
    Tic = 7,
}

impl PowerDomain {
    pub const COUNT: usize = 8;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Analog,
        Self::Digital,
        Self::Sensors,
        Self::Radio,
        Self::Tcxo,
        Self::Gps,
        Self::McuTcxo,
        Self::Tic,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Time the rail needs after switch-on before its consumers are valid.
    pub const fn default_settle_ms(self) -> u32 {
        match self {
            Self::Analog => 50,
            Self::Digital | Self::Sensors | Self::Radio => 100,
            Self::Tcxo => 500,
            Self::Gps => 1000,
            Self::McuTcxo | Self::Tic => 0,
        }
    }
}

/// Tag of each module or task allowed to hold a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequesterId {
    Node = 0,
    Common,
    Lvrm,
    Bpsm,
    Ddrm,
    Gpsm,
    Sm,
    Rrm,
    Bcm,
    McuApi,
    RfApi,
    Measure,
    Tic,
}

impl RequesterId {
    const fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

/// How the caller waits out the settle delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayMode {
    /// Busy-wait; peripherals and clocks stay up.
    Active,
    /// Low-power sleep until the delay elapses.
    Sleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    Off,
    On,
}

// ═══════════════════════════════════════════════════════════════
//  Hardware seams
// ═══════════════════════════════════════════════════════════════

/// Physical rail switch.
pub trait RailPort {
    fn set_rail(&mut self, domain: PowerDomain, on: bool) -> Result<(), RailError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailError {
    /// No switch fitted for this domain on this board.
    NotFitted,
    /// The enable pin could not be driven.
    PinFailed,
}

impl core::fmt::Display for RailError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFitted => write!(f, "rail not fitted"),
            Self::PinFailed => write!(f, "rail pin failed"),
        }
    }
}

/// Blocking wait used for settle delays.  Never cancelled.
pub trait SettleDelay {
    fn settle(&mut self, ms: u32, mode: DelayMode);
}

// ═══════════════════════════════════════════════════════════════
//  Arbiter
// ═══════════════════════════════════════════════════════════════

/// Power API consumed by module adapters and housekeeping tasks.
pub trait PowerControl {
    /// Add `requester` to the holders of `domain`.  On the 0→1 transition
    /// the rail is switched on and the call blocks for the settle delay.
    fn enable(&mut self, requester: RequesterId, domain: PowerDomain, mode: DelayMode);

    /// Remove `requester` from the holders of `domain`.  On the 1→0
    /// transition the rail is switched off.  No-op for non-holders.
    fn disable(&mut self, requester: RequesterId, domain: PowerDomain);

    fn state(&self, domain: PowerDomain) -> DomainState;
}

/// Reference-counted arbiter over a [`RailPort`] and a [`SettleDelay`].
pub struct PowerArbiter<R, D> {
    rails: R,
    delay: D,
    /// Holder bitmask per domain, one bit per [`RequesterId`].
    holders: [u16; PowerDomain::COUNT],
    settle_ms: [u32; PowerDomain::COUNT],
}

impl<R: RailPort, D: SettleDelay> PowerArbiter<R, D> {
    /// All domains start with zero holders; rails are switched off.
    pub fn new(mut rails: R, delay: D) -> Self {
        let mut settle_ms = [0; PowerDomain::COUNT];
        for domain in PowerDomain::ALL {
            settle_ms[domain.index()] = domain.default_settle_ms();
            match rails.set_rail(domain, false) {
                Ok(()) | Err(RailError::NotFitted) => {}
                Err(e) => error!("power: switching {:?} off at start failed: {e}", domain),
            }
        }
        Self {
            rails,
            delay,
            holders: [0; PowerDomain::COUNT],
            settle_ms,
        }
    }

    /// Override the settle delay of one domain (board-specific hardware).
    pub fn with_settle_delay(mut self, domain: PowerDomain, ms: u32) -> Self {
        self.settle_ms[domain.index()] = ms;
        self
    }

    pub fn settle_ms(&self, domain: PowerDomain) -> u32 {
        self.settle_ms[domain.index()]
    }

    /// `true` if `requester` currently holds `domain`.
    pub fn is_held_by(&self, requester: RequesterId, domain: PowerDomain) -> bool {
        self.holders[domain.index()] & requester.bit() != 0
    }

    /// Number of requesters currently holding `domain`.
    pub fn holder_count(&self, domain: PowerDomain) -> u32 {
        self.holders[domain.index()].count_ones()
    }

    pub fn rails(&self) -> &R {
        &self.rails
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }
}

impl<R: RailPort, D: SettleDelay> PowerControl for PowerArbiter<R, D> {
    fn enable(&mut self, requester: RequesterId, domain: PowerDomain, mode: DelayMode) {
        let slot = &mut self.holders[domain.index()];
        let was_off = *slot == 0;
        *slot |= requester.bit();
        if !was_off {
            return;
        }
        debug!("power: {:?} on (requester {:?})", domain, requester);
        if let Err(e) = self.rails.set_rail(domain, true) {
            error!("power: switching {:?} on failed: {e}", domain);
        }
        let ms = self.settle_ms[domain.index()];
        if ms > 0 {
            self.delay.settle(ms, mode);
        }
    }

    fn disable(&mut self, requester: RequesterId, domain: PowerDomain) {
        let slot = &mut self.holders[domain.index()];
        if *slot & requester.bit() == 0 {
            return;
        }
        *slot &= !requester.bit();
        if *slot != 0 {
            return;
        }
        debug!("power: {:?} off (requester {:?})", domain, requester);
        if let Err(e) = self.rails.set_rail(domain, false) {
            error!("power: switching {:?} off failed: {e}", domain);
        }
    }

    fn state(&self, domain: PowerDomain) -> DomainState {
        if self.holders[domain.index()] != 0 {
            DomainState::On
        } else {
            DomainState::Off
        }
    }
}
