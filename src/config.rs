//! Node configuration
//!
//! Runtime choices that select the module variant and its wiring, and the
//! tunables of the housekeeping tasks.  Loaded from JSON by the host
//! runner; on target the defaults are compiled in.

use serde::{Deserialize, Serialize};

use crate::ports::{AnalogChannel, ConfigError};

/// Hardware variant and its wiring capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ModuleConfig {
    /// DC-DC load control.
    LoadControl {
        /// DC-DC enable is tied in hardware; software control is refused.
        forced_hardware: bool,
    },
    /// Low-voltage relay.
    Relay {
        forced_hardware: bool,
        /// Battery management mode; `None` leaves the relay to the bus.
        bms: Option<BmsConfig>,
    },
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self::LoadControl {
            forced_hardware: false,
        }
    }
}

/// Relay battery management (hysteresis on the common voltage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BmsConfig {
    /// Battery check period (seconds)
    pub period_secs: u32,
    /// Factory low threshold (mV), relay opened below it
    pub low_threshold_mv: u16,
    /// Factory high threshold (mV), relay closed above it
    pub high_threshold_mv: u16,
}

impl Default for BmsConfig {
    fn default() -> Self {
        Self {
            period_secs: 60,
            low_threshold_mv: 10_000,
            high_threshold_mv: 12_000,
        }
    }
}

/// Output-current LED indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Input voltage / output current sampling period (seconds)
    pub measurement_period_secs: u32,
    /// LED blink period (seconds)
    pub indicator_period_secs: u32,
    /// Minimum input voltage (mV, exclusive) for the board to count as powered
    pub power_threshold_mv: i32,
    /// Single blink duration (milliseconds)
    pub blink_duration_ms: u32,
    pub input_channel: AnalogChannel,
    pub current_channel: AnalogChannel,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            measurement_period_secs: 60,
            indicator_period_secs: 10,
            power_threshold_mv: 6000,
            blink_duration_ms: 2000,
            input_channel: AnalogChannel::VinMv,
            current_channel: AnalogChannel::IoutUa,
        }
    }
}

/// Core node configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub module: ModuleConfig,

    // --- NVM ---
    /// Overwrite the NVM mirror with factory values on init
    pub factory_reset: bool,
    /// Bus address written to NVM on factory reset
    pub factory_node_address: u8,

    // --- Identity ---
    pub hw_version_major: u8,
    pub hw_version_minor: u8,

    // --- Housekeeping ---
    pub iout_indicator: Option<IndicatorConfig>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            module: ModuleConfig::default(),
            factory_reset: false,
            factory_node_address: 0x7F,
            hw_version_major: 1,
            hw_version_minor: 0,
            iout_indicator: Some(IndicatorConfig::default()),
        }
    }
}

impl NodeConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values.  Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.factory_node_address > 0x7F {
            return Err(ConfigError::ValidationFailed(
                "factory_node_address must be 0x00–0x7F",
            ));
        }
        if let ModuleConfig::Relay {
            forced_hardware,
            bms: Some(bms),
        } = self.module
        {
            if forced_hardware {
                return Err(ConfigError::ValidationFailed(
                    "bms requires a software-controlled relay",
                ));
            }
            if bms.period_secs == 0 {
                return Err(ConfigError::ValidationFailed("bms.period_secs must be > 0"));
            }
            if bms.low_threshold_mv >= bms.high_threshold_mv {
                return Err(ConfigError::ValidationFailed(
                    "bms.low_threshold_mv must be < bms.high_threshold_mv",
                ));
            }
        }
        if let Some(indicator) = &self.iout_indicator {
            if indicator.measurement_period_secs == 0 || indicator.indicator_period_secs == 0 {
                return Err(ConfigError::ValidationFailed(
                    "iout_indicator periods must be > 0",
                ));
            }
            if indicator.blink_duration_ms == 0 {
                return Err(ConfigError::ValidationFailed(
                    "iout_indicator.blink_duration_ms must be > 0",
                ));
            }
            if indicator.blink_duration_ms >= indicator.indicator_period_secs.saturating_mul(1000) {
                return Err(ConfigError::ValidationFailed(
                    "iout_indicator blink must end before the next one",
                ));
            }
        }
        Ok(())
    }
}
