//! Configuration for a scale: pin assignment, calibration inputs, sampling
//!
//! The driver never persists calibration on its own; a [`ScaleConfig`] is
//! caller-supplied input, typically loaded from a TOML file next to the
//! application:
//!
//! ```toml
//! clock_pin = 6
//! data_pin = 5
//! gain = "A128"
//! zero_offset = -94800
//! scale_factor = 438.5
//!
//! [sampling]
//! num_readings = 11
//! num_avgs = 5
//! ```

use crate::driver::Gain;
use crate::error::{Hx711Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default readings per median batch
pub const DEFAULT_NUM_READINGS: usize = 11;

/// Default moving-average window capacity
pub const DEFAULT_NUM_AVGS: usize = 5;

/// Batch and window sizes for the sampling pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Raw readings collected per median batch
    #[serde(default = "default_num_readings")]
    pub num_readings: usize,

    /// Capacity of the moving-average window
    #[serde(default = "default_num_avgs")]
    pub num_avgs: usize,
}

fn default_num_readings() -> usize {
    DEFAULT_NUM_READINGS
}

fn default_num_avgs() -> usize {
    DEFAULT_NUM_AVGS
}

fn default_scale_factor() -> f64 {
    1.0
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            num_readings: DEFAULT_NUM_READINGS,
            num_avgs: DEFAULT_NUM_AVGS,
        }
    }
}

/// Complete configuration for one physical scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleConfig {
    /// BCM number of the clock (PD_SCK) output pin
    pub clock_pin: u8,

    /// BCM number of the data (DOUT) input pin
    pub data_pin: u8,

    /// Channel/gain selection
    #[serde(default)]
    pub gain: Gain,

    /// Raw reading for an empty scale
    #[serde(default)]
    pub zero_offset: i32,

    /// Raw counts per caller-defined weight unit; must be nonzero
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,

    /// Sampling pipeline knobs
    #[serde(default)]
    pub sampling: SamplingConfig,
}

impl ScaleConfig {
    /// Load and validate a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Hx711Error::Config(format!("failed to read config file: {}", e)))?;
        let config: ScaleConfig = toml::from_str(&text)
            .map_err(|e| Hx711Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.scale_factor == 0.0 {
            return Err(Hx711Error::Config(
                "scale_factor must be nonzero".to_string(),
            ));
        }
        if self.clock_pin == self.data_pin {
            return Err(Hx711Error::Config(
                "clock_pin and data_pin must differ".to_string(),
            ));
        }
        if self.sampling.num_readings == 0 {
            return Err(Hx711Error::Config(
                "sampling.num_readings must be at least 1".to_string(),
            ));
        }
        if self.sampling.num_avgs == 0 {
            return Err(Hx711Error::Config(
                "sampling.num_avgs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
