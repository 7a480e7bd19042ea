//! Interactive guided calibration
//!
//! Calibration needs two numbers: the raw reading of an empty scale (the
//! zero offset) and how many raw counts one weight unit is worth (the scale
//! factor). This helper walks an operator through an empty reading and two
//! known-weight readings, then suggests a zero offset and a scale-factor
//! range by linear interpolation between the two weight points:
//!
//! ```text
//! adjust = (raw_at_weight - zero_offset) / weight
//! ```
//!
//! The two adjusts rarely agree exactly; pick a value inside the suggested
//! range and verify with known weights.

use crate::driver::Hx711;
use crate::error::{Hx711Error, Result};
use crate::pins::{ClockOutput, DataInput};
use std::time::Duration;

/// Suggested calibration parameters from a guided run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSuggestion {
    /// Raw reading observed with the scale empty
    pub zero_offset: i32,
    /// Lower bound of the suggested scale factor
    pub scale_low: f64,
    /// Upper bound of the suggested scale factor
    pub scale_high: f64,
}

impl CalibrationSuggestion {
    /// Midpoint of the suggested scale-factor range
    pub fn scale_midpoint(&self) -> f64 {
        (self.scale_low + self.scale_high) / 2.0
    }
}

/// Pacing of a guided calibration run
#[derive(Debug, Clone, Copy)]
pub struct CalibrationPacing {
    /// Delay before the empty-scale reading
    pub empty_delay: Duration,
    /// Delay before each known-weight reading
    pub weight_delay: Duration,
    /// Readings per median batch
    pub num_readings: usize,
}

impl Default for CalibrationPacing {
    fn default() -> Self {
        Self {
            empty_delay: Duration::from_secs(5),
            weight_delay: Duration::from_secs(15),
            num_readings: 11,
        }
    }
}

/// Run a guided calibration with the standard 5s/15s/15s pacing
///
/// Prompts on stdout; the operator empties the scale, then places `weight1`
/// and `weight2` (in caller-defined units) when asked. Weights must be
/// positive and distinct readings are the operator's responsibility.
pub fn guided_calibration<C, D>(
    scale: &mut Hx711<C, D>,
    weight1: f64,
    weight2: f64,
) -> Result<CalibrationSuggestion>
where
    C: ClockOutput,
    D: DataInput,
{
    guided_calibration_with_pacing(scale, weight1, weight2, CalibrationPacing::default())
}

/// Run a guided calibration with explicit pacing
pub fn guided_calibration_with_pacing<C, D>(
    scale: &mut Hx711<C, D>,
    weight1: f64,
    weight2: f64,
    pacing: CalibrationPacing,
) -> Result<CalibrationSuggestion>
where
    C: ClockOutput,
    D: DataInput,
{
    if weight1 <= 0.0 || weight2 <= 0.0 {
        return Err(Hx711Error::InvalidArgument(
            "calibration weights must be positive",
        ));
    }

    println!(
        "Make sure the scale is working and empty, reading in {} seconds...",
        pacing.empty_delay.as_secs()
    );
    std::thread::sleep(pacing.empty_delay);
    let zero_offset = scale.read_median_raw(pacing.num_readings)?;
    println!("Empty raw reading: {}", zero_offset);

    println!(
        "Put the first weight of {:.2} on the scale, reading in {} seconds...",
        weight1,
        pacing.weight_delay.as_secs()
    );
    std::thread::sleep(pacing.weight_delay);
    let raw1 = scale.read_median_raw(pacing.num_readings)?;
    println!("Raw reading at first weight: {}", raw1);

    println!(
        "Put the second weight of {:.2} on the scale, reading in {} seconds...",
        weight2,
        pacing.weight_delay.as_secs()
    );
    std::thread::sleep(pacing.weight_delay);
    let raw2 = scale.read_median_raw(pacing.num_readings)?;
    println!("Raw reading at second weight: {}", raw2);

    let adjust1 = f64::from(raw1 - zero_offset) / weight1;
    let adjust2 = f64::from(raw2 - zero_offset) / weight2;

    let suggestion = CalibrationSuggestion {
        zero_offset,
        scale_low: adjust1.min(adjust2),
        scale_high: adjust1.max(adjust2),
    };
    println!("Suggested zero offset: {}", suggestion.zero_offset);
    println!(
        "Suggested scale factor: between {:.6} and {:.6}",
        suggestion.scale_low, suggestion.scale_high
    );
    Ok(suggestion)
}
