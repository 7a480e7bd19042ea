//! Core HX711 driver: conversion protocol and chip lifecycle
//!
//! One conversion is read by clocking 24 data bits out of the chip, MSB
//! first, sampling the data line after each pulse. The number of extra
//! pulses after the data bits selects the channel and gain used for the
//! *next* conversion. The chip signals a conversion is ready by pulling the
//! data line low.
//!
//! # Timing
//!
//! The protocol is timing sensitive in exactly one place: if the clock line
//! stays high for 60us or longer the chip enters power-down and the
//! conversion in flight is corrupted. On a general-purpose OS scheduling
//! jitter can stretch a pulse past that budget, so every pulse is measured
//! against the wall clock and a too-long pulse fails with
//! [`Hx711Error::TimingViolation`] after scheduling a gain re-application
//! to flush the chip back into a known mode.

use crate::error::{Hx711Error, Result};
use crate::pins::{ClockOutput, DataInput, Level};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Minimum value representable in a 24-bit two's-complement reading
pub const RAW_MINIMUM: i32 = -(1 << 23);

/// Maximum value representable in a 24-bit two's-complement reading
pub const RAW_MAXIMUM: i32 = (1 << 23) - 1;

/// A clock pulse held high this long or longer corrupts the conversion
pub const CLOCK_HIGH_BUDGET: Duration = Duration::from_micros(60);

/// Chip-mandated minimum width of the power-on-reset pulse
pub const RESET_PULSE_WIDTH: Duration = Duration::from_micros(70);

/// Per-round timeout while waiting for the data line to signal ready
pub const READY_EDGE_TIMEOUT: Duration = Duration::from_millis(100);

/// Rounds of ready polling before giving up
///
/// The chip usually settles in 80-100ms after power-up but has been observed
/// to take around 500ms, so the budget is roughly 0.1-1.1s.
pub const READY_RETRY_ROUNDS: u32 = 11;

/// Dummy reads attempted while flushing a gain change into the chip
const GAIN_APPLY_ATTEMPTS: u32 = 5;

/// Channel and gain selection, encoded as trailing pulses after the data bits
///
/// The selection only takes effect starting from the second conversion after
/// it is requested: the trailing pulses of one conversion determine the mode
/// of the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gain {
    /// Channel A, gain 128 (one trailing pulse, the chip default)
    #[default]
    A128,
    /// Channel A, gain 64 (three trailing pulses)
    A64,
    /// Channel B, gain 32 (two trailing pulses)
    B32,
}

impl Gain {
    /// Number of trailing clock pulses that select this mode
    pub fn end_pulses(self) -> u32 {
        match self {
            Gain::A128 => 1,
            Gain::A64 => 3,
            Gain::B32 => 2,
        }
    }

    /// Map a numeric gain factor (128, 64, or 32) to a mode
    ///
    /// Unrecognized factors select the chip default of 128, matching the
    /// chip's own power-on behavior.
    pub fn from_factor(factor: u32) -> Gain {
        match factor {
            128 => Gain::A128,
            64 => Gain::A64,
            32 => Gain::B32,
            _ => Gain::A128,
        }
    }
}

/// Sign-extend a 24-bit two's-complement value into a native `i32`
///
/// Only the low 24 bits of `raw` are meaningful; bit 23 is the sign bit.
pub fn sign_extend_24(raw: u32) -> i32 {
    let raw = raw & 0x00FF_FFFF;
    if raw & 0x0080_0000 != 0 {
        (raw | 0xFF00_0000) as i32
    } else {
        raw as i32
    }
}

/// Driver for one HX711 chip over a clock/data pin pair
///
/// Owns its pins exclusively: the design assumes exactly one logical reader
/// per chip, and pin access is not internally synchronized.
///
/// # Example
///
/// ```ignore
/// let mut scale = hx711_rs::gpio::open(6, 5)?;
/// scale.reset()?;
/// let weight = scale.read_median(11)?;
/// scale.shutdown()?;
/// ```
pub struct Hx711<C, D> {
    clock: C,
    data: D,
    gain: Gain,
    zero_offset: i32,
    scale_factor: f64,
    // guards against recursive recovery when the recovery reads themselves
    // hit a timing violation
    in_gain_recovery: bool,
}

impl<C, D> Hx711<C, D>
where
    C: ClockOutput,
    D: DataInput,
{
    /// Create a driver over an already-configured pin pair
    ///
    /// Performs no chip I/O; callers that bound real pins should follow up
    /// with [`apply_gain`](Self::apply_gain) or [`reset`](Self::reset) before
    /// the first burst of reads. [`crate::gpio::open`] does this for you.
    pub fn new(clock: C, data: D) -> Self {
        Self {
            clock,
            data,
            gain: Gain::default(),
            zero_offset: 0,
            scale_factor: 1.0,
            in_gain_recovery: false,
        }
    }

    /// Currently selected gain mode
    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Raw reading that corresponds to an empty scale
    pub fn zero_offset(&self) -> i32 {
        self.zero_offset
    }

    /// Set the raw reading that corresponds to an empty scale
    pub fn set_zero_offset(&mut self, zero_offset: i32) {
        self.zero_offset = zero_offset;
    }

    /// Raw counts per caller-defined weight unit
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Set the raw counts per caller-defined weight unit
    ///
    /// A zero scale factor is a configuration error, not something to divide
    /// by later, so it is rejected here.
    pub fn set_scale_factor(&mut self, scale_factor: f64) -> Result<()> {
        if scale_factor == 0.0 {
            return Err(Hx711Error::InvalidArgument("scale factor must be nonzero"));
        }
        self.scale_factor = scale_factor;
        Ok(())
    }

    /// Transform a raw reading into a calibrated weight
    ///
    /// The subtraction is widened to `i64`: a configured zero offset near the
    /// `i32` limits must not overflow against a raw reading.
    pub fn calibrated(&self, raw: i32) -> f64 {
        (i64::from(raw) - i64::from(self.zero_offset)) as f64 / self.scale_factor
    }

    /// Drive the clock high then low, measuring the high phase
    ///
    /// Failing the 60us budget schedules a gain re-application (the chip may
    /// have dropped into power-down and lost its mode) before surfacing
    /// [`Hx711Error::TimingViolation`].
    fn clock_pulse(&mut self) -> Result<()> {
        let start = Instant::now();
        self.clock.set_level(Level::High)?;
        self.clock.set_level(Level::Low)?;
        let held = start.elapsed();

        if held >= CLOCK_HIGH_BUDGET {
            if !self.in_gain_recovery {
                self.in_gain_recovery = true;
                let recovered = self.apply_gain();
                self.in_gain_recovery = false;
                if let Err(err) = recovered {
                    tracing::warn!(error = %err, "gain re-application after timing violation failed");
                }
            }
            return Err(Hx711Error::TimingViolation {
                held_us: held.as_micros() as u64,
            });
        }

        Ok(())
    }

    /// Wait for the chip to pull the data line low, signaling a conversion
    ///
    /// Drives the clock low first; ready signaling is only valid with the
    /// clock idle. The edge wait sometimes returns early, so the level is
    /// re-read every round rather than trusting the edge result.
    fn wait_for_data_ready(&mut self) -> Result<()> {
        self.clock.set_level(Level::Low)?;

        for _ in 0..READY_RETRY_ROUNDS {
            if self.data.read_level() == Level::Low {
                return Ok(());
            }
            self.data.wait_for_falling_edge(READY_EDGE_TIMEOUT);
        }

        Err(Hx711Error::ReadyTimeout)
    }

    /// Read one raw 24-bit two's-complement conversion from the chip
    ///
    /// Blocks for up to the ready-wait budget (~1.1s worst case). Any pulse
    /// error propagates immediately; no partial reading is returned.
    pub fn read_raw(&mut self) -> Result<i32> {
        self.wait_for_data_ready()?;

        let mut acc: u32 = 0;
        for _ in 0..24 {
            self.clock_pulse()?;
            acc <<= 1;
            if self.data.read_level() == Level::High {
                acc |= 1;
            }
        }

        // trailing pulses select channel/gain for the next conversion
        for _ in 0..self.gain.end_pulses() {
            self.clock_pulse()?;
        }

        Ok(sign_extend_24(acc))
    }

    /// Flush a pending gain/channel change into the chip
    ///
    /// A gain change only takes effect from the second conversion after it is
    /// requested, so this performs dummy reads until one succeeds. The chip's
    /// >=400ms analog settling time is covered by the ready-wait latency of
    /// the dummy reads themselves.
    pub fn apply_gain(&mut self) -> Result<()> {
        let mut last_err = None;
        for _ in 0..GAIN_APPLY_ATTEMPTS {
            match self.read_raw() {
                Ok(_) => return Ok(()),
                Err(err) => last_err = Some(err),
            }
        }
        Err(Hx711Error::GainApplyFailed {
            attempts: GAIN_APPLY_ATTEMPTS,
            source: Box::new(last_err.unwrap_or(Hx711Error::ReadyTimeout)),
        })
    }

    /// Select the gain mode and flush it into the chip
    pub fn set_gain(&mut self, gain: Gain) -> Result<()> {
        self.gain = gain;
        self.apply_gain()
    }

    /// Start up or reset the chip
    ///
    /// The chip powers down after almost any idle period, so call this
    /// before a burst of reads. Holds the clock high for the chip-mandated
    /// reset pulse width, then re-applies the selected gain.
    pub fn reset(&mut self) -> Result<()> {
        self.clock.set_level(Level::Low)?;
        self.clock.set_level(Level::High)?;
        std::thread::sleep(RESET_PULSE_WIDTH);
        self.clock.set_level(Level::Low)?;
        self.apply_gain()
    }

    /// Put the chip into power-down mode
    ///
    /// The chip interprets a sustained high clock as power-down; the line is
    /// left high. Call after a burst of reads to save power.
    pub fn shutdown(&mut self) -> Result<()> {
        self.clock.set_level(Level::High)
    }
}
