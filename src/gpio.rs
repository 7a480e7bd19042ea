//! Raspberry Pi pin binding via rppal
//!
//! This is the only module that touches real hardware. It brings up the
//! platform GPIO subsystem exactly once, resolves BCM pin numbers into a
//! clock/data pin pair implementing the [`crate::pins`] traits, and
//! constructs ready-to-use drivers.
//!
//! Everything here is thin glue; the timing-sensitive protocol and the
//! filtering pipeline live behind the pin traits and are tested against
//! deterministic fakes instead.

use crate::config::ScaleConfig;
use crate::driver::Hx711;
use crate::error::{Hx711Error, Result};
use crate::pins::{ClockOutput, DataInput, EdgeWait, Level};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use std::sync::OnceLock;
use std::time::Duration;

static GPIO: OnceLock<Gpio> = OnceLock::new();

/// A scale bound to real Raspberry Pi pins
pub type RpiScale = Hx711<GpioClockPin, GpioDataPin>;

/// Bring up the platform GPIO subsystem
///
/// Idempotent and safe to call from multiple threads; the first successful
/// bring-up wins. Must succeed before any pins can be bound - failure here
/// is fatal to construction.
pub fn init() -> Result<&'static Gpio> {
    if let Some(gpio) = GPIO.get() {
        return Ok(gpio);
    }
    let gpio = Gpio::new().map_err(|e| Hx711Error::GpioInit(e.to_string()))?;
    Ok(GPIO.get_or_init(|| gpio))
}

/// Clock (PD_SCK) output pin on real hardware
pub struct GpioClockPin {
    pin: OutputPin,
}

impl ClockOutput for GpioClockPin {
    fn set_level(&mut self, level: Level) -> Result<()> {
        match level {
            Level::High => self.pin.set_high(),
            Level::Low => self.pin.set_low(),
        }
        Ok(())
    }
}

/// Data (DOUT) input pin on real hardware
pub struct GpioDataPin {
    pin: InputPin,
    bcm: u8,
}

impl DataInput for GpioDataPin {
    fn read_level(&mut self) -> Level {
        match self.pin.read() {
            rppal::gpio::Level::High => Level::High,
            rppal::gpio::Level::Low => Level::Low,
        }
    }

    fn wait_for_falling_edge(&mut self, timeout: Duration) -> EdgeWait {
        match self.pin.poll_interrupt(true, Some(timeout)) {
            Ok(Some(_)) => EdgeWait::Edge,
            Ok(None) => EdgeWait::TimedOut,
            Err(err) => {
                tracing::trace!(pin = self.bcm, error = %err, "interrupt poll failed");
                EdgeWait::TimedOut
            }
        }
    }
}

/// Resolve a BCM pin pair into configured clock and data pins
///
/// The clock starts driven low and the data pin is armed for falling-edge
/// interrupts. Fails with [`Hx711Error::PinNotFound`] when a number does not
/// resolve and [`Hx711Error::PinConfigFailed`] when interrupt configuration
/// errors.
pub fn bind_pins(clock_bcm: u8, data_bcm: u8) -> Result<(GpioClockPin, GpioDataPin)> {
    let gpio = init()?;

    let clock = gpio
        .get(clock_bcm)
        .map_err(|e| Hx711Error::PinNotFound {
            pin: clock_bcm,
            message: e.to_string(),
        })?
        .into_output_low();

    let mut data = gpio
        .get(data_bcm)
        .map_err(|e| Hx711Error::PinNotFound {
            pin: data_bcm,
            message: e.to_string(),
        })?
        .into_input();

    data.set_interrupt(Trigger::FallingEdge, None)
        .map_err(|e| Hx711Error::PinConfigFailed {
            pin: data_bcm,
            message: e.to_string(),
        })?;

    Ok((
        GpioClockPin { pin: clock },
        GpioDataPin {
            pin: data,
            bcm: data_bcm,
        },
    ))
}

/// Bind pins and construct a driver, flushing the default gain into the chip
pub fn open(clock_bcm: u8, data_bcm: u8) -> Result<RpiScale> {
    let (clock, data) = bind_pins(clock_bcm, data_bcm)?;
    let mut scale = Hx711::new(clock, data);
    scale.apply_gain()?;
    Ok(scale)
}

/// Construct a driver from a validated [`ScaleConfig`]
///
/// Applies the configured calibration parameters and flushes the configured
/// gain into the chip.
pub fn open_configured(config: &ScaleConfig) -> Result<RpiScale> {
    config.validate()?;

    let (clock, data) = bind_pins(config.clock_pin, config.data_pin)?;
    let mut scale = Hx711::new(clock, data);
    scale.set_zero_offset(config.zero_offset);
    scale.set_scale_factor(config.scale_factor)?;
    scale.set_gain(config.gain)?;
    Ok(scale)
}
