//! Error handling for the HX711 driver
//!
//! This module defines the crate-wide error type and a Result alias used
//! throughout the driver, the sampling pipeline, and the background sampler.

use thiserror::Error;

/// Main error type for HX711 operations
#[derive(Error, Debug)]
pub enum Hx711Error {
    /// The platform GPIO subsystem could not be brought up
    #[error("GPIO subsystem initialization failed: {0}")]
    GpioInit(String),

    /// A pin identifier did not resolve to a usable GPIO pin
    #[error("pin {pin} not found: {message}")]
    PinNotFound {
        /// BCM pin number that failed to resolve
        pin: u8,
        /// Underlying platform message
        message: String,
    },

    /// Direction, pull, or edge configuration on a pin failed
    #[error("pin {pin} configuration failed: {message}")]
    PinConfigFailed {
        /// BCM pin number that failed to configure
        pin: u8,
        /// Underlying platform message
        message: String,
    },

    /// A runtime pin operation failed while driving the clock line
    #[error("pin fault: {0}")]
    Pin(String),

    /// A clock pulse held the line high past the chip's 60us budget,
    /// so the conversion in flight is presumed corrupted
    #[error("clock high for {held_us}us, conversion presumed corrupted")]
    TimingViolation {
        /// Measured high-phase duration in microseconds
        held_us: u64,
    },

    /// The chip never pulled the data line low within the retry budget
    #[error("chip never signaled data ready")]
    ReadyTimeout,

    /// Dummy reads failed to flush the chip into the requested gain mode
    #[error("gain change did not settle after {attempts} dummy reads")]
    GainApplyFailed {
        /// Number of consecutive failed dummy reads
        attempts: u32,
        /// Last underlying read error
        #[source]
        source: Box<Hx711Error>,
    },

    /// An entire median batch produced zero usable samples
    #[error("no valid readings in batch")]
    NoValidData {
        /// Last individual read error, if any reading failed outright
        /// (readings discarded for the -1 sentinel leave no error behind)
        #[source]
        last: Option<Box<Hx711Error>>,
    },

    /// The stop signal was observed before or during a median batch
    #[error("sampling cancelled")]
    Cancelled,

    /// A caller-supplied argument violated a documented precondition
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Configuration loading or validation failed
    #[error("configuration error: {0}")]
    Config(String),
}

impl Hx711Error {
    /// Whether this error is the cancellation signal rather than a fault
    ///
    /// Callers driving a stop flag use this to tell a normal shutdown apart
    /// from a read failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Hx711Error::Cancelled)
    }
}

/// Result type alias for HX711 operations
pub type Result<T> = std::result::Result<T, Hx711Error>;
