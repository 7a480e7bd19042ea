//! Pin facade traits for the two-wire HX711 interface
//!
//! The HX711 is not on a standard bus: it is driven over one output pin
//! (PD_SCK, the clock) and one input pin (DOUT, the data line). This module
//! defines the minimal contract the driver needs from those two pins,
//! enabling both real hardware pins (via rppal, see [`crate::gpio`]) and
//! deterministic fakes for testing.
//!
//! Timing-sensitive behavior lives entirely behind these traits: the driver
//! core only assembles bits, filters, and averages, so it is fully
//! unit-testable without hardware.

use crate::error::Result;
use std::time::Duration;

/// Logic level of a GPIO pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Logic low
    Low,
    /// Logic high
    High,
}

/// Outcome of waiting on the data line for a falling edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeWait {
    /// A falling edge was observed within the timeout
    Edge,
    /// The timeout elapsed without an edge
    TimedOut,
}

/// The clock output pin (PD_SCK)
///
/// Implementations must be `Send` so the driver can move to the background
/// sampler thread.
pub trait ClockOutput: Send {
    /// Drive the clock line to the given level
    fn set_level(&mut self, level: Level) -> Result<()>;
}

/// The data input pin (DOUT)
pub trait DataInput: Send {
    /// Read the current level of the data line (non-blocking)
    fn read_level(&mut self) -> Level;

    /// Block until a falling edge is observed or the timeout elapses
    ///
    /// Reports edge-or-timeout only; the ready loop re-reads the level after
    /// every wait, so a platform fault here is indistinguishable from a
    /// timeout and implementations should log it and report [`EdgeWait::TimedOut`].
    fn wait_for_falling_edge(&mut self, timeout: Duration) -> EdgeWait;
}
