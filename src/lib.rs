//! # hx711-rs: HX711 load-cell ADC driver
//!
//! A driver for the HX711 24-bit analog-to-digital converter used in
//! weighing and load-cell applications, bit-banged over a two-wire
//! clock/data pin pair on Raspberry Pi class hardware.
//!
//! ## Architecture
//!
//! - **Pins**: the two-pin contract lives behind the [`pins`] traits so the
//!   core is fully testable with deterministic fakes; [`gpio`] provides the
//!   rppal-backed implementation for real hardware
//! - **Driver**: [`driver::Hx711`] runs the conversion protocol (clock
//!   pulse timing, MSB-first bit sampling, gain selection via trailing
//!   pulses, two's-complement decode) and the chip lifecycle
//!   (reset/shutdown/gain flushing)
//! - **Sampling**: median-of-N batches with sentinel/error exclusion,
//!   zero/scale calibration, and bounded moving-average windows
//! - **Background sampler**: a cancellable worker thread that keeps a
//!   shared moving average fresh, in the single-writer style of a polling
//!   backend
//!
//! ## Example
//!
//! ```ignore
//! use hx711_rs::{config::ScaleConfig, sampler::BackgroundSampler};
//!
//! let config = ScaleConfig::load("scale.toml")?;
//! let scale = hx711_rs::gpio::open_configured(&config)?;
//!
//! let handle = BackgroundSampler::spawn(scale, config.sampling);
//! loop {
//!     println!("weight: {:.1}", handle.latest());
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//! }
//! ```

pub mod calibration;
pub mod config;
pub mod driver;
pub mod error;
pub mod gpio;
pub mod pins;
pub mod sampler;
pub mod sampling;

// Re-export commonly used types
pub use calibration::{guided_calibration, CalibrationSuggestion};
pub use config::{SamplingConfig, ScaleConfig};
pub use driver::{sign_extend_24, Gain, Hx711, RAW_MAXIMUM, RAW_MINIMUM};
pub use error::{Hx711Error, Result};
pub use pins::{ClockOutput, DataInput, EdgeWait, Level};
pub use sampler::{BackgroundSampler, SamplerHandle};
pub use sampling::{CancelToken, MovingAverage};
