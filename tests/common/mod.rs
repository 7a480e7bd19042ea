//! Shared test infrastructure: a wire-level fake of the chip

// each test binary exercises a different subset of the fake's helpers
#![allow(dead_code)]

pub mod fake_pins;

pub use fake_pins::FakeChip;
