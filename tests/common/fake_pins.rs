//! Deterministic fake pin pair simulating an HX711 at the wire level
//!
//! The fake models the chip's conversion state machine as seen from the two
//! pins: a rising clock edge shifts out the next data bit (MSB first),
//! pulses after the 24 data bits are counted as gain/channel selection, and
//! a clock held high past the 60us budget powers the chip down, aborting
//! the frame in flight - the same behavior the real chip exhibits when
//! scheduling jitter stretches a pulse.
//!
//! Readings are queued as [`FakeFrame`]s; an `endless` value can back the
//! queue for open-ended loops like the background sampler.

use hx711_rs::error::{Hx711Error, Result};
use hx711_rs::pins::{ClockOutput, DataInput, EdgeWait, Level};
use hx711_rs::Hx711;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One scripted conversion
#[derive(Debug, Clone, Copy)]
pub enum FakeFrame {
    /// A 24-bit reading served bit by bit
    Value(i32),
    /// The first clock pulse of this frame fails at the pin level
    PulseError,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    /// `bits_done` pulses of the 24 data bits have been clocked
    Shifting { value: u32, bits_done: u8 },
    Trailing { pulses: u32 },
}

struct ChipState {
    queue: VecDeque<FakeFrame>,
    endless: Option<i32>,
    phase: Phase,
    clock: Level,
    raised_at: Option<Instant>,
    /// Stall this rising edge (1-based global count) past the timing budget
    slow_pulse_at: Option<u64>,
    pulse_count: u64,
    trailing_counts: Vec<u32>,
    edge_waits: u64,
}

impl ChipState {
    fn frame_available(&self) -> bool {
        !self.queue.is_empty() || self.endless.is_some()
    }

    fn next_value(&mut self) -> Option<FakeFrame> {
        self.queue.front().copied().or(self.endless.map(FakeFrame::Value))
    }

    fn rising_edge(&mut self) -> Result<()> {
        self.pulse_count += 1;
        if self.slow_pulse_at == Some(self.pulse_count) {
            // stretch the high phase past the chip's power-down threshold
            std::thread::sleep(Duration::from_micros(80));
        }

        match self.phase {
            Phase::Idle => match self.next_value() {
                Some(FakeFrame::PulseError) => {
                    self.queue.pop_front();
                    return Err(Hx711Error::Pin("injected pulse fault".to_string()));
                }
                Some(FakeFrame::Value(value)) => {
                    self.phase = Phase::Shifting {
                        value: (value as u32) & 0x00FF_FFFF,
                        bits_done: 1,
                    };
                }
                // pulsing with no conversion pending (e.g. a reset pulse)
                None => {}
            },
            Phase::Shifting { value, bits_done } => {
                if bits_done < 24 {
                    self.phase = Phase::Shifting {
                        value,
                        bits_done: bits_done + 1,
                    };
                } else {
                    self.phase = Phase::Trailing { pulses: 1 };
                }
            }
            Phase::Trailing { pulses } => {
                self.phase = Phase::Trailing { pulses: pulses + 1 };
            }
        }
        Ok(())
    }

    fn falling_edge(&mut self) {
        // a high phase past 60us powers the chip down and corrupts the
        // conversion in flight; the frame is aborted but not consumed
        if let Some(raised_at) = self.raised_at.take() {
            if raised_at.elapsed() >= Duration::from_micros(60) {
                self.phase = Phase::Idle;
            }
        }
    }

    /// Complete a finished frame: record its trailing pulses and consume it
    fn finalize_if_trailing(&mut self) {
        if let Phase::Trailing { pulses } = self.phase {
            self.trailing_counts.push(pulses);
            self.queue.pop_front();
            self.phase = Phase::Idle;
        }
    }

    fn data_level(&mut self) -> Level {
        self.finalize_if_trailing();
        match self.phase {
            Phase::Shifting { value, bits_done } => {
                let bit = (value >> (24 - u32::from(bits_done))) & 1;
                if bit == 1 {
                    Level::High
                } else {
                    Level::Low
                }
            }
            // ready is signaled by the data line going low
            Phase::Idle | Phase::Trailing { .. } => {
                if self.frame_available() {
                    Level::Low
                } else {
                    Level::High
                }
            }
        }
    }
}

/// Handle to a scripted fake chip; clones of the pins share its state
#[derive(Clone)]
pub struct FakeChip {
    state: Arc<Mutex<ChipState>>,
}

impl FakeChip {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ChipState {
                queue: VecDeque::new(),
                endless: None,
                phase: Phase::Idle,
                clock: Level::Low,
                raised_at: None,
                slow_pulse_at: None,
                pulse_count: 0,
                trailing_counts: Vec::new(),
                edge_waits: 0,
            })),
        }
    }

    /// A chip with the given readings queued in order
    pub fn with_readings(values: &[i32]) -> Self {
        let chip = Self::new();
        for &value in values {
            chip.push_value(value);
        }
        chip
    }

    /// A chip that serves `value` forever
    pub fn endless(value: i32) -> Self {
        let chip = Self::new();
        chip.state.lock().unwrap().endless = Some(value);
        chip
    }

    pub fn push_value(&self, value: i32) {
        self.state
            .lock()
            .unwrap()
            .queue
            .push_back(FakeFrame::Value(value));
    }

    pub fn push_pulse_error(&self) {
        self.state
            .lock()
            .unwrap()
            .queue
            .push_back(FakeFrame::PulseError);
    }

    /// Stall the `n`-th rising edge (1-based) past the timing budget
    pub fn stall_pulse(&self, n: u64) {
        self.state.lock().unwrap().slow_pulse_at = Some(n);
    }

    /// The pin pair backed by this chip
    pub fn pins(&self) -> (FakeClock, FakeData) {
        (
            FakeClock {
                state: Arc::clone(&self.state),
            },
            FakeData {
                state: Arc::clone(&self.state),
            },
        )
    }

    /// A driver over this chip's pins
    pub fn driver(&self) -> Hx711<FakeClock, FakeData> {
        let (clock, data) = self.pins();
        Hx711::new(clock, data)
    }

    /// Trailing pulse counts recorded per completed frame
    ///
    /// A frame still waiting to be finalized (trailing pulses clocked but no
    /// follow-up data read yet) is settled here first.
    pub fn trailing_counts(&self) -> Vec<u32> {
        let mut state = self.state.lock().unwrap();
        state.finalize_if_trailing();
        state.trailing_counts.clone()
    }

    pub fn frames_completed(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        state.finalize_if_trailing();
        state.trailing_counts.len()
    }

    pub fn pulse_count(&self) -> u64 {
        self.state.lock().unwrap().pulse_count
    }

    pub fn edge_waits(&self) -> u64 {
        self.state.lock().unwrap().edge_waits
    }

    pub fn queued(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    pub fn clock_level(&self) -> Level {
        self.state.lock().unwrap().clock
    }
}

/// Fake PD_SCK output pin
pub struct FakeClock {
    state: Arc<Mutex<ChipState>>,
}

impl ClockOutput for FakeClock {
    fn set_level(&mut self, level: Level) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let previous = state.clock;
        state.clock = level;
        match (previous, level) {
            (Level::Low, Level::High) => {
                state.raised_at = Some(Instant::now());
                state.rising_edge()
            }
            (Level::High, Level::Low) => {
                state.falling_edge();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Fake DOUT input pin
pub struct FakeData {
    state: Arc<Mutex<ChipState>>,
}

impl DataInput for FakeData {
    fn read_level(&mut self) -> Level {
        self.state.lock().unwrap().data_level()
    }

    fn wait_for_falling_edge(&mut self, _timeout: Duration) -> EdgeWait {
        // never sleeps: reports an edge as soon as a conversion is pending
        let mut state = self.state.lock().unwrap();
        state.edge_waits += 1;
        if state.frame_available() {
            EdgeWait::Edge
        } else {
            EdgeWait::TimedOut
        }
    }
}
