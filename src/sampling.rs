//! Sampling pipeline: median filtering, calibration, and averaging
//!
//! Raw conversions are noisy, so the pipeline never hands a single reading
//! to the caller. One *batch* collects up to N raw readings, discards
//! failures and the chip's `-1` error sentinel, and takes the lower median
//! of what survives. On top of batches sit two averaging strategies: a
//! simple average of independent batches, and a caller-owned bounded
//! moving-average window for continuous readouts.
//!
//! Long batches are cancellable: a [`CancelToken`] is checked before every
//! reading so a stop request is honored mid-batch.

use crate::driver::Hx711;
use crate::error::{Hx711Error, Result};
use crate::pins::{ClockOutput, DataInput};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Raw value the chip reports as an error indicator, not a real reading
///
/// Its exact origin is not rigorously specified by the chip; readings equal
/// to it are excluded from median batches rather than treated as data.
pub const SENTINEL_RAW: i32 = -1;

/// Cloneable cancellation handle shared between a sampling loop and its caller
///
/// The caller is the sole writer (via [`cancel`](Self::cancel)), the sampler
/// only reads. A token starts out not cancelled and never resets.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Bounded FIFO window of calibrated readings with an arithmetic mean
///
/// Pushing at capacity evicts the oldest element. The window is owned by
/// whoever created it; the pipeline never retains a copy.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: VecDeque<f64>,
    capacity: usize,
}

impl MovingAverage {
    /// Create a window holding up to `capacity` readings
    ///
    /// A zero capacity has no meaningful mean and is rejected.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Hx711Error::InvalidArgument(
                "moving average capacity must be at least 1",
            ));
        }
        Ok(Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Push a reading, evicting the oldest if the window is full
    pub fn push(&mut self, value: f64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(value);
    }

    /// Arithmetic mean over the current contents
    ///
    /// Returns 0.0 while the window is empty.
    pub fn mean(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    /// Number of readings currently held
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether the window holds no readings yet
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Lower median: middle element of the sorted samples, rounding down on ties
fn lower_median(mut samples: Vec<i32>) -> Option<i32> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable();
    Some(samples[(samples.len() - 1) / 2])
}

impl<C, D> Hx711<C, D>
where
    C: ClockOutput,
    D: DataInput,
{
    /// Median of up to `num_readings` raw readings, cancellable mid-batch
    ///
    /// The token is checked before every attempt and fails fast with
    /// [`Hx711Error::Cancelled`]. Individual read errors and the
    /// [`SENTINEL_RAW`] indicator are excluded from the sample set without
    /// retrying in their place; a batch with zero usable samples fails with
    /// [`Hx711Error::NoValidData`] carrying the last individual error.
    pub fn read_median_raw_cancellable(
        &mut self,
        num_readings: usize,
        cancel: &CancelToken,
    ) -> Result<i32> {
        let mut samples = Vec::with_capacity(num_readings);
        let mut last_err = None;

        for _ in 0..num_readings {
            if cancel.is_cancelled() {
                return Err(Hx711Error::Cancelled);
            }

            match self.read_raw() {
                Ok(SENTINEL_RAW) => continue,
                Ok(raw) => samples.push(raw),
                Err(err) => last_err = Some(err),
            }
        }

        lower_median(samples).ok_or(Hx711Error::NoValidData {
            last: last_err.map(Box::new),
        })
    }

    /// Median of up to `num_readings` raw readings, without cancellation
    pub fn read_median_raw(&mut self, num_readings: usize) -> Result<i32> {
        self.read_median_raw_cancellable(num_readings, &CancelToken::new())
    }

    /// Calibrated median: `(median_raw - zero_offset) / scale_factor`
    pub fn read_median(&mut self, num_readings: usize) -> Result<f64> {
        let raw = self.read_median_raw(num_readings)?;
        Ok(self.calibrated(raw))
    }

    /// Average of `num_avgs` independent median batches, calibrated
    ///
    /// The zero offset is subtracted per batch before summing; the sum is
    /// divided by `num_avgs` and then by the scale factor. Equivalent to
    /// averaging calibrated values as long as the scale factor is constant
    /// across the run.
    pub fn read_median_then_avg(&mut self, num_readings: usize, num_avgs: usize) -> Result<f64> {
        if num_avgs == 0 {
            return Err(Hx711Error::InvalidArgument("num_avgs must be at least 1"));
        }

        let mut sum: i64 = 0;
        for _ in 0..num_avgs {
            let raw = self.read_median_raw(num_readings)?;
            sum += i64::from(raw) - i64::from(self.zero_offset());
        }
        Ok((sum as f64 / num_avgs as f64) / self.scale_factor())
    }

    /// One calibrated median pushed into a caller-owned window; returns the
    /// window mean
    ///
    /// Early on the window holds fewer readings than its capacity and the
    /// mean covers only what has been pushed so far.
    pub fn read_median_then_moving_avg(
        &mut self,
        num_readings: usize,
        window: &mut MovingAverage,
    ) -> Result<f64> {
        let value = self.read_median(num_readings)?;
        window.push(value);
        Ok(window.mean())
    }
}
