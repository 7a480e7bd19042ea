//! Background sampler: a long-lived thread that keeps a moving average fresh
//!
//! The sampler owns the chip driver outright and continuously refreshes a
//! shared moving-average value until cancelled. It communicates with its
//! caller through exactly three primitives, each single-writer:
//!
//! - [`CancelToken`] - caller writes, sampler reads (the stop signal)
//! - a published `f64` cell - sampler writes, caller reads (the average)
//! - a completion channel whose sender is dropped when the loop exits - a
//!   one-shot broadcast-on-close signal observable by any number of waiters
//!
//! Transient errors never stop the loop: reset failures are retried with a
//! fixed backoff and read failures are logged and skipped, so the published
//! value always reflects the last successful reading. Only cancellation
//! stops the sampler.
//!
//! # Example
//!
//! ```ignore
//! use hx711_rs::{config::SamplingConfig, sampler::BackgroundSampler};
//!
//! let scale = hx711_rs::gpio::open(6, 5)?;
//! let handle = BackgroundSampler::spawn(scale, SamplingConfig::default());
//!
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! println!("weight: {}", handle.latest());
//!
//! handle.stop();
//! handle.wait();
//! ```

use crate::config::SamplingConfig;
use crate::driver::Hx711;
use crate::pins::{ClockOutput, DataInput};
use crate::sampling::{CancelToken, MovingAverage};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Backoff between reset attempts while the chip is still settling
const RESET_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Shared cell holding the most recently published moving average
///
/// Single writer (the sampler), any number of readers. The value is stored
/// as `f64` bits in an atomic so readers always observe a complete write.
#[derive(Debug, Default)]
struct SharedAverage {
    bits: AtomicU64,
    updates: AtomicU64,
}

impl SharedAverage {
    fn publish(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::SeqCst);
        self.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Caller-side handle to a running [`BackgroundSampler`]
#[derive(Debug, Clone)]
pub struct SamplerHandle {
    cancel: CancelToken,
    latest: Arc<SharedAverage>,
    done: Receiver<()>,
}

impl SamplerHandle {
    /// Most recently published moving average
    ///
    /// Reflects the last successful reading; starts at 0.0 before the first
    /// batch completes and never changes to an error marker on failure.
    pub fn latest(&self) -> f64 {
        self.latest.load()
    }

    /// Number of times the average has been published
    ///
    /// Useful for telling "no reading yet" apart from a genuine 0.0.
    pub fn update_count(&self) -> u64 {
        self.latest.updates.load(Ordering::SeqCst)
    }

    /// Request the sampler to stop
    ///
    /// Honored mid-batch; the sampler shuts the chip down and fires the
    /// completion signal once the loop exits.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Block until the sampler has fully stopped
    pub fn wait(&self) {
        // the sender is dropped when the loop exits, closing the channel
        let _ = self.done.recv();
    }

    /// Block until the sampler has stopped or the timeout elapses
    ///
    /// Returns true if the sampler stopped within the timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
            // nothing is ever sent on this channel
            Ok(()) => true,
        }
    }

    /// A clonable completion receiver for additional waiters
    ///
    /// The channel never carries a message; it disconnects exactly once when
    /// the sampler exits.
    pub fn completion(&self) -> Receiver<()> {
        self.done.clone()
    }
}

/// Continuously samples the chip and republishes a moving average
pub struct BackgroundSampler<C, D> {
    scale: Hx711<C, D>,
    config: SamplingConfig,
    cancel: CancelToken,
    latest: Arc<SharedAverage>,
    // held only so the drop at the end of run() closes the channel
    _done: Sender<()>,
}

impl<C, D> BackgroundSampler<C, D>
where
    C: ClockOutput,
    D: DataInput,
{
    /// Create a sampler and its caller-side handle
    ///
    /// The sampler does nothing until [`run`](Self::run) is called, usually
    /// on a dedicated thread; [`spawn`](Self::spawn) does both.
    pub fn new(scale: Hx711<C, D>, config: SamplingConfig) -> (Self, SamplerHandle) {
        let cancel = CancelToken::new();
        let latest = Arc::new(SharedAverage::default());
        let (done_tx, done_rx) = bounded::<()>(0);

        let sampler = Self {
            scale,
            config,
            cancel: cancel.clone(),
            latest: Arc::clone(&latest),
            _done: done_tx,
        };
        let handle = SamplerHandle {
            cancel,
            latest,
            done: done_rx,
        };
        (sampler, handle)
    }

    /// Spawn the sampler on a new thread and return its handle
    pub fn spawn(scale: Hx711<C, D>, config: SamplingConfig) -> SamplerHandle
    where
        C: 'static,
        D: 'static,
    {
        let (sampler, handle) = Self::new(scale, config);
        std::thread::spawn(move || sampler.run());
        handle
    }

    /// Run the sampling loop until cancelled
    ///
    /// Resets the chip first, retrying with a fixed backoff: reset failures
    /// are expected while the chip is still settling from a previous power
    /// cycle and are not fatal. On exit the chip is shut down and the
    /// completion channel closes.
    pub fn run(mut self) {
        tracing::debug!("background sampler started");

        // window capacity was validated by SamplingConfig
        let mut window = match MovingAverage::new(self.config.num_avgs) {
            Ok(window) => window,
            Err(err) => {
                tracing::error!(error = %err, "invalid sampler configuration");
                return;
            }
        };

        while !self.cancel.is_cancelled() {
            match self.scale.reset() {
                Ok(()) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "reset failed, retrying");
                    std::thread::sleep(RESET_RETRY_BACKOFF);
                }
            }
        }

        while !self.cancel.is_cancelled() {
            let raw = match self
                .scale
                .read_median_raw_cancellable(self.config.num_readings, &self.cancel)
            {
                Ok(raw) => raw,
                Err(err) if err.is_cancelled() => continue,
                Err(err) => {
                    tracing::warn!(error = %err, "median batch failed, retrying");
                    continue;
                }
            };

            window.push(self.scale.calibrated(raw));
            self.latest.publish(window.mean());
        }

        if let Err(err) = self.scale.shutdown() {
            tracing::warn!(error = %err, "shutdown after stop failed");
        }
        tracing::debug!("background sampler stopped");
        // _done drops here, broadcasting completion to every waiter
    }
}
