//! Integration tests for the background sampler lifecycle
//!
//! The fake chip never sleeps, so these tests run the full
//! reset -> sample -> publish -> cancel -> shutdown cycle in milliseconds.

mod common;

use common::FakeChip;
use hx711_rs::{BackgroundSampler, Level, SamplingConfig};
use std::time::{Duration, Instant};

fn small_config() -> SamplingConfig {
    SamplingConfig {
        num_readings: 3,
        num_avgs: 2,
    }
}

/// Poll until the condition holds or the timeout elapses
fn wait_for(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn publishes_calibrated_moving_average() {
    let chip = FakeChip::endless(500);
    let handle = BackgroundSampler::spawn(chip.driver(), small_config());

    assert!(
        wait_for(|| handle.update_count() >= 2, Duration::from_secs(2)),
        "sampler never published"
    );
    assert_eq!(handle.latest(), 500.0);

    handle.stop();
    assert!(handle.wait_timeout(Duration::from_secs(2)));
}

#[test]
fn stop_fires_completion_once_and_freezes_the_average() {
    let chip = FakeChip::endless(250);
    let handle = BackgroundSampler::spawn(chip.driver(), small_config());

    assert!(wait_for(|| handle.update_count() >= 1, Duration::from_secs(2)));

    handle.stop();
    assert!(handle.wait_timeout(Duration::from_secs(2)));

    // no further publishes once completion has fired
    let frozen_count = handle.update_count();
    let frozen_value = handle.latest();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(handle.update_count(), frozen_count);
    assert_eq!(handle.latest(), frozen_value);

    // a second wait returns immediately; the signal stays closed
    assert!(handle.wait_timeout(Duration::from_millis(10)));

    // the chip was shut down on the way out
    assert_eq!(chip.clock_level(), Level::High);
}

#[test]
fn completion_is_observable_by_multiple_waiters() {
    let chip = FakeChip::endless(42);
    let handle = BackgroundSampler::spawn(chip.driver(), small_config());

    let first = handle.completion();
    let second = handle.completion();

    handle.stop();
    assert!(handle.wait_timeout(Duration::from_secs(2)));

    // the channel never carries a message; it closes exactly once and every
    // clone observes the disconnect
    assert!(first.recv().is_err());
    assert!(second.recv().is_err());
}

#[test]
fn transient_read_errors_do_not_stop_the_loop() {
    let chip = FakeChip::endless(250);
    let handle = BackgroundSampler::spawn(chip.driver(), small_config());

    assert!(wait_for(|| handle.update_count() >= 1, Duration::from_secs(2)));

    // inject a burst of pin faults; the queue is served before the endless
    // value, so the next batches fail and must be logged and skipped
    for _ in 0..6 {
        chip.push_pulse_error();
    }

    let count_before = handle.update_count();
    assert!(
        wait_for(
            || handle.update_count() > count_before + 2,
            Duration::from_secs(2)
        ),
        "sampler stopped publishing after transient errors"
    );
    assert_eq!(handle.latest(), 250.0);

    handle.stop();
    assert!(handle.wait_timeout(Duration::from_secs(2)));
}
