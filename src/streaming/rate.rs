//! Samples-per-second measurement.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Length of one counting window.
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct RateState {
    counter: AtomicU64,
    rate: AtomicU64,
    windows: AtomicU64,
    verbose: AtomicBool,
}

/// Counts samples per one-second window and publishes the last full count.
///
/// Cloning yields another handle to the same counters.
#[derive(Debug, Clone, Default)]
pub struct RateMonitor {
    state: Arc<RateState>,
}

impl RateMonitor {
    /// Create a monitor with a zero rate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrate each published rate at `info` level instead of `debug`.
    pub fn set_verbose(&self, verbose: bool) {
        self.state.verbose.store(verbose, Ordering::Relaxed);
    }

    /// Count one received sample.
    pub fn record(&self) {
        self.state.counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count `n` received samples.
    pub fn record_many(&self, n: u64) {
        self.state.counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Samples received in the last completed window.
    pub fn current(&self) -> u64 {
        self.state.rate.load(Ordering::Acquire)
    }

    /// Number of windows published so far.
    pub fn windows_completed(&self) -> u64 {
        self.state.windows.load(Ordering::Acquire)
    }

    /// Close the current window: publish its count and start a new one.
    pub fn roll_over(&self) -> u64 {
        let count = self.state.counter.swap(0, Ordering::AcqRel);
        self.state.rate.store(count, Ordering::Release);
        self.state.windows.fetch_add(1, Ordering::AcqRel);

        if self.state.verbose.load(Ordering::Relaxed) {
            info!(rate = count, "Sampling rate");
        } else {
            debug!(rate = count, "Sampling rate");
        }
        count
    }

    /// Run the one-second window on the current runtime until `cancel` fires.
    ///
    /// The counter is reset at spawn time, so the first published rate covers
    /// a full window.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let monitor = self.clone();
        monitor.state.counter.store(0, Ordering::Release);
        let first_tick = Instant::now() + RATE_WINDOW;

        tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, RATE_WINDOW);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        monitor.roll_over();
                    }
                }
            }
        })
    }
}
