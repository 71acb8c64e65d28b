//! Acquisition client.
//!
//! [`StreamClient`] owns the connection state and the published
//! raw-sample/quality cells. `start()` spawns one acquisition task that opens
//! the configured [`SampleSource`], then publishes every reading in wire
//! order, counting it in the [`RateMonitor`] and forwarding the sample
//! to each attached [`SampleSink`].
//!
//! Any error from the source is fatal: the client closes itself, and the
//! error is returned from [`StreamClient::join`].

use super::{
    error::{StreamError, StreamResult},
    protocol::{NO_CONTACT_LEVEL, RawSample, SignalQuality},
    rate::RateMonitor,
    sources::{SyntheticConfig, SyntheticSource, TcpConfig, TcpRecordSource},
    traits::{Reading, SampleSink, SampleSource},
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Connection lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Initializing = 0,
    Streaming = 1,
    Closed = 2,
}

impl ConnectionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Initializing,
            1 => Self::Streaming,
            _ => Self::Closed,
        }
    }

    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Configuration for [`StreamClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Use the synthetic generator instead of the bridge
    pub synthetic: bool,
    /// Narrate progress at `info` level; no behavioral effect
    pub verbose: bool,
    pub tcp: TcpConfig,
    pub synthetic_source: SyntheticConfig,
}

impl ClientConfig {
    /// Connect to the bridge on the default local endpoint.
    pub fn network() -> Self {
        Self::default()
    }

    /// Generate samples locally.
    pub fn synthetic() -> Self {
        Self {
            synthetic: true,
            ..Self::default()
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// State shared between the client handle and its acquisition task.
struct Shared {
    raw: AtomicI32,
    quality: AtomicI32,
    state: AtomicU8,
    published: AtomicU64,
    skipped: AtomicU64,
    verbose: AtomicBool,
    cancel: CancellationToken,
    rate: RateMonitor,
    sinks: Vec<Arc<dyn SampleSink>>,
    last_error: Mutex<Option<StreamError>>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `Streaming` unless already closed.
    fn mark_streaming(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Initializing as u8,
                ConnectionState::Streaming as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn narrate(&self, message: &str) {
        if self.verbose.load(Ordering::Relaxed) {
            info!("{message}");
        } else {
            debug!("{message}");
        }
    }

    fn publish(&self, reading: Reading) {
        let sample = reading.raw;
        if let Some(quality) = reading.quality {
            self.quality.store(quality, Ordering::Release);
            if quality == NO_CONTACT_LEVEL {
                self.narrate("Poor connection: headset reports no contact");
            }
        }
        self.raw.store(sample, Ordering::Release);
        self.published.fetch_add(1, Ordering::Relaxed);
        self.rate.record();

        for sink in &self.sinks {
            sink.push_sample(sample);
        }
    }

    fn close(&self) {
        let previous = self
            .state
            .swap(ConnectionState::Closed as u8, Ordering::AcqRel);
        if previous == ConnectionState::Closed as u8 {
            return;
        }
        self.cancel.cancel();
        for sink in &self.sinks {
            sink.on_close();
        }
        self.narrate("Connection closed");
    }

    fn fail(&self, error: StreamError) -> StreamError {
        error!(error = %error, "An error occurred, is the headset connected?");
        *self.last_error.lock() = Some(error.clone());
        self.close();
        error
    }
}

/// Streams samples from a [`SampleSource`] and publishes the latest values.
pub struct StreamClient {
    config: ClientConfig,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<StreamResult<()>>>>,
    started: AtomicBool,
}

impl StreamClient {
    /// Create a client with no sinks attached.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_sinks(config, Vec::new())
    }

    /// Create a client that forwards every published sample to `sinks`.
    pub fn with_sinks(config: ClientConfig, sinks: Vec<Arc<dyn SampleSink>>) -> Self {
        let rate = RateMonitor::new();
        rate.set_verbose(config.verbose);
        let shared = Arc::new(Shared {
            raw: AtomicI32::new(0),
            quality: AtomicI32::new(0),
            state: AtomicU8::new(ConnectionState::Initializing as u8),
            published: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            verbose: AtomicBool::new(config.verbose),
            cancel: CancellationToken::new(),
            rate,
            sinks,
            last_error: Mutex::new(None),
        });

        Self {
            config,
            shared,
            task: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start acquiring from the configured source. Returns immediately.
    ///
    /// Must be called from within a Tokio runtime. Connection failures are
    /// reported through [`join`](Self::join), not here.
    pub fn start(&self) -> StreamResult<()> {
        if self.config.synthetic {
            let source = SyntheticSource::new(self.config.synthetic_source.clone())?;
            self.start_with_source(source)
        } else {
            self.start_with_source(TcpRecordSource::new(self.config.tcp.clone()))
        }
    }

    /// Start acquiring from an explicit source. Returns immediately.
    pub fn start_with_source<S>(&self, source: S) -> StreamResult<()>
    where
        S: SampleSource + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| StreamError::Runtime(e.to_string()))?;
        if self.shared.state() == ConnectionState::Closed {
            return Err(StreamError::InvalidConfig(
                "client is closed; create a new StreamClient to reconnect".to_string(),
            ));
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(StreamError::InvalidConfig(
                "client has already been started".to_string(),
            ));
        }

        let handle = runtime.spawn(acquire(Arc::clone(&self.shared), source));
        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// Wait for the acquisition task to finish and return its outcome.
    ///
    /// Returns `Ok(())` after an explicit [`close`](Self::close), the fatal
    /// error otherwise. Subsequent calls return `Ok(())`.
    pub async fn join(&self) -> StreamResult<()> {
        let handle = self.task.lock().take();
        match handle {
            Some(handle) => handle.await.map_err(|e| {
                self.shared.fail(StreamError::Runtime(format!("acquisition task failed: {e}")))
            })?,
            None => Ok(()),
        }
    }

    /// Latest raw sample, 0 before the first record.
    pub fn latest_sample(&self) -> RawSample {
        self.shared.raw.load(Ordering::Acquire)
    }

    /// Latest signal quality, 0 before the first quality report.
    pub fn latest_quality(&self) -> SignalQuality {
        self.shared.quality.load(Ordering::Acquire)
    }

    /// Samples received in the last completed one-second window.
    pub fn sample_rate(&self) -> u64 {
        self.shared.rate.current()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.shared.state().is_open()
    }

    /// Total records published since start.
    pub fn records_published(&self) -> u64 {
        self.shared.published.load(Ordering::Relaxed)
    }

    /// Records the source dropped because they could not be decoded.
    pub fn records_skipped(&self) -> u64 {
        self.shared.skipped.load(Ordering::Relaxed)
    }

    /// The fatal error that closed this client, if any.
    pub fn last_error(&self) -> Option<StreamError> {
        self.shared.last_error.lock().clone()
    }

    /// Close the client. Idempotent and safe from any thread.
    pub fn close(&self) {
        self.shared.close();
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.shared.close();
    }
}

async fn acquire<S: SampleSource>(shared: Arc<Shared>, mut source: S) -> StreamResult<()> {
    let cancel = shared.cancel.clone();
    debug!(source = source.name(), "Opening sample source");

    let opened = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        opened = source.open() => opened,
    };
    if let Err(e) = opened {
        return Err(shared.fail(e));
    }
    if !shared.mark_streaming() {
        return Ok(());
    }

    shared.narrate("Initialising timer...");
    let rate_task = shared.rate.spawn(cancel.child_token());
    shared.narrate("Retrieving data...");

    let outcome = 'acquire: loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break 'acquire Ok(()),
            next = source.next_readings() => next,
        };
        match next {
            Ok(readings) => {
                for reading in readings {
                    shared.publish(reading);
                }
                shared
                    .skipped
                    .store(source.skipped_records(), Ordering::Relaxed);
            }
            Err(e) => break 'acquire Err(shared.fail(e)),
        }
    };

    drop(source);
    rate_task.abort();
    outcome
}
