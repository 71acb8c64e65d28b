//! Batching spectral analyzer.
//!
//! Samples are appended to a live batch. When the batch reaches
//! `resolution` it is swapped for an empty one under the same lock and moved
//! into a single-slot hand-off read by one background worker. If the worker
//! is still busy when another batch fills, the newer batch replaces the one
//! waiting in the slot, so at most one analysis runs and at most one waits.

use super::spectrum::{AnalysisOutcome, BatchTransform, Spectrum};
use crate::streaming::protocol::RawSample;
use crate::streaming::traits::SampleSink;
use crate::{AnalysisError, AnalysisResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Configuration for [`SpectralAnalyzer`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Samples per batch
    pub resolution: usize,
    /// Batches with any `|sample| >= artifact_threshold` are discarded
    pub artifact_threshold: RawSample,
    /// Sample rate assumed by the frequency axis
    pub sample_rate_hz: f64,
    /// First retained DFT bin
    pub first_bin: usize,
    /// Maximum number of retained bins
    pub max_bins: usize,
    /// Whether artifact batches are discarded at all
    pub reject_artifacts: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            resolution: 250,
            artifact_threshold: 150,
            sample_rate_hz: 512.0,
            first_bin: 2,
            max_bins: 48,
            reject_artifacts: true,
        }
    }
}

impl AnalyzerConfig {
    /// Check that the configuration can produce a spectrum.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.resolution == 0 {
            return Err(AnalysisError::invalid_config("resolution must be > 0"));
        }
        if self.artifact_threshold <= 0 {
            return Err(AnalysisError::invalid_config(format!(
                "artifact_threshold must be > 0, got {}",
                self.artifact_threshold
            )));
        }
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(AnalysisError::invalid_config(format!(
                "sample_rate_hz must be a positive number, got {}",
                self.sample_rate_hz
            )));
        }
        if self.max_bins == 0 {
            return Err(AnalysisError::invalid_config("max_bins must be > 0"));
        }
        if self.first_bin > self.resolution / 2 {
            return Err(AnalysisError::invalid_config(format!(
                "first_bin {} is beyond the {} bins of a {}-point transform",
                self.first_bin,
                self.resolution / 2 + 1,
                self.resolution
            )));
        }
        Ok(())
    }
}

/// Snapshot of analyzer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzerStats {
    pub batches_dispatched: u64,
    pub batches_analyzed: u64,
    pub batches_rejected: u64,
    pub batches_superseded: u64,
    pub analysis_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    dispatched: AtomicU64,
    analyzed: AtomicU64,
    rejected: AtomicU64,
    superseded: AtomicU64,
    failures: AtomicU64,
}

/// State shared between the analyzer handles and the worker task.
struct Handoff {
    slot: Mutex<Option<Vec<RawSample>>>,
    notify: Notify,
    spectrum: watch::Sender<Option<Arc<Spectrum>>>,
    counters: Counters,
}

struct Inner {
    config: AnalyzerConfig,
    batch: Mutex<Vec<RawSample>>,
    handoff: Arc<Handoff>,
    closed: AtomicBool,
    cancel: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Turns a sample stream into a periodically refreshed [`Spectrum`].
///
/// Cloning yields another handle to the same analyzer.
#[derive(Clone)]
pub struct SpectralAnalyzer {
    inner: Arc<Inner>,
}

impl SpectralAnalyzer {
    /// Create an analyzer and spawn its worker on the current Tokio runtime.
    pub fn new(config: AnalyzerConfig) -> AnalysisResult<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AnalysisError::Runtime(e.to_string()))?;

        let (spectrum, _) = watch::channel(None);
        let handoff = Arc::new(Handoff {
            slot: Mutex::new(None),
            notify: Notify::new(),
            spectrum,
            counters: Counters::default(),
        });
        let cancel = CancellationToken::new();

        runtime.spawn(run_worker(
            Arc::clone(&handoff),
            BatchTransform::new(config.clone()),
            cancel.clone(),
        ));

        Ok(Self {
            inner: Arc::new(Inner {
                batch: Mutex::new(Vec::with_capacity(config.resolution)),
                config,
                handoff,
                closed: AtomicBool::new(false),
                cancel,
            }),
        })
    }

    /// Create an analyzer with the default 250-sample configuration.
    pub fn with_defaults() -> AnalysisResult<Self> {
        Self::new(AnalyzerConfig::default())
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.inner.config
    }

    /// Append one sample; dispatches the batch when it fills. Never blocks on analysis.
    pub fn append(&self, sample: RawSample) {
        let resolution = self.inner.config.resolution;
        let full = {
            let mut batch = self.inner.batch.lock();
            batch.push(sample);
            if batch.len() >= resolution {
                Some(std::mem::replace(
                    &mut *batch,
                    Vec::with_capacity(resolution),
                ))
            } else {
                None
            }
        };

        if let Some(batch) = full {
            self.dispatch(batch);
        }
    }

    fn dispatch(&self, batch: Vec<RawSample>) {
        if self.inner.closed.load(Ordering::Acquire) {
            trace!("Analyzer closed; dropping full batch");
            return;
        }

        let handoff = &self.inner.handoff;
        let stale = handoff.slot.lock().replace(batch);
        handoff.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        if stale.is_some() {
            handoff.counters.superseded.fetch_add(1, Ordering::Relaxed);
            debug!("Analysis still running; superseding the waiting batch");
        }
        handoff.notify.notify_one();
    }

    /// Number of samples in the batch currently being accumulated.
    pub fn pending_len(&self) -> usize {
        self.inner.batch.lock().len()
    }

    /// Latest published spectrum, if any batch has been accepted yet.
    pub fn spectrum(&self) -> Option<Arc<Spectrum>> {
        self.inner.handoff.spectrum.borrow().clone()
    }

    pub fn spectrum_available(&self) -> bool {
        self.inner.handoff.spectrum.borrow().is_some()
    }

    /// Receiver that is notified whenever a new spectrum is published.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Spectrum>>> {
        self.inner.handoff.spectrum.subscribe()
    }

    pub fn stats(&self) -> AnalyzerStats {
        let counters = &self.inner.handoff.counters;
        AnalyzerStats {
            batches_dispatched: counters.dispatched.load(Ordering::Relaxed),
            batches_analyzed: counters.analyzed.load(Ordering::Relaxed),
            batches_rejected: counters.rejected.load(Ordering::Relaxed),
            batches_superseded: counters.superseded.load(Ordering::Relaxed),
            analysis_failures: counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Stop dispatching new batches. A batch already handed off still completes.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            self.inner.cancel.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl SampleSink for SpectralAnalyzer {
    fn push_sample(&self, sample: RawSample) {
        self.append(sample);
    }

    fn on_close(&self) {
        self.close();
    }
}

async fn run_worker(handoff: Arc<Handoff>, mut transform: BatchTransform, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            _ = handoff.notify.notified() => {
                analyze_pending(&handoff, &mut transform);
            }
            _ = cancel.cancelled() => {
                analyze_pending(&handoff, &mut transform);
                break;
            }
        }
    }
    trace!("Spectral analysis worker stopped");
}

fn analyze_pending(handoff: &Handoff, transform: &mut BatchTransform) {
    let Some(batch) = handoff.slot.lock().take() else {
        return;
    };

    let counters = &handoff.counters;
    match transform.analyze(&batch) {
        Ok(AnalysisOutcome::Accepted(spectrum)) => {
            counters.analyzed.fetch_add(1, Ordering::Relaxed);
            handoff.spectrum.send_replace(Some(Arc::new(spectrum)));
        }
        Ok(AnalysisOutcome::Rejected { min, max }) => {
            counters.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(
                min,
                max,
                threshold = transform.config().artifact_threshold,
                "Discarding batch with artifact"
            );
        }
        Err(e) => {
            counters.failures.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Spectral analysis failed; keeping previous spectrum");
        }
    }
}
