//! Batch-to-spectrum transform.
//!
//! A batch is rejected outright when any sample reaches the artifact
//! threshold in either direction. Accepted batches go through a forward DFT;
//! the retained bins are `first_bin..first_bin + max_bins` (clamped to the
//! `n / 2 + 1` non-negative bins) and each magnitude is `|Re(X_k)|`.
//!
//! The frequency axis uses a sample spacing of `2 / fs`, so bin `k` of an
//! `n`-point batch sits at `k * fs / (2n)` Hz.

use super::analyzer::AnalyzerConfig;
use crate::streaming::protocol::RawSample;
use crate::{AnalysisError, AnalysisResult};
use num_complex::Complex;
use rustfft::FftPlanner;

/// Paired frequency bins and magnitudes for one accepted batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spectrum {
    pub frequencies: Vec<f64>,
    pub magnitudes: Vec<f64>,
}

impl Spectrum {
    /// Number of retained bins.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// True when no bins were retained.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Iterate over `(frequency, magnitude)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.magnitudes.iter().copied())
    }

    /// Bin with the largest magnitude.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.iter().max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Result of analysing one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The batch was clean; here is its spectrum.
    Accepted(Spectrum),
    /// The batch contained an artifact and was discarded.
    Rejected { min: RawSample, max: RawSample },
}

impl AnalysisOutcome {
    /// The spectrum, if the batch was accepted.
    pub fn spectrum(self) -> Option<Spectrum> {
        match self {
            Self::Accepted(spectrum) => Some(spectrum),
            Self::Rejected { .. } => None,
        }
    }
}

/// True when any sample reaches `threshold` in magnitude.
pub fn is_artifact(batch: &[RawSample], threshold: RawSample) -> bool {
    batch.iter().any(|&s| s >= threshold || s <= -threshold)
}

/// Frequencies of the retained bins for an `n`-point batch.
pub fn frequency_bins(n: usize, config: &AnalyzerConfig) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let spacing = 2.0 / config.sample_rate_hz;
    let scale = 1.0 / (n as f64 * spacing);
    retained_bins(n, config).map(|k| k as f64 * scale).collect()
}

fn retained_bins(n: usize, config: &AnalyzerConfig) -> std::ops::Range<usize> {
    let available = n / 2 + 1;
    let start = config.first_bin.min(available);
    let end = config.first_bin.saturating_add(config.max_bins).min(available);
    start..end
}

/// Reusable transform; keeps the FFT planner's plan cache between batches.
pub struct BatchTransform {
    config: AnalyzerConfig,
    planner: FftPlanner<f64>,
}

impl BatchTransform {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            planner: FftPlanner::new(),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Reject or transform one batch.
    pub fn analyze(&mut self, batch: &[RawSample]) -> AnalysisResult<AnalysisOutcome> {
        let n = batch.len();
        if n == 0 {
            return Err(AnalysisError::EmptyBatch);
        }

        if self.config.reject_artifacts && is_artifact(batch, self.config.artifact_threshold) {
            let min = batch.iter().copied().min().unwrap_or_default();
            let max = batch.iter().copied().max().unwrap_or_default();
            return Ok(AnalysisOutcome::Rejected { min, max });
        }

        let fft = self.planner.plan_fft_forward(n);
        let mut buffer: Vec<Complex<f64>> = batch
            .iter()
            .map(|&s| Complex::new(f64::from(s), 0.0))
            .collect();
        fft.process(&mut buffer);

        let magnitudes = buffer[retained_bins(n, &self.config)]
            .iter()
            .map(|x| x.re.abs())
            .collect();

        Ok(AnalysisOutcome::Accepted(Spectrum {
            frequencies: frequency_bins(n, &self.config),
            magnitudes,
        }))
    }
}

/// One-shot convenience wrapper around [`BatchTransform`].
pub fn analyze_batch(
    batch: &[RawSample],
    config: &AnalyzerConfig,
) -> AnalysisResult<AnalysisOutcome> {
    BatchTransform::new(config.clone()).analyze(batch)
}
