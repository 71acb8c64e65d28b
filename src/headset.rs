//! One-stop handle for a headset session.
//!
//! [`NeuroSky`] wires a [`StreamClient`] to a [`SpectralAnalyzer`] and exposes
//! the values a display layer polls: the latest raw sample, the poor-signal
//! level, the latest spectrum, the sampling rate and whether the session is
//! still open.

use crate::analysis::{AnalyzerConfig, AnalyzerStats, SpectralAnalyzer, Spectrum};
use crate::streaming::{
    ClientConfig, ConnectionState, RawSample, SampleSink, SampleSource, SignalQuality,
    StreamClient, StreamResult,
};
use std::sync::Arc;

/// Configuration for a [`NeuroSky`] session.
#[derive(Debug, Clone, Default)]
pub struct HeadsetConfig {
    pub client: ClientConfig,
    pub analyzer: AnalyzerConfig,
}

impl HeadsetConfig {
    /// Read from the bridge on `127.0.0.1:13854`.
    pub fn network() -> Self {
        Self::default()
    }

    /// Use generated samples instead of a headset.
    pub fn synthetic() -> Self {
        Self {
            client: ClientConfig::synthetic(),
            ..Self::default()
        }
    }
}

/// A running acquisition + analysis session.
pub struct NeuroSky {
    client: StreamClient,
    analyzer: SpectralAnalyzer,
}

impl NeuroSky {
    /// Start a session with the source selected by `config.client`.
    pub fn start(config: HeadsetConfig) -> StreamResult<Self> {
        let session = Self::build(config)?;
        session.client.start()?;
        Ok(session)
    }

    /// Start a session reading from an explicit source.
    pub fn start_with_source<S>(config: HeadsetConfig, source: S) -> StreamResult<Self>
    where
        S: SampleSource + 'static,
    {
        let session = Self::build(config)?;
        session.client.start_with_source(source)?;
        Ok(session)
    }

    fn build(config: HeadsetConfig) -> StreamResult<Self> {
        let analyzer = SpectralAnalyzer::new(config.analyzer)?;
        let sink: Arc<dyn SampleSink> = Arc::new(analyzer.clone());
        let client = StreamClient::with_sinks(config.client, vec![sink]);
        Ok(Self { client, analyzer })
    }

    /// Latest raw sample.
    pub fn raw_data(&self) -> RawSample {
        self.client.latest_sample()
    }

    /// Latest poor-signal level, `0..=200`.
    pub fn poor_signal_level(&self) -> SignalQuality {
        self.client.latest_quality()
    }

    /// Latest spectrum; `None` until the first clean batch is analysed.
    pub fn fft_data(&self) -> Option<Arc<Spectrum>> {
        self.analyzer.spectrum()
    }

    pub fn spectrum_available(&self) -> bool {
        self.analyzer.spectrum_available()
    }

    /// Samples received in the last full second.
    pub fn sample_rate(&self) -> u64 {
        self.client.sample_rate()
    }

    pub fn is_open(&self) -> bool {
        self.client.is_open()
    }

    pub fn state(&self) -> ConnectionState {
        self.client.state()
    }

    pub fn analyzer_stats(&self) -> AnalyzerStats {
        self.analyzer.stats()
    }

    pub fn client(&self) -> &StreamClient {
        &self.client
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    /// Request shutdown. Idempotent.
    pub fn close(&self) {
        self.client.close();
    }

    /// Wait for acquisition to end; returns the fatal error, if any.
    pub async fn join(&self) -> StreamResult<()> {
        self.client.join().await
    }
}
