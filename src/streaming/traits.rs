//! Core traits for the acquisition pipeline.

use super::error::StreamResult;
use super::protocol::{RawSample, Record, SignalQuality};
use std::future::Future;

/// One value delivered by a [`SampleSource`]: a raw sample, plus a quality
/// report when the source had one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub raw: RawSample,
    pub quality: Option<SignalQuality>,
}

impl Reading {
    /// A raw sample with no quality report.
    pub const fn raw(raw: RawSample) -> Self {
        Self { raw, quality: None }
    }

    /// A raw sample reported together with a quality value.
    pub const fn with_quality(raw: RawSample, quality: SignalQuality) -> Self {
        Self {
            raw,
            quality: Some(quality),
        }
    }
}

impl From<Record> for Reading {
    fn from(record: Record) -> Self {
        Self {
            raw: record.raw_sample(),
            quality: record.signal_quality(),
        }
    }
}

/// Represents a source that can provide readings in real-time.
///
/// The acquisition loop in [`StreamClient`](super::StreamClient) only talks
/// to this trait, so the network bridge and the synthetic generator are
/// interchangeable.
pub trait SampleSource: Send {
    /// Short human-readable name used in log output.
    fn name(&self) -> &'static str;

    /// Establish the source (connect and handshake for network sources).
    ///
    /// The client moves from `Initializing` to `Streaming` once this returns `Ok`.
    fn open(&mut self) -> impl Future<Output = StreamResult<()>> + Send;

    /// Wait for the next batch of readings.
    ///
    /// An empty vector is valid (a read that completed no record). Any error
    /// is treated as fatal by the caller.
    fn next_readings(&mut self) -> impl Future<Output = StreamResult<Vec<Reading>>> + Send;

    /// Records dropped so far because they could not be decoded.
    fn skipped_records(&self) -> u64 {
        0
    }
}

/// Consumes every sample the client publishes.
pub trait SampleSink: Send + Sync {
    /// Called once per published sample, in wire order.
    fn push_sample(&self, sample: RawSample);

    /// Called once when the client closes. No more samples follow.
    fn on_close(&self) {}
}
