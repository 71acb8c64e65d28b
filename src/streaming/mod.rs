//! Acquisition from the ThinkGear Connector bridge (or a synthetic stand-in).
//!
//! This module provides:
//! - The bridge wire protocol: handshake, record framing and decoding
//! - A TCP source and a synthetic Gaussian source behind one [`SampleSource`] trait
//! - [`StreamClient`], which runs the acquisition loop and publishes the latest values
//! - [`RateMonitor`], which measures samples per second
//!
//! # Example
//!
//! ```rust,no_run
//! use neurosky_stream::streaming::{ClientConfig, StreamClient, StreamError};
//!
//! async fn watch_headset() -> Result<(), StreamError> {
//!     let client = StreamClient::new(ClientConfig::network());
//!     client.start()?;
//!
//!     // ... read client.latest_sample() / client.latest_quality() from the UI ...
//!
//!     client.join().await
//! }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod rate;
pub mod sources;
pub mod traits;

#[cfg(test)]
pub(crate) mod tests;

// Re-export main types for convenience
pub use error::{StreamError, StreamResult};

pub use traits::{Reading, SampleSink, SampleSource};

pub use client::{ClientConfig, ConnectionState, StreamClient};

pub use protocol::{ControlMessage, RawSample, Record, RecordFramer, SignalQuality, decode_record};

pub use rate::RateMonitor;

pub use sources::{SyntheticConfig, SyntheticSource, TcpConfig, TcpRecordSource};
