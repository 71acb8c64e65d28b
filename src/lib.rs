// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::box_collection)] // Warns on boxed `Vec`, `String`, etc.
#![warn(clippy::vec_box)] // Avoids using `Vec<Box<T>>` when unnecessary
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::let_unit_value)] // Avoids binding `()` to variables
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_safety_doc)] // Docs for `unsafe` functions

//! # neurosky_stream
//!
//! Live acquisition and windowed spectral analysis for NeuroSky ThinkGear
//! headsets.
//!
//! ## Overview
//!
//! The headset is read through the ThinkGear Connector bridge, which serves
//! newline/carriage-return separated JSON records on `127.0.0.1:13854`. The
//! crate is split into two layers:
//!
//! - [`streaming`]: the bridge protocol, a TCP source, a synthetic Gaussian
//!   source for running without hardware, the acquisition client and a
//!   samples-per-second monitor.
//! - [`analysis`]: a batcher that collects 250 samples, rejects batches that
//!   contain artifacts, and turns clean batches into a magnitude spectrum.
//!
//! [`NeuroSky`] ties the two together and exposes the values a display layer
//! polls.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use neurosky_stream::{HeadsetConfig, NeuroSky, StreamResult};
//!
//! async fn run() -> StreamResult<()> {
//!     let headset = NeuroSky::start(HeadsetConfig::synthetic())?;
//!
//!     if let Some(spectrum) = headset.fft_data() {
//!         for (frequency, magnitude) in spectrum.iter() {
//!             println!("{frequency:6.2} Hz  {magnitude:.1}");
//!         }
//!     }
//!     println!("rate: {} samples/s", headset.sample_rate());
//!
//!     headset.close();
//!     headset.join().await
//! }
//! ```
//!
//! ## Error Handling
//!
//! Analysis failures are [`AnalysisError`]s; everything on the acquisition
//! side is a [`StreamError`], which wraps analysis errors when they cross the
//! boundary.
//!
//! ```rust
//! use neurosky_stream::{AnalysisError, StreamError};
//!
//! let err: StreamError = AnalysisError::EmptyBatch.into();
//! match err {
//!     StreamError::Analysis(inner) => eprintln!("analysis failed: {inner}"),
//!     other if other.is_recoverable() => eprintln!("skipped: {other}"),
//!     other => eprintln!("fatal: {other}"),
//! }
//! ```
//!
//! ## Logging
//!
//! Progress and failures are reported through [`tracing`]; install any
//! subscriber to see them. Setting `verbose` on [`ClientConfig`] promotes the
//! progress narration from `debug` to `info`.

mod error;

pub mod analysis;
pub mod headset;
pub mod streaming;

pub use crate::error::{AnalysisError, AnalysisResult};

pub use crate::analysis::{
    AnalysisOutcome, AnalyzerConfig, AnalyzerStats, BatchTransform, SpectralAnalyzer, Spectrum,
    analyze_batch, frequency_bins, is_artifact,
};

pub use crate::headset::{HeadsetConfig, NeuroSky};

pub use crate::streaming::{
    ClientConfig, ConnectionState, RateMonitor, RawSample, Record, SignalQuality, StreamClient,
    StreamError, StreamResult, SyntheticConfig, TcpConfig,
};
