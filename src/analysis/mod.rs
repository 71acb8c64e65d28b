//! Windowed spectral analysis with artifact rejection.

pub mod analyzer;
pub mod spectrum;

pub use analyzer::{AnalyzerConfig, AnalyzerStats, SpectralAnalyzer};
pub use spectrum::{AnalysisOutcome, BatchTransform, Spectrum, analyze_batch, frequency_bins, is_artifact};
