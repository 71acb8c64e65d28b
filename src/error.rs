//! Error types and result utilities for spectral analysis.

use thiserror::Error;

/// Convenience type alias for results that may contain AnalysisError
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Error types that can occur while turning a batch into a spectrum.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A batch with no samples reached the transform.
    #[error("Cannot analyse an empty batch")]
    EmptyBatch,

    /// Error that occurs when analyzer parameters are out of range.
    ///
    /// This includes a zero batch resolution, a non-positive sample rate, or a
    /// bin window that starts beyond the transform length.
    #[error("Invalid analyzer configuration: {0}")]
    InvalidConfig(String),

    /// The analyzer was created outside of an async runtime.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl AnalysisError {
    /// Create an invalid configuration error
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig(details.into())
    }
}
