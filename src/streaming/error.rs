//! Error types for streaming operations.

use crate::AnalysisError;
use std::time::Duration;

/// Streaming-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Spectral analysis failure surfaced through the streaming layer
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Raw socket I/O failure
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// Stream configuration errors
    #[error("Invalid stream configuration: {0}")]
    InvalidConfig(String),

    /// Stream ended unexpectedly
    #[error("Stream ended unexpectedly: {0}")]
    UnexpectedEnd(String),

    /// Timeout during stream operation
    #[error("Operation '{operation}' timed out after {}ms", duration.as_millis())]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// A record on the wire could not be decoded
    #[error("Protocol error: {protocol} - {details}")]
    Protocol {
        protocol: &'static str,
        details: String,
    },

    /// No async runtime was available to host the background tasks
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Connection-related errors
    #[error("Connection error during {operation}: {source}")]
    Connection {
        operation: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StreamError {
    /// Create a connection error for the named operation
    pub fn connection(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a protocol error
    pub fn protocol(protocol: &'static str, details: impl Into<String>) -> Self {
        Self::Protocol {
            protocol,
            details: details.into(),
        }
    }

    /// Check if this is a recoverable error.
    ///
    /// Only a malformed record is recovered locally (it is skipped); every
    /// other error ends the client that raised it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Check if this is a fatal error that should terminate the stream
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

impl Clone for StreamError {
    fn clone(&self) -> Self {
        match self {
            Self::Analysis(err) => Self::Analysis(err.clone()),
            Self::Network(err) => Self::Network(std::io::Error::new(err.kind(), err.to_string())),
            Self::InvalidConfig(msg) => Self::InvalidConfig(msg.clone()),
            Self::UnexpectedEnd(msg) => Self::UnexpectedEnd(msg.clone()),
            Self::Timeout {
                operation,
                duration,
            } => Self::Timeout {
                operation: operation.clone(),
                duration: *duration,
            },
            Self::Protocol { protocol, details } => Self::Protocol {
                protocol,
                details: details.clone(),
            },
            Self::Runtime(msg) => Self::Runtime(msg.clone()),
            Self::Connection { operation, source } => Self::Connection {
                operation: operation.clone(),
                source: Box::new(std::io::Error::other(source.to_string())),
            },
        }
    }
}

/// Result type for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;
