//! Sample source implementations for streaming.

pub mod synthetic;
pub mod tcp;

// Re-export main source types
pub use synthetic::{SyntheticConfig, SyntheticSource};
pub use tcp::{TcpConfig, TcpRecordSource};
