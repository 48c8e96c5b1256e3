//! Unified error types for dictate-core.
//!
//! # Error Hierarchy
//!
//! ```text
//! DictateError
//!   ├── Audio(AudioError)       - device, capture, processing errors (C1/C2/C3)
//!   ├── Realtime(RealtimeError) - connection/protocol errors (C4/C5)
//!   ├── Inject(InjectError)     - output-injection backend errors (C10)
//!   ├── Config(String)          - startup configuration errors
//!   ├── Filter(String)          - filter-rule-file parse errors (C9)
//!   ├── Io(std::io::Error)      - generic I/O errors
//!   └── Other(String)           - anyhow bridge
//! ```

pub use crate::audio::AudioError;
pub use crate::inject::InjectError;
pub use crate::realtime::RealtimeError;

/// Top-level error type for dictate-core operations.
#[derive(Debug, thiserror::Error)]
pub enum DictateError {
    /// Audio device, capture or processing errors.
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Realtime connection or protocol errors.
    #[error("Realtime error: {0}")]
    Realtime(#[from] RealtimeError),

    /// Output injection backend errors.
    #[error("Output injection error: {0}")]
    Inject(#[from] InjectError),

    /// Startup configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filter-rule-file parse errors (non-fatal; caller keeps prior rules).
    #[error("Filter configuration error: {0}")]
    Filter(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error bridge.
    #[error("{0}")]
    Other(String),
}

impl DictateError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a filter configuration error.
    pub fn filter(msg: impl Into<String>) -> Self {
        Self::Filter(msg.into())
    }

    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Convenience result type using `DictateError`.
pub type Result<T> = std::result::Result<T, DictateError>;

impl From<anyhow::Error> for DictateError {
    fn from(err: anyhow::Error) -> Self {
        DictateError::Other(err.to_string())
    }
}
