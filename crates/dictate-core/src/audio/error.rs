//! Audio-specific error types (C1/C2/C3)

use std::fmt;

/// Errors that can occur during audio capture and processing.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// No compatible device was found during the C1 selection policy.
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to open or run a capture stream.
    #[error("Recording failed: {0}")]
    RecordingFailed(String),

    /// Failed to encode audio data (e.g. building the fallback WAV).
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// Invalid stream configuration.
    #[error("Invalid stream configuration: {0}")]
    InvalidConfig(String),

    /// Resampling error (C2).
    #[error("Resampling error: {0}")]
    ResamplingError(String),

    /// Noise suppression error (C2).
    #[error("Noise suppression error: {0}")]
    NoiseSuppressionError(String),

    /// I/O error during audio operations.
    #[error("Audio I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic audio error.
    #[error("{0}")]
    Other(String),
}

impl AudioError {
    pub fn device_not_found(device: impl fmt::Display) -> Self {
        Self::DeviceNotFound(device.to_string())
    }

    pub fn recording_failed(msg: impl fmt::Display) -> Self {
        Self::RecordingFailed(msg.to_string())
    }

    pub fn encoding_failed(msg: impl fmt::Display) -> Self {
        Self::EncodingFailed(msg.to_string())
    }
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(err: cpal::BuildStreamError) -> Self {
        AudioError::RecordingFailed(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(err: cpal::PlayStreamError) -> Self {
        AudioError::RecordingFailed(err.to_string())
    }
}

impl From<cpal::DevicesError> for AudioError {
    fn from(err: cpal::DevicesError) -> Self {
        AudioError::DeviceNotFound(err.to_string())
    }
}
