//! Optional noise suppression + gain stage (C2).
//!
//! Operates on 24kHz mono PCM16 frames: resample to 16kHz, chunk into exact
//! 10ms/160-sample frames, run them through a noise suppressor, apply linear
//! gain, then resample back to 24kHz. Mirrors the teacher's real/no-op VAD
//! processor split (`audio::vad::{processor, processor_noop}`).

#[cfg(feature = "noise-suppression")]
mod real;
mod noop;

#[cfg(feature = "noise-suppression")]
pub use real::NoiseSuppressingProcessor;
pub use noop::PassthroughProcessor;

use crate::audio::error::AudioError;

/// 10ms at 16kHz: the frame size WebRTC-style noise suppressors operate on.
pub const PROCESSOR_CHUNK_SAMPLES: usize = 160;

/// Configuration for C2, resolved from `DictateConfig`.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorConfig {
    /// Noise suppression aggressiveness, 0 (disabled) through 4 (max).
    pub noise_suppression_level: u8,
    /// Linear gain multiplier applied after suppression.
    pub gain: f32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            noise_suppression_level: 0,
            gain: 1.0,
        }
    }
}

impl ProcessorConfig {
    pub fn is_active(&self) -> bool {
        self.noise_suppression_level > 0 || (self.gain - 1.0).abs() > f32::EPSILON
    }
}

/// Uniform interface for the real and no-op audio processors.
pub trait AudioProcessor: Send {
    /// Process one 24kHz mono PCM16 frame, returning zero or more 24kHz PCM16
    /// frames' worth of bytes (the resampler may buffer internally, so output
    /// size does not have to match input size one-to-one).
    fn process(&mut self, pcm24k: &[u8]) -> Result<Vec<u8>, AudioError>;

    /// Flush any buffered residue (pads the trailing partial 10ms chunk).
    fn flush(&mut self) -> Result<Vec<u8>, AudioError>;
}

/// Build the appropriate processor for `config`: a real noise-suppressing one
/// when the feature is compiled in and a level is requested, a passthrough
/// otherwise.
pub fn build_processor(config: ProcessorConfig) -> Box<dyn AudioProcessor> {
    #[cfg(feature = "noise-suppression")]
    if config.noise_suppression_level > 0 {
        match NoiseSuppressingProcessor::new(config) {
            Ok(p) => return Box::new(p),
            Err(e) => {
                crate::warn!("Falling back to passthrough audio processor: {}", e);
            }
        }
    }

    Box::new(PassthroughProcessor::new(config))
}
