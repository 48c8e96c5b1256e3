//! Gain-only / passthrough processor: used when noise suppression is disabled.
//!
//! Gain is linear and commutes with resampling, so a gain-only request is
//! applied directly in the 24kHz domain without paying for a resample round
//! trip through 16kHz — that round trip exists solely to feed the noise
//! suppressor its expected sample rate.

use super::{AudioProcessor, ProcessorConfig};
use crate::audio::error::AudioError;

pub struct PassthroughProcessor {
    gain: f32,
}

impl PassthroughProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { gain: config.gain }
    }
}

impl AudioProcessor for PassthroughProcessor {
    fn process(&mut self, pcm24k: &[u8]) -> Result<Vec<u8>, AudioError> {
        if (self.gain - 1.0).abs() <= f32::EPSILON {
            return Ok(pcm24k.to_vec());
        }
        Ok(apply_gain(pcm24k, self.gain))
    }

    fn flush(&mut self) -> Result<Vec<u8>, AudioError> {
        Ok(Vec::new())
    }
}

pub(super) fn apply_gain(pcm: &[u8], gain: f32) -> Vec<u8> {
    let mut out = Vec::with_capacity(pcm.len());
    for chunk in pcm.chunks_exact(2) {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        let scaled = (sample as f32 * gain).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        out.extend_from_slice(&scaled.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_gain_is_identity() {
        let mut p = PassthroughProcessor::new(ProcessorConfig {
            noise_suppression_level: 0,
            gain: 1.0,
        });
        let pcm = vec![0x00, 0x10, 0xFF, 0x7F];
        assert_eq!(p.process(&pcm).unwrap(), pcm);
    }

    #[test]
    fn gain_clamps_at_i16_bounds() {
        let pcm = i16::MAX.to_le_bytes().to_vec();
        let out = apply_gain(&pcm, 2.0);
        assert_eq!(i16::from_le_bytes([out[0], out[1]]), i16::MAX);
    }
}
