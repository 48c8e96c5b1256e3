//! Real-time frame-by-frame resampling (C2).
//!
//! Generalized from the teacher's fixed device-rate-to-16kHz `FrameResampler`
//! into a bidirectional `from_rate -> to_rate` converter: C2's pipeline needs
//! both 24kHz->16kHz (feeding the noise suppressor its native rate) and
//! 16kHz->24kHz (back onto the wire format), not just "resample to Whisper's
//! rate" the way the teacher's local-transcription path did.

use anyhow::{Context, Result};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Target sample rate for the realtime wire protocol (C4).
pub const WIRE_SAMPLE_RATE: u32 = 24_000;

/// Real-time frame-by-frame resampler for audio callbacks.
pub struct FrameResampler {
    /// `None` when `from_rate == to_rate` (passthrough, mono only).
    resampler: Option<Fft<f32>>,
    channels: u16,
    input_buffer: Vec<f32>,
    chunk_size: usize,
}

impl FrameResampler {
    /// `channels` describes the *input* layout; output is always mono.
    pub fn new(from_rate: u32, to_rate: u32, channels: u16) -> Result<Self> {
        if from_rate == to_rate && channels == 1 {
            return Ok(Self { resampler: None, channels, input_buffer: Vec::new(), chunk_size: 0 });
        }

        let resampler = Fft::<f32>::new(
            from_rate as usize,
            to_rate as usize,
            1024,
            2,
            1,
            FixedSync::Input,
        )
        .context("failed to create frame resampler")?;

        let chunk_size = resampler.input_frames_max();
        Ok(Self {
            resampler: Some(resampler),
            channels,
            input_buffer: Vec::with_capacity(chunk_size * 2),
            chunk_size,
        })
    }

    /// Process incoming samples, returning whatever whole chunks of resampled
    /// output are now available (may be empty if not enough has accumulated).
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(resampler) = &mut self.resampler else {
            return samples.to_vec();
        };

        let mono_samples =
            if self.channels > 1 { stereo_to_mono(samples, self.channels) } else { samples.to_vec() };
        self.input_buffer.extend_from_slice(&mono_samples);

        let mut output = Vec::new();
        while self.input_buffer.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.input_buffer.drain(..self.chunk_size).collect();
            if let Ok(adapter) = InterleavedSlice::new(&chunk, 1, chunk.len())
                && let Ok(resampled) = resampler.process(&adapter, 0, None)
            {
                output.extend_from_slice(&resampled.take_data());
            }
        }
        output
    }

    /// Flush any buffered remainder, zero-padded to a full chunk.
    pub fn flush(&mut self) -> Vec<f32> {
        let Some(resampler) = &mut self.resampler else {
            return std::mem::take(&mut self.input_buffer);
        };
        if self.input_buffer.is_empty() {
            return Vec::new();
        }

        let mut padded = std::mem::take(&mut self.input_buffer);
        padded.resize(self.chunk_size, 0.0);

        if let Ok(adapter) = InterleavedSlice::new(&padded, 1, padded.len())
            && let Ok(resampled) = resampler.process(&adapter, 0, None)
        {
            resampled.take_data()
        } else {
            Vec::new()
        }
    }
}

fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    samples.chunks(channels as usize).map(|frame| frame.iter().sum::<f32>() / channels as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_when_rate_and_channels_already_match() {
        let mut r = FrameResampler::new(24_000, 24_000, 1).unwrap();
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(r.process(&samples), samples);
    }

    #[test]
    fn resampling_produces_output_once_enough_input_accumulates() {
        let mut r = FrameResampler::new(48_000, 16_000, 1).unwrap();
        let chunk = vec![0.0f32; 4096];
        let out = r.process(&chunk);
        assert!(out.is_empty() || out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn stereo_downmix_averages_channels() {
        let mono = stereo_to_mono(&[1.0, 3.0, 2.0, 4.0], 2);
        assert_eq!(mono, vec![2.0, 3.0]);
    }
}
