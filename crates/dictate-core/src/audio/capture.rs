//! Continuous audio capture loop (C1).
//!
//! Unlike the teacher's push-to-talk `AudioRecorder`, this runs for the whole
//! life of the session: it opens one compatible input device and keeps yielding
//! 1024-sample/24kHz/mono/PCM16 frames until told to stop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tokio::sync::mpsc;

use super::devices;
use super::error::AudioError;
use super::types::{AudioFrame, FRAME_SAMPLES};

/// Wire sample rate required by the realtime protocol (C4).
pub const CAPTURE_SAMPLE_RATE: u32 = 24_000;
/// Channel count required by the realtime protocol.
pub const CAPTURE_CHANNELS: u16 = 1;

/// A running capture session. Dropping this stops the stream.
pub struct AudioCapture {
    stream: cpal::Stream,
    device_name: String,
}

// cpal::Stream is not Send on some platforms (notably macOS' CoreAudio handle);
// we only ever touch it from the thread that created and subsequently drops it.
unsafe impl Send for AudioCapture {}

impl AudioCapture {
    /// Open a compatible device and start streaming frames into the returned channel.
    ///
    /// Device selection policy (C1 §4.1): a PipeWire-named device matching
    /// `preferred_name_hint` first, then the system default, then any input
    /// device that supports 24kHz/mono/16-bit PCM.
    pub fn start(
        preferred_name_hint: Option<&str>,
        channel_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<AudioFrame>), AudioError> {
        devices::init_platform();
        let host = cpal::default_host();

        let device = select_device(&host, preferred_name_hint)?;
        let device_name = device
            .description()
            .map(|d| d.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());

        crate::info!("Audio device: {}", device_name);

        let config = StreamConfig {
            channels: CAPTURE_CHANNELS,
            sample_rate: SampleRate(CAPTURE_SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = mpsc::channel(channel_capacity);
        let frame_index = Arc::new(AtomicU32::new(0));
        let carry = Arc::new(std::sync::Mutex::new(Vec::<i16>::with_capacity(FRAME_SAMPLES * 2)));

        let stream = build_input_stream(&device, &config, tx, frame_index, carry)?;
        stream.play().map_err(AudioError::from)?;

        Ok((Self { stream, device_name }, rx))
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Stop capture; the device is released once the stream is dropped.
    pub fn stop(self) {
        let _ = self.stream.pause();
    }
}

fn select_device(
    host: &cpal::Host,
    preferred_name_hint: Option<&str>,
) -> Result<cpal::Device, AudioError> {
    let mut candidates: Vec<cpal::Device> = host
        .input_devices()
        .map_err(AudioError::from)?
        .collect();

    if let Some(hint) = preferred_name_hint {
        let hint_lower = hint.to_lowercase();
        if let Some(device) = candidates.iter().find(|d| {
            d.description()
                .map(|desc| desc.to_string().to_lowercase().contains(&hint_lower))
                .unwrap_or(false)
                && device_supports_capture_format(d)
        }) {
            return Ok(device.clone());
        }
    }

    if let Some(default) = host.default_input_device()
        && device_supports_capture_format(&default)
    {
        return Ok(default);
    }

    candidates
        .drain(..)
        .find(device_supports_capture_format)
        .ok_or_else(|| {
            AudioError::device_not_found(
                "no input device supports 24kHz mono 16-bit PCM capture",
            )
        })
}

fn device_supports_capture_format(device: &cpal::Device) -> bool {
    let Ok(configs) = device.supported_input_configs() else {
        return false;
    };
    configs.into_iter().any(|range| {
        range.channels() == CAPTURE_CHANNELS
            && range.min_sample_rate().0 <= CAPTURE_SAMPLE_RATE
            && range.max_sample_rate().0 >= CAPTURE_SAMPLE_RATE
            && matches!(
                range.sample_format(),
                SampleFormat::I16 | SampleFormat::F32 | SampleFormat::U16
            )
    })
}

type Carry = Arc<std::sync::Mutex<Vec<i16>>>;

fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    tx: mpsc::Sender<AudioFrame>,
    frame_index: Arc<AtomicU32>,
    carry: Carry,
) -> Result<cpal::Stream, AudioError> {
    let configs = device.supported_input_configs().map_err(AudioError::from)?;
    let sample_format = configs
        .into_iter()
        .find(|range| {
            range.channels() == CAPTURE_CHANNELS
                && range.min_sample_rate().0 <= CAPTURE_SAMPLE_RATE
                && range.max_sample_rate().0 >= CAPTURE_SAMPLE_RATE
        })
        .map(|range| range.sample_format())
        .unwrap_or(SampleFormat::I16);

    let err_fn = |err| crate::error!("Audio stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::I16 => {
            let (tx, frame_index, carry) = (tx.clone(), frame_index.clone(), carry.clone());
            device.build_input_stream(
                config,
                move |data: &[i16], _| {
                    emit_frames(data.iter().copied(), &tx, &frame_index, &carry)
                },
                err_fn,
                None,
            )
        }
        SampleFormat::F32 => {
            let (tx, frame_index, carry) = (tx.clone(), frame_index.clone(), carry.clone());
            device.build_input_stream(
                config,
                move |data: &[f32], _| {
                    emit_frames(data.iter().map(|&s| f32_to_i16(s)), &tx, &frame_index, &carry)
                },
                err_fn,
                None,
            )
        }
        SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _| {
                emit_frames(
                    data.iter().map(|&s| (s as i32 - 32768) as i16),
                    &tx,
                    &frame_index,
                    &carry,
                )
            },
            err_fn,
            None,
        ),
        other => {
            return Err(AudioError::InvalidConfig(format!(
                "unsupported sample format {other:?}"
            )));
        }
    }
    .map_err(AudioError::from)?;

    Ok(stream)
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Accumulate incoming samples (cpal callback buffers are typically far smaller
/// than `FRAME_SAMPLES`) and emit one `AudioFrame` per complete 1024-sample chunk,
/// tagging each with its session-relative millisecond offset. The remainder
/// carries over to the next callback.
fn emit_frames(
    samples: impl Iterator<Item = i16>,
    tx: &mpsc::Sender<AudioFrame>,
    frame_index: &Arc<AtomicU32>,
    carry: &Carry,
) {
    let mut buf = carry.lock().unwrap();
    buf.extend(samples);

    while buf.len() >= FRAME_SAMPLES {
        let chunk: Vec<i16> = buf.drain(..FRAME_SAMPLES).collect();
        let index = frame_index.fetch_add(1, Ordering::SeqCst);
        let session_ms = (index as f64 * super::types::FRAME_DURATION_MS) as u32;
        let mut pcm = Vec::with_capacity(chunk.len() * 2);
        for s in chunk {
            pcm.extend_from_slice(&s.to_le_bytes());
        }
        // Best-effort, non-blocking: a full channel means the pipeline behind it
        // is overloaded; drop the frame rather than stalling the capture thread.
        let _ = tx.try_send(AudioFrame::new(session_ms, pcm));
    }
}
