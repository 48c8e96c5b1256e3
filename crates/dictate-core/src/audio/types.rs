//! Core audio types used throughout the audio module.

use serde::{Deserialize, Serialize};

/// One 1024-sample / 2048-byte PCM16 mono 24kHz frame (42.67ms), timestamped
/// relative to the start of the current realtime session (C3's data model).
#[derive(Clone, Debug)]
pub struct AudioFrame {
    /// Milliseconds since the current connection started streaming audio.
    pub session_ms: u32,
    /// 1024 samples of signed 16-bit little-endian mono PCM (2048 bytes).
    pub pcm: Vec<u8>,
}

/// Number of PCM16 samples in one frame.
pub const FRAME_SAMPLES: usize = 1024;
/// Number of bytes in one frame (`FRAME_SAMPLES` * 2 bytes/sample).
pub const FRAME_BYTES: usize = FRAME_SAMPLES * 2;
/// Frame duration in milliseconds (1024 / 24000 * 1000).
pub const FRAME_DURATION_MS: f64 = 1024.0 / 24_000.0 * 1000.0;

impl AudioFrame {
    pub fn new(session_ms: u32, pcm: Vec<u8>) -> Self {
        Self { session_ms, pcm }
    }

    /// Number of i16 samples contained in this frame.
    pub fn sample_count(&self) -> usize {
        self.pcm.len() / 2
    }
}

/// Information about an available audio input device.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    /// Device name as reported by the system (used for lookup during capture).
    pub name: String,
    /// Human-readable display name, when available.
    pub display_name: Option<String>,
    /// Whether this is the default input device.
    pub is_default: bool,
    /// PulseAudio `device.form_factor` property (e.g. "headset", "webcam"), if known.
    pub form_factor: Option<String>,
    /// PulseAudio `device.bus` property (e.g. "usb", "pci"), if known.
    pub bus: Option<String>,
    /// Whether this source is a monitor of an output sink rather than a real input.
    pub is_monitor: bool,
}
