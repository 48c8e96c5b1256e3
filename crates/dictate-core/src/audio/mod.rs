//! Audio capture and processing (C1, C2, C3).
//!
//! # Architecture
//!
//! ```text
//! AudioCapture (C1)
//!   -> AudioProcessor (C2, optional noise suppression + gain)
//!     -> AudioRing (C3, fallback source)
//!     -> realtime uplink (C4)
//! ```

pub mod capture;
pub mod devices;
pub mod error;
pub mod processor;
#[cfg(all(target_os = "linux", feature = "pulse-metadata"))]
pub mod pulse;
pub mod ring;
pub mod types;

pub use capture::{AudioCapture, CAPTURE_CHANNELS, CAPTURE_SAMPLE_RATE};
pub use devices::list_audio_devices;
pub use error::AudioError;
pub use processor::{AudioProcessor, ProcessorConfig, build_processor};
pub use ring::AudioRing;
pub use types::{AudioDeviceInfo, AudioFrame, FRAME_BYTES, FRAME_DURATION_MS, FRAME_SAMPLES};
