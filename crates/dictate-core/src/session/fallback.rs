//! Fallback transcriber (C7): on a stalled utterance, slices the ring buffer,
//! encodes a canonical WAV, and submits it to the one-shot transcription
//! endpoint. Grounded on the original's `audio_buffer.py` offset search and
//! the teacher's `http.rs` client / `elevenlabs.rs` multipart-upload shape.

use std::io::Cursor;

use crate::audio::{AudioFrame, AudioRing, FRAME_DURATION_MS};
use crate::http::get_http_client;

const API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const MODEL: &str = "whisper-1";

/// Utterances shorter than this are almost certainly noise; skip fallback
/// entirely rather than submit a near-empty clip.
const MIN_SEGMENT_MS: u32 = 300;

/// Offset search half-width and step, both in milliseconds (§4.7.2).
const OFFSET_SEARCH_M_MS: i64 = 200;
const OFFSET_SEARCH_STEP_MS: i64 = 20;

/// Best-offset error above which a warning is logged (but the attempt proceeds).
const OFFSET_WARNING_THRESHOLD_MS: f64 = 500.0;

#[derive(Debug, Default, Clone)]
pub struct FallbackOutcome {
    /// Transcribed text, if the request succeeded and returned non-empty text.
    pub text: Option<String>,
    /// Skipped because the requested segment was under [`MIN_SEGMENT_MS`]
    /// (§4.7.1: "likely noise", never even attempted).
    pub skipped_short: bool,
}

/// One-shot transcription fallback used when the realtime path silently
/// fails to settle an utterance within its timeout.
pub struct FallbackTranscriber {
    api_key: String,
}

impl FallbackTranscriber {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    /// Attempt to transcribe the audio between `speech_start_ms` and
    /// `speech_end_ms` (both required; absence of either is treated as "no
    /// fallback possible"). A `None` `text` on skip or failure lets the caller
    /// fall through to the mandatory empty-text give-up (§4.6); `skipped_short`
    /// distinguishes the pre-attempt noise-floor skip from an attempted,
    /// genuinely failed request.
    pub async fn transcribe(
        &self,
        ring: &AudioRing,
        speech_start_ms: Option<u32>,
        speech_end_ms: Option<u32>,
    ) -> FallbackOutcome {
        let (start_ms, end_ms) = match (speech_start_ms, speech_end_ms) {
            (Some(s), Some(e)) => (s, e),
            _ => return FallbackOutcome::default(),
        };
        let expected_ms = end_ms.saturating_sub(start_ms) as f64;
        if expected_ms < MIN_SEGMENT_MS as f64 {
            crate::verbose!("Utterance segment {:.0}ms under {}ms floor; skipping fallback", expected_ms, MIN_SEGMENT_MS);
            return FallbackOutcome { text: None, skipped_short: true };
        }

        let frames = best_offset_frames(ring, start_ms, end_ms, expected_ms);
        if frames.is_empty() {
            crate::warn!("Fallback found no audio for segment [{}, {}]ms", start_ms, end_ms);
            return FallbackOutcome::default();
        }

        let wav = match encode_wav(&frames) {
            Ok(bytes) => bytes,
            Err(e) => {
                crate::error!("Failed to encode fallback WAV: {}", e);
                return FallbackOutcome::default();
            }
        };

        let text = match self.request_transcription(wav).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                crate::error!("Fallback transcription request failed: {}", e);
                None
            }
        };
        FallbackOutcome { text, skipped_short: false }
    }

    async fn request_transcription(&self, wav_bytes: Vec<u8>) -> anyhow::Result<String> {
        let client = get_http_client()?;

        let form = reqwest::multipart::Form::new().text("model", MODEL).part(
            "file",
            reqwest::multipart::Part::bytes(wav_bytes)
                .file_name("fallback.wav")
                .mime_str("audio/wav")?,
        );

        let response = client
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("whisper-1 fallback request failed ({status}): {body}");
        }

        #[derive(serde::Deserialize)]
        struct Response {
            text: String,
        }
        let parsed: Response = response.json().await?;
        Ok(parsed.text)
    }
}

/// Try offsets in `{-M, -M+step, ..., +M}` ms, picking the one whose resulting
/// frame-derived duration is closest to `expected_ms`. Warns (but proceeds) if
/// the best error still exceeds [`OFFSET_WARNING_THRESHOLD_MS`].
fn best_offset_frames(
    ring: &AudioRing,
    start_ms: u32,
    end_ms: u32,
    expected_ms: f64,
) -> Vec<AudioFrame> {
    let mut best_frames: Vec<AudioFrame> = Vec::new();
    let mut best_err = f64::MAX;

    let mut offset = -OFFSET_SEARCH_M_MS;
    while offset <= OFFSET_SEARCH_M_MS {
        let lo = (start_ms as i64 + offset).max(0) as u32;
        let hi = (end_ms as i64 + offset).max(0) as u32;
        let frames = ring.chunks_in_range(lo, hi);
        let actual_ms = frames.len() as f64 * FRAME_DURATION_MS;
        let err = (expected_ms - actual_ms).abs();
        if err < best_err {
            best_err = err;
            best_frames = frames;
        }
        offset += OFFSET_SEARCH_STEP_MS;
    }

    if best_err > OFFSET_WARNING_THRESHOLD_MS {
        crate::warn!(
            "Fallback offset search error {:.0}ms exceeds {:.0}ms; proceeding anyway",
            best_err,
            OFFSET_WARNING_THRESHOLD_MS
        );
    }

    best_frames
}

/// Concatenate frames into a canonical mono/24kHz/16-bit WAV (RIFF+fmt+data).
fn encode_wav(frames: &[AudioFrame]) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: crate::audio::CAPTURE_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for frame in frames {
            for chunk in frame.pcm.chunks_exact(2) {
                writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
            }
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FRAME_BYTES;

    fn frame(ms: u32) -> AudioFrame {
        AudioFrame::new(ms, vec![0u8; FRAME_BYTES])
    }

    #[test]
    fn short_segment_is_skipped() {
        // 299ms must be skipped, 300ms must not (testable boundary, §8).
        assert!(299u32 < MIN_SEGMENT_MS);
        assert!(!(300u32 < MIN_SEGMENT_MS));
    }

    #[tokio::test]
    async fn segment_under_floor_is_reported_as_skipped_short() {
        let ring = AudioRing::new();
        let transcriber = FallbackTranscriber::new("unused".to_string());
        let outcome = transcriber.transcribe(&ring, Some(0), Some(299)).await;
        assert!(outcome.skipped_short);
        assert!(outcome.text.is_none());
    }

    #[tokio::test]
    async fn missing_speech_bounds_is_not_a_short_skip() {
        let ring = AudioRing::new();
        let transcriber = FallbackTranscriber::new("unused".to_string());
        let outcome = transcriber.transcribe(&ring, None, Some(1000)).await;
        assert!(!outcome.skipped_short);
        assert!(outcome.text.is_none());
    }

    #[test]
    fn best_offset_prefers_the_closest_duration_match() {
        let ring = AudioRing::new();
        for ms in (0..2000).step_by(FRAME_DURATION_MS as usize) {
            ring.push(frame(ms as u32));
        }
        let frames = best_offset_frames(&ring, 500, 1500, 1000.0);
        assert!(!frames.is_empty());
    }

    #[test]
    fn wav_round_trips_pcm_samples() {
        let samples: Vec<i16> = vec![0, 100, -100, i16::MAX, i16::MIN];
        let mut pcm = Vec::new();
        for s in &samples {
            pcm.extend_from_slice(&s.to_le_bytes());
        }
        let frames = vec![AudioFrame::new(0, pcm)];
        let wav = encode_wav(&frames).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }
}
