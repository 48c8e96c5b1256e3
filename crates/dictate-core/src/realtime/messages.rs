//! Wire protocol structs for the OpenAI realtime transcription API (C4).

use serde::{Deserialize, Serialize};

/// The three transcription models the realtime session can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptionModel {
    #[serde(rename = "whisper-1")]
    Whisper1,
    #[serde(rename = "gpt-4o-transcribe")]
    Gpt4oTranscribe,
    #[serde(rename = "gpt-4o-mini-transcribe")]
    Gpt4oMiniTranscribe,
}

impl TranscriptionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whisper1 => "whisper-1",
            Self::Gpt4oTranscribe => "gpt-4o-transcribe",
            Self::Gpt4oMiniTranscribe => "gpt-4o-mini-transcribe",
        }
    }
}

impl std::str::FromStr for TranscriptionModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whisper-1" => Ok(Self::Whisper1),
            "gpt-4o-transcribe" => Ok(Self::Gpt4oTranscribe),
            "gpt-4o-mini-transcribe" => Ok(Self::Gpt4oMiniTranscribe),
            other => Err(format!("unknown transcription model '{other}'")),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TranscriptionSessionUpdate {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub session: TranscriptionSessionConfig,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionSessionConfig {
    pub input_audio_transcription: InputAudioTranscription,
}

#[derive(Debug, Serialize)]
pub struct InputAudioTranscription {
    pub model: &'static str,
}

impl TranscriptionSessionUpdate {
    pub fn new(model: TranscriptionModel) -> Self {
        Self {
            kind: "transcription_session.update",
            session: TranscriptionSessionConfig {
                input_audio_transcription: InputAudioTranscription {
                    model: model.as_str(),
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InputAudioBufferAppend {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub audio: String,
}

impl InputAudioBufferAppend {
    pub fn new(base64_audio: String) -> Self {
        Self {
            kind: "input_audio_buffer.append",
            audio: base64_audio,
        }
    }
}

/// An error payload as emitted by the service's `error` event type.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeErrorPayload {
    pub code: Option<String>,
    pub message: String,
}

/// A `conversation.item.created` item's minimal shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationItem {
    pub id: String,
}

/// Raw inbound event envelope, before being classified into `RealtimeEvent`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub item: Option<ConversationItem>,
    pub item_id: Option<String>,
    pub audio_start_ms: Option<u32>,
    pub audio_end_ms: Option<u32>,
    pub delta: Option<String>,
    pub transcript: Option<String>,
    pub error: Option<RealtimeErrorPayload>,
}
