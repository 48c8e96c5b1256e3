//! Event router (C5): classifies raw inbound JSON into a tagged union and
//! dispatches it to the session's downstream state.

use super::messages::RawEvent;

/// A classified inbound realtime event.
#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    SessionCreated,
    SessionUpdated,
    ItemCreated { item_id: String },
    SpeechStarted { item_id: String, audio_start_ms: u32 },
    SpeechStopped { item_id: String, audio_end_ms: u32 },
    TranscriptionDelta { item_id: String, delta: String },
    TranscriptionCompleted { item_id: String, transcript: String },
    Error { code: Option<String>, message: String },
    /// Forward-compatible: anything not recognized above.
    Unknown { kind: String, raw: serde_json::Value },
}

impl RealtimeEvent {
    /// Parse and classify one inbound JSON text message.
    pub fn parse(text: &str) -> Option<Self> {
        let raw: RawEvent = serde_json::from_str(text).ok()?;
        let value: serde_json::Value = serde_json::from_str(text).unwrap_or(serde_json::Value::Null);
        Some(Self::classify(raw, value))
    }

    fn classify(raw: RawEvent, original: serde_json::Value) -> Self {
        match raw.kind.as_str() {
            "session.created" => RealtimeEvent::SessionCreated,
            "session.updated" | "transcription_session.created" | "transcription_session.updated" => {
                RealtimeEvent::SessionUpdated
            }
            "conversation.item.created" => {
                let item_id = raw.item.map(|i| i.id).unwrap_or_default();
                RealtimeEvent::ItemCreated { item_id }
            }
            "input_audio_buffer.speech_started" => RealtimeEvent::SpeechStarted {
                item_id: raw.item_id.unwrap_or_default(),
                audio_start_ms: raw.audio_start_ms.unwrap_or(0),
            },
            "input_audio_buffer.speech_stopped" => RealtimeEvent::SpeechStopped {
                item_id: raw.item_id.unwrap_or_default(),
                audio_end_ms: raw.audio_end_ms.unwrap_or(0),
            },
            // Legacy events retained defensively; routed identically to their
            // `conversation.item.input_audio_transcription.*` counterparts.
            "conversation.item.input_audio_transcription.delta" | "response.audio_transcript.delta" => {
                RealtimeEvent::TranscriptionDelta {
                    item_id: raw.item_id.unwrap_or_default(),
                    delta: raw.delta.unwrap_or_default(),
                }
            }
            "conversation.item.input_audio_transcription.completed" | "response.audio_transcript.done" => {
                RealtimeEvent::TranscriptionCompleted {
                    item_id: raw.item_id.unwrap_or_default(),
                    transcript: raw.transcript.unwrap_or_default(),
                }
            }
            "error" => {
                let err = raw.error.unwrap_or(super::messages::RealtimeErrorPayload {
                    code: None,
                    message: "unknown error".to_string(),
                });
                RealtimeEvent::Error {
                    code: err.code,
                    message: err.message,
                }
            }
            other => RealtimeEvent::Unknown {
                kind: other.to_string(),
                raw: original,
            },
        }
    }

    /// Whether this event's `error.code` classifies as a session-expiry close.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, RealtimeEvent::Error { code: Some(c), .. } if c == "session_expired")
    }

    /// JSON-encoded router payload, for C11's debug event log.
    pub fn to_log_value(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            RealtimeEvent::SessionCreated => json!({"kind": "session.created"}),
            RealtimeEvent::SessionUpdated => json!({"kind": "session.updated"}),
            RealtimeEvent::ItemCreated { item_id } => json!({"kind": "item.created", "item_id": item_id}),
            RealtimeEvent::SpeechStarted { item_id, audio_start_ms } => {
                json!({"kind": "speech.started", "item_id": item_id, "audio_start_ms": audio_start_ms})
            }
            RealtimeEvent::SpeechStopped { item_id, audio_end_ms } => {
                json!({"kind": "speech.stopped", "item_id": item_id, "audio_end_ms": audio_end_ms})
            }
            RealtimeEvent::TranscriptionDelta { item_id, delta } => {
                json!({"kind": "transcription.delta", "item_id": item_id, "delta": delta})
            }
            RealtimeEvent::TranscriptionCompleted { item_id, transcript } => {
                json!({"kind": "transcription.completed", "item_id": item_id, "transcript": transcript})
            }
            RealtimeEvent::Error { code, message } => json!({"kind": "error", "code": code, "message": message}),
            RealtimeEvent::Unknown { kind, raw } => json!({"kind": kind, "raw": raw}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_item_created() {
        let json = r#"{"type":"conversation.item.created","item":{"id":"item_1"}}"#;
        match RealtimeEvent::parse(json) {
            Some(RealtimeEvent::ItemCreated { item_id }) => assert_eq!(item_id, "item_1"),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn classifies_legacy_transcript_done_like_completed() {
        let json = r#"{"type":"response.audio_transcript.done","item_id":"item_2","transcript":"hi"}"#;
        match RealtimeEvent::parse(json) {
            Some(RealtimeEvent::TranscriptionCompleted { item_id, transcript }) => {
                assert_eq!(item_id, "item_2");
                assert_eq!(transcript, "hi");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn session_expired_error_is_flagged() {
        let json = r#"{"type":"error","error":{"code":"session_expired","message":"expired"}}"#;
        let event = RealtimeEvent::parse(json).unwrap();
        assert!(event.is_session_expired());
    }

    #[test]
    fn unknown_event_is_preserved() {
        let json = r#"{"type":"response.output_item.added"}"#;
        match RealtimeEvent::parse(json) {
            Some(RealtimeEvent::Unknown { kind, .. }) => {
                assert_eq!(kind, "response.output_item.added")
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }
}
