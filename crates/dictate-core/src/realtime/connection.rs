//! Connection manager (C4): owns the realtime WebSocket session, keep-alive,
//! close-code classification, and exponential-backoff reconnection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Message, http::HeaderValue};

use super::events::RealtimeEvent;
use super::messages::{InputAudioBufferAppend, TranscriptionModel, TranscriptionSessionUpdate};
use crate::audio::AudioFrame;
use crate::logging::SessionMetrics;

const REALTIME_URL: &str = "wss://api.openai.com/v1/realtime?intent=transcription";
const PING_INTERVAL: Duration = Duration::from_secs(20);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(30);
const MAX_BACKOFF_EXPONENT: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("missing OPENAI_API_KEY")]
    MissingApiKey,
}

/// Why a connection attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Close code 1000: user/service intentionally ended the session.
    Terminal,
    /// Abnormal close (1006, missing code, or any other code): reconnect.
    Reconnect,
    /// `error.code == "session_expired"`: close then reconnect.
    SessionExpired,
}

/// Drives one realtime session end-to-end: connect, negotiate, stream audio,
/// route events, and reconnect with backoff on non-terminal closes.
pub struct ConnectionManager {
    api_key: String,
    model: TranscriptionModel,
    metrics: Arc<SessionMetrics>,
}

impl ConnectionManager {
    pub fn new(api_key: String, model: TranscriptionModel, metrics: Arc<SessionMetrics>) -> Self {
        Self { api_key, model, metrics }
    }

    /// Run until `running` is cleared or the service closes the session with
    /// code 1000. `on_reconnect` is invoked between attempts so the caller can
    /// reset C3/C6/C8 state while preserving C9's dedup window and C11's files.
    pub async fn run(
        &self,
        mut audio_rx: mpsc::Receiver<AudioFrame>,
        event_tx: mpsc::Sender<RealtimeEvent>,
        running: Arc<AtomicBool>,
        mut on_reconnect: impl FnMut(),
    ) {
        let mut attempt: u32 = 0;

        while running.load(Ordering::SeqCst) {
            match self.run_once(&mut audio_rx, &event_tx, &running, &mut attempt).await {
                Ok(CloseReason::Terminal) => {
                    crate::info!("Realtime session closed (code 1000); stopping.");
                    break;
                }
                Ok(reason) => {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    crate::warn!(
                        "Realtime session ended ({:?}); reconnecting in {:?} (attempt {})",
                        reason,
                        delay,
                        attempt
                    );
                    on_reconnect();
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.metrics.incr(&self.metrics.websocket_errors);
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    crate::error!(
                        "Realtime connection error: {} (attempt {}, retrying in {:?})",
                        e,
                        attempt,
                        delay
                    );
                    on_reconnect();
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// `attempt` is reset to zero as soon as this connection receives its
    /// first successful inbound event (SPEC_FULL.md §4.4: the counter resets
    /// once the *next connection succeeds*, not unconditionally at the top of
    /// every reconnect cycle).
    async fn run_once(
        &self,
        audio_rx: &mut mpsc::Receiver<AudioFrame>,
        event_tx: &mpsc::Sender<RealtimeEvent>,
        running: &Arc<AtomicBool>,
        attempt: &mut u32,
    ) -> Result<CloseReason, RealtimeError> {
        self.metrics.incr(&self.metrics.connection_attempts);

        let mut request = REALTIME_URL
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidRequest(e.to_string()))?;
        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| RealtimeError::InvalidRequest(e.to_string()))?,
        );
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (ws_stream, _response) = connect_async(request).await?;
        let (mut sink, mut stream) = ws_stream.split();

        let update = TranscriptionSessionUpdate::new(self.model);
        let update_json = serde_json::to_string(&update)
            .map_err(|e| RealtimeError::InvalidRequest(e.to_string()))?;
        sink.send(Message::Text(update_json.into())).await?;

        let mut ping_due = Instant::now() + PING_INTERVAL;
        let mut awaiting_pong_since: Option<Instant> = None;
        let mut reconnect_counter_reset = false;

        loop {
            if !running.load(Ordering::SeqCst) {
                let _ = sink.send(Message::Close(None)).await;
                return Ok(CloseReason::Terminal);
            }

            if let Some(since) = awaiting_pong_since
                && since.elapsed() >= PONG_TIMEOUT
            {
                crate::warn!("No pong within {:?}; treating connection as dead", PONG_TIMEOUT);
                return Ok(CloseReason::Reconnect);
            }

            tokio::select! {
                frame = audio_rx.recv() => {
                    let Some(frame) = frame else {
                        // Capture pipeline shut down; nothing left to stream.
                        let _ = sink.send(Message::Close(None)).await;
                        return Ok(CloseReason::Terminal);
                    };
                    let encoded = BASE64.encode(&frame.pcm);
                    let append = InputAudioBufferAppend::new(encoded);
                    let json = serde_json::to_string(&append)
                        .map_err(|e| RealtimeError::InvalidRequest(e.to_string()))?;
                    sink.send(Message::Text(json.into())).await?;
                    self.metrics.incr(&self.metrics.audio_chunks_sent);
                }

                _ = tokio::time::sleep_until(ping_due) => {
                    sink.send(Message::Ping(Vec::new().into())).await?;
                    awaiting_pong_since = Some(Instant::now());
                    ping_due = Instant::now() + PING_INTERVAL;
                }

                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if !reconnect_counter_reset {
                                reconnect_counter_reset = true;
                                *attempt = 0;
                            }
                            if let Some(event) = RealtimeEvent::parse(&text) {
                                let expired = event.is_session_expired();
                                let _ = event_tx.send(event).await;
                                if expired {
                                    let _ = sink.send(Message::Close(None)).await;
                                    return Ok(CloseReason::SessionExpired);
                                }
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            awaiting_pong_since = None;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            return Ok(classify_close(frame.map(|f| f.code)));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(RealtimeError::WebSocket(e)),
                        None => return Ok(CloseReason::Reconnect),
                    }
                }
            }
        }
    }
}

fn classify_close(code: Option<CloseCode>) -> CloseReason {
    match code {
        Some(CloseCode::Normal) => CloseReason::Terminal,
        _ => CloseReason::Reconnect,
    }
}

/// `min(base * 2^(n-1), 30s)`, base=1s, n capped at 10.
fn backoff_delay(attempt: u32) -> Duration {
    let n = attempt.min(MAX_BACKOFF_EXPONENT).max(1);
    let scaled = BACKOFF_BASE.saturating_mul(1u32 << (n - 1));
    scaled.min(BACKOFF_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(5), Duration::from_secs(16));
        assert_eq!(backoff_delay(10), Duration::from_secs(30));
        assert_eq!(backoff_delay(20), Duration::from_secs(30));
    }

    #[test]
    fn normal_close_is_terminal() {
        assert_eq!(classify_close(Some(CloseCode::Normal)), CloseReason::Terminal);
        assert_eq!(classify_close(None), CloseReason::Reconnect);
        assert_eq!(classify_close(Some(CloseCode::Away)), CloseReason::Reconnect);
    }
}
