//! Session orchestrator: wires C1-C11 together per §5's concurrency roles.

pub mod fallback;
pub mod output_queue;
pub mod utterance;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

pub use fallback::FallbackTranscriber;
pub use utterance::{TimedOutUtterance, UTTERANCE_TIMEOUT, UtteranceTracker};

use crate::audio::{AudioCapture, AudioFrame, AudioRing, ProcessorConfig, build_processor};
use crate::config::DictateConfig;
use crate::error::{DictateError, Result};
use crate::filter::FilterEngine;
use crate::inject::OutputInjector;
use crate::logging::{SessionLogger, SessionMetrics};
use crate::realtime::{ConnectionManager, RealtimeEvent};

/// How often the timeout ticker wakes to scan for stalled utterances (§4.6).
const TIMEOUT_TICK: Duration = Duration::from_millis(1000);
/// Capacity of the bounded channels crossing the sync-capture/async-network
/// boundary (§5), sized generously above the frame rate so a brief network
/// stall doesn't force Capture to drop frames.
const CHANNEL_CAPACITY: usize = 256;

/// Ties together the audio pipeline, realtime connection, utterance tracking,
/// filtering, output injection, and logging for one continuously-running
/// dictation process.
pub struct Session {
    config: DictateConfig,
}

impl Session {
    pub fn new(config: DictateConfig) -> Self {
        Self { config }
    }

    /// Runs until a terminal close or a SIGINT/SIGTERM, per §5's cancellation
    /// policy. Each independent role (capture, network I/O, timeout ticker,
    /// fallback workers, metrics ticker) runs as its own task/thread; no
    /// unhandled panic in a non-capture role may tear down the session (§7).
    pub async fn run(self) -> Result<()> {
        let running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(SessionMetrics::new());
        let logger = Arc::new(SessionLogger::new(
            &self.config.conversations_dir,
            !self.config.no_log,
            Arc::clone(&metrics),
        )?);
        let filter_config = crate::filter::FilterConfig {
            allow_bye_thank_you: self.config.allow_bye_thank_you,
            allow_fillers: self.config.allow_fillers,
            allow_non_ascii: self.config.allow_non_ascii,
            extra_hallucination_patterns: Vec::new(),
        };
        let filter = Arc::new(FilterEngine::new(filter_config, self.config.filter_rules_path.clone()));
        let injector = Arc::new(OutputInjector::new(self.config.typer_rules_path.clone()));
        let tracker = Arc::new(UtteranceTracker::new());
        let ring = Arc::new(AudioRing::new());
        let fallback = Arc::new(FallbackTranscriber::new(self.config.api_key.clone()));

        logger.spawn_metrics_ticker(Arc::clone(&running));
        spawn_signal_handler(Arc::clone(&running));

        let (capture, frame_rx) = AudioCapture::start(self.config.device_hint.as_deref(), CHANNEL_CAPACITY)
            .map_err(DictateError::from)?;

        let processor_config = ProcessorConfig {
            noise_suppression_level: self.config.noise_suppression,
            gain: self.config.gain,
        };
        let (audio_tx, audio_rx) = mpsc::channel::<AudioFrame>(CHANNEL_CAPACITY);
        spawn_capture_pipeline(frame_rx, audio_tx, processor_config, Arc::clone(&ring), Arc::clone(&running));

        let (event_tx, mut event_rx) = mpsc::channel::<RealtimeEvent>(CHANNEL_CAPACITY);
        let model = self.config.model;
        let api_key = self.config.api_key.clone();
        let connection = ConnectionManager::new(api_key, model, Arc::clone(&metrics));

        let metrics_for_reconnect = Arc::clone(&metrics);
        let tracker_for_reconnect = Arc::clone(&tracker);
        let ring_for_reconnect = Arc::clone(&ring);
        let connection_running = Arc::clone(&running);
        let connection_handle = tokio::spawn(async move {
            connection
                .run(audio_rx, event_tx, connection_running, move || {
                    metrics_for_reconnect.incr(&metrics_for_reconnect.reconnection_attempts);
                    tracker_for_reconnect.reset();
                    ring_for_reconnect.clear();
                })
                .await;
        });

        let timeout_handle = spawn_timeout_ticker(
            Arc::clone(&running),
            Arc::clone(&tracker),
            Arc::clone(&ring),
            Arc::clone(&fallback),
            Arc::clone(&filter),
            Arc::clone(&injector),
            Arc::clone(&logger),
            Arc::clone(&metrics),
        );

        while let Some(event) = event_rx.recv().await {
            logger.record_event("info", event.to_log_value());
            dispatch_event(event, &tracker, &filter, &injector, &logger, &metrics);
        }

        running.store(false, Ordering::SeqCst);
        drop(capture);
        let _ = tokio::time::timeout(Duration::from_secs(2), timeout_handle).await;
        let _ = connection_handle.await;

        logger.write_metrics_summary();
        crate::info!("Session stopped. {}", logger.console_summary());
        Ok(())
    }
}

fn spawn_signal_handler(running: Arc<AtomicBool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    crate::warn!("Failed to install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        crate::info!("Shutdown signal received");
        running.store(false, Ordering::SeqCst);
    });
}

/// Reads raw capture frames, runs them through C2, appends the result to C3,
/// and forwards it to the realtime uplink (C4). Runs on a blocking task since
/// `AudioProcessor` implementations are synchronous (§5: capture must never
/// be starved by network I/O, so this task never awaits network sends).
fn spawn_capture_pipeline(
    mut frame_rx: mpsc::Receiver<AudioFrame>,
    audio_tx: mpsc::Sender<AudioFrame>,
    processor_config: ProcessorConfig,
    ring: Arc<AudioRing>,
    running: Arc<AtomicBool>,
) {
    tokio::task::spawn_blocking(move || {
        let mut processor = build_processor(processor_config);
        let mut session_ms: f64 = 0.0;

        while running.load(Ordering::SeqCst) {
            let Some(frame) = frame_rx.blocking_recv() else { break };

            let processed = match processor.process(&frame.pcm) {
                Ok(bytes) => bytes,
                Err(e) => {
                    crate::error!("Audio processor error: {}", e);
                    continue;
                }
            };
            if processed.is_empty() {
                continue;
            }

            let ms = session_ms as u32;
            session_ms += (processed.len() / 2) as f64 / (crate::audio::CAPTURE_SAMPLE_RATE as f64 / 1000.0);

            let out = AudioFrame::new(ms, processed);
            ring.push(out.clone());
            if audio_tx.blocking_send(out).is_err() {
                break;
            }
        }

        if let Ok(tail) = processor.flush()
            && !tail.is_empty()
        {
            let ms = session_ms as u32;
            let out = AudioFrame::new(ms, tail);
            ring.push(out.clone());
            let _ = audio_tx.blocking_send(out);
        }
    });
}

fn spawn_timeout_ticker(
    running: Arc<AtomicBool>,
    tracker: Arc<UtteranceTracker>,
    ring: Arc<AudioRing>,
    fallback: Arc<FallbackTranscriber>,
    filter: Arc<FilterEngine>,
    injector: Arc<OutputInjector>,
    logger: Arc<SessionLogger>,
    metrics: Arc<SessionMetrics>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while running.load(Ordering::SeqCst) {
            tokio::time::sleep(TIMEOUT_TICK).await;

            for due in tracker.poll_timeouts() {
                metrics.incr(&metrics.utterance_timeouts);
                spawn_fallback_worker(
                    due,
                    Arc::clone(&tracker),
                    Arc::clone(&ring),
                    Arc::clone(&fallback),
                    Arc::clone(&filter),
                    Arc::clone(&injector),
                    Arc::clone(&logger),
                    Arc::clone(&metrics),
                );
            }
        }
    })
}

/// One-shot fallback worker (§5 "Fallback workers"): off the network I/O
/// thread, bounded in number by utterance rate rather than an explicit
/// semaphore.
fn spawn_fallback_worker(
    due: TimedOutUtterance,
    tracker: Arc<UtteranceTracker>,
    ring: Arc<AudioRing>,
    fallback: Arc<FallbackTranscriber>,
    filter: Arc<FilterEngine>,
    injector: Arc<OutputInjector>,
    logger: Arc<SessionLogger>,
    metrics: Arc<SessionMetrics>,
) {
    tokio::spawn(async move {
        let segment_ms = match (due.speech_start_ms, due.speech_end_ms) {
            (Some(s), Some(e)) => e.saturating_sub(s),
            _ => 0,
        };

        let outcome = fallback.transcribe(&ring, due.speech_start_ms, due.speech_end_ms).await;
        if outcome.skipped_short {
            metrics.incr(&metrics.short_segments_skipped);
        } else {
            match &outcome.text {
                Some(_) => metrics.incr(&metrics.fallback_successes),
                None if segment_ms < 1000 => metrics.incr(&metrics.fallback_failures_short),
                None => metrics.incr(&metrics.fallback_failures_long),
            }
        }

        // C6 marks this item completed either way (§4.6): an empty give-up
        // still unblocks later items in C8's order.
        let (ready, is_race) = tracker.complete(&due.item_id, outcome.text.unwrap_or_default());
        if is_race {
            metrics.incr(&metrics.fallback_races);
        }
        emit_ready(ready, &filter, &injector, &logger, &metrics);
    });
}

fn dispatch_event(
    event: RealtimeEvent,
    tracker: &Arc<UtteranceTracker>,
    filter: &Arc<FilterEngine>,
    injector: &Arc<OutputInjector>,
    logger: &Arc<SessionLogger>,
    metrics: &Arc<SessionMetrics>,
) {
    match event {
        RealtimeEvent::SessionCreated | RealtimeEvent::SessionUpdated => {
            metrics.incr(&metrics.connection_successes);
        }
        RealtimeEvent::ItemCreated { item_id } => tracker.item_created(&item_id),
        RealtimeEvent::SpeechStarted { item_id, audio_start_ms } => {
            tracker.speech_started(&item_id, audio_start_ms);
        }
        RealtimeEvent::SpeechStopped { item_id, audio_end_ms } => {
            tracker.speech_stopped(&item_id, audio_end_ms);
        }
        RealtimeEvent::TranscriptionDelta { item_id, delta } => {
            // Partial-display deltas are best-effort and never typed (§5):
            // accumulate and show a filtered, redacted preview only.
            let partial = tracker.append_delta(&item_id, &delta);
            let redacted = filter.filter_text(&partial);
            crate::verbose!("partial[{}]: {}", item_id, redacted);
        }
        RealtimeEvent::TranscriptionCompleted { item_id, transcript } => {
            metrics.incr(&metrics.realtime_transcriptions);
            let (ready, is_race) = tracker.complete(&item_id, transcript);
            if is_race {
                metrics.incr(&metrics.fallback_races);
            }
            emit_ready(ready, filter, injector, logger, metrics);
        }
        RealtimeEvent::Error { code, message } => {
            // Protocol-session-expired is a distinct counter from other API
            // errors (§7): the close/reconnect already happens in C4, this
            // just classifies the event for the metrics summary.
            if code.as_deref() == Some("session_expired") {
                metrics.incr(&metrics.session_expirations);
            } else {
                metrics.incr(&metrics.api_errors);
            }
            crate::warn!("Realtime error {:?}: {}", code, message);
        }
        RealtimeEvent::Unknown { kind, .. } => {
            crate::verbose!("Unhandled realtime event: {}", kind);
        }
    }
}

/// Filters, dedups, injects, and logs each ready transcript, in order
/// (§4.8-4.11). A transcript that filters to empty is never sent to C10
/// (§8's "unless T is the empty transcript" clause).
fn emit_ready(
    ready: Vec<String>,
    filter: &Arc<FilterEngine>,
    injector: &Arc<OutputInjector>,
    logger: &Arc<SessionLogger>,
    metrics: &Arc<SessionMetrics>,
) {
    for raw in ready {
        let filtered = filter.filter_text(&raw);
        if filtered != crate::filter::normalize_whitespace(&raw) {
            metrics.incr(&metrics.content_filtered);
        }
        if filtered.is_empty() {
            continue;
        }
        if filter.is_duplicate(&filtered) {
            metrics.incr(&metrics.duplicates_filtered);
            continue;
        }
        filter.note_emitted(filtered.clone());

        if !injector.type_text(&filtered) {
            crate::warn!("Output injection failed; text remains in the transcript file");
        }
        logger.record_transcript(&filtered);
    }
}
