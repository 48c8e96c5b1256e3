//! Per-session on-disk artefacts (C11): transcript file, structured debug
//! event log, and periodic metrics summary.
//!
//! Console-facing progress goes through the existing `verbose!`/`info!`
//! macros (`crate::verbose`), not through this module — this module owns
//! only the three files named in §6's "On-disk artefacts".

pub mod metrics;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Local;
use serde::Serialize;

pub use metrics::SessionMetrics;

const METRICS_TICK: std::time::Duration = std::time::Duration::from_secs(60);

fn session_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[derive(Serialize)]
struct DebugEvent<'a> {
    seq: u64,
    timestamp: String,
    level: &'a str,
    message: serde_json::Value,
}

struct Files {
    transcript: File,
    debug: File,
    metrics_path: PathBuf,
}

/// Owns the session's on-disk artefacts. `None` when logging is disabled
/// (`--no-log`); every method becomes a no-op so callers don't need to branch.
pub struct SessionLogger {
    files: Option<Mutex<Files>>,
    seq: AtomicU64,
    metrics: Arc<SessionMetrics>,
    start: Instant,
}

impl SessionLogger {
    /// `dir` holds the three `conversations/` artefacts (§6). Pass `enabled =
    /// false` for `--no-log`, in which case no files are created at all.
    pub fn new(dir: &Path, enabled: bool, metrics: Arc<SessionMetrics>) -> crate::error::Result<Self> {
        let files = if enabled {
            std::fs::create_dir_all(dir)?;
            let ts = session_timestamp();
            let transcript = File::create(dir.join(format!("transcription_{ts}.txt")))?;
            let debug = File::create(dir.join(format!("debug_events_{ts}.jsonl")))?;
            let metrics_path = dir.join(format!("metrics_{ts}.txt"));
            Some(Mutex::new(Files { transcript, debug, metrics_path }))
        } else {
            None
        };

        Ok(Self { files, seq: AtomicU64::new(0), metrics, start: Instant::now() })
    }

    /// Append one line `[<YYYY-MM-DD HH:MM:SS>] <text>` to the transcript
    /// file, flushing immediately (§4.11).
    pub fn record_transcript(&self, text: &str) {
        let Some(files) = &self.files else { return };
        let line = format!("[{}] {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), text);
        let mut files = files.lock().unwrap();
        if let Err(e) = files.transcript.write_all(line.as_bytes()).and_then(|_| files.transcript.flush()) {
            crate::warn!("Failed to write transcript line: {}", e);
        }
    }

    /// Append one JSON line capturing a routed event, with a per-session
    /// monotonic sequence number.
    pub fn record_event(&self, level: &str, message: impl Serialize) {
        let Some(files) = &self.files else { return };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let message = match serde_json::to_value(message) {
            Ok(v) => v,
            Err(e) => {
                crate::warn!("Failed to serialize debug event: {}", e);
                return;
            }
        };
        let event = DebugEvent { seq, timestamp: Local::now().to_rfc3339(), level, message };
        let mut line = match serde_json::to_string(&event) {
            Ok(s) => s,
            Err(e) => {
                crate::warn!("Failed to serialize debug event: {}", e);
                return;
            }
        };
        line.push('\n');

        let mut files = files.lock().unwrap();
        if let Err(e) = files.debug.write_all(line.as_bytes()).and_then(|_| files.debug.flush()) {
            crate::warn!("Failed to write debug event: {}", e);
        }
    }

    /// One-line console summary, for the 60 s periodic ticker.
    pub fn console_summary(&self) -> String {
        self.metrics.one_line_summary(self.start)
    }

    /// Write the formatted metrics summary to disk (on the 60 s tick and
    /// again on shutdown).
    pub fn write_metrics_summary(&self) {
        let Some(files) = &self.files else { return };
        let summary = self.metrics.formatted_summary(self.start);
        let files = files.lock().unwrap();
        if let Err(e) = std::fs::write(&files.metrics_path, summary) {
            crate::warn!("Failed to write metrics summary: {}", e);
        }
    }

    /// Spawn the background task that emits a console summary and refreshes
    /// the on-disk metrics file every 60 s (§4.11), until `running` clears.
    pub fn spawn_metrics_ticker(self: &Arc<Self>, running: Arc<std::sync::atomic::AtomicBool>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                tokio::time::sleep(METRICS_TICK).await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                crate::info!("{}", this.console_summary());
                this.write_metrics_summary();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dictate-logging-test-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn disabled_logger_never_touches_disk() {
        let dir = tmp_dir("disabled");
        let logger = SessionLogger::new(&dir, false, Arc::new(SessionMetrics::new())).unwrap();
        logger.record_transcript("hello");
        logger.write_metrics_summary();
        assert!(!dir.exists());
    }

    #[test]
    fn enabled_logger_creates_and_appends_to_transcript_file() {
        let dir = tmp_dir("enabled");
        let logger = SessionLogger::new(&dir, true, Arc::new(SessionMetrics::new())).unwrap();
        logger.record_transcript("alpha");
        logger.record_transcript("beta");

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().filter_map(|e| e.ok()).collect();
        let transcript_path = entries
            .iter()
            .map(|e| e.path())
            .find(|p| p.to_string_lossy().contains("transcription_"))
            .unwrap();
        let text = std::fs::read_to_string(transcript_path).unwrap();
        assert!(text.contains("alpha"));
        assert!(text.contains("beta"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn metrics_summary_file_is_written() {
        let dir = tmp_dir("metrics");
        let metrics = Arc::new(SessionMetrics::new());
        metrics.incr(&metrics.duplicates_filtered);
        let logger = SessionLogger::new(&dir, true, metrics).unwrap();
        logger.write_metrics_summary();

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().filter_map(|e| e.ok()).collect();
        let metrics_path = entries
            .iter()
            .map(|e| e.path())
            .find(|p| p.to_string_lossy().contains("metrics_"))
            .unwrap();
        let text = std::fs::read_to_string(metrics_path).unwrap();
        assert!(text.contains("duplicates_filtered: 1"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
