//! Session counters (C11), grounded on the original implementation's metrics
//! dataclass and named per §1.1/§8.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

macro_rules! counters {
    ($($name:ident),+ $(,)?) => {
        /// Atomically-updated session counters. Survives reconnect (§4.4):
        /// only the connection-scoped state (C3/C6/C8) is reset, not this.
        #[derive(Default)]
        pub struct SessionMetrics {
            $(pub $name: AtomicU64,)+
        }

        impl SessionMetrics {
            pub fn new() -> Self {
                Self::default()
            }

            fn snapshot(&self) -> Vec<(&'static str, u64)> {
                vec![$((stringify!($name), self.$name.load(Ordering::Relaxed)),)+]
            }
        }
    };
}

counters! {
    connection_attempts,
    connection_successes,
    session_expirations,
    reconnection_attempts,
    audio_chunks_sent,
    realtime_transcriptions,
    utterance_timeouts,
    fallback_successes,
    fallback_failures_short,
    fallback_failures_long,
    fallback_races,
    short_segments_skipped,
    duplicates_filtered,
    content_filtered,
    websocket_errors,
    api_errors,
}

impl SessionMetrics {
    pub fn incr(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// One-line summary for the 60 s periodic console emission (§4.11).
    pub fn one_line_summary(&self, uptime: Instant) -> String {
        let elapsed = uptime.elapsed().as_secs();
        let parts: Vec<String> = self
            .snapshot()
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        format!("uptime={elapsed}s {}", parts.join(" "))
    }

    /// Formatted multi-line summary written to `metrics_<ts>.txt` on shutdown.
    pub fn formatted_summary(&self, uptime: Instant) -> String {
        let elapsed = uptime.elapsed().as_secs();
        let mut out = format!("session uptime: {elapsed}s\n");
        for (name, value) in self.snapshot() {
            out.push_str(&format!("{name}: {value}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incr_is_reflected_in_the_summary() {
        let metrics = SessionMetrics::new();
        metrics.incr(&metrics.fallback_races);
        metrics.incr(&metrics.fallback_races);
        let summary = metrics.formatted_summary(Instant::now());
        assert!(summary.contains("fallback_races: 2"));
    }

    #[test]
    fn one_line_summary_includes_uptime() {
        let metrics = SessionMetrics::new();
        let line = metrics.one_line_summary(Instant::now());
        assert!(line.starts_with("uptime="));
    }
}
