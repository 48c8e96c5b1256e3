//! Timestamped audio ring buffer (C3).
//!
//! Append-only, bounded by wall-clock retention rather than a fixed element
//! count (§9's open question: the source leaves the cap unset and recommends
//! 10 minutes). Single-writer (capture), multi-reader (fallback workers).

use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::types::AudioFrame;

/// Wall-clock retention window; frames older than this are evicted lazily on append.
pub const RING_RETENTION: Duration = Duration::from_secs(10 * 60);

struct Entry {
    frame: AudioFrame,
    received_at: Instant,
}

/// Timestamped audio ring buffer queried by fallback transcription (C7).
pub struct AudioRing {
    entries: RwLock<Vec<Entry>>,
}

impl AudioRing {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Append a frame. Invariant: `session_ms` must be non-decreasing across calls.
    pub fn push(&self, frame: AudioFrame) {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap();
        entries.push(Entry {
            frame,
            received_at: now,
        });
        let cutoff = now.checked_sub(RING_RETENTION);
        if let Some(cutoff) = cutoff {
            entries.retain(|e| e.received_at >= cutoff);
        }
    }

    /// All frames whose `session_ms` lies inclusively in `[lo_ms, hi_ms]`, in
    /// append order.
    pub fn chunks_in_range(&self, lo_ms: u32, hi_ms: u32) -> Vec<AudioFrame> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.frame.session_ms >= lo_ms && e.frame.session_ms <= hi_ms)
            .map(|e| e.frame.clone())
            .collect()
    }

    /// Reset all buffered audio (called on reconnect, C4).
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AudioRing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ms: u32) -> AudioFrame {
        AudioFrame::new(ms, vec![0u8; super::super::types::FRAME_BYTES])
    }

    #[test]
    fn range_query_is_inclusive() {
        let ring = AudioRing::new();
        for ms in [0, 100, 200, 300] {
            ring.push(frame(ms));
        }
        let got: Vec<u32> = ring
            .chunks_in_range(100, 200)
            .iter()
            .map(|f| f.session_ms)
            .collect();
        assert_eq!(got, vec![100, 200]);
    }

    #[test]
    fn clear_empties_the_ring() {
        let ring = AudioRing::new();
        ring.push(frame(0));
        ring.clear();
        assert!(ring.is_empty());
    }
}
