//! Utterance tracker (C6) and the combined "output lock" shared with C8
//! (§5: C6's map and C8's three fields share a single lock).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::output_queue::OutputQueue;

/// Upper bound on how long an utterance's completion may be missing before
/// the timeout ticker forces a fallback attempt (§4.6; fixed, not configurable
/// per SPEC_FULL.md's resolution of the two competing source values).
pub const UTTERANCE_TIMEOUT: Duration = Duration::from_millis(2500);

/// Sentinel `created_seq` for an utterance that exists only because a
/// speech-activity event arrived before its `conversation.item.created`.
const PENDING_SEQ: u64 = u64::MAX;

/// One voice segment, keyed by the service-assigned `item_id` (data model §3).
#[derive(Debug, Clone)]
pub struct Utterance {
    pub created_seq: u64,
    pub speech_start_ms: Option<u32>,
    pub speech_end_ms: Option<u32>,
    pub stopped_at: Option<Instant>,
    pub completed: bool,
    pub transcript: Option<String>,
    fallback_dispatched: bool,
}

impl Utterance {
    fn pending() -> Self {
        Self {
            created_seq: PENDING_SEQ,
            speech_start_ms: None,
            speech_end_ms: None,
            stopped_at: None,
            completed: false,
            transcript: None,
            fallback_dispatched: false,
        }
    }
}

struct Inner {
    utterances: HashMap<String, Utterance>,
    next_seq: u64,
    queue: OutputQueue,
    /// Accumulated `delta` text per item, for the display-only partial view
    /// (§4.5: `...transcription.delta` events). Cleared once the item completes.
    partials: HashMap<String, String>,
}

/// An utterance past its timeout, handed to the fallback transcriber (C7).
pub struct TimedOutUtterance {
    pub item_id: String,
    pub speech_start_ms: Option<u32>,
    pub speech_end_ms: Option<u32>,
}

/// Combined utterance map (C6) and ordered output queue (C8), under one lock.
pub struct UtteranceTracker {
    inner: Mutex<Inner>,
}

impl UtteranceTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                utterances: HashMap::new(),
                next_seq: 0,
                queue: OutputQueue::new(),
                partials: HashMap::new(),
            }),
        }
    }

    /// `conversation.item.created`: idempotent. Assigns a fresh monotonic
    /// `created_seq` the first time `item_id` is properly created, even if a
    /// speech-activity event already created a placeholder entry for it.
    pub fn item_created(&self, item_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.utterances.get(item_id)
            && existing.created_seq != PENDING_SEQ
        {
            return;
        }
        inner
            .utterances
            .entry(item_id.to_string())
            .or_insert_with(Utterance::pending);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.utterances.get_mut(item_id).unwrap().created_seq = seq;
        inner.queue.note_created(item_id);
    }

    pub fn speech_started(&self, item_id: &str, audio_start_ms: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .utterances
            .entry(item_id.to_string())
            .or_insert_with(Utterance::pending)
            .speech_start_ms = Some(audio_start_ms);
    }

    /// `conversation.item.input_audio_transcription.delta` (and its legacy
    /// `response.audio_transcript.delta` alias): append to item's partial
    /// display buffer and return the accumulated text so far (§4.5).
    pub fn append_delta(&self, item_id: &str, delta: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        let buf = inner.partials.entry(item_id.to_string()).or_default();
        buf.push_str(delta);
        buf.clone()
    }

    pub fn speech_stopped(&self, item_id: &str, audio_end_ms: u32) {
        let mut inner = self.inner.lock().unwrap();
        let utterance = inner
            .utterances
            .entry(item_id.to_string())
            .or_insert_with(Utterance::pending);
        utterance.speech_end_ms = Some(audio_end_ms);
        utterance.stopped_at = Some(Instant::now());
    }

    /// Mark `item_id` completed with `text` — whichever path (realtime or
    /// fallback) calls this first wins the race (§4.7). Returns transcripts
    /// now ready to emit, in speech order, plus whether this particular call
    /// was the losing side of a race (so the caller can bump the
    /// `fallback_races` metric).
    pub fn complete(&self, item_id: &str, text: String) -> (Vec<String>, bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.partials.remove(item_id);
        if let Some(u) = inner.utterances.get_mut(item_id) {
            if u.completed {
                inner.queue.races += 1;
                return (Vec::new(), true);
            }
            u.completed = true;
            u.transcript = Some(text.clone());
        }
        let races_before = inner.queue.races;
        let ready = inner.queue.complete(item_id, text);
        let is_race = inner.queue.races > races_before;
        (ready, is_race)
    }

    /// Utterances stopped at least [`UTTERANCE_TIMEOUT`] ago, not yet
    /// completed, not yet dispatched to the fallback transcriber. Marks them
    /// dispatched so the ~1s ticker never hands the same item to C7 twice.
    pub fn poll_timeouts(&self) -> Vec<TimedOutUtterance> {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        let mut due = Vec::new();
        for (item_id, u) in inner.utterances.iter_mut() {
            if u.completed || u.fallback_dispatched {
                continue;
            }
            if let Some(stopped_at) = u.stopped_at
                && now.duration_since(stopped_at) >= UTTERANCE_TIMEOUT
            {
                u.fallback_dispatched = true;
                due.push(TimedOutUtterance {
                    item_id: item_id.clone(),
                    speech_start_ms: u.speech_start_ms,
                    speech_end_ms: u.speech_end_ms,
                });
            }
        }
        due
    }

    pub fn races(&self) -> u64 {
        self.inner.lock().unwrap().queue.races
    }

    /// Reset on reconnect (§4.4): drops all utterances and the queue's
    /// ordering state. C9's dedup window and C11's files live elsewhere and
    /// are untouched.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.utterances.clear();
        inner.next_seq = 0;
        inner.queue.reset();
        inner.partials.clear();
    }
}

impl Default for UtteranceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_seq_is_monotonic_per_session() {
        let t = UtteranceTracker::new();
        t.item_created("a");
        t.item_created("b");
        t.item_created("a"); // idempotent
        let inner = t.inner.lock().unwrap();
        assert_eq!(inner.utterances["a"].created_seq, 0);
        assert_eq!(inner.utterances["b"].created_seq, 1);
    }

    #[test]
    fn speech_event_before_creation_still_gets_a_real_seq_later() {
        let t = UtteranceTracker::new();
        t.speech_started("a", 0);
        t.item_created("a");
        let inner = t.inner.lock().unwrap();
        assert_ne!(inner.utterances["a"].created_seq, PENDING_SEQ);
    }

    #[test]
    fn second_completion_is_a_race_and_does_not_reemit() {
        let t = UtteranceTracker::new();
        t.item_created("a");
        let (first, first_race) = t.complete("a", "hi".into());
        assert_eq!(first, vec!["hi"]);
        assert!(!first_race);
        let (second, second_race) = t.complete("a", "again".into());
        assert!(second.is_empty());
        assert!(second_race);
        assert_eq!(t.races(), 1);
    }

    #[test]
    fn partial_delta_accumulates_and_clears_on_completion() {
        let t = UtteranceTracker::new();
        t.item_created("a");
        assert_eq!(t.append_delta("a", "hel"), "hel");
        assert_eq!(t.append_delta("a", "lo"), "hello");
        t.complete("a", "hello".into());
        assert_eq!(t.append_delta("a", "x"), "x");
    }

    #[test]
    fn timeout_is_only_reported_once_per_utterance() {
        let t = UtteranceTracker::new();
        t.item_created("a");
        t.speech_started("a", 0);
        t.speech_stopped("a", 900);
        {
            let mut inner = t.inner.lock().unwrap();
            let u = inner.utterances.get_mut("a").unwrap();
            u.stopped_at = Some(Instant::now() - UTTERANCE_TIMEOUT - Duration::from_millis(1));
        }
        let due = t.poll_timeouts();
        assert_eq!(due.len(), 1);
        assert!(t.poll_timeouts().is_empty());
    }

    #[test]
    fn reset_clears_utterances_and_queue() {
        let t = UtteranceTracker::new();
        t.item_created("a");
        t.reset();
        let inner = t.inner.lock().unwrap();
        assert!(inner.utterances.is_empty());
        assert_eq!(inner.next_seq, 0);
    }
}
