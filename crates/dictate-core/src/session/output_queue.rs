//! Ordered output queue (C8): preserves speech order across the realtime and
//! fallback transcription paths.

use std::collections::HashMap;

/// Shares one lock with C6's utterance map in the real session (§5's "output
/// lock"); here the queue's own state is what that lock protects.
#[derive(Default)]
pub struct OutputQueue {
    item_order: Vec<String>,
    completed_transcripts: HashMap<String, String>,
    next_output_index: usize,
    /// Count of completions that arrived for an item already marked completed.
    pub races: u64,
}

impl OutputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `item_id` was created, in order, if not already known.
    ///
    /// If `item_id` already completed before its creation event arrived
    /// (§4.8.2's bypass-order case), that completion was already emitted
    /// immediately; drop the stray `completed_transcripts` entry instead of
    /// adding the item to `item_order`, or a future `drain_ready` would
    /// re-emit it a second time.
    pub fn note_created(&mut self, item_id: &str) {
        if self.completed_transcripts.remove(item_id).is_some() {
            return;
        }
        if !self.item_order.iter().any(|id| id == item_id) {
            self.item_order.push(item_id.to_string());
        }
    }

    /// Mark `item_id` completed with `text`. Returns the transcripts now ready
    /// to emit, in speech order. Returns an empty vec if nothing can be
    /// flushed yet (earlier items are still pending) or if this item already
    /// completed (a race between the realtime and fallback paths).
    pub fn complete(&mut self, item_id: &str, text: String) -> Vec<String> {
        if self.completed_transcripts.contains_key(item_id) {
            self.races += 1;
            return Vec::new();
        }

        if !self.item_order.iter().any(|id| id == item_id) {
            // No creation event was ever seen for this item: output immediately,
            // bypassing order (§4.8.2).
            self.completed_transcripts.insert(item_id.to_string(), text.clone());
            return vec![text];
        }

        self.completed_transcripts.insert(item_id.to_string(), text);
        self.drain_ready()
    }

    fn drain_ready(&mut self) -> Vec<String> {
        let mut ready = Vec::new();
        while let Some(id) = self.item_order.get(self.next_output_index) {
            match self.completed_transcripts.remove(id) {
                Some(text) => {
                    ready.push(text);
                    self.next_output_index += 1;
                }
                None => break,
            }
        }
        ready
    }

    /// Reset all state (called on reconnect, C4); C9's dedup window is
    /// separate and is not reset here.
    pub fn reset(&mut self) {
        self.item_order.clear();
        self.completed_transcripts.clear();
        self.next_output_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_in_creation_order_regardless_of_completion_order() {
        let mut q = OutputQueue::new();
        q.note_created("a");
        q.note_created("b");
        assert!(q.complete("b", "world".into()).is_empty());
        assert_eq!(q.complete("a", "hello".into()), vec!["hello", "world"]);
    }

    #[test]
    fn second_completion_of_same_item_is_a_race() {
        let mut q = OutputQueue::new();
        q.note_created("a");
        assert_eq!(q.complete("a", "first".into()), vec!["first"]);
        assert!(q.complete("a", "second".into()).is_empty());
        assert_eq!(q.races, 1);
    }

    #[test]
    fn late_creation_event_after_ghost_completion_does_not_reemit() {
        let mut q = OutputQueue::new();
        assert_eq!(q.complete("ghost", "surprise".into()), vec!["surprise"]);
        q.note_created("ghost");
        q.note_created("a");
        assert_eq!(q.complete("a", "hello".into()), vec!["hello"]);
    }

    #[test]
    fn item_without_creation_event_outputs_immediately() {
        let mut q = OutputQueue::new();
        assert_eq!(q.complete("ghost", "surprise".into()), vec!["surprise"]);
    }
}
