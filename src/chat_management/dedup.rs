//! Bounded recent-id cache for the at-least-once chat feed.
//!
//! The upstream feed repeats the same events across consecutive polls while
//! they are still visible, so every batch passes through a [`DedupWindow`]
//! before it reaches the moderation pipeline.

use std::collections::{HashSet, VecDeque};

use crate::models::ChatMessage;

/// Size at which the oldest ids start to be evicted.
pub const SEEN_HIGH_WATER: usize = 5000;
/// Size the set shrinks back to after an eviction.
pub const SEEN_LOW_WATER: usize = 2000;

/// Insertion-ordered set of message ids with high/low water eviction.
#[derive(Debug, Clone)]
pub struct SeenSet {
    order: VecDeque<String>,
    ids: HashSet<String>,
    high: usize,
    low: usize,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::with_limits(SEEN_HIGH_WATER, SEEN_LOW_WATER)
    }

    /// `low` is clamped to `high`.
    pub fn with_limits(high: usize, low: usize) -> Self {
        Self {
            order: VecDeque::new(),
            ids: HashSet::new(),
            high,
            low: low.min(high),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());

        if self.order.len() > self.high {
            let evicted = self.order.len() - self.low;
            for old in self.order.drain(..evicted) {
                self.ids.remove(&old);
            }
            tracing::debug!(evicted, remaining = self.order.len(), "🧹 Seen-id window trimmed");
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops messages whose id was seen recently.
#[derive(Debug, Default)]
pub struct DedupWindow {
    seen: SeenSet,
}

impl DedupWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seen_set(seen: SeenSet) -> Self {
        Self { seen }
    }

    /// Keep first sightings in order and remember their ids.
    pub fn filter(&mut self, raw_messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let total = raw_messages.len();
        let fresh: Vec<ChatMessage> = raw_messages
            .into_iter()
            .filter(|msg| self.seen.insert(&msg.id))
            .collect();

        if fresh.len() < total {
            tracing::debug!(
                duplicates = total - fresh.len(),
                fresh = fresh.len(),
                "🔁 Dropped re-delivered messages"
            );
        }
        fresh
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::message;

    #[test]
    fn test_filter_drops_repeated_ids() {
        let mut window = DedupWindow::new();

        let first = window.filter(vec![message("a", "UC1", "x"), message("b", "UC2", "y")]);
        assert_eq!(first.len(), 2);

        let second = window.filter(vec![
            message("b", "UC2", "y"),
            message("c", "UC3", "z"),
            message("a", "UC1", "x"),
        ]);
        assert_eq!(second.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["c"]);
        assert!(window.seen().contains("c"));
    }

    #[test]
    fn test_filter_drops_duplicates_within_one_batch() {
        let mut window = DedupWindow::new();
        let out = window.filter(vec![message("a", "UC1", "x"), message("a", "UC1", "x")]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_seen_set_evicts_oldest_down_to_low_water() {
        let mut seen = SeenSet::with_limits(5, 2);
        for i in 0..5 {
            assert!(seen.insert(&format!("id{i}")));
        }
        assert_eq!(seen.len(), 5);

        // Sixth insert crosses the high water mark.
        seen.insert("id5");
        assert_eq!(seen.len(), 2);
        assert!(seen.contains("id4"));
        assert!(seen.contains("id5"));
        assert!(!seen.contains("id0"));
        assert!(!seen.contains("id3"));
    }

    #[test]
    fn test_seen_set_never_cleared_entirely() {
        let mut seen = SeenSet::new();
        for i in 0..=SEEN_HIGH_WATER {
            seen.insert(&i.to_string());
        }
        assert_eq!(seen.len(), SEEN_LOW_WATER);
        assert!(seen.contains(&SEEN_HIGH_WATER.to_string()));
    }

    #[test]
    fn test_evicted_ids_are_new_again() {
        let mut window = DedupWindow::with_seen_set(SeenSet::with_limits(3, 1));
        window.filter(vec![
            message("a", "U", "1"),
            message("b", "U", "2"),
            message("c", "U", "3"),
            message("d", "U", "4"),
        ]);
        assert_eq!(window.seen().len(), 1);
        assert_eq!(window.filter(vec![message("a", "U", "1")]).len(), 1);
        assert!(window.filter(vec![message("d", "U", "4")]).is_empty());
    }
}
