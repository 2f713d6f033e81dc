//! Insertion Order Module
//!
//! Tracks the order in which keys first entered the cache, for overflow eviction.

use std::collections::VecDeque;

// == Insertion Order ==
/// Tracks key insertion order for FIFO eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest inserted
/// - Back = Newest inserted
///
/// Re-inserting a key that is already tracked does not move it, so an
/// overwritten entry keeps its original position.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    order: VecDeque<String>,
}

impl InsertionOrder {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Record ==
    /// Appends a key as newest, unless it is already tracked.
    pub fn record(&mut self, key: &str) {
        if !self.contains(key) {
            self.order.push_back(key.to_string());
        }
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Evict Oldest ==
    /// Returns and removes the oldest inserted key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_new() {
        let order = InsertionOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.len(), 0);
    }

    #[test]
    fn test_record_keeps_first_insertion_oldest() {
        let mut order = InsertionOrder::new();

        order.record("gallery:all");
        order.record("gallery:painting");
        order.record("tags");

        assert_eq!(order.len(), 3);
        assert_eq!(order.evict_oldest(), Some("gallery:all".to_string()));
    }

    #[test]
    fn test_rerecord_does_not_move_key() {
        let mut order = InsertionOrder::new();

        order.record("a");
        order.record("b");
        order.record("a");

        assert_eq!(order.len(), 2);
        assert_eq!(order.evict_oldest(), Some("a".to_string()));
        assert_eq!(order.evict_oldest(), Some("b".to_string()));
    }

    #[test]
    fn test_evict_empty() {
        let mut order = InsertionOrder::new();
        assert_eq!(order.evict_oldest(), None);
    }

    #[test]
    fn test_remove_then_record_moves_to_back() {
        let mut order = InsertionOrder::new();

        order.record("a");
        order.record("b");
        order.record("c");
        order.remove("a");
        order.record("a");

        assert_eq!(order.evict_oldest(), Some("b".to_string()));
        assert_eq!(order.evict_oldest(), Some("c".to_string()));
        assert_eq!(order.evict_oldest(), Some("a".to_string()));
    }

    #[test]
    fn test_remove_nonexistent_key() {
        let mut order = InsertionOrder::new();
        order.record("key1");

        order.remove("nonexistent");

        assert_eq!(order.len(), 1);
        assert!(order.contains("key1"));
    }

    #[test]
    fn test_clear() {
        let mut order = InsertionOrder::new();
        order.record("x");
        order.record("y");
        order.clear();
        assert!(order.is_empty());
    }
}
