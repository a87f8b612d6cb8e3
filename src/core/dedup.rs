//! Rolling record of recently served item ids

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ids remembered per channel session
pub const MAX_TRACKED: usize = 100;

/// FIFO-evicting set of item ids.
///
/// `ids` and `order` always hold the same members; `order` runs oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DedupTracker {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `id` as most recent. Returns the id evicted to stay under the cap.
    ///
    /// Re-recording a tracked id moves it to the newest slot.
    pub fn record(&mut self, id: &str) -> Option<String> {
        if self.ids.contains(id) {
            if let Some(pos) = self.order.iter().position(|x| x == id) {
                if let Some(existing) = self.order.remove(pos) {
                    self.order.push_back(existing);
                }
            }
            return None;
        }

        self.ids.insert(id.to_string());
        self.order.push_back(id.to_string());

        if self.order.len() > MAX_TRACKED {
            let oldest = self.order.pop_front()?;
            self.ids.remove(&oldest);
            debug!(evicted = %oldest, "dedup window full");
            return Some(oldest);
        }
        None
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Tracked ids, oldest first, for a catalog exclusion list
    pub fn as_exclude_list(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_keeps_most_recent_hundred() {
        let mut tracker = DedupTracker::new();
        let mut evicted = Vec::new();
        for i in 0..105 {
            if let Some(id) = tracker.record(&format!("v{}", i)) {
                evicted.push(id);
            }
        }

        assert_eq!(tracker.len(), MAX_TRACKED);
        assert_eq!(evicted, vec!["v0", "v1", "v2", "v3", "v4"]);
        for i in 0..5 {
            assert!(!tracker.contains(&format!("v{}", i)));
        }

        let list = tracker.as_exclude_list();
        assert_eq!(list.first().map(String::as_str), Some("v5"));
        assert_eq!(list.last().map(String::as_str), Some("v104"));
    }

    #[test]
    fn test_rerecord_refreshes_without_duplicating() {
        let mut tracker = DedupTracker::new();
        tracker.record("a");
        tracker.record("b");
        tracker.record("a");

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.as_exclude_list(), vec!["b", "a"]);
    }

    #[test]
    fn test_refreshed_id_survives_eviction() {
        let mut tracker = DedupTracker::new();
        for i in 0..MAX_TRACKED {
            tracker.record(&format!("v{}", i));
        }
        tracker.record("v0");
        tracker.record("new");

        assert!(tracker.contains("v0"));
        assert!(!tracker.contains("v1"));
        assert_eq!(tracker.len(), MAX_TRACKED);
    }

    #[test]
    fn test_serde_preserves_order() {
        let mut tracker = DedupTracker::new();
        tracker.record("x");
        tracker.record("y");
        let json = serde_json::to_string(&tracker).unwrap();
        let back: DedupTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tracker);
        assert_eq!(back.as_exclude_list(), vec!["x", "y"]);
    }
}
