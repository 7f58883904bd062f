use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 25;

/// Bounded, most-recent-first list of human-readable event messages.
/// Once full, pushing a new message silently drops the oldest one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFeed {
    capacity: usize,
    entries: VecDeque<String>,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Rebuild a feed from stored entries (already most-recent-first).
    pub fn from_entries(capacity: usize, entries: Vec<String>) -> Self {
        let mut feed = Self::new(capacity);
        feed.entries = entries.into_iter().take(feed.capacity).collect();
        feed
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.entries.push_front(message.into());
        self.entries.truncate(self.capacity);
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_CAPACITY)
    }
}
