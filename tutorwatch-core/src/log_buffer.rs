//! Bounded log feed.
//!
//! Keeps the most recent log entries in arrival order, dropping the oldest
//! once capacity is reached so a long run never grows memory without bound.

use std::collections::VecDeque;

use crate::model::LogEntry;

/// Number of entries the feed keeps by default.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Ring buffer of log entries, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRingBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogRingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl LogRingBuffer {
    /// Creates an empty buffer holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry at the tail, evicting from the head while over capacity.
    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in arrival order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// The most recently appended entry.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Copies the entries out in arrival order.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a LogRingBuffer {
    type Item = &'a LogEntry;
    type IntoIter = std::collections::vec_deque::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
