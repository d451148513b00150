//! Bounded diagnostic log.
//!
//! A fixed number of slots written round-robin. Once every slot is used the
//! oldest entry is overwritten, so at most `capacity` entries are ever live
//! and anything older is gone for good. Reads are newest-first.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Seconds since boot.
    pub timestamp: u32,
    pub level: LogLevel,
    pub message: String,
}

/// Anything that accepts diagnostic events.
pub trait EventLog {
    fn record(&mut self, level: LogLevel, message: &str);
}

/// Fixed-capacity ring of [`LogEntry`] values.
///
/// An empty slot is `None`; `head` is the slot the next append writes.
#[derive(Debug, Clone)]
pub struct LogStore {
    slots: Vec<Option<LogEntry>>,
    head: usize,
    count: usize,
    max_message_len: usize,
}

impl LogStore {
    /// Create a store with `capacity` slots (at least one).
    pub fn new(capacity: usize, max_message_len: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            head: 0,
            count: 0,
            max_message_len,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries; saturates at the capacity.
    pub fn total_entries(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Store an entry, overwriting the oldest one when full.
    pub fn append(&mut self, timestamp: u32, level: LogLevel, message: &str) {
        let message = truncate(message, self.max_message_len).to_string();
        self.slots[self.head] = Some(LogEntry {
            timestamp,
            level,
            message,
        });
        self.head = (self.head + 1) % self.slots.len();
        if self.count < self.slots.len() {
            self.count += 1;
        }
    }

    /// Up to `count` entries, newest first.
    pub fn recent(&self, count: usize) -> Vec<&LogEntry> {
        let capacity = self.slots.len();
        (1..=count.min(self.count))
            .filter_map(|back| self.slots[(self.head + capacity - back) % capacity].as_ref())
            .collect()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.count = 0;
    }
}

/// Longest prefix of `message` that fits in `max` bytes without splitting a character.
fn truncate(message: &str, max: usize) -> &str {
    if message.len() <= max {
        return message;
    }
    let mut end = max;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn messages(store: &LogStore, count: usize) -> Vec<String> {
        store
            .recent(count)
            .into_iter()
            .map(|e| e.message.clone())
            .collect()
    }

    #[test]
    fn test_empty_store() {
        let store = LogStore::new(50, 128);
        assert!(store.is_empty());
        assert_eq!(store.total_entries(), 0);
        assert!(store.recent(10).is_empty());
    }

    #[test]
    fn test_recent_newest_first() {
        let mut store = LogStore::new(50, 128);
        for i in 0..5 {
            store.append(i, LogLevel::Info, &format!("event {}", i));
        }

        assert_eq!(store.total_entries(), 5);
        assert_eq!(messages(&store, 3), vec!["event 4", "event 3", "event 2"]);
        assert_eq!(store.recent(3)[0].timestamp, 4);
    }

    #[test]
    fn test_recent_count_bounded_by_entries() {
        let mut store = LogStore::new(4, 128);
        for n in 0..10u32 {
            for count in 0..8 {
                let expected = count.min((n as usize).min(4));
                assert_eq!(store.recent(count).len(), expected, "n={} count={}", n, count);
            }
            store.append(n, LogLevel::Info, &n.to_string());
        }
    }

    #[test]
    fn test_overwrite_oldest_when_full() {
        let mut store = LogStore::new(3, 128);
        for i in 0..5 {
            store.append(i, LogLevel::Warning, &format!("e{}", i));
        }

        assert_eq!(store.total_entries(), 3);
        assert_eq!(messages(&store, 10), vec!["e4", "e3", "e2"]);
    }

    #[test]
    fn test_message_truncated_on_char_boundary() {
        let mut store = LogStore::new(2, 5);
        store.append(0, LogLevel::Error, "abcdefgh");
        store.append(1, LogLevel::Error, "abcdé");

        assert_eq!(messages(&store, 2), vec!["abcd", "abcde"]);
    }

    #[test]
    fn test_clear() {
        let mut store = LogStore::new(3, 128);
        store.append(0, LogLevel::Success, "ok");
        store.clear();
        assert!(store.is_empty());
        assert!(store.recent(5).is_empty());
    }

    #[test]
    fn test_level_serialization() {
        let json = serde_json::to_string(&LogLevel::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
        assert_eq!(LogLevel::Success.to_string(), "SUCCESS");
    }
}
