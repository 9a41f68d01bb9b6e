use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of entries kept in any bounded history.
pub const DEFAULT_MAX_HISTORY_ENTRIES: usize = 50;

/// An append-only history that keeps only its most recent entries.
///
/// Entries are kept oldest-first. Pushing past the capacity silently drops the
/// oldest entries, so the history behaves like a ring buffer. The capacity is
/// supplied on every push and is not stored; the serialized form is a plain
/// sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History<T> {
    entries: VecDeque<T>,
}

impl<T> History<T> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Appends `entry` and trims the history down to `max` entries.
    ///
    /// A `max` of zero is treated as one: the entry just pushed is always kept.
    pub fn push(&mut self, entry: T, max: usize) {
        self.entries.push_back(entry);
        let max = max.max(1);
        while self.entries.len() > max {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently pushed entry.
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Iterates oldest-first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for History<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_fifty_most_recent_entries() {
        let mut history = History::new();
        for i in 0..55 {
            history.push(i, DEFAULT_MAX_HISTORY_ENTRIES);
        }

        assert_eq!(history.len(), 50);
        assert_eq!(history.iter().next(), Some(&5));
        assert_eq!(history.latest(), Some(&54));
        assert!(history.iter().copied().eq(5..55));
    }

    #[test]
    fn shrinking_capacity_applies_on_next_push() {
        let mut history: History<u32> = (0..10).collect();
        history.push(10, 3);
        assert!(history.iter().copied().eq(8..11));
    }

    #[test]
    fn zero_capacity_keeps_latest_entry() {
        let mut history = History::new();
        history.push("a", 0);
        history.push("b", 0);
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest(), Some(&"b"));
    }

    #[test]
    fn serializes_as_plain_sequence() {
        let history: History<u8> = [1, 2, 3].into_iter().collect();
        let bytes = rmp_serde::to_vec(&history).unwrap();
        let plain: Vec<u8> = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(plain, vec![1, 2, 3]);
    }
}
