//! Session history
//!
//! A linear stack of `{ path }` records mirroring the host's history. The
//! navigation controller pushes on user-initiated transitions; the host
//! recovers the target path for back/forward from the record it gets out
//! of `back()`/`forward()` and feeds it to the router's pop entry point.

use serde::{Deserialize, Serialize};

/// Record associated with one history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Normalized page path
    pub path: String,
}

impl HistoryRecord {
    /// Create a record for a path
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Linear history stack with a cursor
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryRecord>,
    index: usize,
}

impl History {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current entry (or seed an empty history)
    pub fn replace(&mut self, path: impl Into<String>) {
        let record = HistoryRecord::new(path);
        if self.entries.is_empty() {
            self.entries.push(record);
            self.index = 0;
        } else {
            self.entries[self.index] = record;
        }
    }

    /// Push a new entry, discarding any forward entries
    pub fn push(&mut self, path: impl Into<String>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(HistoryRecord::new(path));
        self.index = self.entries.len() - 1;
    }

    /// The entry the cursor points at
    pub fn current(&self) -> Option<&HistoryRecord> {
        self.entries.get(self.index)
    }

    /// Move the cursor back and return the record now current
    pub fn back(&mut self) -> Option<HistoryRecord> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.current().cloned()
    }

    /// Move the cursor forward and return the record now current
    pub fn forward(&mut self) -> Option<HistoryRecord> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.current().cloned()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
