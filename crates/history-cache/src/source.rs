//! Position history collaborators: where lazy loads fetch from, and the
//! bookkeeping of which ranges have been loaded.

use std::collections::VecDeque;

use board_core::Board;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form metadata attached by the caller. Only `name` and `tags` are read.
pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub position: Board,
    pub metadata: Metadata,
}

/// The full position history the cache loads slices from.
pub trait PositionSource: Send {
    /// Number of positions in the history.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records `start..end`, clamped to the history.
    fn fetch(&self, start: usize, end: usize) -> Vec<HistoryRecord>;
}

/// A history held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<HistoryRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<HistoryRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, position: Board, metadata: Metadata) {
        self.records.push(HistoryRecord { position, metadata });
    }
}

impl PositionSource for InMemorySource {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn fetch(&self, start: usize, end: usize) -> Vec<HistoryRecord> {
        let end = end.min(self.records.len());
        if start >= end {
            return Vec::new();
        }
        self.records[start..end].to_vec()
    }
}

/// Half-open index ranges already fetched, oldest first.
#[derive(Debug, Clone)]
pub struct LoadedRanges {
    ranges: VecDeque<(usize, usize)>,
    cap: usize,
}

impl LoadedRanges {
    pub fn new(cap: usize) -> Self {
        Self {
            ranges: VecDeque::new(),
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn is_over_cap(&self) -> bool {
        self.ranges.len() > self.cap
    }

    /// Record a range as the newest. A range already tracked is moved to the back.
    pub fn record(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        self.ranges.retain(|&r| r != (start, end));
        self.ranges.push_back((start, end));
    }

    /// True if one tracked range covers all of `start..end`.
    pub fn covers(&self, start: usize, end: usize) -> bool {
        start < end && self.ranges.iter().any(|&(s, e)| s <= start && end <= e)
    }

    /// Drop ranges failing `keep`, then the oldest past the cap. Returns how many were dropped.
    pub fn prune(&mut self, mut keep: impl FnMut(usize, usize) -> bool) -> usize {
        let before = self.ranges.len();
        self.ranges.retain(|&(s, e)| keep(s, e));
        while self.ranges.len() > self.cap {
            self.ranges.pop_front();
        }
        before - self.ranges.len()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}
