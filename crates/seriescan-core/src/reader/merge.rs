//! Version-keyed priority merge across page batches.
//!
//! Any number of batches, each tagged with a [`VersionKey`] and an end
//! frontier, are multiplexed into a single direction-ordered point
//! stream. When several inputs hold the same timestamp, the point from
//! the input with the largest version survives and the others are
//! discarded at consumption time (shadowing). New inputs may arrive at
//! any moment, including inputs whose head timestamp precedes the
//! current head.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::model::{Batch, TimeValuePair, VersionKey};
use crate::order::Direction;

struct Element {
    direction: Direction,
    batch: Batch,
    version: VersionKey,
    frontier: i64,
}

impl Element {
    /// Head timestamp. Elements in the heap always have a head.
    fn head_time(&self) -> i64 {
        self.batch.current().map_or(0, |p| p.timestamp)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.head_time() == other.head_time() && self.version == other.version
    }
}

impl Eq for Element {}

impl PartialOrd for Element {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Element {
    fn cmp(&self, other: &Self) -> Ordering {
        // Heap pops the greatest element: the head that comes first in
        // the direction, with the larger version winning timestamp
        // ties. The version comparison is explicit; heap stability is
        // never relied upon.
        self.direction
            .compare_times(other.head_time(), self.head_time())
            .then_with(|| self.version.cmp(&other.version))
    }
}

/// Multiplexes per-page batches into one shadow-resolved point stream.
pub struct PriorityMergeReader {
    direction: Direction,
    heap: BinaryHeap<Element>,
}

impl PriorityMergeReader {
    pub fn new(direction: Direction) -> Self {
        PriorityMergeReader {
            direction,
            heap: BinaryHeap::new(),
        }
    }

    /// Add one input. `end_frontier` is the furthest timestamp the
    /// input's page occupies in the scan direction; empty batches are
    /// dropped.
    pub fn add_reader(&mut self, batch: Batch, version: VersionKey, end_frontier: i64) {
        if !batch.has_current() {
            return;
        }
        self.heap.push(Element {
            direction: self.direction,
            batch,
            version,
            frontier: end_frontier,
        });
    }

    pub fn has_next(&self) -> bool {
        !self.heap.is_empty()
    }

    /// Peek the winning head without consuming it.
    pub fn current(&self) -> Option<&TimeValuePair> {
        self.heap.peek().and_then(|e| e.batch.current())
    }

    /// The furthest timestamp that can be emitted without a not-yet-
    /// inserted input invalidating it: the nearest end frontier across
    /// still-live inputs.
    pub fn current_read_stop_time(&self) -> i64 {
        let mut stop = match self.direction {
            Direction::Asc => i64::MAX,
            Direction::Desc => i64::MIN,
        };
        for element in self.heap.iter() {
            stop = match self.direction {
                Direction::Asc => stop.min(element.frontier),
                Direction::Desc => stop.max(element.frontier),
            };
        }
        stop
    }

    /// Consume the winning head. Every other input holding the same
    /// timestamp is advanced past it; a loser whose following
    /// timestamp equals the winner's following timestamp is advanced
    /// past that one too, since the winner's larger version would
    /// shadow it again.
    pub fn next_pair(&mut self) -> Option<TimeValuePair> {
        let mut top = self.heap.pop()?;
        let pair = top.batch.advance()?;
        let top_next_time = top.batch.current().map(|p| p.timestamp);

        while self
            .heap
            .peek()
            .is_some_and(|e| e.head_time() == pair.timestamp)
        {
            let Some(mut loser) = self.heap.pop() else {
                break;
            };
            loser.batch.advance();
            if loser.batch.current().map(|p| p.timestamp) == top_next_time {
                loser.batch.advance();
            }
            if loser.batch.has_current() {
                self.heap.push(loser);
            }
        }

        if top.batch.has_current() {
            self.heap.push(top);
        }
        Some(pair)
    }
}
