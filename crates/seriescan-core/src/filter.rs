//! Filter seams consumed by the read path.
//!
//! Filter *compilation* happens in the planner; the reader only needs
//! two narrow abilities: a point-level predicate it can push down or
//! apply while merging, and a statistics-range fast check loaders use
//! to prune whole items. [`TimeRange`] is the one concrete filter the
//! core owns because time windows are pushed down everywhere.
//!
//! At most one of the reader's time filter and value filter is set in
//! practice: time filters are pushed to every page, value filters only
//! to non-overlapped pages (overlap resolution discards points by
//! version, not by value, so a pre-applied value filter would be
//! unsound there).

use std::fmt;

use crate::model::FieldValue;
use crate::store::FileResource;

/// Point-level predicate.
pub trait Filter: fmt::Debug + Send + Sync {
    /// Whether the point `(timestamp, value)` satisfies the filter.
    fn satisfy(&self, timestamp: i64, value: &FieldValue) -> bool;

    /// Whether *any* point inside the inclusive time range
    /// `[start_time, end_time]` could satisfy the filter. Loaders use
    /// this against statistics to skip items wholesale; the default is
    /// conservative.
    fn satisfy_range(&self, start_time: i64, end_time: i64) -> bool {
        let _ = (start_time, end_time);
        true
    }
}

/// File-level predicate applied once when a reader is constructed.
pub trait FileFilter: fmt::Debug {
    /// Whether `file` should participate in the query at all.
    fn accept(&self, file: &dyn FileResource) -> bool;
}

/// Inclusive time window `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        TimeRange { start, end }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

impl Filter for TimeRange {
    fn satisfy(&self, timestamp: i64, _value: &FieldValue) -> bool {
        self.contains(timestamp)
    }

    fn satisfy_range(&self, start_time: i64, end_time: i64) -> bool {
        // closed-interval intersection
        self.start <= end_time && start_time <= self.end
    }
}
