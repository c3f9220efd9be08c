//! Read-direction policy.
//!
//! Ascending and descending scans are exact mirrors of each other: swap
//! "start" and "end", flip the comparison direction, and consume
//! ordered lists from the opposite end. Every direction-sensitive
//! decision in the pipeline goes through [`Direction`] so the pipeline
//! itself is written once.
//!
//! Terminology used below:
//!
//! - The *order time* of an item is the timestamp used to rank it
//!   against unexplored peers: the time at which it first becomes
//!   relevant when travelling in the direction.
//! - The *trailing frontier* of an item is the furthest point it
//!   occupies in the direction of travel; anything ordered past the
//!   frontier can no longer be affected by that item.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{SeriesPath, Statistics};
use crate::store::FileResource;

/// Direction of a series scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Emit timestamps in non-decreasing order.
    Asc,
    /// Emit timestamps in non-increasing order.
    Desc,
}

impl Direction {
    pub fn is_ascending(self) -> bool {
        matches!(self, Direction::Asc)
    }

    /// Queue key for ranking unexplored peers.
    pub fn order_time(self, stats: &Statistics) -> i64 {
        match self {
            Direction::Asc => stats.start_time,
            Direction::Desc => stats.end_time,
        }
    }

    /// Queue key for ranking a whole file's slice of `series`.
    pub fn order_time_of_file(self, file: &dyn FileResource, series: &SeriesPath) -> i64 {
        match self {
            Direction::Asc => file.start_time(series),
            Direction::Desc => file.end_time(series),
        }
    }

    /// Trailing frontier of a current item.
    pub fn overlap_check_time(self, stats: &Statistics) -> i64 {
        match self {
            Direction::Asc => stats.end_time,
            Direction::Desc => stats.start_time,
        }
    }

    /// Whether `left`'s trailing frontier reaches into `right`.
    pub fn ranges_overlap(self, left: &Statistics, right: &Statistics) -> bool {
        match self {
            Direction::Asc => left.end_time >= right.start_time,
            Direction::Desc => left.start_time <= right.end_time,
        }
    }

    /// Whether a frontier at `time` reaches into `right`.
    pub fn time_overlaps(self, time: i64, right: &Statistics) -> bool {
        match self {
            Direction::Asc => time >= right.start_time,
            Direction::Desc => time <= right.end_time,
        }
    }

    /// Whether a frontier at `time` reaches into `file`'s slice of
    /// `series`.
    pub fn time_overlaps_file(self, time: i64, file: &dyn FileResource, series: &SeriesPath) -> bool {
        match self {
            Direction::Asc => time >= file.start_time(series),
            Direction::Desc => time <= file.end_time(series),
        }
    }

    /// Timestamp ordering under this direction: `Less` means `a` is
    /// emitted before `b`.
    pub fn compare_times(self, a: i64, b: i64) -> Ordering {
        match self {
            Direction::Asc => a.cmp(&b),
            Direction::Desc => b.cmp(&a),
        }
    }

    /// Shrink `current` so it does not cross `stats`' trailing frontier.
    ///
    /// Used while merging: emission out of an overlapped page must not
    /// run past the extent of a contemporaneous peer that has not been
    /// absorbed yet.
    pub fn clamp_frontier(self, current: i64, stats: &Statistics) -> i64 {
        match self {
            Direction::Asc => current.min(stats.end_time),
            Direction::Desc => current.max(stats.start_time),
        }
    }

    /// Widen `current` once the page owning `stats` has been absorbed
    /// into the merge reader; its extent no longer constrains emission.
    pub fn extend_frontier(self, current: i64, stats: &Statistics) -> i64 {
        match self {
            Direction::Asc => current.max(stats.end_time),
            Direction::Desc => current.min(stats.start_time),
        }
    }

    /// Combined trailing frontier of the two front candidates.
    pub fn frontier_of_two(self, seq: &Statistics, unseq: &Statistics) -> i64 {
        match self {
            Direction::Asc => seq.end_time.min(unseq.end_time),
            Direction::Desc => seq.start_time.max(unseq.start_time),
        }
    }

    /// Whether `time` lies strictly past `frontier` in this direction.
    pub fn excess(self, time: i64, frontier: i64) -> bool {
        match self {
            Direction::Asc => time > frontier,
            Direction::Desc => time < frontier,
        }
    }

    /// Tie-break between the two front candidates of a tier: `true`
    /// when the sequential side becomes the current item.
    pub fn prefer_seq(self, seq: &Statistics, unseq: &Statistics) -> bool {
        match self {
            Direction::Asc => seq.start_time < unseq.start_time,
            Direction::Desc => seq.end_time > unseq.end_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(start: i64, end: i64) -> Statistics {
        Statistics::new(start, end, 1)
    }

    #[test]
    fn order_and_frontier_mirror() {
        let s = stats(10, 20);
        assert_eq!(Direction::Asc.order_time(&s), 10);
        assert_eq!(Direction::Desc.order_time(&s), 20);
        assert_eq!(Direction::Asc.overlap_check_time(&s), 20);
        assert_eq!(Direction::Desc.overlap_check_time(&s), 10);
    }

    #[test]
    fn overlap_predicates() {
        let a = stats(0, 10);
        let b = stats(10, 20);
        let c = stats(11, 20);
        assert!(Direction::Asc.ranges_overlap(&a, &b));
        assert!(!Direction::Asc.ranges_overlap(&a, &c));
        assert!(Direction::Desc.ranges_overlap(&b, &a));
        assert!(!Direction::Desc.ranges_overlap(&c, &a));

        assert!(Direction::Asc.time_overlaps(10, &b));
        assert!(!Direction::Asc.time_overlaps(9, &b));
        assert!(Direction::Desc.time_overlaps(20, &b));
        assert!(!Direction::Desc.time_overlaps(21, &b));
    }

    #[test]
    fn comparator_flips_for_desc() {
        assert_eq!(Direction::Asc.compare_times(1, 2), Ordering::Less);
        assert_eq!(Direction::Desc.compare_times(1, 2), Ordering::Greater);
        assert_eq!(Direction::Desc.compare_times(5, 5), Ordering::Equal);
    }

    #[test]
    fn clamp_extend_and_excess() {
        let s = stats(10, 20);
        assert_eq!(Direction::Asc.clamp_frontier(25, &s), 20);
        assert_eq!(Direction::Asc.clamp_frontier(15, &s), 15);
        assert_eq!(Direction::Desc.clamp_frontier(5, &s), 10);
        assert_eq!(Direction::Asc.extend_frontier(15, &s), 20);
        assert_eq!(Direction::Desc.extend_frontier(15, &s), 10);

        assert!(Direction::Asc.excess(21, 20));
        assert!(!Direction::Asc.excess(20, 20));
        assert!(Direction::Desc.excess(9, 10));
        assert!(!Direction::Desc.excess(10, 10));
    }

    #[test]
    fn seq_preference() {
        let seq = stats(1, 30);
        let unseq = stats(2, 40);
        assert!(Direction::Asc.prefer_seq(&seq, &unseq));
        assert!(!Direction::Desc.prefer_seq(&seq, &unseq));
        assert_eq!(Direction::Asc.frontier_of_two(&seq, &unseq), 30);
        assert_eq!(Direction::Desc.frontier_of_two(&seq, &unseq), 2);
    }
}
