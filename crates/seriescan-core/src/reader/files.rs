//! Lazy cursor over the two file populations.
//!
//! Sequential files keep their inherent global order and are consumed
//! from the end matching the scan direction. Unsequential files are
//! sorted once at construction by their direction order time; ties and
//! interleavings are common there, but no files arrive mid-query, so a
//! sort-once deque is the whole queue.
//!
//! Loading the front of either population pops the file and asks it
//! for the series' metadata block. Files without the series are simply
//! dropped. Loaded blocks are tagged with their population; unseq
//! blocks are additionally tagged `modified` unconditionally, which
//! keeps every downstream consumer off the statistics-only shortcut —
//! deletions inside unseq files are invisible at this tier.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use crate::context::QueryContext;
use crate::filter::{FileFilter, Filter};
use crate::model::{SeriesMetadata, SeriesPath};
use crate::order::Direction;
use crate::store::{FileResource, LoadError};

pub(crate) struct FileCursor {
    direction: Direction,
    series: SeriesPath,
    seq: VecDeque<Arc<dyn FileResource>>,
    unseq: VecDeque<Arc<dyn FileResource>>,
}

impl FileCursor {
    pub(crate) fn new(
        direction: Direction,
        series: SeriesPath,
        seq: Vec<Arc<dyn FileResource>>,
        unseq: Vec<Arc<dyn FileResource>>,
        file_filter: Option<&dyn FileFilter>,
    ) -> Self {
        let accept = |file: &Arc<dyn FileResource>| {
            file_filter.map_or(true, |filter| filter.accept(file.as_ref()))
        };
        let seq: VecDeque<_> = seq.into_iter().filter(|file| accept(file)).collect();
        let mut unseq: Vec<_> = unseq.into_iter().filter(|file| accept(file)).collect();
        unseq.sort_by(|a, b| {
            direction.compare_times(
                direction.order_time_of_file(a.as_ref(), &series),
                direction.order_time_of_file(b.as_ref(), &series),
            )
        });

        FileCursor {
            direction,
            series,
            seq,
            unseq: unseq.into(),
        }
    }

    pub(crate) fn has_seq(&self) -> bool {
        !self.seq.is_empty()
    }

    pub(crate) fn has_unseq(&self) -> bool {
        !self.unseq.is_empty()
    }

    fn peek_seq(&self) -> Option<&Arc<dyn FileResource>> {
        match self.direction {
            Direction::Asc => self.seq.front(),
            Direction::Desc => self.seq.back(),
        }
    }

    fn peek_unseq(&self) -> Option<&Arc<dyn FileResource>> {
        self.unseq.front()
    }

    fn pop(&mut self, is_seq: bool) -> Option<Arc<dyn FileResource>> {
        if is_seq {
            match self.direction {
                Direction::Asc => self.seq.pop_front(),
                Direction::Desc => self.seq.pop_back(),
            }
        } else {
            self.unseq.pop_front()
        }
    }

    /// Whether a frontier at `time` reaches into the front sequential
    /// file.
    pub(crate) fn seq_front_overlaps(&self, time: i64) -> bool {
        self.peek_seq().is_some_and(|file| {
            self.direction
                .time_overlaps_file(time, file.as_ref(), &self.series)
        })
    }

    /// Whether a frontier at `time` reaches into the front
    /// unsequential file.
    pub(crate) fn unseq_front_overlaps(&self, time: i64) -> bool {
        self.peek_unseq().is_some_and(|file| {
            self.direction
                .time_overlaps_file(time, file.as_ref(), &self.series)
        })
    }

    /// Pop the front file of one population and load its metadata
    /// block for the series. `None` when the file has nothing for the
    /// series; the file is dropped either way.
    pub(crate) fn load_front(
        &mut self,
        is_seq: bool,
        context: &QueryContext,
        filter: Option<&dyn Filter>,
        all_siblings: &BTreeSet<String>,
    ) -> Result<Option<SeriesMetadata>, LoadError> {
        let Some(file) = self.pop(is_seq) else {
            return Ok(None);
        };
        let loaded =
            file.load_series_metadata(&self.series, context, filter, all_siblings)?;
        let Some(mut metadata) = loaded else {
            log::debug!(
                "query {}: series {} absent from {} file, skipping",
                context.query_id(),
                self.series,
                if is_seq { "seq" } else { "unseq" }
            );
            return Ok(None);
        };
        metadata.set_seq(is_seq);
        if !is_seq {
            metadata.mark_modified();
        }
        Ok(Some(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataType, FieldValue};
    use crate::store::memory::MemoryFileBuilder;

    fn series() -> SeriesPath {
        SeriesPath::new("dev1", "s1")
    }

    fn file(version: u64, start: i64, end: i64) -> Arc<dyn FileResource> {
        MemoryFileBuilder::new(version)
            .chunk(
                &series(),
                DataType::Int64,
                vec![vec![
                    (start, FieldValue::Int64(start)),
                    (end, FieldValue::Int64(end)),
                ]],
            )
            .build()
            .handle()
    }

    #[test]
    fn unseq_files_sorted_by_direction_order_time() {
        let a = file(1, 10, 100);
        let b = file(2, 5, 50);
        let c = file(3, 20, 30);

        let asc = FileCursor::new(
            Direction::Asc,
            series(),
            Vec::new(),
            vec![a.clone(), b.clone(), c.clone()],
            None,
        );
        let starts: Vec<i64> = asc.unseq.iter().map(|f| f.start_time(&series())).collect();
        assert_eq!(starts, vec![5, 10, 20]);

        let desc = FileCursor::new(Direction::Desc, series(), Vec::new(), vec![a, b, c], None);
        let ends: Vec<i64> = desc.unseq.iter().map(|f| f.end_time(&series())).collect();
        assert_eq!(ends, vec![100, 50, 30]);
    }

    #[test]
    fn seq_consumed_from_direction_end() {
        let early = file(1, 0, 10);
        let late = file(2, 20, 30);

        let mut asc = FileCursor::new(
            Direction::Asc,
            series(),
            vec![early.clone(), late.clone()],
            Vec::new(),
            None,
        );
        assert_eq!(asc.pop(true).map(|f| f.start_time(&series())), Some(0));

        let mut desc = FileCursor::new(Direction::Desc, series(), vec![early, late], Vec::new(), None);
        assert_eq!(desc.pop(true).map(|f| f.start_time(&series())), Some(20));
    }

    #[test]
    fn load_front_skips_files_without_the_series() {
        let other = SeriesPath::new("dev2", "s9");
        let absent = MemoryFileBuilder::new(1)
            .chunk(&other, DataType::Int64, vec![vec![(1, FieldValue::Int64(1))]])
            .build()
            .handle();

        let mut cursor = FileCursor::new(Direction::Asc, series(), vec![absent], Vec::new(), None);
        let ctx = QueryContext::new(1);
        let loaded = cursor
            .load_front(true, &ctx, None, &BTreeSet::new())
            .unwrap();
        assert!(loaded.is_none());
        assert!(!cursor.has_seq());
    }

    #[test]
    fn unseq_blocks_are_tagged_modified() {
        let mut cursor = FileCursor::new(
            Direction::Asc,
            series(),
            Vec::new(),
            vec![file(1, 0, 10)],
            None,
        );
        let ctx = QueryContext::new(1);
        let metadata = cursor
            .load_front(false, &ctx, None, &BTreeSet::new())
            .unwrap()
            .expect("series present");
        assert!(!metadata.is_seq);
        assert!(metadata.modified);
    }

    #[test]
    fn file_filter_applies_once_at_construction() {
        #[derive(Debug)]
        struct After(i64);
        impl FileFilter for After {
            fn accept(&self, file: &dyn FileResource) -> bool {
                file.end_time(&SeriesPath::new("dev1", "s1")) >= self.0
            }
        }

        let cursor = FileCursor::new(
            Direction::Asc,
            series(),
            vec![file(1, 0, 10), file(2, 20, 30)],
            vec![file(3, 0, 5)],
            Some(&After(15)),
        );
        assert_eq!(cursor.seq.len(), 1);
        assert!(cursor.unseq.is_empty());
    }
}
