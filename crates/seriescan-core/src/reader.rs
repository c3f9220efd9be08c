//! The four-tier overlap pipeline.
//!
//! [`SeriesReader`] streams one series from the two file populations
//! through four lazily-materialized tiers:
//!
//! ```text
//! files ──▶ series metadata ──▶ chunks ──▶ pages ──▶ points
//! ```
//!
//! Each tier holds at most one *current* item (`first_*`) plus buffers
//! of unexplored peers. An item only descends a tier when its time
//! range can still affect the next emitted value; when an overlap is
//! detected anywhere, every directly-overlapping peer is cascaded down
//! (files → metadata → chunks → pages, always in that order) before a
//! result is produced, and overlapping pages are reconciled point by
//! point in the version-keyed merge reader.
//!
//! The caller drives the reader tier by tier:
//!
//! - `has_next_file` / `has_next_chunk` / `has_next_page` advance a
//!   tier; the two higher ones fail fast when lower-tier buffers still
//!   hold data.
//! - `current_*_statistics` / `current_*_modified` / `is_*_overlapped`
//!   let aggregation-style callers answer from statistics alone and
//!   `skip_current_*` past items that need no materialization.
//! - `next_page` yields either the current page's batch or a cached
//!   batch of merged overlapped data.
//!
//! The cascade is a function, not a fixed control path: overlap found
//! while merging points re-enters it with the merge head's timestamp,
//! which can pull in more files, metadata, chunks, and pages mid-batch.

pub mod error;
pub mod files;
pub mod merge;
pub mod page;
pub mod queue;

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use snafu::prelude::*;

use crate::context::QueryContext;
use crate::filter::{FileFilter, Filter};
use crate::model::{Batch, BatchBuilder, ChunkMetadata, DataType, SeriesMetadata, SeriesPath, Statistics};
use crate::order::Direction;
use crate::store::QuerySource;
use error::{
    CancelledSnafu, LoadSnafu, NoCurrentChunkSnafu, NoCurrentFileSnafu, NoCurrentPageSnafu,
    NoNextPageSnafu, OverlapNotConsumedSnafu, ResidualChunksSnafu, ResidualPagesSnafu,
};
pub use error::{ReadError, ReadResult};
use files::FileCursor;
use merge::PriorityMergeReader;
use page::PrioritizedPageReader;
use queue::TimeOrderedQueue;

/// Order-preserving merge reader for a single series.
///
/// Single consumer; all buffers are private to the instance. File
/// handles are borrowed from the query's resource manager and outlive
/// the reader.
pub struct SeriesReader {
    series: SeriesPath,
    all_siblings: BTreeSet<String>,
    data_type: DataType,
    context: Arc<QueryContext>,
    direction: Direction,

    /// Pushed down to every page.
    time_filter: Option<Arc<dyn Filter>>,
    /// Pushed down to non-overlapped pages only; applied point-wise
    /// during merging because overlap resolution discards by version,
    /// not by value.
    value_filter: Option<Arc<dyn Filter>>,

    files: FileCursor,

    // series-metadata tier
    first_series: Option<SeriesMetadata>,
    seq_series: VecDeque<SeriesMetadata>,
    unseq_series: TimeOrderedQueue<SeriesMetadata>,

    // chunk tier
    first_chunk: Option<ChunkMetadata>,
    chunk_pool: TimeOrderedQueue<ChunkMetadata>,

    // page tier
    first_page: Option<PrioritizedPageReader>,
    seq_pages: VecDeque<PrioritizedPageReader>,
    unseq_pages: TimeOrderedQueue<PrioritizedPageReader>,

    // point tier
    merge_reader: PriorityMergeReader,

    // result cache
    cached_batch: Option<Batch>,
}

impl SeriesReader {
    /// Build a reader over one query's file populations.
    ///
    /// At most one of `time_filter` and `value_filter` is set in
    /// practice. `file_filter` is applied once, here.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        series: SeriesPath,
        all_siblings: BTreeSet<String>,
        data_type: DataType,
        context: Arc<QueryContext>,
        source: QuerySource,
        time_filter: Option<Arc<dyn Filter>>,
        value_filter: Option<Arc<dyn Filter>>,
        file_filter: Option<&dyn FileFilter>,
        direction: Direction,
    ) -> Self {
        let files = FileCursor::new(
            direction,
            series.clone(),
            source.seq,
            source.unseq,
            file_filter,
        );
        SeriesReader {
            series,
            all_siblings,
            data_type,
            context,
            direction,
            time_filter,
            value_filter,
            files,
            first_series: None,
            seq_series: VecDeque::new(),
            unseq_series: TimeOrderedQueue::new(direction),
            first_chunk: None,
            chunk_pool: TimeOrderedQueue::new(direction),
            first_page: None,
            seq_pages: VecDeque::new(),
            unseq_pages: TimeOrderedQueue::new(direction),
            merge_reader: PriorityMergeReader::new(direction),
            cached_batch: None,
        }
    }

    pub fn series(&self) -> &SeriesPath {
        &self.series
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn time_filter(&self) -> Option<&Arc<dyn Filter>> {
        self.time_filter.as_ref()
    }

    /// Whether the reader has nothing left at any tier.
    pub fn is_empty(&mut self) -> ReadResult<bool> {
        Ok(!(self.has_next_page()? || self.has_next_chunk()? || self.has_next_file()?))
    }

    // ---------------------------------------------------------------
    // file tier
    // ---------------------------------------------------------------

    /// Advance the file tier. Requires every lower tier to be fully
    /// consumed.
    pub fn has_next_file(&mut self) -> ReadResult<bool> {
        self.check_cancelled()?;
        self.ensure_no_residual_pages()?;
        if self.first_chunk.is_some() || !self.chunk_pool.is_empty() {
            return ResidualChunksSnafu.fail();
        }

        if self.first_series.is_some() {
            return Ok(true);
        }
        self.init_first_series_metadata()?;
        Ok(self.first_series.is_some())
    }

    /// Whether the current file's range intersects an unexplored peer.
    pub fn is_file_overlapped(&self) -> ReadResult<bool> {
        let first = self.first_series.as_ref().context(NoCurrentFileSnafu)?;
        let stats = &first.statistics;
        Ok(self
            .seq_series
            .front()
            .is_some_and(|m| self.direction.ranges_overlap(stats, &m.statistics))
            || self
                .unseq_series
                .peek()
                .is_some_and(|m| self.direction.ranges_overlap(stats, &m.statistics)))
    }

    pub fn current_file_statistics(&self) -> ReadResult<&Statistics> {
        self.first_series
            .as_ref()
            .map(|m| &m.statistics)
            .context(NoCurrentFileSnafu)
    }

    pub fn current_file_modified(&self) -> ReadResult<bool> {
        self.first_series
            .as_ref()
            .map(|m| m.modified)
            .context(NoCurrentFileSnafu)
    }

    /// Drop the current file without materializing anything below it.
    pub fn skip_current_file(&mut self) {
        self.first_series = None;
    }

    // ---------------------------------------------------------------
    // chunk tier
    // ---------------------------------------------------------------

    /// Advance the chunk tier. Call after `has_next_file` and keep
    /// calling until it returns `false`, so every overlapped chunk is
    /// consumed. Requires the page tier to be fully consumed.
    pub fn has_next_chunk(&mut self) -> ReadResult<bool> {
        self.check_cancelled()?;
        self.ensure_no_residual_pages()?;

        if self.first_chunk.is_some() {
            return Ok(true);
        }

        if self.first_series.is_some() {
            // initial descent from the file tier
            let frontier = match &self.first_series {
                Some(metadata) => self.direction.overlap_check_time(&metadata.statistics),
                None => return Ok(false),
            };
            self.unpack_overlapped_files_to_series_metadata(frontier)?;
            self.unpack_overlapped_series_metadata_to_chunks(frontier, true)?;
        } else if let Some(chunk) = self.chunk_pool.pop() {
            // the front file was exploded earlier; continue on the pool
            let frontier = self.direction.overlap_check_time(&chunk.statistics);
            self.first_chunk = Some(chunk);
            self.unpack_overlapped_files_to_series_metadata(frontier)?;
            self.unpack_overlapped_series_metadata_to_chunks(frontier, false)?;
        }

        Ok(self.first_chunk.is_some())
    }

    /// Whether the current chunk's range intersects an unexplored peer.
    pub fn is_chunk_overlapped(&self) -> ReadResult<bool> {
        let first = self.first_chunk.as_ref().context(NoCurrentChunkSnafu)?;
        Ok(self
            .chunk_pool
            .peek()
            .is_some_and(|c| self.direction.ranges_overlap(&first.statistics, &c.statistics)))
    }

    pub fn current_chunk_statistics(&self) -> ReadResult<&Statistics> {
        self.first_chunk
            .as_ref()
            .map(|c| &c.statistics)
            .context(NoCurrentChunkSnafu)
    }

    pub fn current_chunk_modified(&self) -> ReadResult<bool> {
        self.first_chunk
            .as_ref()
            .map(|c| c.modified)
            .context(NoCurrentChunkSnafu)
    }

    /// Drop the current chunk without materializing its pages.
    pub fn skip_current_chunk(&mut self) {
        self.first_chunk = None;
    }

    // ---------------------------------------------------------------
    // page tier
    // ---------------------------------------------------------------

    /// Advance the page tier. Call after `has_next_chunk` and keep
    /// calling until it returns `false`, so every overlapped page is
    /// consumed.
    pub fn has_next_page(&mut self) -> ReadResult<bool> {
        self.check_cancelled()?;

        if self.cached_batch.is_some() {
            return Ok(true);
        }
        if self.merge_reader.has_next() && self.build_overlapped_batch()? {
            return Ok(true);
        }
        if self.first_page.is_some() {
            return Ok(true);
        }

        if self.first_chunk.is_some() {
            // descend from the chunk tier
            let frontier = match &self.first_chunk {
                Some(chunk) => self.direction.overlap_check_time(&chunk.statistics),
                None => return Ok(false),
            };
            self.unpack_overlapped_chunks_to_pages(frontier, true)?;
        } else {
            self.init_first_page_and_cascade()?;
        }

        if self.first_page_overlapped()? && self.build_overlapped_batch()? {
            return Ok(true);
        }

        // keep a current page selected while the pools still hold
        // cursors; each selection may surface new overlaps
        while self.first_page.is_none()
            && (!self.seq_pages.is_empty() || !self.unseq_pages.is_empty())
        {
            self.init_first_page_and_cascade()?;
            if self.first_page_overlapped()? && self.build_overlapped_batch()? {
                return Ok(true);
            }
        }
        Ok(self.first_page.is_some())
    }

    /// Whether the current page overlaps unexplored unseq pages, or a
    /// merged batch is already cached.
    ///
    /// Call after `has_next_page`. Merged data still pending inside the
    /// current page's range means overlapped data was not consumed
    /// first; that is a protocol violation.
    pub fn is_page_overlapped(&self) -> ReadResult<bool> {
        if self.cached_batch.is_some() {
            return Ok(true);
        }

        let first = self.first_page.as_ref().context(NoCurrentPageSnafu)?;
        let inside = self.merge_reader.current().is_some_and(|pair| match self.direction {
            Direction::Asc => pair.timestamp <= first.statistics().end_time,
            Direction::Desc => pair.timestamp >= first.statistics().start_time,
        });
        if inside {
            return OverlapNotConsumedSnafu.fail();
        }

        Ok(self
            .unseq_pages
            .peek()
            .is_some_and(|p| self.direction.ranges_overlap(first.statistics(), p.statistics())))
    }

    pub fn current_page_statistics(&self) -> ReadResult<&Statistics> {
        self.first_page
            .as_ref()
            .map(|p| p.statistics())
            .context(NoCurrentPageSnafu)
    }

    pub fn current_page_modified(&self) -> ReadResult<bool> {
        self.first_page
            .as_ref()
            .map(|p| p.is_modified())
            .context(NoCurrentPageSnafu)
    }

    /// Drop the current page without decoding it.
    pub fn skip_current_page(&mut self) {
        self.first_page = None;
    }

    /// Emit the next batch: the cached merged batch if one exists,
    /// otherwise the current page realized with the value filter
    /// pushed down.
    pub fn next_page(&mut self) -> ReadResult<Batch> {
        if !self.has_next_page()? {
            return NoNextPageSnafu.fail();
        }

        if let Some(batch) = self.cached_batch.take() {
            return Ok(batch);
        }

        let Some(mut page) = self.first_page.take() else {
            return NoNextPageSnafu.fail();
        };
        if let Some(filter) = &self.value_filter {
            page.set_filter(Arc::clone(filter));
        }
        page.emit(self.direction).context(LoadSnafu)
    }

    // ---------------------------------------------------------------
    // cascade unpacking
    // ---------------------------------------------------------------

    /// Fill both metadata candidate buffers, pull in every file that
    /// overlaps the preferred candidate's frontier, and select the
    /// current series block.
    fn init_first_series_metadata(&mut self) -> ReadResult<()> {
        let filter = self.any_filter();

        while self.seq_series.is_empty() && self.files.has_seq() {
            if let Some(metadata) =
                self.files
                    .load_front(true, &self.context, filter.as_deref(), &self.all_siblings)
                    .context(LoadSnafu)?
            {
                self.seq_series.push_back(metadata);
            }
        }
        while self.unseq_series.is_empty() && self.files.has_unseq() {
            if let Some(metadata) =
                self.files
                    .load_front(false, &self.context, filter.as_deref(), &self.all_siblings)
                    .context(LoadSnafu)?
            {
                let key = self.direction.order_time(&metadata.statistics);
                self.unseq_series.push(key, metadata);
            }
        }

        let frontier = match (self.seq_series.front(), self.unseq_series.peek()) {
            (Some(seq), Some(unseq)) => Some(
                self.direction
                    .frontier_of_two(&seq.statistics, &unseq.statistics),
            ),
            (Some(seq), None) => Some(self.direction.overlap_check_time(&seq.statistics)),
            (None, Some(unseq)) => Some(self.direction.overlap_check_time(&unseq.statistics)),
            (None, None) => None,
        };
        if let Some(frontier) = frontier {
            self.unpack_overlapped_files_to_series_metadata(frontier)?;
        }

        let take_seq = match (self.seq_series.front(), self.unseq_series.peek()) {
            (Some(seq), Some(unseq)) => {
                Some(self.direction.prefer_seq(&seq.statistics, &unseq.statistics))
            }
            (Some(_), None) => Some(true),
            (None, Some(_)) => Some(false),
            (None, None) => None,
        };
        self.first_series = match take_seq {
            Some(true) => self.seq_series.pop_front(),
            Some(false) => self.unseq_series.pop(),
            None => None,
        };
        Ok(())
    }

    /// files → metadata: load every front file whose range intersects
    /// `frontier` into the candidate buffers.
    fn unpack_overlapped_files_to_series_metadata(&mut self, frontier: i64) -> ReadResult<()> {
        let filter = self.any_filter();

        while self.files.unseq_front_overlaps(frontier) {
            if let Some(metadata) =
                self.files
                    .load_front(false, &self.context, filter.as_deref(), &self.all_siblings)
                    .context(LoadSnafu)?
            {
                let key = self.direction.order_time(&metadata.statistics);
                self.unseq_series.push(key, metadata);
            }
        }
        while self.files.seq_front_overlaps(frontier) {
            if let Some(metadata) =
                self.files
                    .load_front(true, &self.context, filter.as_deref(), &self.all_siblings)
                    .context(LoadSnafu)?
            {
                self.seq_series.push_back(metadata);
            }
        }
        Ok(())
    }

    /// metadata → chunks: explode every candidate block whose range
    /// intersects `frontier` into the chunk pool; the current block is
    /// exploded too when it overlaps. With `init`, select the current
    /// chunk afterwards.
    fn unpack_overlapped_series_metadata_to_chunks(
        &mut self,
        frontier: i64,
        init: bool,
    ) -> ReadResult<()> {
        while self
            .seq_series
            .front()
            .is_some_and(|m| self.direction.time_overlaps(frontier, &m.statistics))
        {
            let Some(metadata) = self.seq_series.pop_front() else {
                break;
            };
            self.unpack_one_series_metadata(metadata)?;
        }
        while self
            .unseq_series
            .peek()
            .is_some_and(|m| self.direction.time_overlaps(frontier, &m.statistics))
        {
            let Some(metadata) = self.unseq_series.pop() else {
                break;
            };
            self.unpack_one_series_metadata(metadata)?;
        }

        if self
            .first_series
            .as_ref()
            .is_some_and(|m| self.direction.time_overlaps(frontier, &m.statistics))
        {
            if let Some(metadata) = self.first_series.take() {
                self.unpack_one_series_metadata(metadata)?;
            }
        }

        if init && self.first_chunk.is_none() {
            self.first_chunk = self.chunk_pool.pop();
        }
        Ok(())
    }

    fn unpack_one_series_metadata(&mut self, metadata: SeriesMetadata) -> ReadResult<()> {
        let mut chunks = metadata.load_chunks().context(LoadSnafu)?;
        for chunk in &mut chunks {
            chunk.set_seq(metadata.is_seq);
        }

        if let Some(trace) = self.context.trace() {
            trace.record_chunks(chunks.len() as u64);
            trace.record_points(chunks.iter().map(|c| c.statistics.count).sum());
        }

        for chunk in chunks {
            let key = self.direction.order_time(&chunk.statistics);
            self.chunk_pool.push(key, chunk);
        }
        Ok(())
    }

    /// chunks → pages: explode every pooled chunk whose range
    /// intersects `frontier` into page cursors; the current chunk is
    /// exploded too when it overlaps. With `init`, select the current
    /// page afterwards.
    fn unpack_overlapped_chunks_to_pages(&mut self, frontier: i64, init: bool) -> ReadResult<()> {
        while self
            .chunk_pool
            .peek()
            .is_some_and(|c| self.direction.time_overlaps(frontier, &c.statistics))
        {
            let Some(chunk) = self.chunk_pool.pop() else {
                break;
            };
            self.unpack_one_chunk(chunk)?;
        }
        if self
            .first_chunk
            .as_ref()
            .is_some_and(|c| self.direction.time_overlaps(frontier, &c.statistics))
        {
            if let Some(chunk) = self.first_chunk.take() {
                self.unpack_one_chunk(chunk)?;
            }
        }
        if init
            && self.first_page.is_none()
            && (!self.seq_pages.is_empty() || !self.unseq_pages.is_empty())
        {
            self.init_first_page();
        }
        Ok(())
    }

    fn unpack_one_chunk(&mut self, chunk: ChunkMetadata) -> ReadResult<()> {
        let pages = chunk
            .load_pages(self.time_filter.clone())
            .context(LoadSnafu)?;
        for data in pages {
            let cursor = PrioritizedPageReader::new(chunk.version, chunk.is_seq, data);
            if chunk.is_seq {
                // sequential cursors stay in list order: append when
                // ascending, prepend when descending
                match self.direction {
                    Direction::Asc => self.seq_pages.push_back(cursor),
                    Direction::Desc => self.seq_pages.push_front(cursor),
                }
            } else {
                let key = self.direction.order_time(cursor.statistics());
                self.unseq_pages.push(key, cursor);
            }
        }
        Ok(())
    }

    /// Select the current page from the two pool fronts.
    fn init_first_page(&mut self) {
        let take_seq = match (self.seq_pages.front(), self.unseq_pages.peek()) {
            (Some(seq), Some(unseq)) => {
                Some(self.direction.prefer_seq(seq.statistics(), unseq.statistics()))
            }
            (Some(_), None) => Some(true),
            (None, Some(_)) => Some(false),
            (None, None) => None,
        };
        self.first_page = match take_seq {
            Some(true) => self.seq_pages.pop_front(),
            Some(false) => self.unseq_pages.pop(),
            None => None,
        };
    }

    /// Select the current page, then cascade every tier down to its
    /// frontier; the new page may surface overlaps anywhere above.
    fn init_first_page_and_cascade(&mut self) -> ReadResult<()> {
        self.init_first_page();
        let frontier = self
            .first_page
            .as_ref()
            .map(|p| self.direction.overlap_check_time(p.statistics()));
        if let Some(frontier) = frontier {
            self.unpack_overlapped_files_to_series_metadata(frontier)?;
            self.unpack_overlapped_series_metadata_to_chunks(frontier, false)?;
            self.unpack_overlapped_chunks_to_pages(frontier, false)?;
        }
        Ok(())
    }

    /// Whether the current page overlaps the next seq cursor, the next
    /// unseq cursor, or pending merged data.
    fn first_page_overlapped(&self) -> ReadResult<bool> {
        let Some(first) = self.first_page.as_ref() else {
            return Ok(false);
        };
        let stats = first.statistics();

        let seq_overlap = self
            .seq_pages
            .front()
            .is_some_and(|p| self.direction.ranges_overlap(stats, p.statistics()));
        let unseq_overlap = self
            .unseq_pages
            .peek()
            .is_some_and(|p| self.direction.ranges_overlap(stats, p.statistics()));
        // strict > against the page start, in both directions
        let merge_overlap = self
            .merge_reader
            .current()
            .is_some_and(|pair| pair.timestamp > stats.start_time);

        Ok(seq_overlap || unseq_overlap || merge_overlap)
    }

    // ---------------------------------------------------------------
    // overlap-batch construction
    // ---------------------------------------------------------------

    /// Seed the merge reader with every unseq cursor that directly
    /// overlaps the current read position.
    fn fill_merge_reader_from_front_pages(&mut self) -> ReadResult<()> {
        if self.first_page.is_none() && self.seq_pages.is_empty() && self.unseq_pages.is_empty() {
            return Ok(());
        }

        if self.first_page.is_none() {
            self.init_first_page();
        }

        let frontier = if self.merge_reader.has_next() {
            self.merge_reader.current_read_stop_time()
        } else {
            match self.first_page.as_ref() {
                Some(page) => self.direction.overlap_check_time(page.statistics()),
                None => return Ok(()),
            }
        };
        self.unpack_overlapped_unseq_pages_to_merge_reader(frontier)
    }

    /// pages → points: move every unseq cursor overlapping `frontier`
    /// into the merge reader; the current page goes too when it is
    /// unseq and overlaps.
    fn unpack_overlapped_unseq_pages_to_merge_reader(&mut self, frontier: i64) -> ReadResult<()> {
        while self
            .unseq_pages
            .peek()
            .is_some_and(|p| self.direction.time_overlaps(frontier, p.statistics()))
        {
            let Some(page) = self.unseq_pages.pop() else {
                break;
            };
            self.push_page_to_merge_reader(page)?;
        }
        if self
            .first_page
            .as_ref()
            .is_some_and(|p| !p.is_seq() && self.direction.time_overlaps(frontier, p.statistics()))
        {
            if let Some(page) = self.first_page.take() {
                self.push_page_to_merge_reader(page)?;
            }
        }
        Ok(())
    }

    fn push_page_to_merge_reader(&mut self, page: PrioritizedPageReader) -> ReadResult<()> {
        let frontier = self.direction.overlap_check_time(page.statistics());
        let version = page.version();
        let batch = page.emit(self.direction).context(LoadSnafu)?;
        self.merge_reader.add_reader(batch, version, frontier);
        Ok(())
    }

    /// Drive the merge reader until the next safe emission boundary and
    /// cache the resulting batch. Returns whether a non-empty batch was
    /// cached.
    ///
    /// The emission window is clamped by the extents of the current
    /// page and the next seq cursor: crossing into an unabsorbed page
    /// would let its values escape shadowing. Absorbing such a page
    /// widens the window again by that page's extent.
    fn build_overlapped_batch(&mut self) -> ReadResult<bool> {
        if self.cached_batch.is_some() {
            return Ok(true);
        }

        self.fill_merge_reader_from_front_pages()?;
        if !self.merge_reader.has_next() {
            return Ok(false);
        }

        let mut builder = BatchBuilder::new(self.data_type, self.direction);

        let mut page_end = self.merge_reader.current_read_stop_time();
        if let Some(page) = self.first_page.as_ref() {
            page_end = self.direction.clamp_frontier(page_end, page.statistics());
        }
        if let Some(page) = self.seq_pages.front() {
            page_end = self.direction.clamp_frontier(page_end, page.statistics());
        }

        while self.merge_reader.has_next() {
            let timestamp = match self.merge_reader.current() {
                Some(pair) => pair.timestamp,
                None => break,
            };

            if self.direction.excess(timestamp, page_end) {
                if !builder.is_empty() || self.first_page.is_some() || !self.seq_pages.is_empty() {
                    break;
                }
                // nothing downstream constrains us; move the window to
                // the next live frontier
                page_end = self.merge_reader.current_read_stop_time();
            }

            // newly reachable overlaps at this timestamp, at every tier
            self.unpack_overlapped_files_to_series_metadata(timestamp)?;
            self.unpack_overlapped_series_metadata_to_chunks(timestamp, false)?;
            self.unpack_overlapped_chunks_to_pages(timestamp, false)?;
            self.unpack_overlapped_unseq_pages_to_merge_reader(timestamp)?;

            if let Some(stats) = self.first_page.as_ref().map(|p| p.statistics().clone()) {
                if self
                    .direction
                    .excess(timestamp, self.direction.overlap_check_time(&stats))
                {
                    // merged data has moved past the current page; the
                    // batch must go out before that page can be served
                    return Ok(self.cache_if_nonempty(builder));
                }
                if let Some(page) = self.first_page.take() {
                    self.push_page_to_merge_reader(page)?;
                    page_end = self.direction.extend_frontier(page_end, &stats);
                }
            }

            if let Some(stats) = self.seq_pages.front().map(|p| p.statistics().clone()) {
                if self
                    .direction
                    .excess(timestamp, self.direction.overlap_check_time(&stats))
                {
                    return Ok(self.cache_if_nonempty(builder));
                }
                if let Some(page) = self.seq_pages.pop_front() {
                    self.push_page_to_merge_reader(page)?;
                    page_end = self.direction.extend_frontier(page_end, &stats);
                }
            }

            if let Some(pair) = self.merge_reader.next_pair() {
                let keep = self
                    .value_filter
                    .as_ref()
                    .map_or(true, |f| f.satisfy(pair.timestamp, &pair.value));
                if keep {
                    builder.append(pair.timestamp, pair.value);
                }
            }
        }

        Ok(self.cache_if_nonempty(builder))
    }

    fn cache_if_nonempty(&mut self, builder: BatchBuilder) -> bool {
        if builder.is_empty() {
            return false;
        }
        let batch = builder.build();
        log::trace!(
            "query {}: cached overlapped batch of {} points for {}",
            self.context.query_id(),
            batch.len(),
            self.series
        );
        self.cached_batch = Some(batch);
        true
    }

    // ---------------------------------------------------------------
    // guards
    // ---------------------------------------------------------------

    fn check_cancelled(&self) -> ReadResult<()> {
        if self.context.is_cancelled() {
            return CancelledSnafu {
                query_id: self.context.query_id(),
            }
            .fail();
        }
        Ok(())
    }

    fn ensure_no_residual_pages(&self) -> ReadResult<()> {
        if !self.unseq_pages.is_empty() || self.first_page.is_some() || self.merge_reader.has_next()
        {
            return ResidualPagesSnafu {
                unseq_pool_empty: self.unseq_pages.is_empty(),
                first_page_present: self.first_page.is_some(),
                merge_reader_live: self.merge_reader.has_next(),
            }
            .fail();
        }
        Ok(())
    }

    fn any_filter(&self) -> Option<Arc<dyn Filter>> {
        self.time_filter
            .clone()
            .or_else(|| self.value_filter.clone())
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

    fn value(v: i64) -> FieldValue {
        FieldValue::Int64(v)
    }

    fn reader_over(
        seq: Vec<std::sync::Arc<dyn crate::store::FileResource>>,
        unseq: Vec<std::sync::Arc<dyn crate::store::FileResource>>,
        direction: Direction,
    ) -> SeriesReader {
        SeriesReader::new(
            series(),
            BTreeSet::new(),
            DataType::Int64,
            Arc::new(QueryContext::new(1)),
            QuerySource::new(seq, unseq),
            None,
            None,
            None,
            direction,
        )
    }

    fn unseq_file(version: u64, points: &[i64]) -> std::sync::Arc<dyn crate::store::FileResource> {
        MemoryFileBuilder::new(version)
            .chunk(
                &series(),
                DataType::Int64,
                vec![points.iter().map(|&t| (t, value(t))).collect()],
            )
            .build()
            .handle()
    }

    #[test]
    fn cascade_is_idempotent_at_a_fixed_frontier() {
        // three mutually overlapping unseq files
        let reader = &mut reader_over(
            Vec::new(),
            vec![
                unseq_file(1, &[10, 30]),
                unseq_file(2, &[20, 40]),
                unseq_file(3, &[25, 50]),
            ],
            Direction::Asc,
        );

        assert!(reader.has_next_file().unwrap());
        let frontier = reader
            .direction
            .overlap_check_time(&reader.first_series.as_ref().unwrap().statistics);

        reader
            .unpack_overlapped_files_to_series_metadata(frontier)
            .unwrap();
        let unseq_after_first = reader.unseq_series.len();
        let seq_after_first = reader.seq_series.len();

        reader
            .unpack_overlapped_files_to_series_metadata(frontier)
            .unwrap();
        assert_eq!(reader.unseq_series.len(), unseq_after_first);
        assert_eq!(reader.seq_series.len(), seq_after_first);

        // chunk-level cascade is a no-op the second time as well
        reader
            .unpack_overlapped_series_metadata_to_chunks(frontier, false)
            .unwrap();
        let pool_after_first = reader.chunk_pool.len();
        reader
            .unpack_overlapped_series_metadata_to_chunks(frontier, false)
            .unwrap();
        assert_eq!(reader.chunk_pool.len(), pool_after_first);
    }

    #[test]
    fn single_current_item_per_tier_between_calls() {
        let reader = &mut reader_over(
            Vec::new(),
            vec![unseq_file(1, &[10, 30]), unseq_file(2, &[20, 40])],
            Direction::Asc,
        );

        assert!(reader.has_next_file().unwrap());
        assert!(reader.first_series.is_some());
        assert!(reader.first_chunk.is_none());
        assert!(reader.first_page.is_none());

        assert!(reader.has_next_chunk().unwrap());
        assert!(reader.first_series.is_none());
        assert!(reader.first_chunk.is_some());
        assert!(reader.first_page.is_none());
    }
}
