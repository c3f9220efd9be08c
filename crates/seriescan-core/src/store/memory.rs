//! In-memory implementation of the store seams.
//!
//! Backs every trait in [`crate::store`] with plain vectors so the
//! pipeline can be exercised without a catalog or file format. The
//! implementation keeps the awkward properties of the real store that
//! the reader must survive:
//!
//! - Statistics are computed from the points as written and are *not*
//!   adjusted by deletions; deleted ranges only disappear at decode
//!   time, while the `modified` tags light up.
//! - Page decoders count how often they are fully realized
//!   ([`MemoryFile::decoded_pages`]), which is how tests pin down the
//!   statistics-only traversal guarantees.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::context::QueryContext;
use crate::filter::{Filter, TimeRange};
use crate::model::{
    Batch, ChunkMetadata, DataType, FieldValue, SeriesMetadata, SeriesPath, Statistics,
    TimeValuePair, VersionKey,
};
use crate::order::Direction;
use crate::store::{ChunkListHandle, FileResource, LoadError, PageListHandle, PageReader};

#[derive(Debug)]
struct ChunkData {
    offset: u64,
    /// Pages in file order; points inside a page ascend by timestamp.
    pages: Vec<Vec<TimeValuePair>>,
}

#[derive(Debug)]
struct SeriesData {
    data_type: DataType,
    chunks: Vec<ChunkData>,
    deletes: Vec<TimeRange>,
}

impl SeriesData {
    fn raw_points(&self) -> impl Iterator<Item = &TimeValuePair> {
        self.chunks.iter().flat_map(|c| c.pages.iter().flatten())
    }
}

#[derive(Debug)]
struct FileData {
    file_version: u64,
    series: BTreeMap<SeriesPath, SeriesData>,
    decoded_pages: AtomicUsize,
}

/// Compute statistics over raw (pre-deletion) points.
fn statistics_of<'a>(points: impl Iterator<Item = &'a TimeValuePair>) -> Option<Statistics> {
    let mut stats: Option<Statistics> = None;
    for point in points {
        let stats = stats.get_or_insert_with(|| Statistics {
            start_time: point.timestamp,
            end_time: point.timestamp,
            count: 0,
            min_value: None,
            max_value: None,
        });
        stats.start_time = stats.start_time.min(point.timestamp);
        stats.end_time = stats.end_time.max(point.timestamp);
        stats.count += 1;
        fold_value_bounds(stats, &point.value);
    }
    stats
}

/// Track min/max for the ordered value types; text and boolean keep no
/// value bounds.
fn fold_value_bounds(stats: &mut Statistics, value: &FieldValue) {
    fn lt(a: &FieldValue, b: &FieldValue) -> Option<bool> {
        match (a, b) {
            (FieldValue::Int32(x), FieldValue::Int32(y)) => Some(x < y),
            (FieldValue::Int64(x), FieldValue::Int64(y)) => Some(x < y),
            (FieldValue::Float(x), FieldValue::Float(y)) => Some(x < y),
            (FieldValue::Double(x), FieldValue::Double(y)) => Some(x < y),
            _ => None,
        }
    }

    if !matches!(
        value,
        FieldValue::Int32(_) | FieldValue::Int64(_) | FieldValue::Float(_) | FieldValue::Double(_)
    ) {
        return;
    }

    let update_min = match stats.min_value.as_ref() {
        None => true,
        Some(min) => lt(value, min) == Some(true),
    };
    if update_min {
        stats.min_value = Some(value.clone());
    }

    let update_max = match stats.max_value.as_ref() {
        None => true,
        Some(max) => lt(max, value) == Some(true),
    };
    if update_max {
        stats.max_value = Some(value.clone());
    }
}

/// An in-memory store file.
///
/// Cheap to clone; clones share the same contents and decode counter.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    inner: Arc<FileData>,
}

impl MemoryFile {
    /// How many pages of this file have been fully decoded so far.
    pub fn decoded_pages(&self) -> usize {
        self.inner.decoded_pages.load(Ordering::Relaxed)
    }

    /// This file as a shareable [`FileResource`] handle.
    pub fn handle(&self) -> Arc<dyn FileResource> {
        Arc::new(self.clone())
    }

    fn device_series<'a>(&'a self, device: &str) -> impl Iterator<Item = &'a SeriesData> + 'a {
        let device = device.to_owned();
        self.inner
            .series
            .iter()
            .filter(move |(path, _)| path.device == device)
            .map(|(_, data)| data)
    }
}

impl FileResource for MemoryFile {
    fn start_time(&self, series: &SeriesPath) -> i64 {
        self.device_series(&series.device)
            .filter_map(|s| statistics_of(s.raw_points()))
            .map(|s| s.start_time)
            .min()
            .unwrap_or(i64::MAX)
    }

    fn end_time(&self, series: &SeriesPath) -> i64 {
        self.device_series(&series.device)
            .filter_map(|s| statistics_of(s.raw_points()))
            .map(|s| s.end_time)
            .max()
            .unwrap_or(i64::MIN)
    }

    fn is_modified(&self) -> bool {
        self.inner.series.values().any(|s| !s.deletes.is_empty())
    }

    fn load_series_metadata(
        &self,
        series: &SeriesPath,
        context: &QueryContext,
        filter: Option<&dyn Filter>,
        _all_siblings: &BTreeSet<String>,
    ) -> Result<Option<SeriesMetadata>, LoadError> {
        let Some(data) = self.inner.series.get(series) else {
            return Ok(None);
        };
        let Some(stats) = statistics_of(data.raw_points()) else {
            return Ok(None);
        };
        if let Some(filter) = filter {
            if !filter.satisfy_range(stats.start_time, stats.end_time) {
                return Ok(None);
            }
        }
        log::trace!(
            "query {} loads series metadata for {} from file v{}",
            context.query_id(),
            series,
            self.inner.file_version
        );

        let modified = !data.deletes.is_empty();
        let chunks = Box::new(MemoryChunkList {
            file: Arc::clone(&self.inner),
            series: series.clone(),
        });
        Ok(Some(SeriesMetadata::new(stats, modified, chunks)))
    }
}

struct MemoryChunkList {
    file: Arc<FileData>,
    series: SeriesPath,
}

impl ChunkListHandle for MemoryChunkList {
    fn load(&self) -> Result<Vec<ChunkMetadata>, LoadError> {
        let Some(data) = self.file.series.get(&self.series) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(data.chunks.len());
        for chunk in &data.chunks {
            let Some(stats) = statistics_of(chunk.pages.iter().flatten()) else {
                continue;
            };
            let modified = data
                .deletes
                .iter()
                .any(|d| d.start <= stats.end_time && stats.start_time <= d.end);
            out.push(ChunkMetadata::new(
                stats,
                VersionKey::new(self.file.file_version, chunk.offset),
                modified,
                Box::new(MemoryPageList {
                    file: Arc::clone(&self.file),
                    series: self.series.clone(),
                    chunk_offset: chunk.offset,
                }),
            ));
        }
        Ok(out)
    }
}

struct MemoryPageList {
    file: Arc<FileData>,
    series: SeriesPath,
    chunk_offset: u64,
}

impl PageListHandle for MemoryPageList {
    fn load(
        &self,
        time_filter: Option<Arc<dyn Filter>>,
    ) -> Result<Vec<Box<dyn PageReader>>, LoadError> {
        let Some(data) = self.file.series.get(&self.series) else {
            return Ok(Vec::new());
        };
        let Some(chunk) = data.chunks.iter().find(|c| c.offset == self.chunk_offset) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Box<dyn PageReader>> = Vec::with_capacity(chunk.pages.len());
        for page in &chunk.pages {
            let Some(stats) = statistics_of(page.iter()) else {
                continue;
            };
            if let Some(filter) = &time_filter {
                if !filter.satisfy_range(stats.start_time, stats.end_time) {
                    continue;
                }
            }
            let deletes: Vec<TimeRange> = data
                .deletes
                .iter()
                .filter(|d| d.start <= stats.end_time && stats.start_time <= d.end)
                .copied()
                .collect();
            out.push(Box::new(MemoryPageReader {
                statistics: stats,
                data_type: data.data_type,
                points: page.clone(),
                deletes,
                time_filter: time_filter.clone(),
                value_filter: None,
                decode_counter: Arc::clone(&self.file),
            }));
        }
        Ok(out)
    }
}

struct MemoryPageReader {
    statistics: Statistics,
    data_type: DataType,
    points: Vec<TimeValuePair>,
    deletes: Vec<TimeRange>,
    time_filter: Option<Arc<dyn Filter>>,
    value_filter: Option<Arc<dyn Filter>>,
    decode_counter: Arc<FileData>,
}

impl PageReader for MemoryPageReader {
    fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    fn set_filter(&mut self, filter: Arc<dyn Filter>) {
        self.value_filter = Some(filter);
    }

    fn all_satisfied_data(&mut self, direction: Direction) -> Result<Batch, LoadError> {
        self.decode_counter
            .decoded_pages
            .fetch_add(1, Ordering::Relaxed);

        let mut points: Vec<TimeValuePair> = self
            .points
            .iter()
            .filter(|p| !self.deletes.iter().any(|d| d.contains(p.timestamp)))
            .filter(|p| {
                self.time_filter
                    .as_ref()
                    .map_or(true, |f| f.satisfy(p.timestamp, &p.value))
            })
            .filter(|p| {
                self.value_filter
                    .as_ref()
                    .map_or(true, |f| f.satisfy(p.timestamp, &p.value))
            })
            .cloned()
            .collect();
        if !direction.is_ascending() {
            points.reverse();
        }
        Ok(Batch::new(self.data_type, direction, points))
    }

    fn is_modified(&self) -> bool {
        !self.deletes.is_empty()
    }
}

/// Builder for a [`MemoryFile`].
#[derive(Debug, Default)]
pub struct MemoryFileBuilder {
    file_version: u64,
    series: BTreeMap<SeriesPath, SeriesData>,
}

impl MemoryFileBuilder {
    pub fn new(file_version: u64) -> Self {
        MemoryFileBuilder {
            file_version,
            series: BTreeMap::new(),
        }
    }

    /// Append one chunk for `series`; each inner vector is one page of
    /// `(timestamp, value)` points in ascending time order.
    pub fn chunk(
        mut self,
        series: &SeriesPath,
        data_type: DataType,
        pages: Vec<Vec<(i64, FieldValue)>>,
    ) -> Self {
        let data = self.series.entry(series.clone()).or_insert_with(|| SeriesData {
            data_type,
            chunks: Vec::new(),
            deletes: Vec::new(),
        });
        debug_assert_eq!(data.data_type, data_type, "series data type must not change");
        let offset = data.chunks.len() as u64;
        data.chunks.push(ChunkData {
            offset,
            pages: pages
                .into_iter()
                .map(|page| {
                    page.into_iter()
                        .map(|(t, v)| TimeValuePair::new(t, v))
                        .collect()
                })
                .collect(),
        });
        self
    }

    /// Delete the inclusive range `[start, end]` from `series`. The
    /// points vanish at decode time; statistics stay as written.
    pub fn delete(mut self, series: &SeriesPath, start: i64, end: i64) -> Self {
        if let Some(data) = self.series.get_mut(series) {
            data.deletes.push(TimeRange::new(start, end));
        }
        self
    }

    pub fn build(self) -> MemoryFile {
        MemoryFile {
            inner: Arc::new(FileData {
                file_version: self.file_version,
                series: self.series,
                decoded_pages: AtomicUsize::new(0),
            }),
        }
    }
}
