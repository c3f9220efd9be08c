//! Per-series and per-chunk metadata.
//!
//! Both types pair summary [`Statistics`] with a boxed handle that
//! lazily loads the next tier down. The reader never touches bytes:
//! exploding a series block into chunks or a chunk into pages goes
//! through those handles, and the handles are provided by whatever
//! component produced the metadata.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::model::stats::Statistics;
use crate::model::version::VersionKey;
use crate::store::{ChunkListHandle, LoadError, PageListHandle, PageReader};

/// Fully-qualified series identity: a device and one of its
/// measurements.
///
/// File-level time ranges are tracked per device, so sibling
/// measurements of one device share file ranges and can share a single
/// metadata read.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesPath {
    pub device: String,
    pub measurement: String,
}

impl SeriesPath {
    pub fn new(device: impl Into<String>, measurement: impl Into<String>) -> Self {
        SeriesPath {
            device: device.into(),
            measurement: measurement.into(),
        }
    }
}

impl fmt::Display for SeriesPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.device, self.measurement)
    }
}

/// One file's summary block for a single series.
pub struct SeriesMetadata {
    pub statistics: Statistics,
    /// Whether this block came from the sequential population. Tagged
    /// by the file cursor, not the loader.
    pub is_seq: bool,
    /// Whether deletions may apply to the data under this block. Unseq
    /// blocks are always tagged modified so they never take the
    /// statistics-only shortcut.
    pub modified: bool,
    chunks: Box<dyn ChunkListHandle>,
}

impl SeriesMetadata {
    /// A freshly loaded block; `is_seq` is tagged later by the file
    /// cursor.
    pub fn new(statistics: Statistics, modified: bool, chunks: Box<dyn ChunkListHandle>) -> Self {
        SeriesMetadata {
            statistics,
            is_seq: false,
            modified,
            chunks,
        }
    }

    pub fn set_seq(&mut self, is_seq: bool) {
        self.is_seq = is_seq;
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Load the chunk list under this block.
    pub fn load_chunks(&self) -> Result<Vec<ChunkMetadata>, LoadError> {
        self.chunks.load()
    }
}

impl fmt::Debug for SeriesMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesMetadata")
            .field("statistics", &self.statistics)
            .field("is_seq", &self.is_seq)
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

/// One chunk's summary.
pub struct ChunkMetadata {
    pub statistics: Statistics,
    /// Write precedence of this chunk against overlapping peers.
    pub version: VersionKey,
    /// Whether deletions apply inside this chunk.
    pub modified: bool,
    /// Inherited from the parent series block when the block is
    /// exploded.
    pub is_seq: bool,
    pages: Box<dyn PageListHandle>,
}

impl ChunkMetadata {
    pub fn new(
        statistics: Statistics,
        version: VersionKey,
        modified: bool,
        pages: Box<dyn PageListHandle>,
    ) -> Self {
        ChunkMetadata {
            statistics,
            version,
            modified,
            is_seq: false,
            pages,
        }
    }

    pub fn set_seq(&mut self, is_seq: bool) {
        self.is_seq = is_seq;
    }

    /// Load the page decoders under this chunk, pruned by `time_filter`.
    pub fn load_pages(
        &self,
        time_filter: Option<Arc<dyn Filter>>,
    ) -> Result<Vec<Box<dyn PageReader>>, LoadError> {
        self.pages.load(time_filter)
    }
}

impl fmt::Debug for ChunkMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkMetadata")
            .field("statistics", &self.statistics)
            .field("version", &self.version)
            .field("modified", &self.modified)
            .field("is_seq", &self.is_seq)
            .finish_non_exhaustive()
    }
}
