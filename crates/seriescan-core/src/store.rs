//! Trait seams between the reader and the components that own bytes.
//!
//! The reader borrows file handles from the query's resource manager
//! and asks them for per-series metadata; metadata hands back chunk
//! lists; chunks hand back page decoders. Each hop is a trait so the
//! core never depends on the catalog or the file format:
//!
//! - [`FileResource`] — one file of the store, scoped to a query.
//! - [`ChunkListHandle`] — loads the chunk list under one series block.
//! - [`PageListHandle`] — loads the page decoders under one chunk.
//! - [`PageReader`] — decodes one page into a [`Batch`], at most once.
//!
//! [`memory`] implements the whole chain over plain vectors for tests
//! and examples.

pub mod memory;

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::sync::Arc;

use snafu::{prelude::*, Backtrace};

use crate::context::QueryContext;
use crate::filter::Filter;
use crate::model::{Batch, ChunkMetadata, SeriesMetadata, SeriesPath, Statistics};
use crate::order::Direction;

/// Failures raised by the collaborators while materializing metadata,
/// chunk lists, or pages. The reader propagates these untouched; it is
/// not self-healing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LoadError {
    /// I/O failure underneath a load.
    #[snafu(display("I/O error while loading {what}: {source}"))]
    Io {
        /// Which tier was being loaded.
        what: &'static str,
        /// The underlying I/O error.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// Decoded content failed validation.
    #[snafu(display("Corrupt {what}: {message}"))]
    Corrupt {
        /// Which tier was being decoded.
        what: &'static str,
        /// Validation failure detail.
        message: String,
    },
}

/// One file of the store, borrowed for the lifetime of a query.
///
/// Time ranges are tracked per device and are inclusive on both ends.
pub trait FileResource: fmt::Debug + Send + Sync {
    /// First timestamp this file holds for `series`' device.
    fn start_time(&self, series: &SeriesPath) -> i64;

    /// Last timestamp this file holds for `series`' device.
    fn end_time(&self, series: &SeriesPath) -> i64;

    /// Whether deletions may apply to data in this file.
    fn is_modified(&self) -> bool;

    /// Load the per-series metadata block, or `None` when the file has
    /// no data for `series`.
    ///
    /// `all_siblings` names the other measurements of the same device
    /// the query touches, so one device read can warm the metadata of
    /// every sibling. `filter` lets the loader skip blocks whose
    /// statistics cannot satisfy the query.
    fn load_series_metadata(
        &self,
        series: &SeriesPath,
        context: &QueryContext,
        filter: Option<&dyn Filter>,
        all_siblings: &BTreeSet<String>,
    ) -> Result<Option<SeriesMetadata>, LoadError>;
}

/// Loads the chunk list under one series block.
pub trait ChunkListHandle: Send {
    fn load(&self) -> Result<Vec<ChunkMetadata>, LoadError>;
}

/// Loads the page decoders under one chunk. The pushed-down time
/// filter is both a pruning hint and part of each decoder's state, so
/// it is passed by shared handle.
pub trait PageListHandle: Send {
    fn load(
        &self,
        time_filter: Option<Arc<dyn Filter>>,
    ) -> Result<Vec<Box<dyn PageReader>>, LoadError>;
}

/// Decodes one page. `all_satisfied_data` is called at most once; the
/// decoder is discarded afterwards.
pub trait PageReader: Send {
    /// Statistics of this page.
    fn statistics(&self) -> &Statistics;

    /// Push a value filter down into decoding. Only done for pages that
    /// do not overlap anything.
    fn set_filter(&mut self, filter: Arc<dyn Filter>);

    /// Fully realize the page as a batch honoring `direction` and any
    /// pushed-down filters.
    fn all_satisfied_data(&mut self, direction: Direction) -> Result<Batch, LoadError>;

    /// Whether deletions apply inside this page.
    fn is_modified(&self) -> bool;
}

/// The two file populations handed to one reader.
#[derive(Debug, Clone, Default)]
pub struct QuerySource {
    /// Sequential files in their inherent global order.
    pub seq: Vec<Arc<dyn FileResource>>,
    /// Unsequential files in any order.
    pub unseq: Vec<Arc<dyn FileResource>>,
}

impl QuerySource {
    pub fn new(seq: Vec<Arc<dyn FileResource>>, unseq: Vec<Arc<dyn FileResource>>) -> Self {
        QuerySource { seq, unseq }
    }
}
