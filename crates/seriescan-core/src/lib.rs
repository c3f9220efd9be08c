//! Core merge reader for single-series scans over the seriescan store.
//!
//! The store keeps each series in two file populations: a *sequential*
//! population whose per-series time ranges are globally ordered and
//! disjoint, and an *unsequential* population whose ranges may overlap
//! anything. Inside every file the data is tiered: a per-series
//! metadata block, chunks with statistics, and pages inside chunks.
//!
//! This crate implements the read path that streams one series'
//! timestamped values in a requested direction while later writes
//! shadow earlier ones at equal timestamps:
//!
//! - A four-tier lazy unpacking pipeline (file → chunk → page → point)
//!   that only materializes an item when its time range can still
//!   affect the next emitted value ([`reader::SeriesReader`]).
//! - Overlap-triggered descent: detecting an overlap at any tier forces
//!   every directly-overlapping peer at the higher tiers to be unpacked
//!   before a result is emitted.
//! - A version-keyed priority merge across overlapping pages
//!   ([`reader::merge::PriorityMergeReader`]).
//! - A direction policy object so ascending and descending reads share
//!   one control flow ([`order::Direction`]).
//!
//! Everything that owns bytes — catalog lookup, file-format decoding,
//! filter compilation, compaction — lives in surrounding components.
//! The core consumes them through the narrow traits in [`store`]; an
//! in-memory implementation of those traits ships in [`store::memory`]
//! for tests and examples.

pub mod context;
pub mod filter;
pub mod model;
pub mod order;
pub mod reader;
pub mod store;

pub use context::{QueryContext, QueryTrace};
pub use filter::{FileFilter, Filter, TimeRange};
pub use model::{
    Batch, BatchBuilder, ChunkMetadata, DataType, FieldValue, SeriesMetadata, SeriesPath,
    Statistics, TimeValuePair, VersionKey,
};
pub use order::Direction;
pub use reader::{ReadError, ReadResult, SeriesReader};
pub use store::{
    ChunkListHandle, FileResource, LoadError, PageListHandle, PageReader, QuerySource,
};
