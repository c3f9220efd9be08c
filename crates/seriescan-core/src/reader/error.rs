//! Error types and SNAFU context selectors for the read pipeline.
//!
//! Three kinds of failure leave a [`crate::reader::SeriesReader`]:
//! tier-protocol misuse (a caller advanced a tier while lower-tier
//! buffers still held data, or inspected a tier with no current item),
//! cooperative cancellation, and load failures from the collaborators.
//! All of them abort the query; the reader performs no recovery.

use snafu::prelude::*;

use crate::store::LoadError;

/// Result alias for reader operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Errors from the tier-iteration surface.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReadError {
    /// A higher tier was advanced while the page tier still held data.
    #[snafu(display(
        "all cached pages must be consumed first: unseq pool empty = {unseq_pool_empty}, \
         first page present = {first_page_present}, merge reader live = {merge_reader_live}"
    ))]
    ResidualPages {
        /// Whether the unsequential page pool was already empty.
        unseq_pool_empty: bool,
        /// Whether a current page was still held.
        first_page_present: bool,
        /// Whether the merge reader still held points.
        merge_reader_live: bool,
    },

    /// The file tier was advanced while the chunk tier still held data.
    #[snafu(display("all cached chunks must be consumed first"))]
    ResidualChunks,

    /// A file-tier inspection ran with no current file.
    #[snafu(display("no current file; call has_next_file first"))]
    NoCurrentFile,

    /// A chunk-tier inspection ran with no current chunk.
    #[snafu(display("no current chunk; call has_next_chunk first"))]
    NoCurrentChunk,

    /// A page-tier inspection ran with no current page.
    #[snafu(display("no current page; call has_next_page first"))]
    NoCurrentPage,

    /// `next_page` was called with nothing ready, neither
    /// non-overlapped nor overlapped.
    #[snafu(display("no next page, neither non-overlapped nor overlapped"))]
    NoNextPage,

    /// Overlapped data was still pending inside the current page's
    /// range when the page was inspected.
    #[snafu(display("overlapped data must be consumed before the current page"))]
    OverlapNotConsumed,

    /// The query's cooperative cancellation flag was observed.
    #[snafu(display("query {query_id} cancelled"))]
    Cancelled {
        /// Identity of the cancelled query.
        query_id: u64,
    },

    /// A collaborator failed while materializing metadata, chunks, or
    /// pages.
    #[snafu(display("load failed: {source}"))]
    Load {
        /// The underlying load failure.
        #[snafu(source)]
        source: LoadError,
    },
}
