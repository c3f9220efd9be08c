//! Data model for the read path.
//!
//! These are the passive types that flow through the pipeline: typed
//! values and points ([`value`]), per-tier statistics ([`stats`]), the
//! write-precedence key ([`version`]), per-series and per-chunk
//! metadata ([`metadata`]), and ordered point runs ([`batch`]).
//!
//! The plain-data types derive `serde` traits because the surrounding
//! system ships them across process boundaries; the metadata types
//! carry live load handles and do not.

pub mod batch;
pub mod metadata;
pub mod stats;
pub mod value;
pub mod version;

pub use batch::{Batch, BatchBuilder};
pub use metadata::{ChunkMetadata, SeriesMetadata, SeriesPath};
pub use stats::Statistics;
pub use value::{DataType, FieldValue, TimeValuePair};
pub use version::VersionKey;
