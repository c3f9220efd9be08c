//! Page cursor tagged with write precedence.

use std::sync::Arc;

use crate::filter::Filter;
use crate::model::{Batch, Statistics, VersionKey};
use crate::order::Direction;
use crate::store::{LoadError, PageReader};

/// One page decoder together with the version and population tag the
/// merge path needs.
///
/// Single-use: [`PrioritizedPageReader::emit`] consumes the cursor.
pub(crate) struct PrioritizedPageReader {
    version: VersionKey,
    is_seq: bool,
    data: Box<dyn PageReader>,
}

impl PrioritizedPageReader {
    pub(crate) fn new(version: VersionKey, is_seq: bool, data: Box<dyn PageReader>) -> Self {
        PrioritizedPageReader {
            version,
            is_seq,
            data,
        }
    }

    pub(crate) fn version(&self) -> VersionKey {
        self.version
    }

    pub(crate) fn is_seq(&self) -> bool {
        self.is_seq
    }

    pub(crate) fn statistics(&self) -> &Statistics {
        self.data.statistics()
    }

    pub(crate) fn is_modified(&self) -> bool {
        self.data.is_modified()
    }

    pub(crate) fn set_filter(&mut self, filter: Arc<dyn Filter>) {
        self.data.set_filter(filter);
    }

    /// Fully realize the page as a batch honoring `direction`.
    pub(crate) fn emit(mut self, direction: Direction) -> Result<Batch, LoadError> {
        self.data.all_satisfied_data(direction)
    }
}
