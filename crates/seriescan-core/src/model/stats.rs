//! Per-tier summary statistics.

use serde::{Deserialize, Serialize};

use crate::model::value::FieldValue;

/// Time and value summary for one tier item (a file's series slice, a
/// chunk, or a page).
///
/// `start_time` and `end_time` are both inclusive. Statistics are
/// computed at write time and are *not* adjusted by later deletions;
/// the `modified` tags on the metadata types exist precisely because
/// these bounds can be stale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Smallest timestamp covered, inclusive.
    pub start_time: i64,
    /// Largest timestamp covered, inclusive.
    pub end_time: i64,
    /// Number of points.
    pub count: u64,
    /// Smallest value, when the data type is ordered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<FieldValue>,
    /// Largest value, when the data type is ordered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<FieldValue>,
}

impl Statistics {
    /// Time-only statistics.
    pub fn new(start_time: i64, end_time: i64, count: u64) -> Self {
        Statistics {
            start_time,
            end_time,
            count,
            min_value: None,
            max_value: None,
        }
    }

    /// Statistics with value bounds attached.
    pub fn with_values(
        start_time: i64,
        end_time: i64,
        count: u64,
        min_value: FieldValue,
        max_value: FieldValue,
    ) -> Self {
        Statistics {
            start_time,
            end_time,
            count,
            min_value: Some(min_value),
            max_value: Some(max_value),
        }
    }
}
