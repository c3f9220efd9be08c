//! Typed values and timestamped points.

use serde::{Deserialize, Serialize};

/// Physical data types a series can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Single-bit flag values.
    Boolean,
    /// 32-bit signed integers.
    Int32,
    /// 64-bit signed integers.
    Int64,
    /// 32-bit IEEE floats.
    Float,
    /// 64-bit IEEE floats.
    Double,
    /// UTF-8 strings.
    Text,
}

/// A single typed value read from a page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Text(String),
}

impl FieldValue {
    /// The [`DataType`] this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            FieldValue::Boolean(_) => DataType::Boolean,
            FieldValue::Int32(_) => DataType::Int32,
            FieldValue::Int64(_) => DataType::Int64,
            FieldValue::Float(_) => DataType::Float,
            FieldValue::Double(_) => DataType::Double,
            FieldValue::Text(_) => DataType::Text,
        }
    }
}

/// One timestamped point of a series.
///
/// Timestamps are raw `i64` in the store's configured resolution; the
/// reader never interprets the unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeValuePair {
    pub timestamp: i64,
    pub value: FieldValue,
}

impl TimeValuePair {
    pub fn new(timestamp: i64, value: FieldValue) -> Self {
        TimeValuePair { timestamp, value }
    }
}
