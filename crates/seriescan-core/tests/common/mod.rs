//! Shared fixtures: scenario files over the in-memory store and
//! protocol-driving helpers.

use std::collections::BTreeSet;
use std::sync::Arc;

use seriescan_core::store::memory::{MemoryFile, MemoryFileBuilder};
use seriescan_core::{
    DataType, Direction, FieldValue, Filter, QueryContext, QuerySource, ReadResult, SeriesPath,
    SeriesReader,
};

pub fn series() -> SeriesPath {
    SeriesPath::new("dev1", "s1")
}

pub fn text(v: &str) -> FieldValue {
    FieldValue::Text(v.to_string())
}

/// One file holding a single chunk whose pages are the inner slices.
pub fn file_with_pages(version: u64, pages: &[&[(i64, &str)]]) -> MemoryFile {
    MemoryFileBuilder::new(version)
        .chunk(
            &series(),
            DataType::Text,
            pages
                .iter()
                .map(|page| page.iter().map(|&(t, v)| (t, text(v))).collect())
                .collect(),
        )
        .build()
}

/// One file holding one single-page chunk per inner slice.
pub fn file_with_chunks(version: u64, chunks: &[&[(i64, &str)]]) -> MemoryFile {
    let mut builder = MemoryFileBuilder::new(version);
    for chunk in chunks {
        builder = builder.chunk(
            &series(),
            DataType::Text,
            vec![chunk.iter().map(|&(t, v)| (t, text(v))).collect()],
        );
    }
    builder.build()
}

pub fn reader_with(
    seq: &[MemoryFile],
    unseq: &[MemoryFile],
    direction: Direction,
    context: Arc<QueryContext>,
    time_filter: Option<Arc<dyn Filter>>,
    value_filter: Option<Arc<dyn Filter>>,
) -> SeriesReader {
    SeriesReader::new(
        series(),
        BTreeSet::new(),
        DataType::Text,
        context,
        QuerySource::new(
            seq.iter().map(|f| f.handle()).collect(),
            unseq.iter().map(|f| f.handle()).collect(),
        ),
        time_filter,
        value_filter,
        None,
        direction,
    )
}

pub fn reader(seq: &[MemoryFile], unseq: &[MemoryFile], direction: Direction) -> SeriesReader {
    reader_with(
        seq,
        unseq,
        direction,
        Arc::new(QueryContext::new(1)),
        None,
        None,
    )
}

fn text_of(value: FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s,
        other => panic!("expected text value, got {other:?}"),
    }
}

/// Drain the full tier protocol, returning batches as they came out.
pub fn drain_batches(reader: &mut SeriesReader) -> ReadResult<Vec<Vec<(i64, String)>>> {
    let mut batches = Vec::new();
    while reader.has_next_file()? {
        while reader.has_next_chunk()? {
            while reader.has_next_page()? {
                let batch = reader.next_page()?;
                batches.push(
                    batch
                        .map(|p| (p.timestamp, text_of(p.value)))
                        .collect::<Vec<_>>(),
                );
            }
        }
    }
    Ok(batches)
}

/// Drain the full tier protocol into one flattened point list.
pub fn drain(reader: &mut SeriesReader) -> ReadResult<Vec<(i64, String)>> {
    Ok(drain_batches(reader)?.into_iter().flatten().collect())
}

pub fn pairs(expected: &[(i64, &str)]) -> Vec<(i64, String)> {
    expected.iter().map(|&(t, v)| (t, v.to_string())).collect()
}

/// Value predicate rejecting one exact value; ignores timestamps.
#[derive(Debug)]
pub struct ExcludeValue(pub FieldValue);

impl Filter for ExcludeValue {
    fn satisfy(&self, _timestamp: i64, value: &FieldValue) -> bool {
        *value != self.0
    }
}
