//! Tier-protocol guarantees: statistics-only traversal, misuse
//! errors, cancellation, and telemetry.

mod common;

use std::sync::Arc;

use common::*;
use seriescan_core::{Direction, QueryContext, ReadError, Statistics};

#[test]
fn statistics_only_traversal_decodes_nothing() {
    let f1 = file_with_pages(1, &[&[(1, "a"), (2, "b"), (3, "c")]]);
    let f2 = file_with_pages(2, &[&[(4, "d"), (5, "e")]]);

    let mut reader = reader(&[f1.clone(), f2.clone()], &[], Direction::Asc);

    let mut stats: Vec<Statistics> = Vec::new();
    while reader.has_next_file().unwrap() {
        assert!(!reader.is_file_overlapped().unwrap());
        assert!(!reader.current_file_modified().unwrap());
        stats.push(reader.current_file_statistics().unwrap().clone());
        reader.skip_current_file();
    }

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].start_time, 1);
    assert_eq!(stats[0].end_time, 3);
    assert_eq!(stats[1].count, 2);
    assert_eq!(f1.decoded_pages(), 0);
    assert_eq!(f2.decoded_pages(), 0);
}

#[test]
fn chunk_statistics_shortcut_skips_page_decoding() {
    let seq = file_with_chunks(1, &[&[(1, "a"), (2, "b")], &[(10, "c"), (20, "d")]]);

    let mut reader = reader(&[seq.clone()], &[], Direction::Asc);

    let mut counts = 0;
    while reader.has_next_file().unwrap() {
        while reader.has_next_chunk().unwrap() {
            assert!(!reader.is_chunk_overlapped().unwrap());
            assert!(!reader.current_chunk_modified().unwrap());
            counts += reader.current_chunk_statistics().unwrap().count;
            reader.skip_current_chunk();
        }
    }

    assert_eq!(counts, 4);
    assert_eq!(seq.decoded_pages(), 0);
}

#[test]
fn empty_source_is_empty() {
    let mut reader = reader(&[], &[], Direction::Asc);
    assert!(reader.is_empty().unwrap());
    assert!(!reader.has_next_file().unwrap());
    assert!(!reader.has_next_chunk().unwrap());
    assert!(!reader.has_next_page().unwrap());
}

#[test]
fn files_without_the_series_are_dropped() {
    use seriescan_core::store::memory::MemoryFileBuilder;
    use seriescan_core::{DataType, SeriesPath};

    let other = SeriesPath::new("dev9", "s9");
    let absent = MemoryFileBuilder::new(1)
        .chunk(&other, DataType::Text, vec![vec![(1, text("z"))]])
        .build();
    let present = file_with_pages(2, &[&[(5, "v")]]);

    let mut reader = reader(&[absent, present], &[], Direction::Asc);
    assert_eq!(drain(&mut reader).unwrap(), pairs(&[(5, "v")]));
}

#[test]
fn advancing_file_tier_over_residual_pages_fails() {
    let seq = file_with_pages(1, &[&[(1, "a"), (2, "b")]]);
    let mut reader = reader(&[seq], &[], Direction::Asc);

    assert!(reader.has_next_file().unwrap());
    assert!(reader.has_next_chunk().unwrap());
    assert!(reader.has_next_page().unwrap());

    // the current page was never consumed
    let err = reader.has_next_file().unwrap_err();
    assert!(matches!(
        err,
        ReadError::ResidualPages {
            first_page_present: true,
            ..
        }
    ));
    let err = reader.has_next_chunk().unwrap_err();
    assert!(matches!(err, ReadError::ResidualPages { .. }));
}

#[test]
fn advancing_file_tier_over_residual_chunks_fails() {
    let seq = file_with_chunks(1, &[&[(1, "a")], &[(10, "b")]]);
    let mut reader = reader(&[seq], &[], Direction::Asc);

    assert!(reader.has_next_file().unwrap());
    assert!(reader.has_next_chunk().unwrap());

    let err = reader.has_next_file().unwrap_err();
    assert!(matches!(err, ReadError::ResidualChunks));
}

#[test]
fn inspecting_missing_current_items_fails() {
    let mut reader = reader(&[], &[], Direction::Asc);

    assert!(matches!(
        reader.current_file_statistics(),
        Err(ReadError::NoCurrentFile)
    ));
    assert!(matches!(
        reader.current_chunk_statistics(),
        Err(ReadError::NoCurrentChunk)
    ));
    assert!(matches!(
        reader.current_page_statistics(),
        Err(ReadError::NoCurrentPage)
    ));
    assert!(matches!(
        reader.is_page_overlapped(),
        Err(ReadError::NoCurrentPage)
    ));
}

#[test]
fn next_page_without_a_ready_batch_fails() {
    let mut reader = reader(&[], &[], Direction::Asc);
    assert!(matches!(reader.next_page(), Err(ReadError::NoNextPage)));
}

#[test]
fn cancellation_surfaces_between_tier_calls() {
    let seq = file_with_pages(1, &[&[(1, "a"), (2, "b"), (3, "c")]]);
    let unseq = file_with_pages(2, &[&[(2, "B"), (3, "C"), (4, "D")]]);

    let context = Arc::new(QueryContext::new(42));
    let mut reader = reader_with(
        &[seq],
        &[unseq],
        Direction::Asc,
        Arc::clone(&context),
        None,
        None,
    );

    assert!(reader.has_next_file().unwrap());
    assert!(reader.has_next_chunk().unwrap());

    context.cancel();
    let err = reader.has_next_page().unwrap_err();
    assert!(matches!(err, ReadError::Cancelled { query_id: 42 }));
}

#[test]
fn page_overlap_inspection_reports_pending_unseq() {
    let seq = file_with_pages(1, &[&[(1, "a"), (2, "b"), (3, "c")]]);
    let mut reader = reader(&[seq], &[], Direction::Asc);

    assert!(reader.has_next_file().unwrap());
    assert!(reader.has_next_chunk().unwrap());
    assert!(reader.has_next_page().unwrap());
    assert!(!reader.is_page_overlapped().unwrap());
    assert!(!reader.current_page_modified().unwrap());
    assert_eq!(reader.current_page_statistics().unwrap().count, 3);
}

#[test]
fn telemetry_counts_unpacked_chunks_and_points() {
    let seq = file_with_pages(1, &[&[(1, "a"), (2, "b"), (3, "c")]]);
    let unseq = file_with_pages(2, &[&[(2, "B"), (3, "C"), (4, "D")]]);

    let context = Arc::new(QueryContext::with_tracing(7));
    let mut reader = reader_with(
        &[seq],
        &[unseq],
        Direction::Asc,
        Arc::clone(&context),
        None,
        None,
    );
    drain(&mut reader).unwrap();

    let trace = context.trace().expect("tracing enabled");
    assert_eq!(trace.chunk_count(), 2);
    assert_eq!(trace.point_count(), 6);
}

#[test]
fn reader_is_empty_after_full_drain() {
    let seq = file_with_pages(1, &[&[(1, "a"), (2, "b")]]);
    let unseq = file_with_pages(2, &[&[(2, "B")]]);

    let mut reader = reader(&[seq], &[unseq], Direction::Asc);
    assert!(!reader.is_empty().unwrap());
    drain(&mut reader).unwrap();
    assert!(reader.is_empty().unwrap());
}
