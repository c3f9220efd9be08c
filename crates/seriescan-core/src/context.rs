//! Per-query execution context.
//!
//! A [`QueryContext`] travels with every reader of one query. It
//! carries the query identity, the cooperative cancellation flag, and
//! (when performance tracing is enabled for the query) the telemetry
//! counters that the pipeline feeds while unpacking chunks.
//!
//! The context is shared via `Arc`: a session layer may flip the
//! cancellation flag from another thread, and the reader observes it at
//! its suspension points only.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Telemetry counters for one query, fed while the pipeline unpacks
/// series metadata into chunks.
#[derive(Debug, Default)]
pub struct QueryTrace {
    chunk_count: AtomicU64,
    point_count: AtomicU64,
}

impl QueryTrace {
    /// Record `chunks` more chunks materialized for this query.
    pub fn record_chunks(&self, chunks: u64) {
        self.chunk_count.fetch_add(chunks, Ordering::Relaxed);
    }

    /// Record `points` more points covered by materialized chunks.
    pub fn record_points(&self, points: u64) {
        self.point_count.fetch_add(points, Ordering::Relaxed);
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count.load(Ordering::Relaxed)
    }

    pub fn point_count(&self) -> u64 {
        self.point_count.load(Ordering::Relaxed)
    }
}

/// Identity, cancellation, and optional telemetry for one query.
#[derive(Debug)]
pub struct QueryContext {
    query_id: u64,
    started_at: DateTime<Utc>,
    cancelled: AtomicBool,
    trace: Option<QueryTrace>,
}

impl QueryContext {
    /// A context without telemetry.
    pub fn new(query_id: u64) -> Self {
        QueryContext {
            query_id,
            started_at: Utc::now(),
            cancelled: AtomicBool::new(false),
            trace: None,
        }
    }

    /// A context with telemetry counters attached; used when the
    /// store-wide performance-tracing flag is on.
    pub fn with_tracing(query_id: u64) -> Self {
        QueryContext {
            trace: Some(QueryTrace::default()),
            ..QueryContext::new(query_id)
        }
    }

    pub fn query_id(&self) -> u64 {
        self.query_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Request cooperative cancellation. The owning reader fails with a
    /// cancellation error at its next tier-advance call.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn trace(&self) -> Option<&QueryTrace> {
        self.trace.as_ref()
    }
}
