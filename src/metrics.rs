//! Pipeline Metrics
//!
//! Counters and histograms for each stage of a run. They go through the
//! `metrics` facade, so they are free when no recorder is installed.

use crate::types::RunStatus;

/// Metrics for the batch-reading stage
pub struct BatchMetrics;

impl BatchMetrics {
    pub fn record_discovered(new_batches: usize) {
        ::metrics::histogram!("listening_new_batches_per_run").record(new_batches as f64);
    }

    pub fn record_read(events: usize) {
        ::metrics::counter!("listening_batches_read_total").increment(1);
        ::metrics::counter!("listening_events_read_total").increment(events as u64);
    }

    pub fn record_skipped() {
        ::metrics::counter!("listening_batches_skipped_total").increment(1);
    }
}

/// Metrics for genre enrichment
pub struct GenreMetrics;

impl GenreMetrics {
    /// Distinct artists in this run whose genre came from the cache
    pub fn record_cache_hits(artists: usize) {
        ::metrics::counter!("listening_genre_cache_hits_total").increment(artists as u64);
    }

    pub fn record_resolved() {
        ::metrics::counter!("listening_genre_lookups_total", "outcome" => "resolved").increment(1);
    }

    pub fn record_unknown(reason: &'static str) {
        ::metrics::counter!("listening_genre_lookups_total", "outcome" => "unknown", "reason" => reason)
            .increment(1);
    }

    pub fn record_retry() {
        ::metrics::counter!("listening_genre_lookup_retries_total").increment(1);
    }
}

/// Run-level metrics
pub struct RunMetrics;

impl RunMetrics {
    pub fn record_finished(status: RunStatus, rows: usize, duration_secs: f64) {
        ::metrics::counter!("listening_runs_total", "status" => status.as_str()).increment(1);
        ::metrics::histogram!("listening_run_duration_seconds").record(duration_secs);
        if status == RunStatus::Ok {
            ::metrics::gauge!("listening_dataset_rows").set(rows as f64);
        }
    }

    pub fn record_failure(kind: &'static str) {
        ::metrics::counter!("listening_run_failures_total", "kind" => kind).increment(1);
    }
}
