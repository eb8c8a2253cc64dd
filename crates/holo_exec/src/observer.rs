//! Terminal query events and the observer that aggregates them per host.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::info;

use crate::error::QueryError;
use crate::metrics::{summarize, HostMetrics, HostMetricsStore, HostSummary};
use crate::session::HostId;

/// Final, authoritative outcome of one logical query.
///
/// The driver produces exactly one of these per query no matter how many
/// retry or speculative attempts ran underneath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedQueryEvent {
    pub statement: String,
    /// Winning host on success, host of the last failed attempt otherwise.
    pub host: HostId,
    /// Attempts launched for this query, speculative ones included.
    pub attempts: u32,
    /// Elapsed time from the first launch to the terminal result.
    pub latency: Duration,
    pub rows: u64,
    pub outcome: Result<(), QueryError>,
}

impl ObservedQueryEvent {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub trait QueryObserver: Send + Sync {
    fn on_event(&self, event: &ObservedQueryEvent);
}

/// Folds successful events into per-host [`HostMetrics`].
///
/// Failed events leave the metrics untouched; with error counting enabled
/// they are tallied in a separate per-host table instead.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    store: HostMetricsStore,
    verbose: bool,
    count_errors: bool,
}

impl MetricsObserver {
    pub fn new(verbose: bool) -> Self {
        Self {
            store: HostMetricsStore::default(),
            verbose,
            count_errors: false,
        }
    }

    pub fn with_error_counts(mut self, count_errors: bool) -> Self {
        self.count_errors = count_errors;
        self
    }

    /// Point-in-time copy of the host table.
    pub fn snapshot(&self) -> BTreeMap<HostId, HostMetrics> {
        self.store.snapshot()
    }

    /// Per-host failed-query counts; empty unless error counting is enabled.
    pub fn error_snapshot(&self) -> BTreeMap<HostId, u64> {
        self.store.error_snapshot()
    }

    /// Attempts and average latency for every host seen so far.
    pub fn summary(&self) -> Vec<HostSummary> {
        let hosts = self.store.snapshot();
        if self.count_errors {
            let errors = self.store.error_snapshot();
            summarize(&hosts, Some(&errors))
        } else {
            summarize(&hosts, None)
        }
    }
}

impl QueryObserver for MetricsObserver {
    fn on_event(&self, event: &ObservedQueryEvent) {
        match &event.outcome {
            Ok(()) => self.store.record_success(
                &event.host,
                u64::from(event.attempts),
                u64::try_from(event.latency.as_millis()).unwrap_or(u64::MAX),
            ),
            Err(_) if self.count_errors => self.store.record_error(&event.host),
            Err(_) => {}
        }

        if self.verbose {
            let error = match &event.outcome {
                Ok(()) => "none".to_string(),
                Err(err) => err.to_string(),
            };
            info!(
                "observed query {:?}: returned {} rows, took {:?} on host {} with {} attempts. error: {}",
                event.statement, event.rows, event.latency, event.host, event.attempts, error
            );
        }
    }
}
