//! Per-host attempt and latency aggregates.
//!
//! The store is owned by [`crate::MetricsObserver`]; outside callers only
//! ever see copies taken under the lock.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use serde::Serialize;

use crate::error::AggregationError;
use crate::session::HostId;

/// Cumulative successful-execution counters for one host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostMetrics {
    /// Attempts consumed by successful queries won by this host.
    pub attempts: u64,
    /// Sum of end-to-end latency of those queries in milliseconds.
    pub total_latency_ms: u64,
}

impl HostMetrics {
    pub fn merge(&mut self, attempts: u64, latency_ms: u64) {
        self.attempts = self.attempts.saturating_add(attempts);
        self.total_latency_ms = self.total_latency_ms.saturating_add(latency_ms);
    }

    pub fn average_latency_ms(&self, host: &HostId) -> Result<u64, AggregationError> {
        self.total_latency_ms
            .checked_div(self.attempts)
            .ok_or_else(|| AggregationError::ZeroAttempts { host: host.clone() })
    }
}

/// Mutex-guarded host table plus the optional per-host error tally.
#[derive(Debug, Default)]
pub(crate) struct HostMetricsStore {
    hosts: Mutex<BTreeMap<HostId, HostMetrics>>,
    errors: Mutex<BTreeMap<HostId, u64>>,
}

impl HostMetricsStore {
    pub(crate) fn record_success(&self, host: &HostId, attempts: u64, latency_ms: u64) {
        let mut hosts = self
            .hosts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        hosts
            .entry(host.clone())
            .or_default()
            .merge(attempts, latency_ms);
    }

    pub(crate) fn record_error(&self, host: &HostId) {
        let mut errors = self
            .errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let count = errors.entry(host.clone()).or_default();
        *count = count.saturating_add(1);
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<HostId, HostMetrics> {
        self.hosts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn error_snapshot(&self) -> BTreeMap<HostId, u64> {
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// One line of the end-of-run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostSummary {
    pub host: HostId,
    pub attempts: u64,
    pub total_latency_ms: u64,
    /// `None` when the average could not be computed.
    pub avg_latency_ms: Option<u64>,
    /// Failed queries attributed to this host, when error counting is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<u64>,
}

impl fmt::Display for HostSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Host: {}, Attempts: {}, ", self.host, self.attempts)?;
        match self.avg_latency_ms {
            Some(avg) => write!(f, "Avg Latency: {avg}ms")?,
            None => f.write_str("Avg Latency: N/A")?,
        }
        if let Some(errors) = self.errors {
            write!(f, ", Errors: {errors}")?;
        }
        Ok(())
    }
}

/// Builds report lines for every host present in either table.
///
/// Hosts that only ever failed appear with zero attempts and no average.
pub fn summarize(
    hosts: &BTreeMap<HostId, HostMetrics>,
    errors: Option<&BTreeMap<HostId, u64>>,
) -> Vec<HostSummary> {
    let mut names: Vec<&HostId> = hosts.keys().collect();
    if let Some(errors) = errors {
        names.extend(errors.keys().filter(|host| !hosts.contains_key(*host)));
        names.sort();
    }

    names
        .into_iter()
        .map(|host| {
            let metrics = hosts.get(host).copied().unwrap_or_default();
            let avg_latency_ms = match metrics.average_latency_ms(host) {
                Ok(avg) => Some(avg),
                Err(err) => {
                    // Error-only hosts legitimately have no attempts.
                    if errors.map_or(true, |errors| !errors.contains_key(host)) {
                        tracing::warn!(error = %err, "skipping average latency");
                    }
                    None
                }
            };
            HostSummary {
                host: host.clone(),
                attempts: metrics.attempts,
                total_latency_ms: metrics.total_latency_ms,
                avg_latency_ms,
                errors: errors.map(|errors| errors.get(host).copied().unwrap_or(0)),
            }
        })
        .collect()
}
