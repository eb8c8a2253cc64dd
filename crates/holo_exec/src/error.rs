//! Error taxonomy for query execution and metrics aggregation.

use std::time::Duration;

use crate::session::HostId;

/// Startup failure while establishing the client session. Fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("no hosts configured")]
    NoHosts,
    #[error("unable to reach any of {seeds} seed hosts: {reasons}")]
    Unreachable { seeds: usize, reasons: String },
}

/// Failure of a single attempt. Always retryable within the retry budget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    #[error("attempt on {host} timed out after {timeout:?}")]
    Timeout { host: HostId, timeout: Duration },
    #[error("attempt on {host} failed: {reason}")]
    Failed { host: HostId, reason: String },
}

impl AttemptError {
    pub fn failed(host: &HostId, reason: impl Into<String>) -> Self {
        Self::Failed {
            host: host.clone(),
            reason: reason.into(),
        }
    }

    /// Host the failed attempt ran against.
    pub fn host(&self) -> &HostId {
        match self {
            Self::Timeout { host, .. } | Self::Failed { host, .. } => host,
        }
    }
}

/// Terminal failure of a logical query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("retries exhausted after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: AttemptError },
}

/// Raised while summarizing host metrics; reported per host, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationError {
    #[error("host {host} has no recorded attempts")]
    ZeroAttempts { host: HostId },
}
